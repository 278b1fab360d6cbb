//! Agent System
//!
//! [`Agent`] is a model-backed conversational agent with a stable identity, a rolling
//! [`LLMSession`], and optional tool access through a [`ToolRegistry`].
//!
//! Tools are offered to the model in plain text: every user message is followed by the tool
//! catalogue and an instruction to answer with
//! `{"tool_call": {"name": "...", "parameters": {...}}}`. When the reply contains such a
//! fragment the agent runs the tool, feeds the outcome back as the next user message, and
//! repeats, up to five tool calls per question.
//!
//! # Example
//!
//! ```rust,no_run
//! use course_advisor::Agent;
//! use course_advisor::clients::openai::OpenAIClient;
//! use std::sync::Arc;
//!
//! # async {
//! let mut agent = Agent::new(
//!     "advisor",
//!     "Course Advisor",
//!     Arc::new(OpenAIClient::new_with_model_string("key", "gpt-4o")),
//! )
//! .with_system_prompt("You are a course advisor.");
//!
//! let reply = agent.send("What are the prerequisites for BIOL P110?").await.unwrap();
//! println!("{}", reply.content);
//! # };
//! ```

use crate::advisor::client_wrapper::{ClientWrapper, Role, TokenUsage};
use crate::advisor::config::DEFAULT_MAX_TOKENS;
use crate::advisor::event::{AgentEvent, EventHandler};
use crate::advisor::llm_session::LLMSession;
use crate::advisor::tool_protocol::ToolRegistry;
use std::error::Error;
use std::sync::Arc;

/// Most tool calls honoured while answering one question.
pub const MAX_TOOL_ITERATIONS: usize = 5;

/// Suffix appended when the model is still asking for tools after the cap.
pub const MAX_ITERATIONS_WARNING: &str = "\n\n[Warning: Maximum tool iterations reached]";

/// A `{"tool_call": ...}` request parsed out of a model reply.
#[derive(Debug, Clone, PartialEq)]
struct ToolCall {
    name: String,
    parameters: serde_json::Value,
}

/// Final answer to one question.
#[derive(Debug, Clone)]
pub struct AgentResponse {
    /// Final message content produced across tool iterations.
    pub content: String,
    /// Token usage summed over every model call, `None` if the provider reported nothing.
    pub tokens_used: Option<TokenUsage>,
}

/// An LLM agent with identity, conversation memory and optional tools.
pub struct Agent {
    /// Stable identifier.
    pub id: String,
    /// Human-readable display name for logging.
    pub name: String,
    session: LLMSession,
    tool_registry: ToolRegistry,
    event_handler: Option<Arc<dyn EventHandler>>,
}

impl Agent {
    /// Create an agent with an empty system prompt, no tools and the default token budget.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        client: Arc<dyn ClientWrapper>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            session: LLMSession::new(client, String::new(), DEFAULT_MAX_TOKENS),
            tool_registry: ToolRegistry::empty(),
            event_handler: None,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.session.set_system_prompt(prompt.into());
        self
    }

    /// Context window after which the oldest history is dropped.
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.session.set_max_tokens(max_tokens);
        self
    }

    /// Replace the tool registry.
    pub fn with_tools(mut self, registry: ToolRegistry) -> Self {
        self.tool_registry = registry;
        self
    }

    pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.event_handler = Some(handler);
        self
    }

    pub fn set_system_prompt(&mut self, prompt: &str) {
        self.session.set_system_prompt(prompt.to_string());
    }

    pub fn system_prompt(&self) -> &str {
        self.session.system_prompt()
    }

    /// Names of the registered tools, in registration order.
    pub fn list_tools(&self) -> Vec<String> {
        self.tool_registry
            .list_tools()
            .iter()
            .map(|m| m.name.clone())
            .collect()
    }

    pub fn tool_registry(&self) -> &ToolRegistry {
        &self.tool_registry
    }

    pub fn model_name(&self) -> &str {
        self.session.client().model_name()
    }

    pub fn client(&self) -> &Arc<dyn ClientWrapper> {
        self.session.client()
    }

    pub fn session(&self) -> &LLMSession {
        &self.session
    }

    async fn emit(&self, event: AgentEvent) {
        if let Some(handler) = &self.event_handler {
            handler.on_agent_event(&event).await;
        }
    }

    /// Tool catalogue appended to each question, empty when there are no tools.
    fn tool_catalogue(&self) -> String {
        let tools = self.tool_registry.list_tools();
        if tools.is_empty() {
            return String::new();
        }

        let mut out = String::from("\n\nYou have access to the following tools:\n");
        for tool in tools {
            out.push_str(&format!("- {}: {}\n", tool.name, tool.description));
            if !tool.parameters.is_empty() {
                out.push_str("  Parameters:\n");
                for param in &tool.parameters {
                    out.push_str(&format!(
                        "    - {} ({:?}{}): {}\n",
                        param.name,
                        param.param_type,
                        if param.required { ", required" } else { "" },
                        param.description.as_deref().unwrap_or("No description")
                    ));
                }
            }
        }
        out.push_str(
            "\nTo use a tool, respond with a JSON object in the following format:\n\
             {\"tool_call\": {\"name\": \"tool_name\", \"parameters\": {...}}}\n\
             After tool execution, I'll provide the result and you can continue.\n",
        );
        out
    }

    async fn call_model(
        &mut self,
        content: String,
        iteration: usize,
        totals: &mut TokenUsage,
    ) -> Result<String, Box<dyn Error + Send + Sync>> {
        let reply = self.session.send_message(Role::User, content).await?;
        if let Some(usage) = self.session.client().get_last_usage() {
            totals.accumulate(&usage);
        }
        self.emit(AgentEvent::LLMCallCompleted {
            agent_id: self.id.clone(),
            agent_name: self.name.clone(),
            iteration,
            tokens_used: reported(totals),
            response_length: reply.content.len(),
        })
        .await;
        Ok(reply.content)
    }

    /// Answer `user_message`, running any tools the model asks for.
    ///
    /// Tool failures are reported back to the model rather than returned; only a failed
    /// model call is an error.
    pub async fn send(
        &mut self,
        user_message: &str,
    ) -> Result<AgentResponse, Box<dyn Error + Send + Sync>> {
        self.emit(AgentEvent::SendStarted {
            agent_id: self.id.clone(),
            agent_name: self.name.clone(),
            message_preview: user_message.chars().take(120).collect(),
        })
        .await;

        let mut totals = TokenUsage::default();
        let message_with_tools = format!("{}{}", user_message, self.tool_catalogue());
        let mut current_response = self.call_model(message_with_tools, 1, &mut totals).await?;

        let mut tool_iteration = 0;
        while let Some(tool_call) = parse_tool_call(&current_response) {
            if tool_iteration >= MAX_TOOL_ITERATIONS {
                self.emit(AgentEvent::ToolMaxIterationsReached {
                    agent_id: self.id.clone(),
                    agent_name: self.name.clone(),
                })
                .await;
                current_response.push_str(MAX_ITERATIONS_WARNING);
                break;
            }
            tool_iteration += 1;

            self.emit(AgentEvent::ToolCallDetected {
                agent_id: self.id.clone(),
                agent_name: self.name.clone(),
                tool_name: tool_call.name.clone(),
                parameters: tool_call.parameters.clone(),
                iteration: tool_iteration,
            })
            .await;

            let outcome = self
                .tool_registry
                .execute_tool(&tool_call.name, tool_call.parameters.clone())
                .await;
            let (feedback, success, error) = match outcome {
                Ok(result) if result.success => (
                    format!(
                        "Tool '{}' executed successfully. Result: {}",
                        tool_call.name,
                        result.output_text()
                    ),
                    true,
                    None,
                ),
                Ok(result) => {
                    let err = result.error.unwrap_or_else(|| "Unknown error".to_string());
                    (
                        format!("Tool '{}' failed. Error: {}", tool_call.name, err),
                        false,
                        Some(err),
                    )
                }
                Err(e) => (
                    format!("Tool execution error: {}", e),
                    false,
                    Some(e.to_string()),
                ),
            };

            self.emit(AgentEvent::ToolExecutionCompleted {
                agent_id: self.id.clone(),
                agent_name: self.name.clone(),
                tool_name: tool_call.name,
                parameters: tool_call.parameters,
                success,
                error,
                iteration: tool_iteration,
            })
            .await;

            current_response = self
                .call_model(feedback, tool_iteration + 1, &mut totals)
                .await?;
        }

        let tokens_used = reported(&totals);
        self.emit(AgentEvent::SendCompleted {
            agent_id: self.id.clone(),
            agent_name: self.name.clone(),
            tokens_used: tokens_used.clone(),
            tool_calls_made: tool_iteration,
            response_length: current_response.len(),
        })
        .await;

        Ok(AgentResponse {
            content: current_response,
            tokens_used,
        })
    }
}

fn reported(totals: &TokenUsage) -> Option<TokenUsage> {
    if totals.total_tokens > 0 {
        Some(totals.clone())
    } else {
        None
    }
}

/// Extract the first `{"tool_call": {"name": ..., "parameters": ...}}` object.
///
/// The object may be surrounded by prose and may span several lines. Each `{` that opens a
/// `"tool_call"` key is handed to the JSON deserializer, which stops at the end of the first
/// complete value, so braces inside string literals do not matter.
fn parse_tool_call(response: &str) -> Option<ToolCall> {
    response
        .char_indices()
        .filter(|&(i, ch)| {
            ch == '{' && response[i + 1..].trim_start().starts_with("\"tool_call\"")
        })
        .find_map(|(i, _)| {
            let value = serde_json::Deserializer::from_str(&response[i..])
                .into_iter::<serde_json::Value>()
                .next()?
                .ok()?;
            let call = value.get("tool_call")?;
            Some(ToolCall {
                name: call.get("name")?.as_str()?.to_string(),
                parameters: call
                    .get("parameters")
                    .cloned()
                    .unwrap_or_else(|| serde_json::json!({})),
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::clients::openai::OpenAIClient;

    #[test]
    fn test_agent_creation() {
        let agent = Agent::new(
            "course-recommendation-agent",
            "Course Advisor",
            Arc::new(OpenAIClient::new_with_model_string("test-key", "gpt-4o")),
        )
        .with_system_prompt("advise");

        assert_eq!(agent.id, "course-recommendation-agent");
        assert_eq!(agent.system_prompt(), "advise");
        assert_eq!(agent.model_name(), "gpt-4o");
        assert!(agent.list_tools().is_empty());
    }

    #[test]
    fn test_parse_tool_call_inside_prose() {
        let reply = "Let me check. {\"tool_call\": {\"name\": \"sql_query\", \"parameters\": {\"query\": \"SELECT 1 WHERE x = '{}'\"}}} Thanks.";
        let call = parse_tool_call(reply).unwrap();
        assert_eq!(call.name, "sql_query");
        assert_eq!(call.parameters["query"], "SELECT 1 WHERE x = '{}'");
    }

    #[test]
    fn test_parse_tool_call_after_multibyte_text() {
        let reply = "Voilà → {\"tool_call\": {\"name\": \"get_schema\", \"parameters\": {}}}";
        let call = parse_tool_call(reply).unwrap();
        assert_eq!(call.name, "get_schema");
        assert_eq!(call.parameters, serde_json::json!({}));
    }

    #[test]
    fn test_parse_tool_call_with_brace_inside_string() {
        let reply = r#"{"tool_call": {"name": "sql_query", "parameters": {"query": "SELECT * FROM course_schedule WHERE title LIKE '%}%'"}}}"#;
        let call = parse_tool_call(reply).unwrap();
        assert_eq!(call.name, "sql_query");
        assert_eq!(
            call.parameters["query"],
            "SELECT * FROM course_schedule WHERE title LIKE '%}%'"
        );
    }

    #[test]
    fn test_parse_tool_call_pretty_printed() {
        let reply = "Sure.\n{\n  \"tool_call\": {\n    \"name\": \"get_schema\",\n    \"parameters\": {}\n  }\n}\n";
        let call = parse_tool_call(reply).unwrap();
        assert_eq!(call.name, "get_schema");
        assert_eq!(call.parameters, serde_json::json!({}));
    }

    #[test]
    fn test_parse_tool_call_skips_broken_fragment() {
        let reply = r#"{"tool_call": oops} then {"tool_call": {"name": "retrieve", "parameters": {"text": "biology"}}}"#;
        let call = parse_tool_call(reply).unwrap();
        assert_eq!(call.name, "retrieve");
        assert_eq!(call.parameters["text"], "biology");
    }

    #[test]
    fn test_parse_tool_call_rejects_incomplete() {
        assert!(parse_tool_call("no tools here").is_none());
        assert!(parse_tool_call("{\"tool_call\": {\"name\": \"sql_query\"").is_none());
        assert!(parse_tool_call("{\"tool_call\": {\"parameters\": {}}}").is_none());
    }
}
