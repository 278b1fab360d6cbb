//! Agent event system.
//!
//! Implement [`EventHandler`] to observe what the advising agent does while it answers a
//! question: each LLM round-trip, each tool call it makes, and the iteration cap.
//! [`LoggingEventHandler`] forwards everything to the `log` facade and is what the binary
//! installs when debug logging is on.
//!
//! # Event Flow (during a typical `send()` call)
//!
//! ```text
//! SendStarted
//!   └─ LLMCallCompleted { iteration: 1 }
//!   └─ (if tool call detected in response)
//!       ├─ ToolCallDetected { iteration: 1 }
//!       ├─ ToolExecutionCompleted { iteration: 1 }
//!       └─ LLMCallCompleted { iteration: 2 }
//!   └─ (loop continues until no tool call or max iterations)
//! SendCompleted
//! ```

use crate::advisor::client_wrapper::TokenUsage;
use async_trait::async_trait;

/// Events emitted by an [`Agent`](crate::Agent) during [`send`](crate::Agent::send).
///
/// Every variant carries `agent_id` and `agent_name` so a shared handler can tell agents
/// apart.
#[derive(Debug, Clone)]
pub enum AgentEvent {
    /// A question was received.
    SendStarted {
        agent_id: String,
        agent_name: String,
        /// First ~120 characters of the user message.
        message_preview: String,
    },

    /// `send()` is returning a final answer.
    SendCompleted {
        agent_id: String,
        agent_name: String,
        /// Usage summed over every model call in this turn.
        tokens_used: Option<TokenUsage>,
        /// Number of tool calls executed while answering.
        tool_calls_made: usize,
        /// Character length of the final response text.
        response_length: usize,
    },

    /// One model round-trip finished.
    LLMCallCompleted {
        agent_id: String,
        agent_name: String,
        /// 1-based iteration (1 = initial call, 2+ = tool follow-ups).
        iteration: usize,
        tokens_used: Option<TokenUsage>,
        response_length: usize,
    },

    /// A `{"tool_call": ...}` fragment was parsed from the model's reply.
    ToolCallDetected {
        agent_id: String,
        agent_name: String,
        tool_name: String,
        parameters: serde_json::Value,
        iteration: usize,
    },

    /// A tool finished executing. On failure `error` holds the message fed back to the model.
    ToolExecutionCompleted {
        agent_id: String,
        agent_name: String,
        tool_name: String,
        parameters: serde_json::Value,
        success: bool,
        error: Option<String>,
        iteration: usize,
    },

    /// The tool loop hit its iteration cap and the answer was returned with a warning suffix.
    ToolMaxIterationsReached { agent_id: String, agent_name: String },
}

/// Callback for [`AgentEvent`]s. The default implementation ignores everything.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn on_agent_event(&self, _event: &AgentEvent) {}
}

/// Writes every event to the `log` facade at debug level, tool failures at warn.
pub struct LoggingEventHandler;

#[async_trait]
impl EventHandler for LoggingEventHandler {
    async fn on_agent_event(&self, event: &AgentEvent) {
        match event {
            AgentEvent::SendStarted {
                agent_name,
                message_preview,
                ..
            } => log::debug!("{} received: {}", agent_name, message_preview),
            AgentEvent::LLMCallCompleted {
                agent_name,
                iteration,
                response_length,
                ..
            } => log::debug!(
                "{} model call {} returned {} chars",
                agent_name,
                iteration,
                response_length
            ),
            AgentEvent::ToolCallDetected {
                agent_name,
                tool_name,
                parameters,
                ..
            } => log::debug!("{} calling {} with {}", agent_name, tool_name, parameters),
            AgentEvent::ToolExecutionCompleted {
                agent_name,
                tool_name,
                success,
                error,
                ..
            } => {
                if *success {
                    log::debug!("{} tool {} succeeded", agent_name, tool_name);
                } else {
                    log::warn!(
                        "{} tool {} failed: {}",
                        agent_name,
                        tool_name,
                        error.as_deref().unwrap_or("unknown error")
                    );
                }
            }
            AgentEvent::ToolMaxIterationsReached { agent_name, .. } => {
                log::warn!("{} reached the tool iteration limit", agent_name)
            }
            AgentEvent::SendCompleted {
                agent_name,
                tokens_used,
                tool_calls_made,
                ..
            } => log::debug!(
                "{} answered after {} tool call(s), {} tokens",
                agent_name,
                tool_calls_made,
                tokens_used.as_ref().map(|u| u.total_tokens).unwrap_or(0)
            ),
        }
    }
}
