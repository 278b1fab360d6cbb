//! The `llm_session` module keeps the running conversation for one advising session:
//! message history, the system prompt that steers the model, context pruning, and
//! cumulative token accounting.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use course_advisor::client_wrapper::Role;
//! use course_advisor::clients::bedrock::BedrockClient;
//! use course_advisor::LLMSession;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let client = BedrockClient::from_env("us.anthropic.claude-3-5-haiku-20241022-v1:0")?;
//! let mut session = LLMSession::new(
//!     Arc::new(client),
//!     "You are a course advisor.".into(),
//!     8_192,
//! );
//!
//! let reply = session.send_message(Role::User, "How many credits has student 1 earned?".into()).await?;
//! println!("Advisor: {}", reply.content);
//!
//! let usage = session.token_usage();
//! println!("{} tokens so far", usage.total_tokens);
//! # Ok(())
//! # }
//! ```

use crate::advisor::client_wrapper::{ClientWrapper, Message, Role, TokenUsage};
use std::error::Error;
use std::sync::Arc;

/// A conversation with one model.
///
/// The system prompt is kept apart from `conversation_history` and prepended on every
/// request. When the reported usage of a call exceeds `max_tokens`, the oldest messages
/// are dropped until the estimated excess is cleared.
pub struct LLMSession {
    client: Arc<dyn ClientWrapper>,
    system_prompt: Message,
    conversation_history: Vec<Message>,
    max_tokens: usize,
    usage: TokenUsage,
    last_call_tokens: usize,
}

impl LLMSession {
    pub fn new(client: Arc<dyn ClientWrapper>, system_prompt: String, max_tokens: usize) -> Self {
        LLMSession {
            client,
            system_prompt: Message::new(Role::System, system_prompt),
            conversation_history: Vec::new(),
            max_tokens,
            usage: TokenUsage::default(),
            last_call_tokens: 0,
        }
    }

    /// Append `content` under `role`, send the whole conversation, and record the reply.
    ///
    /// On failure the message is taken back out of history, so a retry does not repeat it.
    pub async fn send_message(
        &mut self,
        role: Role,
        content: String,
    ) -> Result<Message, Box<dyn Error + Send + Sync>> {
        self.conversation_history.push(Message::new(role, content));

        let mut request = Vec::with_capacity(self.conversation_history.len() + 1);
        request.push(self.system_prompt.clone());
        request.extend(self.conversation_history.iter().cloned());

        let response = match self.client.send_message(&request).await {
            Ok(response) => response,
            Err(e) => {
                self.conversation_history.pop();
                return Err(e);
            }
        };

        if let Some(usage) = self.client.get_last_usage() {
            self.usage.accumulate(&usage);
            self.last_call_tokens = usage.total_tokens;

            if usage.total_tokens > self.max_tokens {
                let mut excess = usage.total_tokens - self.max_tokens;
                while excess > 0 && !self.conversation_history.is_empty() {
                    let removed = self.conversation_history.remove(0);
                    excess = excess.saturating_sub(estimate_message_token_count(&removed));
                }
                log::debug!(
                    "context over {} tokens, history trimmed to {} message(s)",
                    self.max_tokens,
                    self.conversation_history.len()
                );
            }
        }

        self.conversation_history.push(response.clone());
        Ok(response)
    }

    pub fn set_system_prompt(&mut self, prompt: String) {
        self.system_prompt = Message::new(Role::System, prompt);
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt.content
    }

    pub fn set_max_tokens(&mut self, max_tokens: usize) {
        self.max_tokens = max_tokens;
    }

    pub fn get_max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Cumulative usage across every call in this session.
    pub fn token_usage(&self) -> TokenUsage {
        self.usage.clone()
    }

    /// Total tokens reported for the most recent call.
    pub fn last_call_tokens(&self) -> usize {
        self.last_call_tokens
    }

    pub fn history(&self) -> &[Message] {
        &self.conversation_history
    }

    pub fn client(&self) -> &Arc<dyn ClientWrapper> {
        &self.client
    }
}

/// Roughly one token per 4 characters.
fn estimate_token_count(text: &str) -> usize {
    (text.len() / 4).max(1)
}

fn estimate_message_token_count(message: &Message) -> usize {
    1 + estimate_token_count(&message.content)
}
