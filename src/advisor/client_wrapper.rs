use async_trait::async_trait;
use std::error::Error;
use std::sync::Mutex;

/// A ClientWrapper is a wrapper around a specific hosted LLM service.
/// It provides a common interface to interact with the model.
/// It does not keep track of the conversation, for that we use an LLMSession
/// which keeps the history and token accounting and uses a ClientWrapper
/// to talk to the model.
// src/advisor/client_wrapper

/// Represents the possible roles for a message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Role {
    System,
    // set by the developer to steer the model's responses
    User,
    // a message sent by the student/advisor at the console, or a tool result fed back
    Assistant, // lets the model know the content was generated as a response to a user message
}

impl Role {
    /// Wire name used by OpenAI compatible chat endpoints.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// How many tokens were spent on prompt vs. completion.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub total_tokens: usize,
}

impl TokenUsage {
    /// Add another usage record to this one.
    pub fn accumulate(&mut self, other: &TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.total_tokens += other.total_tokens;
    }
}

/// Represents a generic message to be sent to an LLM.
#[derive(Clone, Debug)]
pub struct Message {
    /// The role associated with the message.
    pub role: Role,
    /// The actual content of the message.
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Trait defining the interface to interact with hosted model services.
#[async_trait]
pub trait ClientWrapper: Send + Sync {
    /// Send the full message list to the model and get the assistant reply.
    async fn send_message(
        &self,
        messages: &[Message],
    ) -> Result<Message, Box<dyn Error + Send + Sync>>;

    /// Model identifier injected into every request.
    fn model_name(&self) -> &str;

    /// Hook to retrieve usage from the *last* send_message() call.
    /// Default impl reads the usage slot, wrappers without one return None.
    fn get_last_usage(&self) -> Option<TokenUsage> {
        self.usage_slot()
            .and_then(|slot| slot.lock().ok().and_then(|u| u.clone()))
    }

    fn usage_slot(&self) -> Option<&Mutex<Option<TokenUsage>>> {
        // Wrappers supporting TokenUsage tracking return their slot by overriding this method.
        None
    }
}
