//! Anthropic Claude client wrapper built on the OpenAI-compatible transport.
//!
//! Use this when talking to Anthropic directly instead of through Bedrock. The wrapper
//! delegates HTTP concerns to [`OpenAIClient`], so swapping providers only requires a
//! different constructor.

use crate::advisor::client_wrapper::{ClientWrapper, Message, TokenUsage};
use crate::advisor::clients::openai::OpenAIClient;
use async_trait::async_trait;
use std::error::Error;
use std::sync::Mutex;

/// Anthropic's OpenAI compatibility surface.
pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";

/// Client wrapper for Anthropic's Claude API routed through the OpenAI compatible surface.
pub struct ClaudeClient {
    /// Delegated client that handles the HTTP interactions.
    delegate_client: OpenAIClient,
}

impl ClaudeClient {
    /// Create a client from an API key and explicit model string.
    pub fn new_with_model_str(secret_key: &str, model_name: &str) -> Self {
        ClaudeClient {
            // we reuse the OpenAIClient for Claude and delegate the calls to it
            delegate_client: OpenAIClient::new_with_base_url(
                secret_key,
                model_name,
                ANTHROPIC_BASE_URL,
            ),
        }
    }
}

#[async_trait]
impl ClientWrapper for ClaudeClient {
    async fn send_message(
        &self,
        messages: &[Message],
    ) -> Result<Message, Box<dyn Error + Send + Sync>> {
        self.delegate_client.send_message(messages).await
    }

    fn model_name(&self) -> &str {
        self.delegate_client.model_name()
    }

    fn usage_slot(&self) -> Option<&Mutex<Option<TokenUsage>>> {
        self.delegate_client.usage_slot()
    }
}
