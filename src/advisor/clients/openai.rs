//! The `OpenAIClient` struct implements `ClientWrapper` for OpenAI compatible Chat
//! Completions endpoints, capturing both the assistant response and token usage.
//!
//! It is also the transport that [`ClaudeClient`](super::claude::ClaudeClient) and
//! [`BedrockClient`](super::bedrock::BedrockClient) delegate to.
//!
//! # Example
//!
//! ```rust,no_run
//! use course_advisor::clients::openai::OpenAIClient;
//! use course_advisor::client_wrapper::{ClientWrapper, Message, Role};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let secret_key = std::env::var("OPEN_AI_SECRET")?;
//!     let client = OpenAIClient::new_with_model_string(&secret_key, "gpt-4.1-mini");
//!
//!     let resp = client
//!         .send_message(&[
//!             Message::new(Role::System, "You are an academic advisor."),
//!             Message::new(Role::User, "Hello!"),
//!         ])
//!         .await?;
//!     println!("Assistant: {}", resp.content);
//!
//!     if let Some(usage) = client.get_last_usage() {
//!         println!("Tokens used: {}", usage.total_tokens);
//!     }
//!     Ok(())
//! }
//! ```
use std::error::Error;
use std::sync::Mutex;

use async_trait::async_trait;
use openai_rust2 as openai_rust;

use crate::advisor::client_wrapper::{ClientWrapper, Message, Role, TokenUsage};
use crate::advisor::clients::common::{send_and_track, to_chat_messages};
use crate::advisor::http_client_pool::get_or_create_client;

/// Default OpenAI REST endpoint.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com";

/// Path of the chat completions resource on OpenAI compatible servers.
pub const DEFAULT_CHAT_PATH: &str = "/v1/chat/completions";

/// Client wrapper for OpenAI compatible Chat Completions APIs.
///
/// Holds the selected model identifier, the chat resource path, and a [`TokenUsage`] slot
/// so callers can inspect how many tokens each request consumed.
pub struct OpenAIClient {
    /// Underlying SDK client pointing at the REST endpoint.
    client: openai_rust::Client,
    /// Model name that will be injected into each request.
    model: String,
    /// Absolute path of the chat completions resource.
    chat_path: String,
    /// Storage for the token usage returned by the most recent request.
    token_usage: Mutex<Option<TokenUsage>>,
}

impl OpenAIClient {
    /// Construct a client for api.openai.com with an explicit model name.
    pub fn new_with_model_string(secret_key: &str, model_name: &str) -> Self {
        Self::new_with_base_url(secret_key, model_name, OPENAI_BASE_URL)
    }

    /// Construct a client targeting a custom OpenAI compatible base URL.
    pub fn new_with_base_url(secret_key: &str, model_name: &str, base_url: &str) -> Self {
        Self::new_with_base_url_and_path(secret_key, model_name, base_url, DEFAULT_CHAT_PATH)
    }

    /// Construct a client for servers that mount chat completions under a non standard path
    /// (e.g. Bedrock's `/openai/v1/chat/completions`).
    pub fn new_with_base_url_and_path(
        secret_key: &str,
        model_name: &str,
        base_url: &str,
        chat_path: &str,
    ) -> Self {
        OpenAIClient {
            client: openai_rust::Client::new_with_client_and_base_url(
                secret_key,
                get_or_create_client(base_url),
                base_url,
            ),
            model: model_name.to_string(),
            chat_path: chat_path.to_string(),
            token_usage: Mutex::new(None),
        }
    }

    /// Path requests are posted to.
    pub fn chat_path(&self) -> &str {
        &self.chat_path
    }
}

#[async_trait]
impl ClientWrapper for OpenAIClient {
    async fn send_message(
        &self,
        messages: &[Message],
    ) -> Result<Message, Box<dyn Error + Send + Sync>> {
        let formatted_messages = to_chat_messages(messages);

        let result = send_and_track(
            &self.client,
            &self.model,
            formatted_messages,
            Some(self.chat_path.clone()),
            &self.token_usage,
        )
        .await;

        match result {
            Ok(content) => Ok(Message {
                role: Role::Assistant,
                content,
            }),
            Err(err) => {
                log::error!(
                    "OpenAIClient::send_message(...): model '{}' request failed: {}",
                    self.model,
                    err
                );
                Err(err)
            }
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn usage_slot(&self) -> Option<&Mutex<Option<TokenUsage>>> {
        Some(&self.token_usage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_chat_path() {
        let client = OpenAIClient::new_with_model_string("test-key", "gpt-4.1-mini");
        assert_eq!(client.model_name(), "gpt-4.1-mini");
        assert_eq!(client.chat_path(), "/v1/chat/completions");
        assert!(client.get_last_usage().is_none());
    }
}
