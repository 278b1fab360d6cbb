//! Amazon Bedrock client wrapper.
//!
//! Bedrock Runtime exposes an OpenAI compatible chat completions resource at
//! `https://bedrock-runtime.<region>.amazonaws.com/openai/v1/chat/completions`, authenticated
//! with a Bedrock API key sent as a bearer token. This wrapper points an [`OpenAIClient`] at
//! that resource so the advising agent can use Bedrock model identifiers such as
//! `us.anthropic.claude-3-5-haiku-20241022-v1:0` unchanged.
//!
//! # Example
//!
//! ```rust,no_run
//! use course_advisor::clients::bedrock::BedrockClient;
//! use course_advisor::client_wrapper::ClientWrapper;
//!
//! let client = BedrockClient::from_env("us.anthropic.claude-3-5-haiku-20241022-v1:0").unwrap();
//! assert_eq!(client.model_name(), "us.anthropic.claude-3-5-haiku-20241022-v1:0");
//! ```

use crate::advisor::client_wrapper::{ClientWrapper, Message, TokenUsage};
use crate::advisor::clients::openai::OpenAIClient;
use crate::advisor::config::ConfigError;
use async_trait::async_trait;
use std::error::Error;
use std::sync::Mutex;

/// Environment variable holding the Bedrock API key.
pub const BEDROCK_API_KEY_ENV: &str = "AWS_BEARER_TOKEN_BEDROCK";

/// Region used when `AWS_REGION` is unset.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Chat completions path on the Bedrock Runtime endpoint.
pub const BEDROCK_CHAT_PATH: &str = "/openai/v1/chat/completions";

/// Build the Bedrock Runtime base URL for a region.
pub fn runtime_base_url(region: &str) -> String {
    format!("https://bedrock-runtime.{}.amazonaws.com", region)
}

/// Client wrapper for Bedrock hosted models.
pub struct BedrockClient {
    delegate_client: OpenAIClient,
    region: String,
}

impl BedrockClient {
    /// Create a client for `region` authenticated with `api_key`.
    pub fn new(api_key: &str, region: &str, model_id: &str) -> Self {
        BedrockClient {
            delegate_client: OpenAIClient::new_with_base_url_and_path(
                api_key,
                model_id,
                &runtime_base_url(region),
                BEDROCK_CHAT_PATH,
            ),
            region: region.to_string(),
        }
    }

    /// Create a client from `AWS_BEARER_TOKEN_BEDROCK` and `AWS_REGION`.
    pub fn from_env(model_id: &str) -> Result<Self, ConfigError> {
        let api_key = std::env::var(BEDROCK_API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingVariable(BEDROCK_API_KEY_ENV.to_string()))?;
        let region = std::env::var("AWS_REGION")
            .ok()
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());
        Ok(Self::new(&api_key, &region, model_id))
    }

    /// Region the client was created for.
    pub fn region(&self) -> &str {
        &self.region
    }
}

#[async_trait]
impl ClientWrapper for BedrockClient {
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
