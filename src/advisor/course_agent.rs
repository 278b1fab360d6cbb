//! Course recommendation agent assembly.
//!
//! Wires the advising instruction, the four advising tools and a model client into an
//! [`Agent`]. The registry always offers the tools in the same order: `get_schema`,
//! `sql_query`, `predict_student_success`, `retrieve`.

use crate::advisor::agent::Agent;
use crate::advisor::client_wrapper::ClientWrapper;
use crate::advisor::clients::bedrock::{BedrockClient, BEDROCK_API_KEY_ENV, DEFAULT_REGION};
use crate::advisor::clients::claude::ClaudeClient;
use crate::advisor::config::{AdvisorConfig, ConfigError};
use crate::advisor::prompt::{AGENT_INSTRUCTION, AGENT_NAME};
use crate::advisor::tool_protocol::ToolRegistry;
use crate::advisor::tool_protocols::{DatabaseProtocol, PredictionProtocol, RetrieveProtocol};
use crate::advisor::tools::database::{DatabaseTools, DATABASE_ACTION_GROUP};
use crate::advisor::tools::handlers::handler_from_spec;
use crate::advisor::tools::knowledge_base::{HttpKnowledgeBase, KnowledgeBase, KnowledgeBaseAuth};
use crate::advisor::tools::prediction::{StudentSuccessPredictor, PREDICTION_ACTION_GROUP};
use std::error::Error;
use std::sync::Arc;

/// Register the four advising tools.
pub async fn build_tool_registry(
    database: DatabaseTools,
    predictor: StudentSuccessPredictor,
    knowledge_base: Arc<dyn KnowledgeBase>,
) -> Result<ToolRegistry, Box<dyn Error + Send + Sync>> {
    let mut registry = ToolRegistry::empty();
    registry
        .add_protocol("database", Arc::new(DatabaseProtocol::new(database)))
        .await?;
    registry
        .add_protocol("prediction", Arc::new(PredictionProtocol::new(predictor)))
        .await?;
    registry
        .add_protocol("retrieval", Arc::new(RetrieveProtocol::new(knowledge_base)))
        .await?;
    Ok(registry)
}

/// Environment variable holding an Anthropic API key.
pub const ANTHROPIC_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Pick the client for `model_id`: bare Anthropic ids (`claude-...`) go straight to
/// Anthropic, everything else is treated as a Bedrock model or inference profile.
pub fn client_for_model<F>(
    model_id: &str,
    lookup: F,
) -> Result<Arc<dyn ClientWrapper>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if model_id.starts_with("claude-") {
        let key = lookup(ANTHROPIC_API_KEY_ENV)
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingVariable(ANTHROPIC_API_KEY_ENV.to_string()))?;
        return Ok(Arc::new(ClaudeClient::new_with_model_str(&key, model_id)));
    }

    let key = lookup(BEDROCK_API_KEY_ENV)
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingVariable(BEDROCK_API_KEY_ENV.to_string()))?;
    let region = lookup("AWS_REGION")
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_REGION.to_string());
    Ok(Arc::new(BedrockClient::new(&key, &region, model_id)))
}

/// The advising agent on top of `client`, with no event handler attached.
pub fn create_agent(client: Arc<dyn ClientWrapper>, registry: ToolRegistry) -> Agent {
    Agent::new(AGENT_NAME, "Course Recommendation Agent", client)
        .with_system_prompt(AGENT_INSTRUCTION.trim())
        .with_tools(registry)
}

/// Build the advising agent from configuration: handlers from their specs, the knowledge
/// base over HTTPS (SigV4 signed when AWS credentials resolve), and the client [`client_for_model`] picks for `config.model_id`.
pub async fn create_agent_from_config(
    config: &AdvisorConfig,
) -> Result<Agent, Box<dyn Error + Send + Sync>> {
    let sql_handler = config
        .sql_handler
        .as_ref()
        .ok_or_else(|| ConfigError::MissingHandler(DATABASE_ACTION_GROUP.to_string()))?;
    let prediction_handler = config
        .prediction_handler
        .as_ref()
        .ok_or_else(|| ConfigError::MissingHandler(PREDICTION_ACTION_GROUP.to_string()))?;

    let database = DatabaseTools::new(handler_from_spec(sql_handler));
    let predictor = StudentSuccessPredictor::new(handler_from_spec(prediction_handler));

    let auth = KnowledgeBaseAuth::resolve_with(|key| std::env::var(key).ok());
    if auth == KnowledgeBaseAuth::None {
        log::warn!("no AWS credentials or Bedrock API key found; retrieval requests are unsigned");
    }
    let mut knowledge_base = HttpKnowledgeBase::new().with_auth(auth);
    if let Some(endpoint) = &config.kb_endpoint {
        knowledge_base = knowledge_base.with_endpoint(endpoint.clone());
    }

    let registry = build_tool_registry(database, predictor, Arc::new(knowledge_base)).await?;
    let client = client_for_model(&config.model_id, |key| std::env::var(key).ok())?;
    log::debug!("advising agent using {}", client.model_name());

    Ok(create_agent(client, registry).with_max_tokens(config.max_tokens))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::clients::openai::OpenAIClient;
    use crate::advisor::tools::handlers::{ActionGroupEvent, FnHandler, FunctionHandler};
    use serde_json::Value as JsonValue;

    fn noop_handler() -> Arc<dyn FunctionHandler> {
        Arc::new(FnHandler::new(
            "noop",
            Arc::new(
                |_e: &ActionGroupEvent,
                 _c: &JsonValue|
                 -> Result<JsonValue, Box<dyn Error + Send + Sync>> {
                    Ok(serde_json::json!({}))
                },
            ),
        ))
    }

    #[tokio::test]
    async fn test_registry_order() {
        let registry = build_tool_registry(
            DatabaseTools::new(noop_handler()),
            StudentSuccessPredictor::new(noop_handler()),
            Arc::new(HttpKnowledgeBase::new()),
        )
        .await
        .unwrap();

        let agent = create_agent(
            Arc::new(OpenAIClient::new_with_model_string("k", "gpt-4o")),
            registry,
        );
        assert_eq!(
            agent.list_tools(),
            vec!["get_schema", "sql_query", "predict_student_success", "retrieve"]
        );
        assert!(agent.system_prompt().contains("predict_student_success"));
        assert_eq!(agent.id, "course-recommendation-agent");
    }

    #[test]
    fn test_client_for_model() {
        let keys = |key: &str| match key {
            "AWS_BEARER_TOKEN_BEDROCK" => Some("bedrock-key".to_string()),
            "ANTHROPIC_API_KEY" => Some("anthropic-key".to_string()),
            _ => None,
        };
        let bedrock = client_for_model("us.anthropic.claude-3-5-haiku-20241022-v1:0", keys).unwrap();
        assert_eq!(
            bedrock.model_name(),
            "us.anthropic.claude-3-5-haiku-20241022-v1:0"
        );
        let claude = client_for_model("claude-3-5-haiku-latest", keys).unwrap();
        assert_eq!(claude.model_name(), "claude-3-5-haiku-latest");

        let missing = client_for_model("claude-sonnet-4-5", |_| None).err().unwrap();
        assert_eq!(missing, ConfigError::MissingVariable("ANTHROPIC_API_KEY".to_string()));
        let missing = client_for_model("us.amazon.nova-pro-v1:0", |_| None).err().unwrap();
        assert_eq!(
            missing,
            ConfigError::MissingVariable("AWS_BEARER_TOKEN_BEDROCK".to_string())
        );
    }

    #[tokio::test]
    async fn test_missing_handler_is_reported() {
        let err = create_agent_from_config(&AdvisorConfig::default())
            .await
            .err()
            .unwrap();
        assert_eq!(
            err.to_string(),
            "no handler configured for action group 'database-tools'"
        );
    }
}
