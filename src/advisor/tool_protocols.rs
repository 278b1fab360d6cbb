//! Tool Protocol Implementations
//!
//! Each struct adapts one of the advising tools in [`tools`](crate::tools) to the
//! [`ToolProtocol`] trait so it can be registered in a
//! [`ToolRegistry`](crate::tool_protocol::ToolRegistry).
//!
//! # Available Implementations
//!
//! - **DatabaseProtocol**: `get_schema`, `sql_query`
//! - **PredictionProtocol**: `predict_student_success`
//! - **RetrieveProtocol**: `retrieve`
//!
//! Database and prediction tools always succeed from the registry's point of view: their
//! output is whatever text the action group produced, error lines included, so the model
//! sees exactly what the handler said.
//!
//! ```ignore
//! let mut registry = ToolRegistry::empty();
//! registry.add_protocol("database", Arc::new(DatabaseProtocol::new(DatabaseTools::new(sql)))).await?;
//! registry.add_protocol("prediction", Arc::new(PredictionProtocol::new(StudentSuccessPredictor::new(pred)))).await?;
//! registry.add_protocol("knowledge_base", Arc::new(RetrieveProtocol::new(Arc::new(HttpKnowledgeBase::new())))).await?;
//! ```

use crate::advisor::tool_protocol::{
    ToolError, ToolMetadata, ToolParameter, ToolParameterType, ToolProtocol, ToolResult,
};
use crate::advisor::tools::database::{DatabaseTools, DATABASE_ACTION_GROUP};
use crate::advisor::tools::knowledge_base::{
    filter_by_score, format_results, KnowledgeBase, KnowledgeBaseError, RetrieveRequest,
    RetrieveSettings, DEFAULT_NUMBER_OF_RESULTS,
};
use crate::advisor::tools::prediction::{StudentSuccessPredictor, PREDICTION_ACTION_GROUP};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::error::Error;
use std::sync::Arc;

/// Read a string argument; numbers are accepted and rendered, anything else counts as absent.
fn string_param(parameters: &JsonValue, name: &str) -> String {
    match parameters.get(name) {
        Some(JsonValue::String(s)) => s.clone(),
        Some(JsonValue::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// `get_schema` and `sql_query`.
pub struct DatabaseProtocol {
    tools: DatabaseTools,
}

impl DatabaseProtocol {
    pub fn new(tools: DatabaseTools) -> Self {
        Self { tools }
    }
}

#[async_trait]
impl ToolProtocol for DatabaseProtocol {
    async fn execute(
        &self,
        tool_name: &str,
        parameters: JsonValue,
    ) -> Result<ToolResult, Box<dyn Error + Send + Sync>> {
        let body = match tool_name {
            "get_schema" => self.tools.get_schema().await,
            "sql_query" => {
                let query = string_param(&parameters, "query");
                self.tools.sql_query(&query).await
            }
            _ => return Err(Box::new(ToolError::NotFound(tool_name.to_string()))),
        };
        Ok(ToolResult::text(body)
            .with_metadata("action_group", JsonValue::from(DATABASE_ACTION_GROUP)))
    }

    async fn list_tools(&self) -> Result<Vec<ToolMetadata>, Box<dyn Error + Send + Sync>> {
        Ok(vec![
            ToolMetadata::new("get_schema", "Get the database schema for all tables."),
            ToolMetadata::new(
                "sql_query",
                "Execute a SQL query against the academic database and return the results as a string.",
            )
            .with_parameter(
                ToolParameter::new("query", ToolParameterType::String)
                    .with_description("SQL query string to execute")
                    .required(),
            ),
        ])
    }

    fn protocol_name(&self) -> &str {
        "database"
    }
}

/// `predict_student_success`.
pub struct PredictionProtocol {
    predictor: StudentSuccessPredictor,
}

impl PredictionProtocol {
    pub fn new(predictor: StudentSuccessPredictor) -> Self {
        Self { predictor }
    }
}

#[async_trait]
impl ToolProtocol for PredictionProtocol {
    async fn execute(
        &self,
        tool_name: &str,
        parameters: JsonValue,
    ) -> Result<ToolResult, Box<dyn Error + Send + Sync>> {
        if tool_name != "predict_student_success" {
            return Err(Box::new(ToolError::NotFound(tool_name.to_string())));
        }
        let course_id = string_param(&parameters, "course_id");
        let student_id = string_param(&parameters, "student_id");
        let body = self
            .predictor
            .predict_student_success(&course_id, &student_id)
            .await;
        Ok(ToolResult::text(body)
            .with_metadata("action_group", JsonValue::from(PREDICTION_ACTION_GROUP)))
    }

    async fn list_tools(&self) -> Result<Vec<ToolMetadata>, Box<dyn Error + Send + Sync>> {
        Ok(vec![ToolMetadata::new(
            "predict_student_success",
            "Predict the success rate of a student taking a specific course, with an explanation.",
        )
        .with_parameter(
            ToolParameter::new("course_id", ToolParameterType::String)
                .with_description("The course identifier, e.g. 'BIOL P110'")
                .required(),
        )
        .with_parameter(
            ToolParameter::new("student_id", ToolParameterType::String)
                .with_description("The student identifier")
                .required(),
        )])
    }

    fn protocol_name(&self) -> &str {
        "prediction"
    }
}

/// `retrieve` against the course catalogue knowledge base.
///
/// Settings are read from the environment on every call unless fixed with
/// [`RetrieveProtocol::with_settings`].
pub struct RetrieveProtocol {
    knowledge_base: Arc<dyn KnowledgeBase>,
    settings: Option<RetrieveSettings>,
}

impl RetrieveProtocol {
    pub fn new(knowledge_base: Arc<dyn KnowledgeBase>) -> Self {
        Self {
            knowledge_base,
            settings: None,
        }
    }

    pub fn with_settings(mut self, settings: RetrieveSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    fn settings(&self) -> RetrieveSettings {
        match &self.settings {
            Some(settings) => settings.clone(),
            None => RetrieveSettings::from_env(),
        }
    }
}

#[async_trait]
impl ToolProtocol for RetrieveProtocol {
    async fn execute(
        &self,
        tool_name: &str,
        parameters: JsonValue,
    ) -> Result<ToolResult, Box<dyn Error + Send + Sync>> {
        if tool_name != "retrieve" {
            return Err(Box::new(ToolError::NotFound(tool_name.to_string())));
        }

        let text = string_param(&parameters, "text");
        if text.trim().is_empty() {
            return Ok(ToolResult::failure(
                "Missing mandatory parameter: text".to_string(),
            ));
        }

        let settings = self.settings();
        let knowledge_base_id = match parameters
            .get("knowledgeBaseId")
            .and_then(|v| v.as_str())
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .or(settings.knowledge_base_id.clone())
        {
            Some(id) => id,
            None => return Ok(ToolResult::failure(KnowledgeBaseError::NotConfigured.to_string())),
        };
        let min_score = parameters
            .get("score")
            .and_then(|v| v.as_f64())
            .unwrap_or(settings.min_score);
        let number_of_results = parameters
            .get("numberOfResults")
            .and_then(|v| v.as_u64())
            .map(|n| u32::try_from(n).unwrap_or(u32::MAX).max(1))
            .unwrap_or(DEFAULT_NUMBER_OF_RESULTS);

        let request = RetrieveRequest {
            knowledge_base_id: knowledge_base_id.clone(),
            region: settings.region.clone(),
            text,
            number_of_results,
        };

        match self.knowledge_base.retrieve(&request).await {
            Ok(results) => {
                let kept = filter_by_score(results, min_score);
                Ok(ToolResult::text(format_results(&kept, min_score))
                    .with_metadata("knowledge_base_id", JsonValue::from(knowledge_base_id))
                    .with_metadata("results", JsonValue::from(kept.len())))
            }
            Err(err) => {
                log::warn!("retrieval from {} failed: {}", knowledge_base_id, err);
                Ok(ToolResult::failure(format!(
                    "Error during retrieval: {}",
                    err
                )))
            }
        }
    }

    async fn list_tools(&self) -> Result<Vec<ToolMetadata>, Box<dyn Error + Send + Sync>> {
        Ok(vec![ToolMetadata::new(
            "retrieve",
            "Retrieve relevant passages from the course catalog and program requirements knowledge base.",
        )
        .with_parameter(
            ToolParameter::new("text", ToolParameterType::String)
                .with_description("The user's question, passed as-is")
                .required(),
        )
        .with_parameter(
            ToolParameter::new("numberOfResults", ToolParameterType::Integer)
                .with_description("Maximum number of results to return")
                .with_default(JsonValue::from(DEFAULT_NUMBER_OF_RESULTS)),
        )
        .with_parameter(
            ToolParameter::new("knowledgeBaseId", ToolParameterType::String)
                .with_description("Knowledge base to query (defaults to KNOWLEDGE_BASE_ID)"),
        )
        .with_parameter(
            ToolParameter::new("score", ToolParameterType::Number)
                .with_description("Minimum relevance score (defaults to MIN_SCORE)"),
        )])
    }

    fn protocol_name(&self) -> &str {
        "retrieval"
    }
}
