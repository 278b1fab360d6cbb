//! Tool Protocol Abstraction Layer
//!
//! Tools are the only way the advising agent reaches data: the database action group, the
//! student-success predictor and the knowledge base each sit behind a [`ToolProtocol`]
//! implementation, and the agent only ever sees a [`ToolRegistry`].
//!
//! # Architecture
//!
//! ```text
//! Agent → ToolRegistry → ToolProtocol (trait) → [database | prediction | retrieval | user-defined]
//! ```
//!
//! # Example
//!
//! ```rust
//! use course_advisor::tool_protocol::{ToolMetadata, ToolParameter, ToolParameterType};
//!
//! let metadata = ToolMetadata::new("sql_query", "Execute a SQL query against the academic database")
//!     .with_parameter(
//!         ToolParameter::new("query", ToolParameterType::String)
//!             .with_description("SQL query string to execute")
//!             .required(),
//!     );
//! assert_eq!(metadata.parameters.len(), 1);
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// Represents the result of a tool execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the tool execution was successful
    pub success: bool,
    /// The output data from the tool
    pub output: serde_json::Value,
    /// Optional error message if execution failed
    pub error: Option<String>,
    /// Metadata about the execution (timing, action group, etc.)
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ToolResult {
    /// Convenience constructor for successful tool execution.
    pub fn success(output: serde_json::Value) -> Self {
        Self {
            success: true,
            output,
            error: None,
            metadata: HashMap::new(),
        }
    }

    /// Successful execution whose output is plain text.
    pub fn text(body: impl Into<String>) -> Self {
        Self::success(serde_json::Value::String(body.into()))
    }

    /// Convenience constructor for failed tool execution.
    pub fn failure(error: String) -> Self {
        Self {
            success: false,
            output: serde_json::Value::Null,
            error: Some(error),
            metadata: HashMap::new(),
        }
    }

    /// Attach protocol or application specific metadata to the result.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Render the output the way it is shown to the model: strings verbatim, everything
    /// else as pretty JSON.
    pub fn output_text(&self) -> String {
        match &self.output {
            serde_json::Value::String(text) => text.clone(),
            other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
        }
    }
}

/// Defines the type of a tool parameter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ToolParameterType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
}

/// Defines a parameter for a tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ToolParameterType,
    pub description: Option<String>,
    pub required: bool,
    pub default: Option<serde_json::Value>,
}

impl ToolParameter {
    /// Define a new tool parameter with the provided name and type.
    pub fn new(name: impl Into<String>, param_type: ToolParameterType) -> Self {
        Self {
            name: name.into(),
            param_type,
            description: None,
            required: false,
            default: None,
        }
    }

    /// Add a human readable description that will surface in the tool catalogue.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Mark the argument as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Provide a default value that will be used when the model omits the parameter.
    pub fn with_default(mut self, default: serde_json::Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// Metadata about a tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolMetadata {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ToolParameter>,
}

impl ToolMetadata {
    /// Create metadata with the supplied identifier and description.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    /// Append a parameter definition to the tool metadata.
    pub fn with_parameter(mut self, param: ToolParameter) -> Self {
        self.parameters.push(param);
        self
    }
}

/// Trait for implementing tool execution protocols
#[async_trait]
pub trait ToolProtocol: Send + Sync {
    /// Execute a tool with the given parameters
    async fn execute(
        &self,
        tool_name: &str,
        parameters: serde_json::Value,
    ) -> Result<ToolResult, Box<dyn Error + Send + Sync>>;

    /// Get metadata about available tools
    async fn list_tools(&self) -> Result<Vec<ToolMetadata>, Box<dyn Error + Send + Sync>>;

    /// Get metadata about a specific tool
    async fn get_tool_metadata(
        &self,
        tool_name: &str,
    ) -> Result<ToolMetadata, Box<dyn Error + Send + Sync>> {
        self.list_tools()
            .await?
            .into_iter()
            .find(|m| m.name == tool_name)
            .ok_or_else(|| {
                Box::new(ToolError::NotFound(tool_name.to_string())) as Box<dyn Error + Send + Sync>
            })
    }

    /// Protocol identifier (e.g., "database", "prediction", "retrieval")
    fn protocol_name(&self) -> &str;
}

/// Errors raised by the registry and protocols. Tool-level failures travel as
/// unsuccessful [`ToolResult`]s instead.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolError {
    /// Requested tool is not registered in the current registry/protocol.
    NotFound(String),
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolError::NotFound(name) => write!(f, "Tool not found: {}", name),
        }
    }
}

impl Error for ToolError {}

/// A tool that can be used by agents
pub struct Tool {
    /// Metadata describing the tool interface.
    metadata: ToolMetadata,
    /// Name of the protocol the tool was registered under.
    protocol_key: String,
    /// Underlying protocol implementation that actually executes the tool.
    protocol: Arc<dyn ToolProtocol>,
}

impl Tool {
    /// Borrow the static metadata for the tool.
    pub fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    /// Name of the protocol this tool routes to.
    pub fn protocol_key(&self) -> &str {
        &self.protocol_key
    }

    /// Execute the tool using the configured protocol.
    pub async fn execute(
        &self,
        parameters: serde_json::Value,
    ) -> Result<ToolResult, Box<dyn Error + Send + Sync>> {
        self.protocol.execute(&self.metadata.name, parameters).await
    }
}

/// Registry for managing tools available to agents.
///
/// Tools keep their registration order, so the catalogue the model sees is stable from one
/// turn to the next.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Tool>,
}

impl ToolRegistry {
    /// Build a registry with no tools.
    pub fn empty() -> Self {
        Self { tools: Vec::new() }
    }

    /// Discover every tool a protocol offers and register it under `name`.
    ///
    /// A tool whose name is already registered is replaced in place.
    pub async fn add_protocol(
        &mut self,
        name: &str,
        protocol: Arc<dyn ToolProtocol>,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let discovered = protocol.list_tools().await?;
        log::debug!(
            "registering {} tool(s) from protocol '{}' ({})",
            discovered.len(),
            name,
            protocol.protocol_name()
        );
        for metadata in discovered {
            let tool = Tool {
                metadata,
                protocol_key: name.to_string(),
                protocol: Arc::clone(&protocol),
            };
            match self
                .tools
                .iter_mut()
                .find(|t| t.metadata.name == tool.metadata.name)
            {
                Some(existing) => *existing = tool,
                None => self.tools.push(tool),
            }
        }
        Ok(())
    }

    /// Remove every tool that was registered under `name`.
    pub fn remove_protocol(&mut self, name: &str) {
        self.tools.retain(|t| t.protocol_key != name);
    }

    /// Borrow a tool by name.
    pub fn get_tool(&self, name: &str) -> Option<&Tool> {
        self.tools.iter().find(|t| t.metadata.name == name)
    }

    /// List metadata for registered tools in registration order.
    pub fn list_tools(&self) -> Vec<&ToolMetadata> {
        self.tools.iter().map(|t| &t.metadata).collect()
    }

    /// Execute a named tool with serialized parameters.
    pub async fn execute_tool(
        &self,
        tool_name: &str,
        parameters: serde_json::Value,
    ) -> Result<ToolResult, Box<dyn Error + Send + Sync>> {
        let tool = self
            .get_tool(tool_name)
            .ok_or_else(|| ToolError::NotFound(tool_name.to_string()))?;

        tool.execute(parameters).await
    }
}
