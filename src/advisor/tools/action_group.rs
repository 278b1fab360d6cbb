//! Action-group invocation.
//!
//! [`ActionGroupInvoker`] turns a function name and its parameters into an
//! [`ActionGroupEvent`], hands it to the configured [`FunctionHandler`], and unwraps the text
//! at `response.functionResponse.responseBody.TEXT.body` from whatever comes back. Nothing
//! is retried; every failure is rendered into a string the model can read.

use crate::advisor::tools::handlers::{ActionGroupEvent, FunctionHandler, Parameter};
use serde_json::Value as JsonValue;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// Why an invocation produced no text body.
#[derive(Debug)]
pub enum InvocationError {
    /// The handler failed or could not be reached.
    Handler(String),
    /// The handler replied, but the body path is missing. Carries the raw reply.
    UnexpectedFormat(JsonValue),
}

impl fmt::Display for InvocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvocationError::Handler(msg) => write!(f, "{}", msg),
            InvocationError::UnexpectedFormat(raw) => {
                write!(f, "Unexpected response format: {}", raw)
            }
        }
    }
}

impl Error for InvocationError {}

/// Pull `response.functionResponse.responseBody.TEXT.body` out of a handler reply.
///
/// Non-string bodies are rendered as JSON text.
pub fn extract_text_body(reply: &JsonValue) -> Option<String> {
    let body = reply
        .get("response")?
        .get("functionResponse")?
        .get("responseBody")?
        .get("TEXT")?
        .get("body")?;
    match body {
        JsonValue::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

/// Calls one external action group on behalf of the agent.
#[derive(Clone)]
pub struct ActionGroupInvoker {
    agent: String,
    action_group: String,
    context: JsonValue,
    handler: Arc<dyn FunctionHandler>,
}

impl ActionGroupInvoker {
    /// Invoker with a `null` context value.
    pub fn new(
        agent: impl Into<String>,
        action_group: impl Into<String>,
        handler: Arc<dyn FunctionHandler>,
    ) -> Self {
        Self {
            agent: agent.into(),
            action_group: action_group.into(),
            context: JsonValue::Null,
            handler,
        }
    }

    /// Context value passed alongside every event.
    pub fn with_context(mut self, context: JsonValue) -> Self {
        self.context = context;
        self
    }

    pub fn action_group(&self) -> &str {
        &self.action_group
    }

    pub fn handler(&self) -> &Arc<dyn FunctionHandler> {
        &self.handler
    }

    /// Build the envelope for `function`.
    pub fn event(&self, function: &str, parameters: Option<Vec<Parameter>>) -> ActionGroupEvent {
        let event = ActionGroupEvent::new(&self.agent, &self.action_group, function);
        match parameters {
            Some(parameters) => event.with_parameters(parameters),
            None => event,
        }
    }

    /// Invoke `function` and return the extracted text body.
    pub async fn invoke(
        &self,
        function: &str,
        parameters: Option<Vec<Parameter>>,
    ) -> Result<String, InvocationError> {
        let event = self.event(function, parameters);
        log::debug!(
            "invoking {}/{} via {}",
            self.action_group,
            function,
            self.handler.describe()
        );

        let reply = self
            .handler
            .invoke(&event, &self.context)
            .await
            .map_err(|e| InvocationError::Handler(e.to_string()))?;

        extract_text_body(&reply).ok_or(InvocationError::UnexpectedFormat(reply))
    }

    /// Invoke `function`, rendering every failure as text.
    ///
    /// A missing body yields `Unexpected response format: <raw>`, a failing handler yields
    /// `Error calling function: <message>`.
    pub async fn call_function(&self, function: &str, parameters: Option<Vec<Parameter>>) -> String {
        match self.invoke(function, parameters).await {
            Ok(body) => body,
            Err(InvocationError::Handler(msg)) => {
                log::error!("Error calling function {}: {}", function, msg);
                format!("Error calling function: {}", msg)
            }
            Err(unexpected) => unexpected.to_string(),
        }
    }
}
