//! External Action-Group Handlers
//!
//! The SQL and prediction logic the agent relies on lives outside this crate, written as
//! Lambda-style handlers: a function taking an event mapping and a context value and
//! returning a nested response mapping. [`FunctionHandler`] is the seam this crate calls
//! them through.
//!
//! # Implementations
//!
//! - [`HttpFunctionHandler`]: POSTs `{"event": ..., "context": ...}` to a URL (a Lambda
//!   function URL, API Gateway route or a local shim) and parses the JSON reply.
//! - [`CommandFunctionHandler`]: spawns a program, writes the same JSON document to its
//!   stdin and parses its stdout. This is how an existing handler script is run unchanged.
//! - [`FnHandler`]: wraps an in-process closure.
//!
//! # Example
//!
//! ```rust,no_run
//! use course_advisor::tools::handlers::{ActionGroupEvent, CommandFunctionHandler, FunctionHandler, Parameter};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let handler = CommandFunctionHandler::new("python3")
//!     .with_arg("tools/invoke_handler.py")
//!     .with_arg("text2sql_lambda_function_porterville");
//!
//! let event = ActionGroupEvent::new("course-recommendation-agent", "database-tools", "sql_query")
//!     .with_parameters(vec![Parameter::new("query", "SELECT COUNT(*) FROM student_data")]);
//!
//! let reply = handler.invoke(&event, &serde_json::Value::Null).await?;
//! println!("{}", reply);
//! # Ok(())
//! # }
//! ```

use crate::advisor::config::HandlerSpec;
use crate::advisor::http_client_pool::get_or_create_client;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::error::Error;
use std::fmt;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

/// Protocol version stamped on every envelope.
pub const MESSAGE_VERSION: &str = "1.0";

/// One named argument of a function invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: String,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// The synthetic request envelope handed to an action-group handler.
///
/// `parameters` is omitted from the serialized form when there are none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionGroupEvent {
    pub agent: String,
    pub action_group: String,
    pub function: String,
    pub message_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<Parameter>>,
}

impl ActionGroupEvent {
    pub fn new(
        agent: impl Into<String>,
        action_group: impl Into<String>,
        function: impl Into<String>,
    ) -> Self {
        Self {
            agent: agent.into(),
            action_group: action_group.into(),
            function: function.into(),
            message_version: MESSAGE_VERSION.to_string(),
            parameters: None,
        }
    }

    /// Attach parameters; an empty list leaves the envelope without a `parameters` key.
    pub fn with_parameters(mut self, parameters: Vec<Parameter>) -> Self {
        self.parameters = if parameters.is_empty() {
            None
        } else {
            Some(parameters)
        };
        self
    }

    /// JSON form of the envelope.
    pub fn to_json(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or(JsonValue::Null)
    }
}

/// Failure to obtain a reply from a handler.
#[derive(Debug)]
pub enum HandlerError {
    /// The handler could not be reached or started.
    Transport(String),
    /// The handler ran but reported a failure.
    Failed(String),
    /// The handler replied with something that is not JSON.
    InvalidReply(String),
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerError::Transport(msg) => write!(f, "handler unreachable: {}", msg),
            HandlerError::Failed(msg) => write!(f, "{}", msg),
            HandlerError::InvalidReply(msg) => write!(f, "handler reply is not JSON: {}", msg),
        }
    }
}

impl Error for HandlerError {}

/// An externally defined Lambda-style function.
#[async_trait]
pub trait FunctionHandler: Send + Sync {
    /// Run the handler on `event` with the given context value and return its raw reply.
    async fn invoke(
        &self,
        event: &ActionGroupEvent,
        context: &JsonValue,
    ) -> Result<JsonValue, Box<dyn Error + Send + Sync>>;

    /// Short description used in logs and diagnostics.
    fn describe(&self) -> String;
}

fn request_document(event: &ActionGroupEvent, context: &JsonValue) -> JsonValue {
    serde_json::json!({
        "event": event.to_json(),
        "context": context,
    })
}

/// Handler reached over HTTP.
pub struct HttpFunctionHandler {
    url: String,
    bearer_token: Option<String>,
}

impl HttpFunctionHandler {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            bearer_token: None,
        }
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }
}

#[async_trait]
impl FunctionHandler for HttpFunctionHandler {
    async fn invoke(
        &self,
        event: &ActionGroupEvent,
        context: &JsonValue,
    ) -> Result<JsonValue, Box<dyn Error + Send + Sync>> {
        let client = get_or_create_client(&self.url);
        let mut request = client.post(&self.url).json(&request_document(event, context));
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| HandlerError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| HandlerError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(Box::new(HandlerError::Failed(format!(
                "HTTP {} from {}: {}",
                status.as_u16(),
                self.url,
                body
            ))));
        }

        serde_json::from_str(&body)
            .map_err(|e| Box::new(HandlerError::InvalidReply(e.to_string())) as Box<dyn Error + Send + Sync>)
    }

    fn describe(&self) -> String {
        format!("http {}", self.url)
    }
}

/// Handler run as a child process speaking JSON over stdin/stdout.
pub struct CommandFunctionHandler {
    program: String,
    args: Vec<String>,
}

impl CommandFunctionHandler {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args.extend(args);
        self
    }
}

#[async_trait]
impl FunctionHandler for CommandFunctionHandler {
    async fn invoke(
        &self,
        event: &ActionGroupEvent,
        context: &JsonValue,
    ) -> Result<JsonValue, Box<dyn Error + Send + Sync>> {
        let mut child = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| HandlerError::Transport(format!("{}: {}", self.program, e)))?;

        let payload = serde_json::to_vec(&request_document(event, context))?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&payload)
                .await
                .map_err(|e| HandlerError::Transport(e.to_string()))?;
            // dropping stdin closes the pipe so the child sees EOF
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| HandlerError::Transport(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Box::new(HandlerError::Failed(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            ))));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| Box::new(HandlerError::InvalidReply(e.to_string())) as Box<dyn Error + Send + Sync>)
    }

    fn describe(&self) -> String {
        if self.args.is_empty() {
            format!("command {}", self.program)
        } else {
            format!("command {} {}", self.program, self.args.join(" "))
        }
    }
}

/// Type alias for in-process handler functions.
pub type HandlerFunction = Arc<
    dyn Fn(&ActionGroupEvent, &JsonValue) -> Result<JsonValue, Box<dyn Error + Send + Sync>>
        + Send
        + Sync,
>;

/// Handler backed by a Rust closure.
pub struct FnHandler {
    name: String,
    function: HandlerFunction,
}

impl FnHandler {
    pub fn new(name: impl Into<String>, function: HandlerFunction) -> Self {
        Self {
            name: name.into(),
            function,
        }
    }
}

#[async_trait]
impl FunctionHandler for FnHandler {
    async fn invoke(
        &self,
        event: &ActionGroupEvent,
        context: &JsonValue,
    ) -> Result<JsonValue, Box<dyn Error + Send + Sync>> {
        (self.function)(event, context)
    }

    fn describe(&self) -> String {
        format!("in-process {}", self.name)
    }
}

/// Build the handler a [`HandlerSpec`] points at.
pub fn handler_from_spec(spec: &HandlerSpec) -> Arc<dyn FunctionHandler> {
    match spec {
        HandlerSpec::Http(url) => Arc::new(HttpFunctionHandler::new(url.clone())),
        HandlerSpec::Command { program, args } => {
            Arc::new(CommandFunctionHandler::new(program.clone()).with_args(args.clone()))
        }
    }
}

/// Build the standard response envelope a handler returns, wrapping `body` at
/// `response.functionResponse.responseBody.TEXT.body`.
pub fn text_response(event: &ActionGroupEvent, body: impl Into<String>) -> JsonValue {
    serde_json::json!({
        "messageVersion": event.message_version,
        "response": {
            "actionGroup": event.action_group,
            "function": event.function,
            "functionResponse": {
                "responseBody": {
                    "TEXT": { "body": body.into() }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_without_parameters_omits_key() {
        let event = ActionGroupEvent::new("course-recommendation-agent", "database-tools", "get_schema")
            .with_parameters(vec![]);
        let json = event.to_json();

        assert_eq!(json["agent"], "course-recommendation-agent");
        assert_eq!(json["actionGroup"], "database-tools");
        assert_eq!(json["function"], "get_schema");
        assert_eq!(json["messageVersion"], "1.0");
        assert!(json.get("parameters").is_none());
    }

    #[test]
    fn test_envelope_keeps_parameter_order() {
        let event = ActionGroupEvent::new("a", "student-prediction", "predict_student_success")
            .with_parameters(vec![
                Parameter::new("course_id", "BIOL P110"),
                Parameter::new("student_id", "1"),
            ]);
        let json = event.to_json();

        assert_eq!(json["parameters"][0]["name"], "course_id");
        assert_eq!(json["parameters"][0]["value"], "BIOL P110");
        assert_eq!(json["parameters"][1]["name"], "student_id");
    }

    #[test]
    fn test_handler_from_spec_describes_target() {
        let http = handler_from_spec(&HandlerSpec::Http("http://localhost:9000/sql".into()));
        assert_eq!(http.describe(), "http http://localhost:9000/sql");

        let cmd = handler_from_spec(&HandlerSpec::Command {
            program: "python3".into(),
            args: vec!["run.py".into()],
        });
        assert_eq!(cmd.describe(), "command python3 run.py");
    }

    #[tokio::test]
    async fn test_command_handler_reads_stdout_json() {
        let handler = CommandFunctionHandler::new("sh").with_arg("-c").with_arg(
            r#"cat > /dev/null; echo '{"response":{"functionResponse":{"responseBody":{"TEXT":{"body":"ok"}}}}}'"#,
        );
        let event = ActionGroupEvent::new("a", "database-tools", "get_schema");

        let reply = handler.invoke(&event, &JsonValue::Null).await.unwrap();
        assert_eq!(
            reply["response"]["functionResponse"]["responseBody"]["TEXT"]["body"],
            "ok"
        );
    }

    #[tokio::test]
    async fn test_command_handler_reports_failure_exit() {
        let handler = CommandFunctionHandler::new("sh")
            .with_arg("-c")
            .with_arg("cat > /dev/null; echo 'no such table' >&2; exit 3");
        let event = ActionGroupEvent::new("a", "database-tools", "sql_query");

        let err = handler.invoke(&event, &JsonValue::Null).await.unwrap_err();
        assert!(err.to_string().contains("no such table"));
    }

    #[tokio::test]
    async fn test_command_handler_missing_program() {
        let handler = CommandFunctionHandler::new("/nonexistent/handler-binary");
        let event = ActionGroupEvent::new("a", "database-tools", "get_schema");

        let err = handler.invoke(&event, &JsonValue::Null).await.unwrap_err();
        assert!(err.to_string().starts_with("handler unreachable"));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_abandoned_command_is_killed() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("pid");
        let handler = CommandFunctionHandler::new("sh").with_arg("-c").with_arg(format!(
            "echo $$ > {}; exec sleep 30",
            pid_file.display()
        ));
        let event = ActionGroupEvent::new("a", "database-tools", "get_schema");

        let outcome = tokio::time::timeout(
            std::time::Duration::from_millis(500),
            handler.invoke(&event, &JsonValue::Null),
        )
        .await;
        assert!(outcome.is_err());

        let pid = std::fs::read_to_string(&pid_file).unwrap().trim().to_string();
        let mut alive = true;
        for _ in 0..50 {
            // a killed child is either gone or a zombie awaiting reaping
            alive = match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
                Ok(stat) => !stat
                    .rsplit(')')
                    .next()
                    .map(|rest| rest.trim_start().starts_with('Z'))
                    .unwrap_or(false),
                Err(_) => false,
            };
            if !alive {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        assert!(!alive, "handler process {} outlived the invocation", pid);
    }
}
