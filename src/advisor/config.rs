//! Configuration for the advising agent.
//!
//! [`AdvisorConfig`] is a plain struct: construct it by hand, take the [`Default`], or
//! overlay environment variables with [`AdvisorConfig::from_env`]. The only file the crate
//! reads is the knowledge-base config handled by [`bootstrap`](crate::bootstrap).
//!
//! # Example
//!
//! ```rust
//! use course_advisor::config::{AdvisorConfig, HandlerSpec};
//! use std::path::PathBuf;
//!
//! let config = AdvisorConfig {
//!     sql_handler: Some(HandlerSpec::parse("http://localhost:9000/sql").unwrap()),
//!     kb_config_path: PathBuf::from("kb_config.json"),
//!     ..AdvisorConfig::default()
//! };
//! assert_eq!(config.model_id, course_advisor::prompt::DEFAULT_MODEL_ID);
//! ```

use crate::advisor::prompt::DEFAULT_MODEL_ID;
use std::error::Error;
use std::fmt;
use std::path::PathBuf;

/// Default location of the knowledge-base config, relative to the working directory.
pub const DEFAULT_KB_CONFIG_PATH: &str = "../kb_config.json";

/// Default location of the prepared academic database.
pub const DEFAULT_DATABASE_PATH: &str = "../porterville_academic.db";

/// Default context budget for the agent session.
pub const DEFAULT_MAX_TOKENS: usize = 128_000;

/// Errors raised while assembling configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A required environment variable is unset or empty.
    MissingVariable(String),
    /// A value could not be interpreted.
    InvalidValue { key: String, value: String },
    /// No handler is configured for an action group.
    MissingHandler(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingVariable(name) => {
                write!(f, "environment variable {} is not set", name)
            }
            ConfigError::InvalidValue { key, value } => {
                write!(f, "invalid value for {}: '{}'", key, value)
            }
            ConfigError::MissingHandler(group) => {
                write!(f, "no handler configured for action group '{}'", group)
            }
        }
    }
}

impl Error for ConfigError {}

/// Where an external action-group handler lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerSpec {
    /// POST the envelope to this URL.
    Http(String),
    /// Spawn this program with these arguments and talk JSON over stdin/stdout.
    Command { program: String, args: Vec<String> },
}

impl HandlerSpec {
    /// Interpret a handler string: `http://` / `https://` URLs become [`HandlerSpec::Http`],
    /// anything else is split on whitespace into a command line.
    pub fn parse(spec: &str) -> Result<Self, ConfigError> {
        let spec = spec.trim();
        if spec.starts_with("http://") || spec.starts_with("https://") {
            return Ok(HandlerSpec::Http(spec.to_string()));
        }

        let mut parts = spec.split_whitespace().map(str::to_string);
        match parts.next() {
            Some(program) => Ok(HandlerSpec::Command {
                program,
                args: parts.collect(),
            }),
            None => Err(ConfigError::InvalidValue {
                key: "handler".to_string(),
                value: spec.to_string(),
            }),
        }
    }
}

/// Runtime settings for the advising agent.
#[derive(Debug, Clone)]
pub struct AdvisorConfig {
    /// Hosted model identifier.
    pub model_id: String,
    /// Path of `kb_config.json`.
    pub kb_config_path: PathBuf,
    /// Path of the prepared academic database (only checked by diagnostics).
    pub database_path: PathBuf,
    /// Handler behind `get_schema` and `sql_query`.
    pub sql_handler: Option<HandlerSpec>,
    /// Handler behind `predict_student_success`.
    pub prediction_handler: Option<HandlerSpec>,
    /// Override for the knowledge-base retrieval endpoint.
    pub kb_endpoint: Option<String>,
    /// Context budget of the agent session.
    pub max_tokens: usize,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL_ID.to_string(),
            kb_config_path: PathBuf::from(DEFAULT_KB_CONFIG_PATH),
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            sql_handler: None,
            prediction_handler: None,
            kb_endpoint: None,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl AdvisorConfig {
    /// Defaults overlaid with `ADVISOR_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from an arbitrary lookup; empty values are ignored.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = AdvisorConfig::default();

        if let Some(model) = get("ADVISOR_MODEL_ID") {
            config.model_id = model;
        }
        if let Some(path) = get("ADVISOR_KB_CONFIG") {
            config.kb_config_path = PathBuf::from(path);
        }
        if let Some(path) = get("ADVISOR_DATABASE_PATH") {
            config.database_path = PathBuf::from(path);
        }
        if let Some(spec) = get("ADVISOR_SQL_HANDLER") {
            config.sql_handler = Some(HandlerSpec::parse(&spec)?);
        }
        if let Some(spec) = get("ADVISOR_PREDICTION_HANDLER") {
            config.prediction_handler = Some(HandlerSpec::parse(&spec)?);
        }
        if let Some(endpoint) = get("ADVISOR_KB_ENDPOINT") {
            config.kb_endpoint = Some(endpoint);
        }
        if let Some(raw) = get("ADVISOR_MAX_TOKENS") {
            config.max_tokens = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "ADVISOR_MAX_TOKENS".to_string(),
                value: raw.clone(),
            })?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_handler_spec_parse() {
        assert_eq!(
            HandlerSpec::parse("https://example.com/lambda").unwrap(),
            HandlerSpec::Http("https://example.com/lambda".to_string())
        );
        assert_eq!(
            HandlerSpec::parse("  python3 tools/run_handler.py text2sql ").unwrap(),
            HandlerSpec::Command {
                program: "python3".to_string(),
                args: vec!["tools/run_handler.py".to_string(), "text2sql".to_string()],
            }
        );
        assert!(HandlerSpec::parse("   ").is_err());
    }

    #[test]
    fn test_from_lookup_overlays_defaults() {
        let vars: HashMap<&str, &str> = [
            ("ADVISOR_MODEL_ID", "claude-3-5-haiku-latest"),
            ("ADVISOR_SQL_HANDLER", "http://localhost:9000/sql"),
            ("ADVISOR_MAX_TOKENS", "32000"),
            ("ADVISOR_KB_CONFIG", ""),
        ]
        .into_iter()
        .collect();

        let config =
            AdvisorConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();

        assert_eq!(config.model_id, "claude-3-5-haiku-latest");
        assert_eq!(config.max_tokens, 32_000);
        assert_eq!(config.kb_config_path, PathBuf::from(DEFAULT_KB_CONFIG_PATH));
        assert_eq!(
            config.sql_handler,
            Some(HandlerSpec::Http("http://localhost:9000/sql".to_string()))
        );
        assert!(config.prediction_handler.is_none());
    }

    #[test]
    fn test_from_lookup_rejects_bad_budget() {
        let err = AdvisorConfig::from_lookup(|key| {
            (key == "ADVISOR_MAX_TOKENS").then(|| "lots".to_string())
        })
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                key: "ADVISOR_MAX_TOKENS".to_string(),
                value: "lots".to_string(),
            }
        );
    }
}
