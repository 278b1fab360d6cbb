//! Knowledge-base environment bootstrap.
//!
//! The data-prep notebook writes a small JSON file naming the knowledge base it created.
//! [`setup_knowledge_base_env`] reads that file and exports the variables the retrieval
//! tool reads at call time:
//!
//! | Variable            | Value                                  |
//! |---------------------|----------------------------------------|
//! | `KNOWLEDGE_BASE_ID` | the configured id                      |
//! | `AWS_REGION`        | the existing value, else `us-east-1`   |
//! | `MIN_SCORE`         | `0.4`                                  |
//!
//! A missing or unusable file is not fatal: the advisor still runs, only retrieval is
//! unavailable.

use serde::Deserialize;
use std::fmt;
use std::path::Path;

/// Region exported when `AWS_REGION` is not already set.
pub const BOOTSTRAP_REGION: &str = "us-east-1";

/// Minimum retrieval score exported alongside the knowledge base id.
pub const BOOTSTRAP_MIN_SCORE: &str = "0.4";

/// How to produce the config file when it is missing.
pub const DATA_PREP_HINT: &str =
    "Please run the data preparation notebook first: jupyter notebook ../data-prep-course-recommendation-agent-short.ipynb";

/// Contents of `kb_config.json`. Unknown keys are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KnowledgeBaseConfig {
    #[serde(default)]
    pub knowledge_base_id: Option<String>,
}

/// Why the config file could not provide a knowledge base id.
#[derive(Debug, Clone, PartialEq)]
pub enum BootstrapError {
    NotFound(String),
    Unreadable(String),
    Malformed(String),
    MissingId,
}

impl fmt::Display for BootstrapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootstrapError::NotFound(path) => {
                write!(f, "Knowledge base config file not found at {}", path)
            }
            BootstrapError::Unreadable(msg) => {
                write!(f, "Could not read knowledge base config: {}", msg)
            }
            BootstrapError::Malformed(msg) => {
                write!(f, "Error loading knowledge base configuration: {}", msg)
            }
            BootstrapError::MissingId => write!(f, "Knowledge base ID not found in config file"),
        }
    }
}

impl std::error::Error for BootstrapError {}

/// Read the knowledge base id from `path`. An empty id counts as missing; any other value
/// is returned as written.
pub fn load_knowledge_base_id(path: &Path) -> Result<String, BootstrapError> {
    if !path.exists() {
        return Err(BootstrapError::NotFound(path.display().to_string()));
    }
    let raw =
        std::fs::read_to_string(path).map_err(|e| BootstrapError::Unreadable(e.to_string()))?;
    let config: KnowledgeBaseConfig =
        serde_json::from_str(&raw).map_err(|e| BootstrapError::Malformed(e.to_string()))?;

    config
        .knowledge_base_id
        .filter(|id| !id.is_empty())
        .ok_or(BootstrapError::MissingId)
}

/// Export the retrieval environment from the config at `path`.
///
/// Returns `true` when `KNOWLEDGE_BASE_ID` was set. On any failure nothing is exported and a
/// warning is logged.
pub fn setup_knowledge_base_env(path: &Path) -> bool {
    match load_knowledge_base_id(path) {
        Ok(id) => {
            std::env::set_var("KNOWLEDGE_BASE_ID", &id);
            // An existing value is kept even when empty.
            let region = match std::env::var("AWS_REGION") {
                Ok(region) => region,
                Err(_) => {
                    std::env::set_var("AWS_REGION", BOOTSTRAP_REGION);
                    BOOTSTRAP_REGION.to_string()
                }
            };
            std::env::set_var("MIN_SCORE", BOOTSTRAP_MIN_SCORE);
            log::info!("Knowledge base configured: {} (region {})", id, region);
            true
        }
        Err(err) => {
            log::warn!("{}", err);
            log::warn!("{}", DATA_PREP_HINT);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn config_file(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_valid_id() {
        let file = config_file(r#"{"knowledge_base_id": "KB12345", "bucket": "ignored"}"#);
        assert_eq!(load_knowledge_base_id(file.path()).unwrap(), "KB12345");

        let padded = config_file(r#"{"knowledge_base_id": " KB12345 "}"#);
        assert_eq!(load_knowledge_base_id(padded.path()).unwrap(), " KB12345 ");
    }

    #[test]
    fn test_load_failures() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_knowledge_base_id(&dir.path().join("kb_config.json")),
            Err(BootstrapError::NotFound(_))
        ));

        let garbage = config_file("{not json");
        assert!(matches!(
            load_knowledge_base_id(garbage.path()),
            Err(BootstrapError::Malformed(_))
        ));

        let empty = config_file(r#"{"knowledge_base_id": ""}"#);
        assert_eq!(
            load_knowledge_base_id(empty.path()),
            Err(BootstrapError::MissingId)
        );

        let absent = config_file("{}");
        assert_eq!(
            load_knowledge_base_id(absent.path()),
            Err(BootstrapError::MissingId)
        );
    }
}
