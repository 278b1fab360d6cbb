//! Environment bootstrap tests.
//!
//! Everything touching process environment lives in a single test so the cases cannot race
//! each other.

use course_advisor::bootstrap::setup_knowledge_base_env;
use course_advisor::tools::RetrieveSettings;
use std::io::Write;

const VARS: [&str; 3] = ["KNOWLEDGE_BASE_ID", "AWS_REGION", "MIN_SCORE"];

fn clear_vars() {
    for var in VARS {
        std::env::remove_var(var);
    }
}

fn config_file(dir: &tempfile::TempDir, name: &str, body: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(body.as_bytes()).unwrap();
    path
}

#[test]
fn test_setup_knowledge_base_env() {
    let dir = tempfile::tempdir().unwrap();

    // Missing file
    clear_vars();
    assert!(!setup_knowledge_base_env(&dir.path().join("kb_config.json")));
    for var in VARS {
        assert!(std::env::var(var).is_err(), "{} should be unset", var);
    }

    // Malformed JSON
    let malformed = config_file(&dir, "malformed.json", "{\"knowledge_base_id\": ");
    assert!(!setup_knowledge_base_env(&malformed));
    assert!(std::env::var("KNOWLEDGE_BASE_ID").is_err());

    // Empty id
    let empty = config_file(&dir, "empty.json", r#"{"knowledge_base_id": ""}"#);
    assert!(!setup_knowledge_base_env(&empty));
    assert!(std::env::var("KNOWLEDGE_BASE_ID").is_err());
    assert!(std::env::var("MIN_SCORE").is_err());

    // Valid config, region defaulted
    let valid = config_file(&dir, "kb_config.json", r#"{"knowledge_base_id": "KBABC123"}"#);
    assert!(setup_knowledge_base_env(&valid));
    assert_eq!(std::env::var("KNOWLEDGE_BASE_ID").unwrap(), "KBABC123");
    assert_eq!(std::env::var("AWS_REGION").unwrap(), "us-east-1");
    assert_eq!(std::env::var("MIN_SCORE").unwrap(), "0.4");

    let settings = RetrieveSettings::from_env();
    assert_eq!(settings.knowledge_base_id.as_deref(), Some("KBABC123"));
    assert_eq!(settings.region, "us-east-1");
    assert_eq!(settings.min_score, 0.4);

    // Valid config, existing region kept
    clear_vars();
    std::env::set_var("AWS_REGION", "eu-west-1");
    assert!(setup_knowledge_base_env(&valid));
    assert_eq!(std::env::var("AWS_REGION").unwrap(), "eu-west-1");

    // An empty region is left alone
    clear_vars();
    std::env::set_var("AWS_REGION", "");
    assert!(setup_knowledge_base_env(&valid));
    assert_eq!(std::env::var("AWS_REGION").unwrap(), "");
    assert_eq!(std::env::var("MIN_SCORE").unwrap(), "0.4");

    clear_vars();
}
