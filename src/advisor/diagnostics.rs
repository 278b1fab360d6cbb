//! Setup checks for the advising agent.
//!
//! Three stages, each usable on its own:
//!
//! 1. [`check_prerequisites`]: the prepared database and the knowledge-base config exist.
//! 2. [`probe_tools`]: call each tool directly, bypassing the model.
//! 3. [`run_smoke_tests`]: send a fixed set of advising questions through the agent.

use crate::advisor::agent::Agent;
use crate::advisor::bootstrap::DATA_PREP_HINT;
use crate::advisor::config::AdvisorConfig;
use crate::advisor::interactive::SEPARATOR;
use crate::advisor::tools::database::DatabaseTools;
use crate::advisor::tools::prediction::StudentSuccessPredictor;
use std::io::{self, Write};

/// Questions covering every tool, in increasing order of difficulty.
pub const SMOKE_QUERIES: [&str; 6] = [
    "How many credits has student 1 earned?",
    "What courses are offered this semester (202408) that are relevant to a biology major?",
    "Does the course BIOL P110 conflict with student 1's current schedule?",
    "What are the prerequisites for BIOL P110?",
    "Tell me about the Biology program requirements at Porterville College.",
    "What courses do you recommend for student 1 to take this semester (202408)? Please consider their academic history, major requirements, and predicted success rates.",
];

/// Query used by the SQL probe.
pub const PROBE_SQL: &str = "SELECT student_id, major FROM student_data LIMIT 3";

const HEAVY_RULE: &str = "============================================================";

/// Report whether the database and the knowledge-base config are in place.
pub fn check_prerequisites<W: Write>(config: &AdvisorConfig, output: &mut W) -> io::Result<bool> {
    if !config.database_path.exists() {
        writeln!(
            output,
            "Database not found at {}.",
            config.database_path.display()
        )?;
        writeln!(output, "{}", DATA_PREP_HINT)?;
        return Ok(false);
    }
    if !config.kb_config_path.exists() {
        writeln!(
            output,
            "Knowledge base config not found at {}. Please complete the data preparation notebook.",
            config.kb_config_path.display()
        )?;
        return Ok(false);
    }
    writeln!(output, "Prerequisites met")?;
    Ok(true)
}

fn preview(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let cut: String = text.chars().take(limit).collect();
    format!("{}...", cut)
}

/// Call every tool once without the model and print what comes back.
pub async fn probe_tools<W: Write>(
    database: &DatabaseTools,
    predictor: &StudentSuccessPredictor,
    output: &mut W,
) -> io::Result<()> {
    writeln!(output, "\n{}\nDIRECT TOOL TESTING\n{}", HEAVY_RULE, HEAVY_RULE)?;

    writeln!(output, "1. Schema Tool:")?;
    writeln!(output, "{}\n", preview(&database.get_schema().await, 200))?;

    writeln!(output, "2. SQL Query Tool:")?;
    writeln!(output, "{}\n", database.sql_query(PROBE_SQL).await)?;

    writeln!(output, "3. Prediction Tool:")?;
    writeln!(
        output,
        "{}\n",
        predictor.predict_student_success("BIOL P110", "1").await
    )?;

    writeln!(output, "4. Retrieve Tool:")?;
    let configured = std::env::var("KNOWLEDGE_BASE_ID")
        .map(|id| !id.is_empty())
        .unwrap_or(false);
    writeln!(output, "Knowledge base configured: {}", configured)?;
    Ok(())
}

/// Send every smoke query to `agent`. Returns how many failed.
pub async fn run_smoke_tests<W: Write>(agent: &mut Agent, output: &mut W) -> io::Result<usize> {
    writeln!(output, "\n{}\nRUNNING AGENT TESTS\n{}", HEAVY_RULE, HEAVY_RULE)?;

    let mut failures = 0;
    for (i, query) in SMOKE_QUERIES.iter().enumerate() {
        writeln!(output, "\n=== Test {}: {} ===", i + 1, preview(query, 50))?;
        match agent.send(query).await {
            Ok(response) => writeln!(output, "{}", response.content)?,
            Err(err) => {
                failures += 1;
                log::warn!("smoke query {} failed: {}", i + 1, err);
                writeln!(output, "Error: {}", err)?;
            }
        }
        writeln!(output, "\n{}", SEPARATOR)?;
    }
    Ok(failures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_preview_is_char_safe() {
        assert_eq!(preview("short", 200), "short");
        assert_eq!(preview("ééééé", 3), "ééé...");
    }

    #[test]
    fn test_missing_database_fails_prerequisites() {
        let dir = tempfile::tempdir().unwrap();
        let config = AdvisorConfig {
            database_path: dir.path().join("porterville_academic.db"),
            kb_config_path: dir.path().join("kb_config.json"),
            ..AdvisorConfig::default()
        };
        let mut out = Vec::new();
        assert!(!check_prerequisites(&config, &mut out).unwrap());
        assert!(String::from_utf8(out).unwrap().contains("Database not found"));
    }

    #[test]
    fn test_prerequisites_met() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("porterville_academic.db");
        let kb = dir.path().join("kb_config.json");
        std::fs::write(&db, b"").unwrap();
        std::fs::write(&kb, b"{}").unwrap();

        let config = AdvisorConfig {
            database_path: PathBuf::from(&db),
            kb_config_path: PathBuf::from(&kb),
            ..AdvisorConfig::default()
        };
        let mut out = Vec::new();
        assert!(check_prerequisites(&config, &mut out).unwrap());
    }
}
