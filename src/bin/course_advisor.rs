use clap::{Parser, ValueHint};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use course_advisor::bootstrap::{setup_knowledge_base_env, DATA_PREP_HINT};
use course_advisor::config::{AdvisorConfig, ConfigError};
use course_advisor::course_agent::create_agent_from_config;
use course_advisor::diagnostics::{check_prerequisites, probe_tools, run_smoke_tests};
use course_advisor::event::LoggingEventHandler;
use course_advisor::interactive::run_interactive;
use course_advisor::tools::database::DATABASE_ACTION_GROUP;
use course_advisor::tools::handlers::handler_from_spec;
use course_advisor::tools::prediction::PREDICTION_ACTION_GROUP;
use course_advisor::tools::{DatabaseTools, StudentSuccessPredictor};

// Run from a directory whose parent holds kb_config.json:
// AWS_BEARER_TOKEN_BEDROCK=... ADVISOR_SQL_HANDLER=http://localhost:9000/sql \
// ADVISOR_PREDICTION_HANDLER=http://localhost:9000/predict cargo run

#[derive(Parser, Debug)]
#[command(author, version, about = "Interactive course recommendation agent")]
struct Cli {
    /// Knowledge-base config written by the data-prep notebook.
    #[arg(long, value_hint = ValueHint::FilePath, env = "ADVISOR_KB_CONFIG")]
    kb_config: Option<PathBuf>,

    /// Hosted model identifier.
    #[arg(long, env = "ADVISOR_MODEL_ID")]
    model: Option<String>,

    /// Check prerequisites and probe each tool directly, then exit.
    #[arg(long)]
    check: bool,

    /// Send the canned advising questions through the agent, then exit.
    #[arg(long)]
    smoke_test: bool,

    /// Log every model round-trip and tool call (shown with RUST_LOG=debug).
    #[arg(long)]
    trace_tools: bool,
}

impl Cli {
    fn apply(&self, config: &mut AdvisorConfig) {
        if let Some(path) = &self.kb_config {
            config.kb_config_path = path.clone();
        }
        if let Some(model) = &self.model {
            config.model_id = model.clone();
        }
    }
}

fn print_checklist() {
    println!("Make sure you have:");
    println!("1. Credentials for the hosted model (AWS_BEARER_TOKEN_BEDROCK), AWS credentials for knowledge-base retrieval, and a region");
    println!("2. ADVISOR_SQL_HANDLER and ADVISOR_PREDICTION_HANDLER pointing at the action-group handlers");
    println!("3. Run the data preparation notebook to create the database and knowledge base");
}

async fn run_check(config: &AdvisorConfig) -> Result<bool, ConfigError> {
    let mut stdout = io::stdout();
    let ready = check_prerequisites(config, &mut stdout).unwrap_or(false);

    let sql = config
        .sql_handler
        .as_ref()
        .ok_or_else(|| ConfigError::MissingHandler(DATABASE_ACTION_GROUP.to_string()))?;
    let prediction = config
        .prediction_handler
        .as_ref()
        .ok_or_else(|| ConfigError::MissingHandler(PREDICTION_ACTION_GROUP.to_string()))?;

    let database = DatabaseTools::new(handler_from_spec(sql));
    let predictor = StudentSuccessPredictor::new(handler_from_spec(prediction));
    if let Err(err) = probe_tools(&database, &predictor, &mut stdout).await {
        log::error!("could not write probe output: {}", err);
    }
    Ok(ready)
}

#[tokio::main]
async fn main() -> ExitCode {
    course_advisor::init_logger();
    let cli = Cli::parse();

    let mut config = match AdvisorConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Configuration error: {}", err);
            return ExitCode::FAILURE;
        }
    };
    cli.apply(&mut config);

    let session_id = uuid::Uuid::new_v4();
    log::debug!("advising session {}", session_id);

    println!("Initializing Course Recommendation Agent...");
    if setup_knowledge_base_env(&config.kb_config_path) {
        println!(
            "Using knowledge base: {}",
            std::env::var("KNOWLEDGE_BASE_ID").unwrap_or_default()
        );
    } else {
        println!("Warning: Knowledge base not configured. Retrieval will be unavailable.");
        println!("{}", DATA_PREP_HINT);
    }

    if cli.check {
        return match run_check(&config).await {
            Ok(true) => ExitCode::SUCCESS,
            Ok(false) => ExitCode::FAILURE,
            Err(err) => {
                println!("Error: {}", err);
                print_checklist();
                ExitCode::FAILURE
            }
        };
    }

    let mut agent = match create_agent_from_config(&config).await {
        Ok(agent) => agent,
        Err(err) => {
            println!("Error creating agent: {}", err);
            print_checklist();
            return ExitCode::FAILURE;
        }
    };
    if cli.trace_tools {
        agent = agent.with_event_handler(Arc::new(LoggingEventHandler));
    }
    println!("Model: {}", agent.model_name());

    if cli.smoke_test {
        return match run_smoke_tests(&mut agent, &mut io::stdout()).await {
            Ok(0) => ExitCode::SUCCESS,
            Ok(failed) => {
                println!("{} of the smoke queries failed", failed);
                ExitCode::FAILURE
            }
            Err(err) => {
                eprintln!("{}", err);
                ExitCode::FAILURE
            }
        };
    }

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = io::stdout();
    let interrupted = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            log::warn!("Ctrl-C handler unavailable: {}", err);
            std::future::pending::<()>().await;
        }
    };
    match run_interactive(&mut agent, stdin, &mut stdout, interrupted).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::FAILURE
        }
    }
}
