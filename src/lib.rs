//! # course-advisor
//!
//! A console course recommendation agent for community-college advising. The agent answers
//! questions about students, course offerings, prerequisites, schedule conflicts and program
//! requirements by calling four tools:
//!
//! * **`get_schema`** / **`sql_query`**: the academic database, reached through an external
//!   text-to-SQL handler ([`tools::DatabaseTools`])
//! * **`predict_student_success`**: an external prediction handler
//!   ([`tools::StudentSuccessPredictor`])
//! * **`retrieve`**: the course catalogue knowledge base ([`tools::knowledge_base`])
//!
//! The external handlers speak the action-group envelope described in [`tools::handlers`]
//! and can live behind an HTTP endpoint, a local command, or an in-process closure.
//!
//! ## Core Concepts
//!
//! ### LLMSession
//!
//! [`LLMSession`] wraps a [`ClientWrapper`] with a system prompt, rolling history, context
//! trimming and token accounting.
//!
//! ### Agent
//!
//! [`Agent`] adds identity and tools to a session. Tools are described to the model in plain
//! text and invoked when the reply contains a `{"tool_call": ...}` fragment; see
//! [`agent`] for the loop.
//!
//! ### Tool Registry
//!
//! Tools reach the agent through a [`tool_protocol::ToolRegistry`]. The advising tools are
//! registered by [`course_agent::build_tool_registry`]:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use course_advisor::course_agent::{build_tool_registry, create_agent};
//! use course_advisor::clients::bedrock::BedrockClient;
//! use course_advisor::tools::{DatabaseTools, HttpFunctionHandler, HttpKnowledgeBase, StudentSuccessPredictor};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     course_advisor::init_logger();
//!
//!     let registry = build_tool_registry(
//!         DatabaseTools::new(Arc::new(HttpFunctionHandler::new("http://localhost:9000/sql"))),
//!         StudentSuccessPredictor::new(Arc::new(HttpFunctionHandler::new("http://localhost:9000/predict"))),
//!         Arc::new(HttpKnowledgeBase::new()),
//!     )
//!     .await?;
//!
//!     let client = BedrockClient::from_env(course_advisor::prompt::DEFAULT_MODEL_ID)?;
//!     let mut agent = create_agent(Arc::new(client), registry);
//!
//!     let reply = agent.send("What are the prerequisites for BIOL P110?").await?;
//!     println!("{}", reply.content);
//!     Ok(())
//! }
//! ```
//!
//! ### Provider Abstraction
//!
//! Every hosted model is a [`ClientWrapper`]. [`clients::openai::OpenAIClient`] talks to any
//! OpenAI compatible chat completions endpoint; [`clients::bedrock::BedrockClient`] and
//! [`clients::claude::ClaudeClient`] point it at Bedrock Runtime and Anthropic.
//!
//! ## Environment
//!
//! [`bootstrap::setup_knowledge_base_env`] exports `KNOWLEDGE_BASE_ID`, `AWS_REGION` and
//! `MIN_SCORE` from `kb_config.json`; the retrieval tool reads them on every call.
//! [`config::AdvisorConfig`] collects everything else.

use chrono::Local;
use std::io::Write;
use std::sync::Once;

static INIT_LOGGER: Once = Once::new();

/// Initialise the global [`env_logger`] subscriber exactly once.
///
/// `RUST_LOG` controls the filter, defaulting to `info`. Lines look like
/// `[2024-08-19 10:42:07] INFO - Knowledge base configured: ...`.
///
/// ```rust
/// course_advisor::init_logger();
/// log::info!("Logger is ready");
/// ```
pub fn init_logger() {
    INIT_LOGGER.call_once(|| {
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .format(|buf, record| {
                writeln!(
                    buf,
                    "[{}] {} - {}",
                    Local::now().format("%Y-%m-%d %H:%M:%S"),
                    record.level(),
                    record.args()
                )
            })
            .try_init();
    });
}

pub mod advisor;

// Re-exporting key items for easier external access.
pub use advisor::agent;
pub use advisor::agent::{Agent, AgentResponse};
pub use advisor::bootstrap;
pub use advisor::client_wrapper;
pub use advisor::client_wrapper::{ClientWrapper, Message, Role, TokenUsage};
pub use advisor::clients;
pub use advisor::config;
pub use advisor::config::AdvisorConfig;
pub use advisor::course_agent;
pub use advisor::diagnostics;
pub use advisor::event;
pub use advisor::event::{AgentEvent, EventHandler};
pub use advisor::interactive;
pub use advisor::llm_session::LLMSession;
pub use advisor::prompt;
pub use advisor::tool_protocol;
pub use advisor::tool_protocols;
pub use advisor::tools;
