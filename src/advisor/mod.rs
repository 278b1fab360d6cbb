// src/advisor/mod.rs

pub mod agent;
pub mod bootstrap;
pub mod client_wrapper;
pub mod clients;
pub mod config;
pub mod course_agent;
pub mod diagnostics;
pub mod event;
pub mod http_client_pool;
pub mod interactive;
pub mod llm_session;
pub mod prompt;
pub mod tool_protocol;
pub mod tool_protocols;
pub mod tools;

// Export LLMSession so it is reachable as course_advisor::LLMSession
pub use llm_session::LLMSession;
