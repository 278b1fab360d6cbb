//! Provider specific [`ClientWrapper`](crate::client_wrapper::ClientWrapper) implementations.
//!
//! Each submodule offers a concrete client that speaks a particular vendor's API while
//! conforming to the uniform contract used by the advising agent.

pub mod common;

pub mod bedrock;
pub mod claude;
pub mod openai;
