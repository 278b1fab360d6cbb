//! Advising Tools
//!
//! The domain side of the four tools the advising agent can call. Each is exposed to the
//! agent through a protocol in [`tool_protocols`](crate::tool_protocols).
//!
//! # Available Tools
//!
//! - **DatabaseTools**: `get_schema` and `sql_query`, forwarded to the external text-to-SQL
//!   handler through the `database-tools` action group
//! - **StudentSuccessPredictor**: `predict_student_success`, forwarded to the external
//!   prediction handler through the `student-prediction` action group
//! - **Knowledge base**: `retrieve`, a query against the catalogue index with score
//!   filtering
//!
//! The [`handlers`] module holds the seam to the external functions and
//! [`action_group`] the envelope plumbing shared by the first two. [`aws_auth`] signs the
//! knowledge-base requests.

pub mod action_group;
pub mod aws_auth;
pub mod database;
pub mod handlers;
pub mod knowledge_base;
pub mod prediction;

pub use action_group::{extract_text_body, ActionGroupInvoker, InvocationError};
pub use database::DatabaseTools;
pub use handlers::{
    ActionGroupEvent, CommandFunctionHandler, FnHandler, FunctionHandler, HttpFunctionHandler,
    Parameter,
};
pub use aws_auth::AwsCredentials;
pub use knowledge_base::{HttpKnowledgeBase, KnowledgeBase, KnowledgeBaseAuth, RetrieveSettings};
pub use prediction::StudentSuccessPredictor;
