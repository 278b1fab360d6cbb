//! Academic database tools.
//!
//! Both tools forward to the external text-to-SQL handler through the `database-tools`
//! action group; the handler owns the schema and the SQL engine.

use crate::advisor::prompt::AGENT_NAME;
use crate::advisor::tools::action_group::ActionGroupInvoker;
use crate::advisor::tools::handlers::{FunctionHandler, Parameter};
use std::sync::Arc;

/// Action group name the SQL handler expects.
pub const DATABASE_ACTION_GROUP: &str = "database-tools";

/// `get_schema` and `sql_query` bound to one handler.
#[derive(Clone)]
pub struct DatabaseTools {
    invoker: ActionGroupInvoker,
}

impl DatabaseTools {
    pub fn new(handler: Arc<dyn FunctionHandler>) -> Self {
        Self {
            invoker: ActionGroupInvoker::new(AGENT_NAME, DATABASE_ACTION_GROUP, handler),
        }
    }

    pub fn invoker(&self) -> &ActionGroupInvoker {
        &self.invoker
    }

    /// Schema description of every table.
    pub async fn get_schema(&self) -> String {
        self.invoker.call_function("get_schema", None).await
    }

    /// Run `query`; an empty query is rejected without reaching the handler.
    pub async fn sql_query(&self, query: &str) -> String {
        if query.is_empty() {
            return "Error: Missing mandatory parameter: query".to_string();
        }
        self.invoker
            .call_function("sql_query", Some(vec![Parameter::new("query", query)]))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::tools::handlers::{text_response, ActionGroupEvent, FnHandler};
    use serde_json::Value as JsonValue;
    use std::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn tools(calls: Arc<AtomicUsize>, seen: Arc<Mutex<Vec<ActionGroupEvent>>>) -> DatabaseTools {
        DatabaseTools::new(Arc::new(FnHandler::new(
            "sql",
            Arc::new(
                move |event: &ActionGroupEvent,
                      ctx: &JsonValue|
                      -> Result<JsonValue, Box<dyn Error + Send + Sync>> {
                    calls.fetch_add(1, Ordering::SeqCst);
                    assert!(ctx.is_null());
                    seen.lock().unwrap().push(event.clone());
                    Ok(text_response(event, format!("ran {}", event.function)))
                },
            ),
        )))
    }

    #[tokio::test]
    async fn test_empty_query_never_reaches_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let db = tools(calls.clone(), Arc::new(Mutex::new(Vec::new())));

        assert_eq!(
            db.sql_query("").await,
            "Error: Missing mandatory parameter: query"
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_schema_and_query_envelopes() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let db = tools(calls.clone(), seen.clone());

        assert_eq!(db.get_schema().await, "ran get_schema");
        assert_eq!(db.sql_query("SELECT 1").await, "ran sql_query");
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].action_group, "database-tools");
        assert!(seen[0].parameters.is_none());
        let params = seen[1].parameters.as_ref().unwrap();
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].name, "query");
        assert_eq!(params[0].value, "SELECT 1");
    }

    #[tokio::test]
    async fn test_raising_handler_becomes_error_line() {
        let db = DatabaseTools::new(Arc::new(FnHandler::new(
            "raising",
            Arc::new(
                |_e: &ActionGroupEvent,
                 _c: &JsonValue|
                 -> Result<JsonValue, Box<dyn Error + Send + Sync>> {
                    Err("no such table: course_schedule".into())
                },
            ),
        )));
        assert_eq!(
            db.sql_query("SELECT * FROM course_schedule").await,
            "Error calling function: no such table: course_schedule"
        );
    }
}
