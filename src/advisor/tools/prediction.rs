//! Student-success prediction tool.

use crate::advisor::prompt::AGENT_NAME;
use crate::advisor::tools::action_group::ActionGroupInvoker;
use crate::advisor::tools::handlers::{FunctionHandler, Parameter};
use std::sync::Arc;

/// Action group name the prediction handler expects.
pub const PREDICTION_ACTION_GROUP: &str = "student-prediction";

/// Forwards `predict_student_success` to the external prediction handler.
///
/// The handler is called with an empty JSON object as its context.
#[derive(Clone)]
pub struct StudentSuccessPredictor {
    invoker: ActionGroupInvoker,
}

impl StudentSuccessPredictor {
    pub fn new(handler: Arc<dyn FunctionHandler>) -> Self {
        Self {
            invoker: ActionGroupInvoker::new(AGENT_NAME, PREDICTION_ACTION_GROUP, handler)
                .with_context(serde_json::json!({})),
        }
    }

    pub fn invoker(&self) -> &ActionGroupInvoker {
        &self.invoker
    }

    /// Predicted success of `student_id` in `course_id`, or an error line.
    pub async fn predict_student_success(&self, course_id: &str, student_id: &str) -> String {
        if course_id.is_empty() || student_id.is_empty() {
            return "Error: Both course_id and student_id are required parameters.".to_string();
        }

        let parameters = vec![
            Parameter::new("course_id", course_id),
            Parameter::new("student_id", student_id),
        ];
        match self
            .invoker
            .invoke("predict_student_success", Some(parameters))
            .await
        {
            Ok(body) => body,
            Err(err) => format!("Error predicting student success: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::tools::handlers::{text_response, ActionGroupEvent, FnHandler};
    use serde_json::Value as JsonValue;
    use std::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn predictor(calls: Arc<AtomicUsize>) -> StudentSuccessPredictor {
        StudentSuccessPredictor::new(Arc::new(FnHandler::new(
            "predictor",
            Arc::new(
                move |event: &ActionGroupEvent,
                      ctx: &JsonValue|
                      -> Result<JsonValue, Box<dyn Error + Send + Sync>> {
                    calls.fetch_add(1, Ordering::SeqCst);
                    assert_eq!(ctx, &serde_json::json!({}));
                    let params = event.parameters.clone().unwrap_or_default();
                    Ok(text_response(
                        event,
                        format!("{} in {}: 0.82", params[1].value, params[0].value),
                    ))
                },
            ),
        )))
    }

    #[tokio::test]
    async fn test_prediction_passes_course_then_student() {
        let calls = Arc::new(AtomicUsize::new(0));
        let out = predictor(calls.clone())
            .predict_student_success("BIOL P110", "1")
            .await;
        assert_eq!(out, "1 in BIOL P110: 0.82");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_ids_short_circuit() {
        let calls = Arc::new(AtomicUsize::new(0));
        let p = predictor(calls.clone());
        assert_eq!(
            p.predict_student_success("", "1").await,
            "Error: Both course_id and student_id are required parameters."
        );
        assert_eq!(
            p.predict_student_success("BIOL P110", "").await,
            "Error: Both course_id and student_id are required parameters."
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_malformed_prediction_reply() {
        let p = StudentSuccessPredictor::new(Arc::new(FnHandler::new(
            "broken",
            Arc::new(
                |_e: &ActionGroupEvent,
                 _c: &JsonValue|
                 -> Result<JsonValue, Box<dyn Error + Send + Sync>> {
                    Ok(serde_json::json!({"body": "no envelope"}))
                },
            ),
        )));
        let out = p.predict_student_success("BIOL P110", "1").await;
        assert!(out.starts_with("Error predicting student success: Unexpected response format:"));
        assert!(out.contains("no envelope"));
    }

    #[tokio::test]
    async fn test_raising_handler_becomes_prediction_error() {
        let p = StudentSuccessPredictor::new(Arc::new(FnHandler::new(
            "raising",
            Arc::new(
                |_e: &ActionGroupEvent,
                 _c: &JsonValue|
                 -> Result<JsonValue, Box<dyn Error + Send + Sync>> {
                    Err("model artifact not found".into())
                },
            ),
        )));
        assert_eq!(
            p.predict_student_success("BIOL P110", "1").await,
            "Error predicting student success: model artifact not found"
        );
    }
}
