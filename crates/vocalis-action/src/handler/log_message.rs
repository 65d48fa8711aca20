//! `log` action: write a message and the binding's arguments to the log.
//!
//! Handy for trying out a grammar before wiring real side effects.
//!
//! args:
//! - `message`: text to log, optional

use async_trait::async_trait;
use vocalis_core::Arguments;

use crate::error::ActionError;
use crate::handler::{str_arg, Action};
use crate::types::ActionResult;

pub struct LogAction;

#[async_trait]
impl Action for LogAction {
    fn name(&self) -> &str {
        "log"
    }

    async fn perform(&self, args: Option<&Arguments>) -> Result<ActionResult, ActionError> {
        let message = str_arg(args, "message")?.unwrap_or("log action invoked");
        let rendered = args
            .map(|a| serde_json::Value::Object(a.clone()).to_string())
            .unwrap_or_else(|| "{}".to_string());
        tracing::info!(args = %rendered, "{}", message);
        Ok(ActionResult {
            message: message.to_string(),
            output: Some(rendered),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_log_with_message() {
        let args = json!({"message": "hello", "n": 1}).as_object().cloned().unwrap();
        let result = LogAction.perform(Some(&args)).await.unwrap();
        assert_eq!(result.message, "hello");
        assert_eq!(result.output.as_deref(), Some(r#"{"message":"hello","n":1}"#));
    }

    #[tokio::test]
    async fn test_log_without_args() {
        let result = LogAction.perform(None).await.unwrap();
        assert_eq!(result.message, "log action invoked");
        assert_eq!(result.output.as_deref(), Some("{}"));
    }

    #[tokio::test]
    async fn test_log_rejects_non_string_message() {
        let args = json!({"message": 5}).as_object().cloned().unwrap();
        assert!(LogAction.perform(Some(&args)).await.is_err());
    }
}
