//! `run` action: start a program.
//!
//! args:
//! - `cmd`: path to the executable
//! - `args`: list of string arguments, optional

use async_trait::async_trait;
use serde_json::Value;
use vocalis_core::Arguments;

use crate::error::ActionError;
use crate::handler::{required_str_arg, Action};
use crate::types::ActionResult;

/// Starts a program and returns without waiting for it to exit.
pub struct RunAction;

impl RunAction {
    fn program_args(args: Option<&Arguments>) -> Result<Vec<String>, ActionError> {
        match args.and_then(|a| a.get("args")) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| {
                    v.as_str().map(str::to_string).ok_or_else(|| {
                        ActionError::InvalidArguments("`args` must be a list of strings".into())
                    })
                })
                .collect(),
            Some(_) => Err(ActionError::InvalidArguments(
                "`args` must be a list of strings".into(),
            )),
        }
    }
}

#[async_trait]
impl Action for RunAction {
    fn name(&self) -> &str {
        "run"
    }

    async fn perform(&self, args: Option<&Arguments>) -> Result<ActionResult, ActionError> {
        let command = required_str_arg(args, "cmd")?;
        let program_args = Self::program_args(args)?;

        tracing::info!(command = %command, args = ?program_args, "Executing command");

        let child = tokio::process::Command::new(command)
            .args(&program_args)
            .stdin(std::process::Stdio::null())
            .spawn()?;

        Ok(ActionResult {
            message: format!("Started: {}", command),
            output: child.id().map(|pid| format!("pid {}", pid)),
        })
    }

    fn describe(&self, args: Option<&Arguments>) -> String {
        let command = required_str_arg(args, "cmd").unwrap_or("<no command>");
        format!("Run program: {}", command)
    }
}
