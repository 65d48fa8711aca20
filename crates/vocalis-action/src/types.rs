//! Value types shared by actions and the dispatcher.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Result returned by a successful action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub message: String,
    pub output: Option<String>,
}

impl ActionResult {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            output: None,
        }
    }
}

/// Policy that stopped a binding from running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyVeto {
    Disabled,
    /// A restricting process was running.
    Restricted { process: String },
}

impl fmt::Display for PolicyVeto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyVeto::Disabled => write!(f, "disabled"),
            PolicyVeto::Restricted { process } => write!(f, "restricted by {}", process),
        }
    }
}

/// How the asynchronous half of a dispatch ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchOutcome {
    Vetoed(PolicyVeto),
    /// The user declined, the prompt timed out, or the prompt failed.
    Denied,
    Failed(String),
    Completed(ActionResult),
}

impl DispatchOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, DispatchOutcome::Completed(_))
    }
}

/// Dispatcher settings taken from the command file and the command line.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Recognitions below this confidence are discarded.
    pub min_confidence: Option<f64>,
    /// Publish dispatch failures as user-visible notifications.
    pub display_errors: bool,
    /// How long a confirmation prompt may block before it counts as "no".
    pub confirmation_timeout: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            min_confidence: None,
            display_errors: false,
            confirmation_timeout: Duration::from_secs(30),
        }
    }
}
