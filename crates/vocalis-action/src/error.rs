//! Error types for the action engine.

/// Errors reported by an action's `perform`.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("Action failed: {0}")]
    Failed(String),
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from building the action registry. Fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Action already registered: {0}")]
    Duplicate(String),
    #[error("Action name is reserved: {0}")]
    ReservedName(String),
    #[error("Action name must not be empty")]
    EmptyName,
}

/// Failure inside a confirmation prompt. Treated as a denial.
#[derive(Debug, thiserror::Error)]
pub enum ConfirmationError {
    #[error("Confirmation prompt failed: {0}")]
    Prompt(String),
    #[error("Confirmation prompt I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a recognized phrase was not scheduled for dispatch.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SubmitError {
    #[error("Recognition confidence {confidence} below threshold {threshold}: {phrase}")]
    LowConfidence {
        phrase: String,
        confidence: f64,
        threshold: f64,
    },
    #[error("Unknown phrase: {0}")]
    UnknownPhrase(String),
    #[error("Action not found: {action} (phrase: {phrase})")]
    ActionNotFound { phrase: String, action: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_error_display() {
        let err = ActionError::Failed("connection reset".to_string());
        assert_eq!(err.to_string(), "Action failed: connection reset");

        let err = ActionError::InvalidArguments("missing url".to_string());
        assert_eq!(err.to_string(), "Invalid arguments: missing url");
    }

    #[test]
    fn test_action_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such program");
        let err: ActionError = io_err.into();
        assert!(matches!(err, ActionError::Io(_)));
        assert!(err.to_string().contains("no such program"));
    }

    #[test]
    fn test_registry_error_display() {
        assert_eq!(
            RegistryError::Duplicate("run".into()).to_string(),
            "Action already registered: run"
        );
        assert_eq!(
            RegistryError::ReservedName("template-action".into()).to_string(),
            "Action name is reserved: template-action"
        );
    }

    #[test]
    fn test_submit_error_display() {
        assert_eq!(
            SubmitError::UnknownPhrase("fly away".into()).to_string(),
            "Unknown phrase: fly away"
        );
        let err = SubmitError::ActionNotFound {
            phrase: "open door".into(),
            action: "garage".into(),
        };
        assert_eq!(err.to_string(), "Action not found: garage (phrase: open door)");
    }

    #[test]
    fn test_confirmation_error_display() {
        let err = ConfirmationError::Prompt("dialog closed".into());
        assert_eq!(err.to_string(), "Confirmation prompt failed: dialog closed");
    }
}
