use std::path::PathBuf;

use thiserror::Error;

/// Fatal configuration failure.
///
/// Raised while reading or parsing the command file, or while extracting its
/// top-level sections. A process that receives one of these must not start
/// listening.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("Configuration source unreadable: {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration is not valid {format}: {message}")]
    Malformed {
        format: &'static str,
        message: String,
    },

    #[error("Configuration root must be an object")]
    NotAnObject,

    #[error("Configuration section `{section}` is invalid: expected {expected}")]
    InvalidSection {
        section: String,
        expected: &'static str,
    },
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Malformed {
            format: "JSON",
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Malformed {
            format: "TOML",
            message: err.to_string(),
        }
    }
}

/// A single malformed or unresolved action binding.
///
/// Never fatal: the offending binding is dropped and the rest of the
/// configuration loads normally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    #[error("Verb `{verb}` must map to an object of nouns")]
    VerbNotAnObject { verb: String },

    #[error("Binding `{verb} {noun}` must be an object")]
    NotAnObject { verb: String, noun: String },

    #[error("Binding `{verb} {noun}` has no `action`")]
    MissingAction { verb: String, noun: String },

    #[error("Binding `{verb} {noun}` field `{field}` must be {expected}")]
    InvalidField {
        verb: String,
        noun: String,
        field: &'static str,
        expected: &'static str,
    },

    #[error("Binding `{verb} {noun}` names unregistered action `{action}`")]
    UnregisteredAction {
        verb: String,
        noun: String,
        action: String,
    },
}

/// A specialized `Result` type for configuration loading.
pub type Result<T> = std::result::Result<T, ConfigError>;
