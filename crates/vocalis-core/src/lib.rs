//! Shared foundation for vocalis: the command file model, variable
//! substitution, error taxonomy and the notification bus.

pub mod config;
pub mod error;
pub mod events;
pub mod grammar;
pub mod types;
pub mod vars;

pub use config::{AssistantConfig, CommandConfig, ConfigStore};
pub use error::{BindingError, ConfigError, Result};
pub use events::{Notification, NotificationBus};
pub use grammar::{
    ActionBinding, Arguments, Grammar, NounBinding, RecognitionChoice, RestrictedProcess,
    RestrictionPolicy,
};
pub use types::{ListeningState, Timestamp};
pub use vars::Variables;
