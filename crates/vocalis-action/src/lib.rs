//! Action dispatch engine for vocalis.
//!
//! Resolves recognized phrases to registered actions, applies the binding's
//! policy, asks for confirmation when required and runs the action on its
//! own task.

pub mod confirmation;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod phrase;
pub mod restriction;
pub mod types;

pub use confirmation::{ConfirmationGate, ConfirmationPrompt, StaticPrompt};
pub use dispatcher::Dispatcher;
pub use error::{ActionError, ConfirmationError, RegistryError, SubmitError};
pub use handler::{Action, ActionRegistry, TEMPLATE_ACTION};
pub use phrase::{phrase_key, PhraseIndex};
pub use restriction::{ProcessProbe, RestrictionChecker, SystemProcessProbe};
pub use types::{ActionResult, DispatchConfig, DispatchOutcome, PolicyVeto};
