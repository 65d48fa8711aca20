//! Action trait and registry.
//!
//! Every action is a named, side-effecting plugin. The registry is built once
//! at startup from an explicit list and never changes afterwards.

pub mod http_request;
pub mod log_message;
pub mod run;
pub mod url_open;
pub mod wake_on_lan;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use vocalis_core::Arguments;

use crate::error::{ActionError, RegistryError};
use crate::types::ActionResult;

/// Name of the authoring template. Never registered.
pub const TEMPLATE_ACTION: &str = "template-action";

/// A pluggable unit of side-effecting behavior.
///
/// `perform` may run for a long time and may be invoked concurrently for the
/// same binding, so implementations must tolerate overlapping calls.
#[async_trait]
pub trait Action: Send + Sync {
    /// Stable registry name, referenced by `action` in the command file.
    fn name(&self) -> &str;

    /// Run the action with the binding's already-substituted arguments.
    async fn perform(&self, args: Option<&Arguments>) -> Result<ActionResult, ActionError>;

    /// Human-readable description of what `perform` would do.
    fn describe(&self, _args: Option<&Arguments>) -> String {
        self.name().to_string()
    }
}

/// Registry of actions keyed by name.
#[derive(Default, Clone)]
pub struct ActionRegistry {
    actions: HashMap<String, Arc<dyn Action>>,
}

impl ActionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in action.
    pub fn with_builtins() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        registry.register_all(builtin_actions())?;
        Ok(registry)
    }

    /// Register an action under its own name.
    ///
    /// Fails on an empty name, the template name, or a name already taken.
    pub fn register(&mut self, action: Arc<dyn Action>) -> Result<(), RegistryError> {
        let name = action.name().to_string();
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if name == TEMPLATE_ACTION {
            return Err(RegistryError::ReservedName(name));
        }
        if self.actions.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        tracing::info!(action = %name, "Registered action");
        self.actions.insert(name, action);
        Ok(())
    }

    pub fn register_all(
        &mut self,
        actions: impl IntoIterator<Item = Arc<dyn Action>>,
    ) -> Result<(), RegistryError> {
        for action in actions {
            self.register(action)?;
        }
        Ok(())
    }

    /// Look up an action by exact name.
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Action>> {
        self.actions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.actions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Every built-in action, in registration order.
pub fn builtin_actions() -> Vec<Arc<dyn Action>> {
    vec![
        Arc::new(run::RunAction),
        Arc::new(url_open::UrlOpenAction),
        Arc::new(wake_on_lan::WakeOnLanAction::default()),
        Arc::new(log_message::LogAction),
        Arc::new(http_request::HttpRequestAction::default()),
    ]
}

/// Read an optional string argument.
pub(crate) fn str_arg<'a>(
    args: Option<&'a Arguments>,
    key: &str,
) -> Result<Option<&'a str>, ActionError> {
    match args.and_then(|a| a.get(key)) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(ActionError::InvalidArguments(format!(
            "`{}` must be a string",
            key
        ))),
    }
}

/// Read a required, non-empty string argument.
pub(crate) fn required_str_arg<'a>(
    args: Option<&'a Arguments>,
    key: &str,
) -> Result<&'a str, ActionError> {
    match str_arg(args, key)? {
        Some(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(ActionError::InvalidArguments(format!(
            "`{}` must not be empty",
            key
        ))),
    }
}
