//! Command file loading.
//!
//! The command file is the user-editable document that maps spoken verbs and
//! nouns to actions. It is JSON by default; a `.toml` file with the same
//! shape is also accepted. Loading happens in two phases:
//!
//! 1. Parse the document and extract its top-level sections. Any failure here
//!    is a [`ConfigError`] and aborts the load.
//! 2. Build one [`ActionBinding`] per noun. A malformed binding is logged,
//!    recorded in [`CommandConfig::rejected`], and skipped.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde_json::Value;
use tracing::{info, warn};

use crate::error::{BindingError, ConfigError, Result};
use crate::grammar::{ActionBinding, Grammar, RestrictionPolicy};
use crate::vars::Variables;

/// The `assistant` section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssistantConfig {
    /// Name that may prefix every spoken verb.
    pub name: Option<String>,
    /// Require the name before each command.
    pub enable_name: bool,
    /// Recognitions below this confidence are discarded.
    pub min_confidence: Option<f64>,
}

impl AssistantConfig {
    /// The name to prefix verbs with, if the prefix is enabled.
    pub fn verb_prefix(&self) -> Option<&str> {
        match (&self.name, self.enable_name) {
            (Some(name), true) if !name.trim().is_empty() => Some(name.as_str()),
            _ => None,
        }
    }
}

/// A fully parsed command file.
#[derive(Debug, Clone, Default)]
pub struct CommandConfig {
    /// Surface dispatch errors to the user, not just the log.
    pub display_errors: bool,
    pub assistant: AssistantConfig,
    pub vars: Variables,
    pub grammar: Grammar,
    pub restrictions: RestrictionPolicy,
    /// Bindings dropped while loading.
    pub rejected: Vec<BindingError>,
}

impl CommandConfig {
    /// Load a command file, choosing the parser from the file extension.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let is_toml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("toml"));
        let config = if is_toml {
            Self::from_toml_str(&content)?
        } else {
            Self::from_json_str(&content)?
        };
        info!(
            path = %path.display(),
            verbs = config.grammar.verbs().len(),
            bindings = config.grammar.binding_count(),
            rejected = config.rejected.len(),
            "Command file loaded"
        );
        Ok(config)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let root: Value = serde_json::from_str(content)?;
        Self::from_value(&root)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let root: Value = toml::from_str(content)?;
        Self::from_value(&root)
    }

    /// Build a configuration from an already-parsed document tree.
    pub fn from_value(root: &Value) -> Result<Self> {
        let root = root.as_object().ok_or(ConfigError::NotAnObject)?;

        let display_errors = match root.get("display_errors") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(_) => return Err(invalid("display_errors", "a boolean")),
        };

        let assistant = match section(root.get("assistant"), "assistant")? {
            Some(obj) => parse_assistant(obj)?,
            None => AssistantConfig::default(),
        };

        let vars = section(root.get("vars"), "vars")?
            .cloned()
            .unwrap_or_default();

        let restrictions = match section(root.get("restrict_by"), "restrict_by")? {
            Some(obj) => match obj.get("processes") {
                None | Some(Value::Null) => RestrictionPolicy::default(),
                Some(Value::Array(items)) => RestrictionPolicy::from_raw(items),
                Some(_) => return Err(invalid("restrict_by.processes", "an array")),
            },
            None => RestrictionPolicy::default(),
        };

        let mut grammar = Grammar::new();
        let mut rejected = Vec::new();

        if let Some(actions) = section(root.get("actions"), "actions")? {
            for (verb, nouns) in actions {
                grammar.add_verb(verb.clone());
                let Some(nouns) = nouns.as_object() else {
                    let err = BindingError::VerbNotAnObject { verb: verb.clone() };
                    warn!(error = %err, "Skipping verb");
                    rejected.push(err);
                    continue;
                };
                for (noun, raw) in nouns {
                    match ActionBinding::from_raw(verb, noun, raw, &vars) {
                        Ok(binding) => grammar.bind(verb, noun.clone(), binding),
                        Err(err) => {
                            warn!(error = %err, "Skipping binding");
                            rejected.push(err);
                        }
                    }
                }
            }
        }

        Ok(Self {
            display_errors,
            assistant,
            vars,
            grammar,
            restrictions,
            rejected,
        })
    }

    /// Drop bindings whose action is not known, logging one warning each.
    pub fn retain_registered(&mut self, is_known: impl Fn(&str) -> bool) {
        for err in self.grammar.retain_actions(is_known) {
            warn!(error = %err, "Dropping binding");
            self.rejected.push(err);
        }
    }
}

fn invalid(section: &str, expected: &'static str) -> ConfigError {
    ConfigError::InvalidSection {
        section: section.to_string(),
        expected,
    }
}

/// An optional object-valued section. `null` counts as absent.
fn section<'a>(
    value: Option<&'a Value>,
    name: &str,
) -> Result<Option<&'a serde_json::Map<String, Value>>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(obj)) => Ok(Some(obj)),
        Some(_) => Err(invalid(name, "an object")),
    }
}

fn parse_assistant(obj: &serde_json::Map<String, Value>) -> Result<AssistantConfig> {
    let name = match obj.get("name") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => return Err(invalid("assistant.name", "a string")),
    };
    let enable_name = match obj.get("enable_name") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(_) => return Err(invalid("assistant.enable_name", "a boolean")),
    };
    let min_confidence = match obj.get("min_confidence") {
        None | Some(Value::Null) => None,
        Some(v) => Some(
            v.as_f64()
                .ok_or_else(|| invalid("assistant.min_confidence", "a number"))?,
        ),
    };
    Ok(AssistantConfig {
        name,
        enable_name,
        min_confidence,
    })
}

/// Holds the current [`CommandConfig`] and the path it was read from.
///
/// Readers get a cheap `Arc` snapshot; [`ConfigStore::reload`] swaps in a new
/// snapshot only when the file parses.
pub struct ConfigStore {
    source: PathBuf,
    current: RwLock<Arc<CommandConfig>>,
}

impl ConfigStore {
    /// Load `source` for the first time.
    pub fn open(source: impl Into<PathBuf>) -> Result<Self> {
        let source = source.into();
        let config = CommandConfig::load(&source)?;
        Ok(Self {
            source,
            current: RwLock::new(Arc::new(config)),
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn current(&self) -> Arc<CommandConfig> {
        Arc::clone(&self.current.read().expect("config lock poisoned"))
    }

    /// Re-read the source. On error the previous configuration stays active.
    pub fn reload(&self) -> Result<Arc<CommandConfig>> {
        let config = Arc::new(CommandConfig::load(&self.source)?);
        *self.current.write().expect("config lock poisoned") = Arc::clone(&config);
        info!(path = %self.source.display(), "Command file reloaded");
        Ok(config)
    }
}
