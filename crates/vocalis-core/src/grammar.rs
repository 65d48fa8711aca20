//! Typed verb/noun grammar and per-binding policy.
//!
//! Built from the `actions` and `restrict_by` sections of the command file.
//! Bindings are parsed one at a time so that a typo in one noun only drops
//! that noun.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::BindingError;
use crate::vars::{self, Variables};

/// Opaque action arguments, passed verbatim to the action.
pub type Arguments = Map<String, Value>;

/// How one noun under one verb resolves.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionBinding {
    /// Registry name of the action to invoke. Never empty.
    pub action: String,
    pub description: Option<String>,
    pub requires_confirmation: bool,
    pub restricted: bool,
    pub disabled: bool,
    /// Arguments with `@@name` references already substituted.
    pub arguments: Option<Arguments>,
}

impl ActionBinding {
    /// A binding with default policy for the given action.
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            description: None,
            requires_confirmation: false,
            restricted: false,
            disabled: false,
            arguments: None,
        }
    }

    /// Parse one raw binding object and substitute variables in its `args`.
    pub fn from_raw(
        verb: &str,
        noun: &str,
        raw: &Value,
        vars: &Variables,
    ) -> Result<Self, BindingError> {
        let obj = raw.as_object().ok_or_else(|| BindingError::NotAnObject {
            verb: verb.to_string(),
            noun: noun.to_string(),
        })?;

        let action = match obj.get("action") {
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            _ => {
                return Err(BindingError::MissingAction {
                    verb: verb.to_string(),
                    noun: noun.to_string(),
                })
            }
        };

        let field_error = |field: &'static str, expected: &'static str| BindingError::InvalidField {
            verb: verb.to_string(),
            noun: noun.to_string(),
            field,
            expected,
        };

        let flag = |field: &'static str| -> Result<bool, BindingError> {
            match obj.get(field) {
                None | Some(Value::Null) => Ok(false),
                Some(Value::Bool(b)) => Ok(*b),
                Some(_) => Err(field_error(field, "a boolean")),
            }
        };

        let description = match obj.get("description") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => return Err(field_error("description", "a string")),
        };

        let arguments = match obj.get("args") {
            None | Some(Value::Null) => None,
            Some(Value::Object(args)) => Some(vars::substitute_map(args, vars)),
            Some(_) => return Err(field_error("args", "an object")),
        };

        Ok(Self {
            action,
            description,
            requires_confirmation: flag("confirm")?,
            restricted: flag("restricted")?,
            disabled: flag("disabled")?,
            arguments,
        })
    }
}

/// A noun and the binding it resolves to.
#[derive(Debug, Clone, PartialEq)]
pub struct NounBinding {
    pub noun: String,
    pub binding: Arc<ActionBinding>,
}

/// Verb list plus the nouns bound under each verb.
///
/// Every verb in `verbs` has an entry in the noun table, possibly empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grammar {
    verbs: Vec<String>,
    nouns_of: HashMap<String, Vec<NounBinding>>,
}

impl Grammar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a verb with no nouns. Adding a known verb is a no-op.
    pub fn add_verb(&mut self, verb: impl Into<String>) {
        let verb = verb.into();
        if !self.nouns_of.contains_key(&verb) {
            self.nouns_of.insert(verb.clone(), Vec::new());
            self.verbs.push(verb);
        }
    }

    /// Bind `noun` under `verb`. A repeated noun replaces the earlier binding.
    pub fn bind(&mut self, verb: &str, noun: impl Into<String>, binding: ActionBinding) {
        self.add_verb(verb);
        let noun = noun.into();
        let binding = Arc::new(binding);
        if let Some(nouns) = self.nouns_of.get_mut(verb) {
            match nouns.iter_mut().find(|nb| nb.noun == noun) {
                Some(existing) => existing.binding = binding,
                None => nouns.push(NounBinding { noun, binding }),
            }
        }
    }

    /// Verbs in configuration order.
    pub fn verbs(&self) -> &[String] {
        &self.verbs
    }

    /// Nouns bound under `verb`, in configuration order.
    pub fn nouns_of(&self, verb: &str) -> &[NounBinding] {
        self.nouns_of.get(verb).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every `(verb, noun, binding)` triple, verbs in configuration order.
    pub fn bindings(&self) -> impl Iterator<Item = (&str, &str, &Arc<ActionBinding>)> {
        self.verbs.iter().flat_map(move |verb| {
            self.nouns_of(verb)
                .iter()
                .map(move |nb| (verb.as_str(), nb.noun.as_str(), &nb.binding))
        })
    }

    pub fn binding_count(&self) -> usize {
        self.nouns_of.values().map(Vec::len).sum()
    }

    /// Drop every binding whose action does not satisfy `is_known`.
    ///
    /// Returns one [`BindingError::UnregisteredAction`] per dropped binding.
    pub fn retain_actions(&mut self, is_known: impl Fn(&str) -> bool) -> Vec<BindingError> {
        let mut dropped = Vec::new();
        for verb in &self.verbs {
            if let Some(nouns) = self.nouns_of.get_mut(verb) {
                nouns.retain(|nb| {
                    let keep = is_known(&nb.binding.action);
                    if !keep {
                        dropped.push(BindingError::UnregisteredAction {
                            verb: verb.clone(),
                            noun: nb.noun.clone(),
                            action: nb.binding.action.clone(),
                        });
                    }
                    keep
                });
            }
        }
        dropped
    }

    /// Phrase choices to load into a recognition engine.
    ///
    /// One entry per verb that has at least one noun. With `prefix` set, the
    /// verb is spoken as `"<prefix> <verb>"`.
    pub fn recognition_phrases(&self, prefix: Option<&str>) -> Vec<RecognitionChoice> {
        self.verbs
            .iter()
            .filter_map(|verb| {
                let nouns = self.nouns_of(verb);
                if nouns.is_empty() {
                    return None;
                }
                let spoken_verb = match prefix {
                    Some(name) => format!("{} {}", name, verb),
                    None => verb.clone(),
                };
                Some(RecognitionChoice {
                    verb: spoken_verb,
                    nouns: nouns.iter().map(|nb| nb.noun.clone()).collect(),
                })
            })
            .collect()
    }
}

/// One verb and the nouns that may follow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionChoice {
    pub verb: String,
    pub nouns: Vec<String>,
}

/// One entry of `restrict_by.processes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestrictedProcess {
    /// Executable path with separators normalized for this platform.
    Path(String),
    /// An entry that is not a string. Counts as always running.
    Unresolvable,
}

impl RestrictedProcess {
    fn from_raw(raw: &Value) -> Self {
        match raw.as_str() {
            Some(path) => RestrictedProcess::Path(normalize_separators(path)),
            None => RestrictedProcess::Unresolvable,
        }
    }
}

/// Processes whose presence vetoes `restricted` bindings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestrictionPolicy {
    pub processes: Vec<RestrictedProcess>,
}

impl RestrictionPolicy {
    pub fn from_raw(processes: &[Value]) -> Self {
        Self {
            processes: processes.iter().map(RestrictedProcess::from_raw).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }
}

/// Rewrite `/` and `\` to the platform separator.
pub fn normalize_separators(path: &str) -> String {
    let sep = std::path::MAIN_SEPARATOR;
    path.chars()
        .map(|c| if c == '/' || c == '\\' { sep } else { c })
        .collect()
}
