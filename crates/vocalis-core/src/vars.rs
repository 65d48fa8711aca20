//! `@@name` variable substitution for binding arguments.

use serde_json::{Map, Value};

/// Marker prefix for a variable reference inside an argument string.
pub const VAR_PREFIX: &str = "@@";

/// Global variables from the `vars` section.
pub type Variables = Map<String, Value>;

/// Replace every `"@@name"` string in `value` with the variable it names.
///
/// Descends through objects and arrays. Unknown names are left as the literal
/// `"@@name"` string, and other scalars pass through unchanged. A variable
/// whose value refers to other variables is resolved through the chain, so
/// the result holds no reference that a second pass could still resolve.
/// A reference that leads back to itself is left as written.
pub fn substitute(value: &Value, vars: &Variables) -> Value {
    match value {
        Value::String(s) => match s.strip_prefix(VAR_PREFIX) {
            Some(name) => resolve(name, vars, &mut Vec::new()).unwrap_or_else(|| {
                tracing::warn!(variable = %name, "Circular variable reference, left unresolved");
                value.clone()
            }),
            None => value.clone(),
        },
        Value::Array(items) => Value::Array(items.iter().map(|v| substitute(v, vars)).collect()),
        Value::Object(map) => Value::Object(substitute_map(map, vars)),
        _ => value.clone(),
    }
}

/// Resolve `@@name`. `None` when the chain of references loops.
fn resolve<'a>(name: &'a str, vars: &'a Variables, chain: &mut Vec<&'a str>) -> Option<Value> {
    let Some(target) = vars.get(name) else {
        return Some(Value::String(format!("{}{}", VAR_PREFIX, name)));
    };
    if chain.contains(&name) {
        return None;
    }
    chain.push(name);
    let resolved = expand(target, vars, chain);
    chain.pop();
    resolved
}

/// Resolve every reference inside a variable's value.
fn expand<'a>(value: &'a Value, vars: &'a Variables, chain: &mut Vec<&'a str>) -> Option<Value> {
    match value {
        Value::String(s) => match s.strip_prefix(VAR_PREFIX) {
            Some(name) => resolve(name, vars, chain),
            None => Some(value.clone()),
        },
        Value::Array(items) => items
            .iter()
            .map(|v| expand(v, vars, chain))
            .collect::<Option<Vec<Value>>>()
            .map(Value::Array),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| expand(v, vars, chain).map(|v| (k.clone(), v)))
            .collect::<Option<Map<String, Value>>>()
            .map(Value::Object),
        _ => Some(value.clone()),
    }
}

/// Apply [`substitute`] to every value of an argument map.
pub fn substitute_map(map: &Map<String, Value>, vars: &Variables) -> Map<String, Value> {
    map.iter()
        .map(|(k, v)| (k.clone(), substitute(v, vars)))
        .collect()
}
