//! `${NAME}` / `$(NAME)` placeholder substitution
//!
//! Substitution is a pure function over JSON-like values. Mapping values and
//! sequence items are walked recursively; keys are never rewritten. Tokens
//! whose name has no substitution are left untouched, and an escaped dollar
//! renders as a literal `$` with no lookup.

use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Substitution values keyed by variable name.
pub type Substitutions = BTreeMap<String, Value>;

/// Escape sequence that renders a literal `$`.
pub const DOLLAR_SIGN_ESCAPE: &str = r"\$";

static TOKEN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([^}]*)\}|\$\(([^)]*)\)").expect("Invalid substitution token regex")
});

static WHOLE_TOKEN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\$\{([^}]*)\}|\$\(([^)]*)\))$").expect("Invalid substitution token regex")
});

fn token_name<'h>(caps: &Captures<'h>) -> &'h str {
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str())
        .unwrap_or_default()
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn substitute_segment(segment: &str, substitutions: &Substitutions) -> String {
    TOKEN_REGEX
        .replace_all(segment, |caps: &Captures<'_>| match substitutions.get(token_name(caps)) {
            Some(value) => render(value),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Substitute tokens inside a single string.
///
/// When the whole string is exactly one token and its value is not a
/// string, the typed value is returned instead of its rendering.
pub fn substitute_str(template: &str, substitutions: &Substitutions, escape_token: &str) -> Value {
    if let Some(caps) = WHOLE_TOKEN_REGEX.captures(template) {
        if let Some(value) = substitutions.get(token_name(&caps)) {
            if !value.is_string() {
                return value.clone();
            }
        }
    }

    if escape_token.is_empty() || !template.contains(escape_token) {
        return Value::String(substitute_segment(template, substitutions));
    }

    let rendered: Vec<String> = template
        .split(escape_token)
        .map(|segment| substitute_segment(segment, substitutions))
        .collect();
    Value::String(rendered.join("$"))
}

/// Recursively substitute tokens in every string of `value`.
pub fn substitute(value: &Value, substitutions: &Substitutions, escape_token: &str) -> Value {
    match value {
        Value::String(s) => substitute_str(s, substitutions, escape_token),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| substitute(item, substitutions, escape_token))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), substitute(v, substitutions, escape_token)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// [`substitute`] with the default [`DOLLAR_SIGN_ESCAPE`].
pub fn substitute_config(value: &Value, substitutions: &Substitutions) -> Value {
    substitute(value, substitutions, DOLLAR_SIGN_ESCAPE)
}

/// Names of all tokens in `value`, resolved or not.
pub fn referenced_variables(value: &Value) -> Vec<String> {
    let mut names = Vec::new();
    collect_names(value, &mut names);
    names.sort();
    names.dedup();
    names
}

fn collect_names(value: &Value, names: &mut Vec<String>) {
    match value {
        Value::String(s) => names.extend(
            TOKEN_REGEX
                .captures_iter(s)
                .map(|caps| token_name(&caps).to_string()),
        ),
        Value::Array(items) => items.iter().for_each(|item| collect_names(item, names)),
        Value::Object(map) => map.values().for_each(|v| collect_names(v, names)),
        _ => {}
    }
}
