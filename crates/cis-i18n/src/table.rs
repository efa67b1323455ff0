//! Nested string tables and `{{name}}` interpolation.

use std::fmt::Display;

use serde_json::{Map, Value};

use crate::error::I18nError;

/// Named values substituted into `{{name}}` placeholders.
pub type Params<'a> = [(&'a str, &'a dyn Display)];

/// One locale's strings. Leaves are strings, interior nodes are objects.
#[derive(Debug, Clone, Default)]
pub struct LocaleTable {
    root: Map<String, Value>,
}

impl LocaleTable {
    pub fn from_json(json: &str) -> Result<Self, I18nError> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| I18nError::InvalidTable(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, I18nError> {
        match value {
            Value::Object(root) => Ok(Self { root }),
            other => Err(I18nError::InvalidTable(format!(
                "expected an object at the top level, found {}",
                kind(&other)
            ))),
        }
    }

    /// Walk `key` segment by segment. `None` unless the path ends at a string.
    pub fn lookup(&self, key: &str) -> Option<&str> {
        let mut segments = key.split('.');
        let mut node = self.root.get(segments.next()?)?;

        for segment in segments {
            node = node.as_object()?.get(segment)?;
        }

        node.as_str()
    }

    /// Dotted paths of every string leaf, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        collect_keys(&self.root, "", &mut keys);
        keys.sort();
        keys
    }
}

fn collect_keys(node: &Map<String, Value>, prefix: &str, out: &mut Vec<String>) {
    for (name, value) in node {
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{}.{}", prefix, name)
        };

        match value {
            Value::String(_) => out.push(path),
            Value::Object(children) => collect_keys(children, &path, out),
            // Numbers, arrays etc. never resolve; skip them.
            _ => {}
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Replace `{{name}}` with the matching param. Whitespace inside the braces is ignored.
/// Placeholders without a matching param, and unterminated `{{`, are kept as written.
pub fn interpolate(template: &str, params: &Params<'_>) -> String {
    if params.is_empty() || !template.contains("{{") {
        return template.to_string();
    }

    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];

        let Some(end) = after_open.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };

        let name = after_open[..end].trim();
        match params.iter().find(|(param, _)| *param == name) {
            Some((_, value)) => out.push_str(&value.to_string()),
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }

        rest = &after_open[end + 2..];
    }

    out.push_str(rest);
    out
}
