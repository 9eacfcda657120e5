//! GraphQL operations, their detected kind and their cache identity.

use serde_json::{Map, Value};
use std::sync::Arc;

use crate::envelope::OperationEnvelope;

/// The root type an operation executes against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

/// A GraphQL document together with the variables it is executed with.
///
/// Kind and name are read from the document header once, at construction.
/// An anonymous `{ ... }` shorthand document is a query.
#[derive(Debug, Clone)]
pub struct Operation {
    document: Arc<str>,
    kind: OperationKind,
    name: Option<String>,
    variables: Map<String, Value>,
}

/// Identity of an operation in the result cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct OperationKey {
    document: Arc<str>,
    variables: String,
}

impl Operation {
    pub fn new(document: impl Into<String>) -> Self {
        let document: Arc<str> = Arc::from(document.into());
        let (kind, name) = {
            let (kind, name) = parse_header(&document);
            (kind, name.map(str::to_owned))
        };
        Self {
            document,
            kind,
            name,
            variables: Map::new(),
        }
    }

    /// Replace the variables sent with this operation.
    #[must_use]
    pub fn with_variables(mut self, variables: Map<String, Value>) -> Self {
        self.variables = variables;
        self
    }

    /// Set a single variable, overwriting any previous value.
    #[must_use]
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn document(&self) -> &str {
        &self.document
    }

    #[must_use]
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub fn variables(&self) -> &Map<String, Value> {
        &self.variables
    }

    /// A copy of this operation with `extra` laid over its variables.
    #[must_use]
    pub fn merged(&self, extra: Map<String, Value>) -> Self {
        let mut next = self.clone();
        next.variables.extend(extra);
        next
    }

    /// Build the wire envelope; empty variables are left out.
    #[must_use]
    pub fn envelope(&self) -> OperationEnvelope {
        OperationEnvelope {
            query: self.document.to_string(),
            variables: (!self.variables.is_empty()).then(|| self.variables.clone()),
            operation_name: self.name.clone(),
        }
    }

    pub(crate) fn key(&self) -> OperationKey {
        OperationKey {
            document: Arc::clone(&self.document),
            variables: canonical_json(&Value::Object(self.variables.clone())),
        }
    }

    /// A short label for log lines.
    pub(crate) fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("<anonymous>")
    }
}

impl From<&str> for Operation {
    fn from(document: &str) -> Self {
        Self::new(document)
    }
}

/// Render `value` as compact JSON with object keys sorted at every level.
///
/// Two variable sets that differ only in key order produce the same string.
pub(crate) fn canonical_json(value: &Value) -> String {
    sorted(value).to_string()
}

fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), sorted(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}

/// Skip whitespace and `#` comments ahead of the first definition.
fn skip_ignored(mut text: &str) -> &str {
    loop {
        text = text.trim_start();
        match text.strip_prefix('#') {
            Some(comment) => {
                text = comment.split_once('\n').map_or("", |(_, rest)| rest);
            }
            None => return text,
        }
    }
}

/// Skip leading `fragment Name on Type { ... }` definitions.
fn skip_fragments(mut text: &str) -> &str {
    loop {
        text = skip_ignored(text);
        let Some(rest) = text.strip_prefix("fragment") else {
            return text;
        };
        if !rest.starts_with(char::is_whitespace) {
            return text;
        }
        let Some(after) = after_selection_set(rest) else {
            return text;
        };
        text = after;
    }
}

/// The text following the first balanced `{ ... }` block.
///
/// Braces inside string literals do not count.
fn after_selection_set(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return text.get(i + c.len_utf8()..);
                }
            }
            _ => {}
        }
    }
    None
}

/// Detect the operation kind and name from the first operation definition.
fn parse_header(document: &str) -> (OperationKind, Option<&str>) {
    let trimmed = skip_fragments(document);
    for (prefix, kind) in [
        ("query", OperationKind::Query),
        ("mutation", OperationKind::Mutation),
        ("subscription", OperationKind::Subscription),
    ] {
        let Some(rest) = trimmed.strip_prefix(prefix) else {
            continue;
        };
        // A delimiter must follow, otherwise `queryX { ... }` would match.
        let is_delim = matches!(
            rest.chars().next(),
            Some('{' | '(' | '@' | ' ' | '\n' | '\t' | '\r')
        );
        if !is_delim {
            continue;
        }
        let name = rest
            .trim_start()
            .split(|c: char| c.is_whitespace() || matches!(c, '(' | '{' | '@'))
            .next()
            .filter(|s| !s.is_empty());
        return (kind, name);
    }
    (OperationKind::Query, None)
}
