//! In-memory normalised result cache with per-field merge policies.
//!
//! Root fields of every successful result are stored under a *storage key*
//! derived from the field name and, depending on the field's [`KeyArgs`],
//! the operation variables. Operation results are reassembled from those
//! entries, so two operations sharing a field see the same value.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::operation::{Operation, OperationKey, canonical_json};

/// Combines the cached value of a field with a newly fetched one.
pub type MergeFn = Arc<dyn Fn(Option<&Value>, Value) -> Value + Send + Sync>;

/// Which arguments contribute to a field's storage key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum KeyArgs {
    /// Every variable of the operation (the default).
    #[default]
    All,
    /// None: all calls of the field share one entry (`keyArgs: false`).
    None,
    /// Only the named variables.
    Only(Vec<String>),
}

/// Cache behaviour for one root field.
#[derive(Clone, Default)]
pub struct FieldPolicy {
    key_args: KeyArgs,
    merge: Option<MergeFn>,
}

impl fmt::Debug for FieldPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldPolicy")
            .field("key_args", &self.key_args)
            .field("merge", &self.merge.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

impl FieldPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn key_args(mut self, key_args: KeyArgs) -> Self {
        self.key_args = key_args;
        self
    }

    #[must_use]
    pub fn merge<F>(mut self, merge: F) -> Self
    where
        F: Fn(Option<&Value>, Value) -> Value + Send + Sync + 'static,
    {
        self.merge = Some(Arc::new(merge));
        self
    }

    fn storage_key(&self, field: &str, variables: &Map<String, Value>) -> String {
        let args: Map<String, Value> = match &self.key_args {
            KeyArgs::None => return field.to_string(),
            KeyArgs::All => variables.clone(),
            KeyArgs::Only(names) => variables
                .iter()
                .filter(|(k, _)| names.iter().any(|n| n == *k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        };
        if args.is_empty() {
            field.to_string()
        } else {
            format!("{field}({})", canonical_json(&Value::Object(args)))
        }
    }

    fn apply(&self, existing: Option<&Value>, incoming: Value) -> Value {
        match &self.merge {
            Some(merge) => merge(existing, incoming),
            None => incoming,
        }
    }
}

/// Field policies for the root `Query` type.
#[derive(Debug, Clone, Default)]
pub struct TypePolicies {
    query_fields: HashMap<String, FieldPolicy>,
}

impl TypePolicies {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the policy for root field `name`.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, policy: FieldPolicy) -> Self {
        self.query_fields.insert(name.into(), policy);
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldPolicy> {
        self.query_fields.get(name)
    }
}

/// How a write treats the value already cached for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// A fresh execution: merge functions see no existing value.
    Replace,
    /// A fetch-more: merge functions see the existing value.
    Merge,
}

#[derive(Debug, Clone)]
struct FieldSlot {
    response_key: String,
    storage_key: String,
}

/// Process-local store of query results.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    policies: TypePolicies,
    fields: HashMap<String, Value>,
    results: HashMap<OperationKey, Vec<FieldSlot>>,
}

impl InMemoryCache {
    #[must_use]
    pub fn new(policies: TypePolicies) -> Self {
        Self {
            policies,
            ..Self::default()
        }
    }

    /// Store the root fields of `data` fetched by `operation`.
    ///
    /// Only [`WriteMode::Replace`] writes remember which fields make up the
    /// operation's result; a merge write updates fields in place.
    pub fn write(&mut self, operation: &Operation, data: Map<String, Value>, mode: WriteMode) {
        let fallback = FieldPolicy::default();
        let mut slots = Vec::with_capacity(data.len());
        for (field, incoming) in data {
            let policy = self.policies.get(&field).unwrap_or(&fallback);
            let storage_key = policy.storage_key(&field, operation.variables());
            let existing = match mode {
                WriteMode::Replace => None,
                WriteMode::Merge => self.fields.get(&storage_key),
            };
            let value = policy.apply(existing, incoming);
            self.fields.insert(storage_key.clone(), value);
            slots.push(FieldSlot {
                response_key: field,
                storage_key,
            });
        }
        if mode == WriteMode::Replace {
            self.results.insert(operation.key(), slots);
        }
    }

    /// Reassemble the cached result of `operation`, if every field is present.
    #[must_use]
    pub fn read(&self, operation: &Operation) -> Option<Value> {
        let slots = self.results.get(&operation.key())?;
        let mut data = Map::new();
        for slot in slots {
            let value = self.fields.get(&slot.storage_key)?;
            data.insert(slot.response_key.clone(), value.clone());
        }
        Some(Value::Object(data))
    }

    /// Look up a field entry by storage key, e.g. `allPeople`.
    #[must_use]
    pub fn field(&self, storage_key: &str) -> Option<&Value> {
        self.fields.get(storage_key)
    }

    /// Drop every entry, keeping the configured policies.
    pub fn reset(&mut self) {
        self.fields.clear();
        self.results.clear();
    }
}
