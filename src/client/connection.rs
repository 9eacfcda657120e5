//! Cursor-based connections and the merge policy that accumulates them.
//!
//! A connection is a list field shaped as `{ pageInfo, edges: [{ node }] }`.
//! [`merge_connection`] keeps every page fetched so far, in fetch order, and
//! takes everything else from the newest page.

use serde::Deserialize;
use serde_json::Value;

use crate::HolonetError;

/// Pagination state reported alongside each page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

impl PageInfo {
    /// The cursor to request the next page with, or `None` on the last page.
    ///
    /// # Errors
    ///
    /// Returns [`HolonetError::BadResponse`] when the server reports more
    /// pages without a cursor to reach them.
    pub fn next_cursor(&self) -> Result<Option<&str>, HolonetError> {
        match (self.has_next_page, self.end_cursor.as_deref()) {
            (false, _) => Ok(None),
            (true, Some(cursor)) => Ok(Some(cursor)),
            (true, None) => Err(HolonetError::BadResponse(
                "hasNextPage=true but endCursor is missing".into(),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Edge<T> {
    pub node: T,
}

/// Typed view of a connection for callers that want to walk its nodes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<T> {
    #[serde(default)]
    pub page_info: PageInfo,
    #[serde(default = "Vec::new")]
    pub edges: Vec<Edge<T>>,
}

impl<T> Connection<T> {
    pub fn nodes(&self) -> impl Iterator<Item = &T> {
        self.edges.iter().map(|edge| &edge.node)
    }
}

fn take_edges(value: &mut Value) -> Vec<Value> {
    value
        .get_mut("edges")
        .and_then(Value::as_array_mut)
        .map(std::mem::take)
        .unwrap_or_default()
}

/// Append `incoming` edges to `existing` edges.
///
/// The result is `incoming` with its `edges` replaced by the concatenation of
/// both sequences. No deduplication or reordering takes place. With no
/// `existing` value the incoming page passes through unchanged. A `null` or
/// non-object incoming value is treated as an empty object.
#[must_use]
pub fn merge_connection(existing: Option<&Value>, incoming: Value) -> Value {
    let Some(existing) = existing else {
        return incoming;
    };
    let mut merged = match incoming {
        Value::Object(map) => Value::Object(map),
        _ => Value::Object(serde_json::Map::new()),
    };
    let mut edges = existing
        .get("edges")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    edges.extend(take_edges(&mut merged));
    if let Some(map) = merged.as_object_mut() {
        map.insert("edges".into(), Value::Array(edges));
    }
    merged
}
