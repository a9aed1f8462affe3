//! Document, filter and query option types
//!
//! The engine is store-agnostic: it never interprets a filter itself. The
//! equality matching and ordering helpers here exist for stores (such as
//! [`MemoryStore`](crate::store::MemoryStore)) that want a simple reading.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{BatchError, Result};

/// A JSON object stored in a collection
pub type Document = Map<String, Value>;

/// Convert an arbitrary JSON value into a document
///
/// Fails unless the value is a JSON object.
pub fn into_document(value: Value) -> Result<Document> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(BatchError::InvalidOperation(format!(
            "document must be a JSON object, got {}",
            other
        ))),
    }
}

/// Selection criteria: field/value pairs that must all be equal
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filter(Map<String, Value>);

impl Filter {
    /// An empty filter (matches every document)
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality condition
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// Build a filter from a JSON value, which must be an object
    pub fn from_value(value: Value) -> Result<Self> {
        into_document(value).map(Self)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over the conditions
    pub fn conditions(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// True when every condition holds for the document
    pub fn matches(&self, document: &Document) -> bool {
        self.0
            .iter()
            .all(|(field, expected)| document.get(field) == Some(expected))
    }
}

impl From<Map<String, Value>> for Filter {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Sort direction for a single field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Per-call options for a select
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FindOptions {
    /// Sort keys, applied left to right
    pub sort: Vec<(String, SortOrder)>,

    /// Number of matching documents to skip
    pub skip: Option<usize>,

    /// Maximum number of documents to return
    pub limit: Option<usize>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort.push((field.into(), order));
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Compare two documents by the configured sort keys
    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        for (field, order) in &self.sort {
            let ord = compare_values(a.get(field), b.get(field));
            let ord = match order {
                SortOrder::Ascending => ord,
                SortOrder::Descending => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    /// Apply sort, skip and limit to a set of matching documents
    pub fn apply(&self, mut documents: Vec<Document>) -> Vec<Document> {
        if !self.sort.is_empty() {
            // stable: equal keys keep insertion order
            documents.sort_by(|a, b| self.compare(a, b));
        }
        let skip = self.skip.unwrap_or(0);
        let limit = self.limit.unwrap_or(usize::MAX);
        documents.into_iter().skip(skip).take(limit).collect()
    }
}

/// Missing < null < bool < number < string; arrays and objects compare equal
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None => 0,
            Some(Value::Null) => 1,
            Some(Value::Bool(_)) => 2,
            Some(Value::Number(_)) => 3,
            Some(Value::String(_)) => 4,
            Some(_) => 5,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}
