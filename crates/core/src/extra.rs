//! Open-ended key/value fields attached to a log record.
//!
//! Values may hold [`SharedObject`] handles, which are reference counted and
//! interior mutable. The same object can therefore appear in several places,
//! or even contain itself. [`ExtraFields::to_json`] renders such graphs
//! without recursing forever: each shared object is written the first time it
//! is reached and omitted on every later encounter within the same pass.

use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::{Map, Number, Value};

/// A single extra-field value.
#[derive(Debug, Clone)]
pub enum ExtraValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<ExtraValue>),
    Object(SharedObject),
}

/// Ordered collection of named values. Inserting an existing name replaces
/// the previous value in place.
#[derive(Debug, Clone, Default)]
pub struct ExtraFields {
    entries: Vec<(String, ExtraValue)>,
}

impl ExtraFields {
    /// Create an empty field list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a field.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ExtraValue>) {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == name) {
            slot.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }

    /// Return the value of a field, if present.
    pub fn get(&self, name: &str) -> Option<&ExtraValue> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Remove a field, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<ExtraValue> {
        let idx = self.entries.iter().position(|(k, _)| k == name)?;
        Some(self.entries.remove(idx).1)
    }

    /// Return the number of fields.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return `true` if there are no fields.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ExtraValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Render the fields as a JSON object, breaking shared-object cycles.
    pub fn to_json(&self) -> Value {
        let mut seen = HashSet::new();
        entries_to_json(&self.entries, &mut seen)
    }
}

impl<K: Into<String>, V: Into<ExtraValue>> FromIterator<(K, V)> for ExtraFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = Self::new();
        for (k, v) in iter {
            fields.insert(k, v);
        }
        fields
    }
}

/// Reference-counted, mutable object node.
///
/// Cloning the handle shares the node. A node that ends up containing itself
/// keeps itself alive until one of the entries forming the cycle is removed.
#[derive(Debug, Clone, Default)]
pub struct SharedObject {
    inner: Arc<RwLock<ExtraFields>>,
}

impl SharedObject {
    /// Create a new, empty shared node.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a field of the shared node.
    pub fn insert(&self, name: impl Into<String>, value: impl Into<ExtraValue>) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, value);
    }

    /// Remove a field of the shared node, returning its value.
    pub fn remove(&self, name: &str) -> Option<ExtraValue> {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }

    /// Whether both handles point at the same node.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn id(&self) -> usize {
        Arc::as_ptr(&self.inner).cast::<()>() as usize
    }

    fn snapshot(&self) -> Vec<(String, ExtraValue)> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .clone()
    }
}

fn entries_to_json(entries: &[(String, ExtraValue)], seen: &mut HashSet<usize>) -> Value {
    let mut map = Map::with_capacity(entries.len());
    for (name, value) in entries {
        if let Some(json) = value_to_json(value, seen) {
            map.insert(name.clone(), json);
        }
    }
    Value::Object(map)
}

/// Returns `None` when the value is an object that was already written.
fn value_to_json(value: &ExtraValue, seen: &mut HashSet<usize>) -> Option<Value> {
    let json = match value {
        ExtraValue::Null => Value::Null,
        ExtraValue::Bool(b) => Value::Bool(*b),
        ExtraValue::Number(n) => Value::Number(n.clone()),
        ExtraValue::String(s) => Value::String(s.clone()),
        ExtraValue::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| value_to_json(item, seen).unwrap_or(Value::Null))
                .collect(),
        ),
        ExtraValue::Object(obj) => {
            if !seen.insert(obj.id()) {
                return None;
            }
            entries_to_json(&obj.snapshot(), seen)
        }
    };
    Some(json)
}

impl From<Value> for ExtraValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => {
                let obj = SharedObject::new();
                for (k, v) in map {
                    obj.insert(k, Self::from(v));
                }
                Self::Object(obj)
            }
        }
    }
}

impl From<SharedObject> for ExtraValue {
    fn from(obj: SharedObject) -> Self {
        Self::Object(obj)
    }
}

impl From<&str> for ExtraValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for ExtraValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for ExtraValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for ExtraValue {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<u64> for ExtraValue {
    fn from(n: u64) -> Self {
        Self::Number(n.into())
    }
}

/// Non-finite floats have no JSON form and become `null`.
impl From<f64> for ExtraValue {
    fn from(n: f64) -> Self {
        Number::from_f64(n).map_or(Self::Null, Self::Number)
    }
}
