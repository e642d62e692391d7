// Request values consumed by the rule engine

use serde_json::Value;
use std::collections::HashMap;

/// Raw value submitted for one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Single scalar value
    Text(String),

    /// Repeated or array-valued field; order preserved, duplicates allowed
    List(Vec<String>),

    /// Value with a shape no rule can interpret (e.g. a nested object)
    Malformed,
}

impl FieldValue {
    /// Normalize to a list of non-blank values.
    ///
    /// A scalar becomes a one-element list. Malformed values yield nothing.
    pub fn values(&self) -> Vec<&str> {
        match self {
            FieldValue::Text(s) => {
                if s.trim().is_empty() {
                    Vec::new()
                } else {
                    vec![s.as_str()]
                }
            }
            FieldValue::List(items) => items
                .iter()
                .map(String::as_str)
                .filter(|s| !s.trim().is_empty())
                .collect(),
            FieldValue::Malformed => Vec::new(),
        }
    }

    /// Values by position, blanks kept, so parallel columns line up
    pub fn rows(&self) -> Vec<&str> {
        match self {
            FieldValue::Text(s) => vec![s.as_str()],
            FieldValue::List(items) => items.iter().map(String::as_str).collect(),
            FieldValue::Malformed => Vec::new(),
        }
    }

    /// True when nothing usable was submitted
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Malformed => false,
            _ => self.values().is_empty(),
        }
    }

    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    match scalar_to_string(item) {
                        Some(s) => out.push(s),
                        None if item.is_null() => {}
                        None => return Some(FieldValue::Malformed),
                    }
                }
                Some(FieldValue::List(out))
            }
            Value::Object(_) => Some(FieldValue::Malformed),
            other => scalar_to_string(other).map(FieldValue::Text),
        }
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<Vec<&str>> for FieldValue {
    fn from(values: Vec<&str>) -> Self {
        FieldValue::List(values.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(values: Vec<String>) -> Self {
        FieldValue::List(values)
    }
}

/// Field name to submitted value, built once per incoming call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationRequest {
    fields: HashMap<String, FieldValue>,
}

impl ValidationRequest {
    /// Create an empty request
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(field, value);
        self
    }

    /// Insert or replace a field
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Raw value of a field
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// Scalar text of a field, if it was submitted as a single value
    pub fn text(&self, field: &str) -> Option<&str> {
        match self.fields.get(field)? {
            FieldValue::Text(s) => Some(s.as_str()),
            FieldValue::List(items) if items.len() == 1 => Some(items[0].as_str()),
            _ => None,
        }
    }

    /// Non-blank values of a field, normalized to a list
    pub fn values(&self, field: &str) -> Vec<&str> {
        self.fields.get(field).map(FieldValue::values).unwrap_or_default()
    }

    /// Positional values of a field, blanks kept
    pub fn rows(&self, field: &str) -> Vec<&str> {
        self.fields.get(field).map(FieldValue::rows).unwrap_or_default()
    }

    /// Whether the field carries at least one non-blank value
    pub fn is_present(&self, field: &str) -> bool {
        self.fields
            .get(field)
            .map(|v| !v.is_blank() && *v != FieldValue::Malformed)
            .unwrap_or(false)
    }

    /// Field names in the request
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when no fields were submitted
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Build a request from a JSON object.
    ///
    /// Numbers and booleans are stringified, nulls are dropped and nested
    /// objects become [`FieldValue::Malformed`]. A non-object input yields an
    /// empty request.
    pub fn from_json(value: &Value) -> Self {
        let mut request = Self::new();
        if let Value::Object(map) = value {
            for (key, value) in map {
                let key = key.strip_suffix("[]").unwrap_or(key);
                if let Some(field) = FieldValue::from_json(value) {
                    request.fields.insert(key.to_string(), field);
                }
            }
        }
        request
    }
}

impl<K, V> FromIterator<(K, V)> for ValidationRequest
where
    K: Into<String>,
    V: Into<FieldValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut request = Self::new();
        for (k, v) in iter {
            request.insert(k, v);
        }
        request
    }
}
