//! Field filters over a declared vocabulary

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by filter edits
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("Unknown filter field '{0}'")]
    UnknownField(String),
}

/// A filterable field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterField {
    /// Name used by the filter UI and in snapshots
    pub key: String,

    /// Query parameter name on the remote endpoint
    pub param: String,

    /// Human readable label
    pub label: String,
}

impl FilterField {
    /// Create a field, deriving the label from the key
    pub fn new(key: impl Into<String>, param: impl Into<String>) -> Self {
        let key = key.into();
        let label = humanize(&key);
        Self {
            key,
            param: param.into(),
            label,
        }
    }
}

/// "AniAliDigits" -> "Ani Ali Digits", "InteractionID" -> "Interaction ID"
fn humanize(key: &str) -> String {
    let mut label = String::with_capacity(key.len() + 4);
    let mut previous: Option<char> = None;
    for c in key.chars() {
        if let Some(p) = previous {
            if c.is_uppercase() && p.is_lowercase() {
                label.push(' ');
            }
        }
        label.push(c);
        previous = Some(c);
    }
    label
}

/// Filters that will actually be sent: active fields with at least one
/// non-empty value, in vocabulary order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSnapshot(IndexMap<String, Vec<String>>);

impl FilterSnapshot {
    /// Build a snapshot from raw pairs, dropping empty values and fields
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Vec<V>)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut fields = IndexMap::new();
        for (key, values) in pairs {
            let values: Vec<String> = values
                .into_iter()
                .map(Into::into)
                .map(|v: String| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .collect();
            if !values.is_empty() {
                fields.insert(key.into(), values);
            }
        }
        Self(fields)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.0.get(key).map(|v| v.as_slice())
    }

    /// The value submitted for `key`; endpoints accept one value per field
    pub fn first_value(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.first()).map(|s| s.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

/// Mapping of declared field -> values, plus the set of fields the user has
/// opted into. Activation is independent of value entry.
#[derive(Debug, Clone)]
pub struct FilterSet {
    fields: Vec<FilterField>,
    values: IndexMap<String, Vec<String>>,
    active: IndexSet<String>,
}

impl FilterSet {
    /// Create an empty filter set over `fields`
    pub fn new(fields: Vec<FilterField>) -> Self {
        let values = fields
            .iter()
            .map(|f| (f.key.clone(), Vec::new()))
            .collect();
        Self {
            fields,
            values,
            active: IndexSet::new(),
        }
    }

    /// Declared vocabulary
    pub fn fields(&self) -> &[FilterField] {
        &self.fields
    }

    pub fn field(&self, key: &str) -> Option<&FilterField> {
        self.fields.iter().find(|f| f.key == key)
    }

    fn ensure_declared(&self, key: &str) -> Result<(), FilterError> {
        if self.values.contains_key(key) {
            Ok(())
        } else {
            Err(FilterError::UnknownField(key.to_string()))
        }
    }

    pub fn is_active(&self, key: &str) -> bool {
        self.active.contains(key)
    }

    /// Active fields in the order they were switched on
    pub fn active_fields(&self) -> impl Iterator<Item = &str> {
        self.active.iter().map(|s| s.as_str())
    }

    /// Switch a field on or off. Switching off also clears its values.
    pub fn set_active(&mut self, key: &str, active: bool) -> Result<(), FilterError> {
        self.ensure_declared(key)?;
        if active {
            self.active.insert(key.to_string());
        } else {
            self.active.shift_remove(key);
            if let Some(values) = self.values.get_mut(key) {
                values.clear();
            }
        }
        Ok(())
    }

    /// Flip a field's activation; returns the new state
    pub fn toggle(&mut self, key: &str) -> Result<bool, FilterError> {
        let active = !self.is_active(key);
        self.set_active(key, active)?;
        Ok(active)
    }

    /// Replace the values of a field
    pub fn set_values(&mut self, key: &str, values: Vec<String>) -> Result<(), FilterError> {
        self.ensure_declared(key)?;
        self.values.insert(key.to_string(), values);
        Ok(())
    }

    /// Replace the values of a field from comma separated text
    pub fn set_text(&mut self, key: &str, text: &str) -> Result<(), FilterError> {
        let values = if text.is_empty() {
            Vec::new()
        } else {
            text.split(',').map(|s| s.to_string()).collect()
        };
        self.set_values(key, values)
    }

    pub fn values(&self, key: &str) -> &[String] {
        self.values.get(key).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Values of a field rendered back as comma separated text
    pub fn text(&self, key: &str) -> String {
        self.values(key).join(",")
    }

    /// Deactivate every field and drop every value
    pub fn clear_all(&mut self) {
        self.active.clear();
        for values in self.values.values_mut() {
            values.clear();
        }
    }

    /// Whether any active field carries a non-empty value
    pub fn has_active_values(&self) -> bool {
        !self.snapshot().is_empty()
    }

    /// Filters to submit, in vocabulary order
    pub fn snapshot(&self) -> FilterSnapshot {
        FilterSnapshot::from_pairs(
            self.fields
                .iter()
                .filter(|f| self.active.contains(&f.key))
                .map(|f| (f.key.clone(), self.values(&f.key).to_vec())),
        )
    }
}
