//! State handed to page and view runs.
//!
//! Only names on the source's whitelist are ever copied from the referrer's
//! query string or the triggering row, so an authenticated page run never
//! sees parameters the action didn't ask for.

use crate::host::Row;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use url::Url;

/// Ordered map of state variable name to scalar value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateMapping(BTreeMap<String, Value>);

impl StateMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intersects `whitelist` with the referrer's query parameters and the
    /// row's fields. Row values win over query values.
    pub fn from_whitelist<'a>(
        whitelist: impl IntoIterator<Item = &'a str>,
        referrer: Option<&Url>,
        row: Option<&Row>,
    ) -> Self {
        let whitelist: Vec<&str> = whitelist.into_iter().collect();
        let mut state = Self::new();
        if let Some(referrer) = referrer {
            for (name, value) in referrer.query_pairs() {
                if whitelist.contains(&&*name) {
                    state.insert(name.into_owned(), Value::String(value.into_owned()));
                }
            }
        }
        if let Some(row) = row {
            for name in &whitelist {
                if let Some(value) = row.get(*name) {
                    state.insert(*name, value.clone());
                }
            }
        }
        state
    }

    /// Uses an already-evaluated mapping as is. Nested values are dropped.
    pub fn explicit(values: impl IntoIterator<Item = (String, Value)>) -> Self {
        let mut state = Self::new();
        for (name, value) in values {
            state.insert(name, value);
        }
        state
    }

    /// Sets `name`, ignoring arrays and objects.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        if matches!(value, Value::Array(_) | Value::Object(_)) {
            tracing::debug!(%name, "Skipping non-scalar state value");
            return;
        }
        self.0.insert(name, value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_whitelist_excludes_other_query_parameters() {
        let referrer = Url::parse("https://app.test/page/invoice?id=5&secret=9").unwrap();
        let state = StateMapping::from_whitelist(["id"], Some(&referrer), None);
        assert_eq!(state.len(), 1);
        assert_eq!(state.get("id"), Some(&json!("5")));
        assert_eq!(state.get("secret"), None);
    }

    #[test]
    fn test_row_overrides_query() {
        let referrer = Url::parse("https://app.test/page/invoice?id=5&tab=lines").unwrap();
        let row = row(json!({"id": 42, "total": 10.5}));
        let state = StateMapping::from_whitelist(["id", "tab"], Some(&referrer), Some(&row));
        assert_eq!(state.get("id"), Some(&json!(42)));
        assert_eq!(state.get("tab"), Some(&json!("lines")));
        assert_eq!(state.get("total"), None);
    }

    #[test]
    fn test_empty_whitelist_yields_empty_state() {
        let referrer = Url::parse("https://app.test/?id=5").unwrap();
        let row = row(json!({"id": 42}));
        assert!(StateMapping::from_whitelist([], Some(&referrer), Some(&row)).is_empty());
    }

    #[test]
    fn test_explicit_mapping_keeps_scalars_only() {
        let state = StateMapping::explicit(row(json!({"id": 7, "tags": ["a"], "draft": false})));
        assert_eq!(state.iter().map(|(k, _)| k).collect::<Vec<_>>(), vec!["draft", "id"]);
    }
}
