//! Typed attribute bag attached to observations
//!
//! Attributes carry caller-supplied metadata. Values are stored as JSON
//! values, but the typed accessors are strict: an integer is never read
//! back as a float and a float is never read back as an integer.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::hash_map::{IntoIter, Iter};
use std::collections::HashMap;

/// String-keyed metadata map with typed setters and getters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(HashMap<String, Value>);

impl Attributes {
    /// Create an empty attribute bag
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    /// Set an arbitrary JSON-convertible value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn set_string(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), Value::String(value.into()));
    }

    pub fn set_int(&mut self, key: impl Into<String>, value: i32) {
        self.0.insert(key.into(), Value::from(value));
    }

    pub fn set_i64(&mut self, key: impl Into<String>, value: i64) {
        self.0.insert(key.into(), Value::from(value));
    }

    /// Set a float value. Non-finite floats are stored as JSON null.
    pub fn set_f64(&mut self, key: impl Into<String>, value: f64) {
        self.0.insert(key.into(), Value::from(value));
    }

    pub fn set_bool(&mut self, key: impl Into<String>, value: bool) {
        self.0.insert(key.into(), Value::Bool(value));
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Raw value lookup
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Integer lookup; `None` for floats, strings, or values outside `i32`
    pub fn get_int(&self, key: &str) -> Option<i32> {
        self.get_i64(key).and_then(|v| i32::try_from(v).ok())
    }

    /// Integer lookup; `None` for floats and strings
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.0.get(key).and_then(Value::as_i64)
    }

    /// Float lookup; `None` for integers and strings
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        match self.0.get(key) {
            Some(Value::Number(n)) if n.is_f64() => n.as_f64(),
            _ => None,
        }
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(Value::as_bool)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> Iter<'_, String, Value> {
        self.0.iter()
    }

    /// Merge `other` into `self`; keys in `other` win on collision
    pub fn merge(&mut self, other: &Attributes) {
        for (k, v) in &other.0 {
            self.0.insert(k.clone(), v.clone());
        }
    }

    /// Independent deep copy
    pub fn copy(&self) -> Attributes {
        self.clone()
    }

    /// Borrow the underlying map
    pub fn as_map(&self) -> &HashMap<String, Value> {
        &self.0
    }

    pub fn into_inner(self) -> HashMap<String, Value> {
        self.0
    }
}

impl From<HashMap<String, Value>> for Attributes {
    fn from(map: HashMap<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl IntoIterator for Attributes {
    type Item = (String, Value);
    type IntoIter = IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Attributes {
    type Item = (&'a String, &'a Value);
    type IntoIter = Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_set_get() {
        let mut attrs = Attributes::new();
        attrs.set_string("agent", "default");
        attrs.set_int("retries", 3);
        attrs.set_i64("bytes", 5_000_000_000);
        attrs.set_f64("temperature", 0.7);
        attrs.set_bool("streaming", true);

        assert_eq!(attrs.get_string("agent"), Some("default"));
        assert_eq!(attrs.get_int("retries"), Some(3));
        assert_eq!(attrs.get_i64("bytes"), Some(5_000_000_000));
        assert_eq!(attrs.get_f64("temperature"), Some(0.7));
        assert_eq!(attrs.get_bool("streaming"), Some(true));
        assert_eq!(attrs.len(), 5);
    }

    #[test]
    fn test_getters_do_not_coerce() {
        let mut attrs = Attributes::new();
        attrs.set_f64("ratio", 3.0);
        attrs.set_int("count", 3);
        attrs.set_string("text", "3");

        assert_eq!(attrs.get_int("ratio"), None);
        assert_eq!(attrs.get_f64("count"), None);
        assert_eq!(attrs.get_int("text"), None);
        assert_eq!(attrs.get_bool("count"), None);
        assert_eq!(attrs.get_string("missing"), None);
    }

    #[test]
    fn test_get_int_out_of_range() {
        let mut attrs = Attributes::new();
        attrs.set_i64("big", i64::from(i32::MAX) + 1);
        assert_eq!(attrs.get_int("big"), None);
        assert!(attrs.get_i64("big").is_some());
    }

    #[test]
    fn test_merge_overwrites() {
        let mut base = Attributes::new().with("model", "gpt-4").with("keep", 1);
        let other = Attributes::new().with("model", "custom").with("extra", true);

        base.merge(&other);

        assert_eq!(base.get_string("model"), Some("custom"));
        assert_eq!(base.get_int("keep"), Some(1));
        assert_eq!(base.get_bool("extra"), Some(true));
    }

    #[test]
    fn test_copy_is_independent() {
        let mut original = Attributes::new();
        original.set("nested", serde_json::json!({"a": [1, 2]}));

        let mut copy = original.copy();
        copy.set_string("added", "x");
        if let Some(Value::Object(obj)) = copy.0.get_mut("nested") {
            obj.insert("b".to_string(), Value::Bool(true));
        }

        assert!(!original.contains_key("added"));
        assert_eq!(original.get("nested"), Some(&serde_json::json!({"a": [1, 2]})));
    }

    #[test]
    fn test_serde_transparent() {
        let attrs: Attributes = [("a", 1)].into_iter().collect();
        let json = serde_json::to_string(&attrs).unwrap();
        assert_eq!(json, r#"{"a":1}"#);
    }
}
