//! Query strings and serialization options.
//!
//! # Design
//! `Query` is backed by a `BTreeMap`, so keys always serialize in sorted
//! order. Keys and values are percent-encoded strictly (everything except
//! `A-Z a-z 0-9 - _ . ~`). Null values never reach the wire.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Options applied to a query map or JSON body before it is serialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SerializationOptions {
    /// Drop keys whose value is an empty string.
    pub strip_empty_strings: bool,
}

impl SerializationOptions {
    pub fn strip_empty_strings() -> Self {
        Self {
            strip_empty_strings: true,
        }
    }
}

/// A single query value. Absent values are represented as `Null`.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    String(String),
    Number(Number),
    Bool(bool),
    Null,
}

impl QueryValue {
    /// JavaScript-style truthiness, used when building form bodies.
    pub fn is_truthy(&self) -> bool {
        match self {
            QueryValue::String(s) => !s.is_empty(),
            QueryValue::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
            QueryValue::Bool(b) => *b,
            QueryValue::Null => false,
        }
    }
}

impl fmt::Display for QueryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryValue::String(s) => f.write_str(s),
            QueryValue::Number(n) => write!(f, "{}", normalize_number(n)),
            QueryValue::Bool(b) => write!(f, "{b}"),
            QueryValue::Null => f.write_str("null"),
        }
    }
}

impl From<&str> for QueryValue {
    fn from(s: &str) -> Self {
        QueryValue::String(s.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(s: String) -> Self {
        QueryValue::String(s)
    }
}

impl From<bool> for QueryValue {
    fn from(b: bool) -> Self {
        QueryValue::Bool(b)
    }
}

macro_rules! query_value_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for QueryValue {
                fn from(n: $t) -> Self {
                    QueryValue::Number(Number::from(n))
                }
            }
        )*
    };
}

query_value_from_int!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize);

impl From<f64> for QueryValue {
    fn from(n: f64) -> Self {
        match Number::from_f64(n) {
            Some(n) => QueryValue::Number(n),
            None => QueryValue::String(n.to_string()),
        }
    }
}

impl<T: Into<QueryValue>> From<Option<T>> for QueryValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(QueryValue::Null, Into::into)
    }
}

/// Mapping of query keys to values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query(BTreeMap<String, QueryValue>);

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chainable insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<QueryValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &QueryValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries that survive serialization under `options`.
    pub fn retained(&self, options: SerializationOptions) -> impl Iterator<Item = (&str, &QueryValue)> {
        self.iter().filter(move |(_, v)| match v {
            QueryValue::Null => false,
            QueryValue::String(s) if options.strip_empty_strings => !s.is_empty(),
            _ => true,
        })
    }
}

impl<K: Into<String>, V: Into<QueryValue>> FromIterator<(K, V)> for Query {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut query = Query::new();
        for (k, v) in iter {
            query.insert(k, v);
        }
        query
    }
}

/// Serialize a query map to `a=1&b=2` form, without the leading `?`.
pub fn stringify_query(query: &Query, options: SerializationOptions) -> String {
    query
        .retained(options)
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(&v.to_string())))
        .collect::<Vec<_>>()
        .join("&")
}

/// Apply `options` to a JSON payload.
///
/// Arrays are walked element by element; objects lose their empty-string
/// entries when `strip_empty_strings` is set. Nested object values are left
/// as they are.
pub fn apply_serialization_options(value: &Value, options: SerializationOptions) -> Value {
    match value {
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| apply_serialization_options(item, options))
                .collect(),
        ),
        Value::Object(map) if options.strip_empty_strings => Value::Object(
            map.iter()
                .filter(|(_, v)| v.as_str() != Some(""))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Rewrite finite whole-number floats as integers throughout `value`, so
/// `1.0` serializes as `1`.
pub fn normalize_numbers(value: Value) -> Value {
    match value {
        Value::Number(n) => Value::Number(normalize_number(&n)),
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_numbers).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, normalize_numbers(v)))
                .collect(),
        ),
        other => other,
    }
}

// Beyond 2^53 an f64 no longer maps to a unique integer.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

fn normalize_number(n: &Number) -> Number {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < MAX_SAFE_INTEGER => {
            Number::from(f as i64)
        }
        _ => n.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn whole_floats_lose_their_fraction() {
        let query = Query::new().with("n", 1.0).with("m", -3.0).with("h", 2.5);
        assert_eq!(stringify_query(&query, SerializationOptions::default()), "h=2.5&m=-3&n=1");
    }

    #[test]
    fn normalize_numbers_walks_nested_values() {
        let value = json!({"a": 1.0, "b": [2.0, 0.25], "c": {"d": -0.0}, "e": 7});
        assert_eq!(
            normalize_numbers(value),
            json!({"a": 1, "b": [2, 0.25], "c": {"d": 0}, "e": 7})
        );
    }

    #[test]
    fn keeps_empty_strings_by_default() {
        let query = Query::new().with("bar", 1).with("baz", "");
        assert_eq!(stringify_query(&query, SerializationOptions::default()), "bar=1&baz=");
    }

    #[test]
    fn strips_empty_strings_when_asked() {
        let query = Query::new().with("bar", 1).with("baz", "");
        assert_eq!(
            stringify_query(&query, SerializationOptions::strip_empty_strings()),
            "bar=1"
        );
    }

    #[test]
    fn omits_null_and_absent_values() {
        let query = Query::new()
            .with("a", QueryValue::Null)
            .with("b", Option::<&str>::None)
            .with("c", Some(true));
        assert_eq!(stringify_query(&query, SerializationOptions::default()), "c=true");
    }

    #[test]
    fn sorts_keys_and_encodes_strictly() {
        let query: Query = [("z", "last"), ("a", "x y&z"), ("m!", "(1)")]
            .into_iter()
            .collect();
        assert_eq!(
            stringify_query(&query, SerializationOptions::default()),
            "a=x%20y%26z&m%21=%281%29&z=last"
        );
    }

    #[test]
    fn numbers_and_bools_render_plainly() {
        let query = Query::new().with("n", 2.5).with("i", -3).with("e", false);
        assert_eq!(stringify_query(&query, SerializationOptions::default()), "e=false&i=-3&n=2.5");
    }

    #[test]
    fn truthiness_matches_form_rules() {
        assert!(QueryValue::from("x").is_truthy());
        assert!(!QueryValue::from("").is_truthy());
        assert!(!QueryValue::from(0).is_truthy());
        assert!(QueryValue::from(7).is_truthy());
        assert!(!QueryValue::from(false).is_truthy());
        assert!(!QueryValue::Null.is_truthy());
    }

    #[test]
    fn strips_empty_strings_from_objects_in_arrays() {
        let body = json!([{"a": "", "b": 1}, "", {"c": ""}]);
        assert_eq!(
            apply_serialization_options(&body, SerializationOptions::strip_empty_strings()),
            json!([{"b": 1}, "", {}])
        );
    }

    #[test]
    fn leaves_nested_objects_alone() {
        let body = json!({"keep": {"inner": ""}, "drop": ""});
        assert_eq!(
            apply_serialization_options(&body, SerializationOptions::strip_empty_strings()),
            json!({"keep": {"inner": ""}})
        );
    }

    #[test]
    fn default_options_are_identity() {
        let body = json!({"a": "", "b": [1, 2]});
        assert_eq!(apply_serialization_options(&body, SerializationOptions::default()), body);
    }

    #[test]
    fn options_deserialize_from_camel_case() {
        let opts: SerializationOptions = serde_json::from_str(r#"{"stripEmptyStrings":true}"#).unwrap();
        assert!(opts.strip_empty_strings);
        let opts: SerializationOptions = serde_json::from_str("{}").unwrap();
        assert!(!opts.strip_empty_strings);
    }
}
