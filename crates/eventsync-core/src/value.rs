#![forbid(unsafe_code)]

//! State tree node type with identity semantics.
//!
//! # Design
//!
//! [`Value`] is a JSON-shaped enum whose containers live behind `Rc`.
//! Cloning a value never copies a container: the clone points at the same
//! allocation, so two handles to one container are *the same* value in the
//! sense of [`Value::same`]. Writers produce new containers instead of
//! mutating existing ones, which lets untouched subtrees be shared between
//! successive versions of the state tree.
//!
//! # Two notions of equality
//!
//! | Operation       | Scalars        | Containers            |
//! |-----------------|----------------|-----------------------|
//! | [`Value::same`] | by value       | by pointer (`Rc`)     |
//! | `PartialEq`     | by value       | deep, element-wise    |
//!
//! Change detection uses [`Value::same`] only. A freshly built container
//! that is deep-equal to the stored one still counts as a change; putting
//! the stored `Rc` back does not.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::path;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// Key/value storage of an object node.
pub type Map = BTreeMap<String, Value>;

/// A node of the state tree.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Rc<Vec<Value>>),
    Object(Rc<Map>),
}

impl Value {
    /// A new, empty object node.
    #[must_use]
    pub fn object() -> Self {
        Self::Object(Rc::new(Map::new()))
    }

    /// A new, empty array node.
    #[must_use]
    pub fn array() -> Self {
        Self::Array(Rc::new(Vec::new()))
    }

    /// Identity comparison.
    ///
    /// Scalars compare by value, with `Int` and `Float` compared
    /// numerically. `NaN` is never the same as anything, itself included.
    /// Containers are the same only when they share an allocation.
    #[must_use]
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Int(a), Self::Float(b)) | (Self::Float(b), Self::Int(a)) => *a as f64 == *b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => Rc::ptr_eq(a, b),
            (Self::Object(a), Self::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Whether a path can descend into this node.
    #[must_use]
    pub fn is_container(&self) -> bool {
        matches!(self, Self::Array(_) | Self::Object(_))
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric view of `Int` and `Float` nodes.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(n) => Some(*n as f64),
            Self::Float(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Look up one path segment in this node.
    ///
    /// Objects are indexed by key, arrays by a canonical index segment (see
    /// [`path::parse_index`]). Scalars have no children.
    #[must_use]
    pub fn child(&self, segment: &str) -> Option<&Value> {
        match self {
            Self::Object(map) => map.get(segment),
            Self::Array(items) => path::parse_index(segment).and_then(|i| items.get(i)),
            _ => None,
        }
    }

    /// Short name of the variant, used in log fields.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) | Self::Float(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }

    /// Convert into a `serde_json::Value` (deep copy).
    ///
    /// Non-finite floats have no JSON form and become `null`.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::from(self)
    }
}

/// Identity comparison of two read results, where `None` is an absent slot.
///
/// Two absent slots are the same; an absent slot is never the same as a
/// present value, `Null` included.
#[must_use]
pub fn same(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.same(b),
        _ => false,
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(n) => serializer.serialize_i64(*n),
            Self::Float(n) => serializer.serialize_f64(*n),
            Self::String(s) => serializer.serialize_str(s),
            Self::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items.iter() {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Object(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map.iter() {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Int(i64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Self::Int(i64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        match i64::try_from(n) {
            Ok(n) => Self::Int(n),
            Err(_) => Self::Float(n as f64),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::Array(Rc::new(items))
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Self::Object(Rc::new(map))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Self::from(u)
                } else {
                    Self::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::from(items.into_iter().map(Self::from).collect::<Vec<_>>())
            }
            serde_json::Value::Object(map) => Self::from(
                map.into_iter()
                    .map(|(k, v)| (k, Self::from(v)))
                    .collect::<Map>(),
            ),
        }
    }
}

impl From<&Value> for serde_json::Value {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Int(n) => Self::from(*n),
            Value::Float(n) => serde_json::Number::from_f64(*n).map_or(Self::Null, Self::Number),
            Value::String(s) => Self::String(s.clone()),
            Value::Array(items) => Self::Array(items.iter().map(Self::from).collect()),
            Value::Object(map) => Self::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::from(v)))
                    .collect(),
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalars_same_by_value() {
        assert!(Value::from(1).same(&Value::from(1)));
        assert!(Value::from("a").same(&Value::from("a")));
        assert!(Value::Null.same(&Value::Null));
        assert!(!Value::from(1).same(&Value::from(2)));
        assert!(!Value::from(true).same(&Value::from(1)));
    }

    #[test]
    fn int_and_float_compare_numerically() {
        assert!(Value::Int(3).same(&Value::Float(3.0)));
        assert!(Value::Float(3.0).same(&Value::Int(3)));
        assert!(!Value::Int(3).same(&Value::Float(3.5)));
    }

    #[test]
    fn nan_is_never_same() {
        let nan = Value::Float(f64::NAN);
        assert!(!nan.same(&nan.clone()));
    }

    #[test]
    fn containers_same_by_identity() {
        let a = Value::from(json!({"x": 1}));
        let clone = a.clone();
        let rebuilt = Value::from(json!({"x": 1}));

        assert!(a.same(&clone));
        assert!(!a.same(&rebuilt));
        // Deep equality still holds.
        assert_eq!(a, rebuilt);
    }

    #[test]
    fn empty_containers_are_distinct() {
        assert!(!Value::object().same(&Value::object()));
        assert!(!Value::array().same(&Value::array()));
    }

    #[test]
    fn same_slot_handles_absent() {
        let v = Value::Null;
        assert!(same(None, None));
        assert!(!same(None, Some(&v)));
        assert!(!same(Some(&v), None));
        assert!(same(Some(&v), Some(&v)));
    }

    #[test]
    fn child_lookup() {
        let v = Value::from(json!({"list": [10, 20], "name": "x"}));
        let list = v.child("list").expect("list");
        assert_eq!(list.child("1"), Some(&Value::Int(20)));
        assert_eq!(list.child("2"), None);
        assert_eq!(list.child("first"), None);
        assert_eq!(list.child("+1"), None);
        assert_eq!(list.child("01"), None);
        assert_eq!(v.child("name").and_then(|n| n.child("0")), None);
    }

    #[test]
    fn json_conversion_preserves_shape() {
        let src = json!({"a": {"b": [1, 2.5, "s", null, true]}, "big": u64::MAX});
        let v = Value::from(src.clone());
        assert!(matches!(v.child("big"), Some(Value::Float(_))));
        assert_eq!(v.child("a").map(Value::to_json), src.get("a").cloned());
    }

    #[test]
    fn non_finite_float_serializes_as_null() {
        assert_eq!(Value::Float(f64::INFINITY).to_json(), json!(null));
    }

    #[test]
    fn serialize_matches_json() {
        let v = Value::from(json!({"user": {"name": "Alice"}, "counter": 0}));
        let text = serde_json::to_string(&v).expect("serialize");
        assert_eq!(text, r#"{"counter":0,"user":{"name":"Alice"}}"#);
        assert_eq!(v.to_string(), text);
    }

    #[test]
    fn option_conversion() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::from("x"));
    }

    #[test]
    fn kind_names() {
        assert_eq!(Value::object().kind(), "object");
        assert_eq!(Value::Float(1.0).kind(), "number");
        assert_eq!(Value::Null.kind(), "null");
    }
}
