//! The JSON-shaped tree that transcoding operates on.
//!
//! [`Node`] mirrors `serde_json::Value` but splits composites from scalars and
//! adds a native date scalar, so the in-memory format can carry
//! `DateTime<Utc>` values that render back to ISO-8601 strings on the wire.

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use serde_json::Number;

/// An insertion-ordered object node.
pub type Object = IndexMap<String, Node>;

/// A node of a JSON-shaped tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// A mapping from string keys to nodes, in insertion order.
    Object(Object),
    /// An ordered sequence of nodes.
    Array(Vec<Node>),
    /// A leaf value.
    Scalar(Scalar),
}

/// A leaf of a JSON-shaped tree.
///
/// Dates are scalars even though they have internal structure; the tree mapper
/// never descends into them.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Date(DateTime<Utc>),
}

impl Node {
    /// An empty object node.
    pub fn empty_object() -> Self {
        Node::Object(Object::new())
    }

    /// Shorthand for a string scalar.
    pub fn string(s: impl Into<String>) -> Self {
        Node::Scalar(Scalar::String(s.into()))
    }

    /// Shorthand for a date scalar.
    pub fn date(d: DateTime<Utc>) -> Self {
        Node::Scalar(Scalar::Date(d))
    }

    /// Converts any serializable value into a tree.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::SerializationFailed`] if the value cannot be
    /// represented as JSON (for example a map with non-string keys).
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> crate::Result<Self> {
        serde_json::to_value(value)
            .map(Node::from)
            .map_err(|e| crate::Error::SerializationFailed(e.to_string()))
    }

    /// Deserializes the tree into a typed value.
    ///
    /// Dates are presented to the deserializer as ISO-8601 strings, which
    /// `chrono`'s serde support and plain `String` fields both accept.
    pub fn deserialize_into<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.to_json())
    }

    /// Renders the tree as a `serde_json::Value`, turning dates into strings.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Node::Object(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Node::Array(items) => {
                serde_json::Value::Array(items.iter().map(Node::to_json).collect())
            }
            Node::Scalar(scalar) => scalar.to_json(),
        }
    }

    /// Returns `true` for object and array nodes.
    pub fn is_composite(&self) -> bool {
        !matches!(self, Node::Scalar(_))
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Node::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Node]> {
        match self {
            Node::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::Scalar(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<&DateTime<Utc>> {
        match self {
            Node::Scalar(Scalar::Date(d)) => Some(d),
            _ => None,
        }
    }

    /// Looks up a key when this node is an object.
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.as_object()?.get(key)
    }
}

impl Scalar {
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Scalar::Null => serde_json::Value::Null,
            Scalar::Bool(b) => serde_json::Value::Bool(*b),
            Scalar::Number(n) => serde_json::Value::Number(n.clone()),
            Scalar::String(s) => serde_json::Value::String(s.clone()),
            Scalar::Date(d) => serde_json::Value::String(to_iso_string(d)),
        }
    }
}

/// Formats a date the way the wire expects it: UTC, millisecond precision,
/// `Z` suffix.
pub fn to_iso_string(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl From<serde_json::Value> for Node {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Node::Scalar(Scalar::Null),
            serde_json::Value::Bool(b) => Node::Scalar(Scalar::Bool(b)),
            serde_json::Value::Number(n) => Node::Scalar(Scalar::Number(n)),
            serde_json::Value::String(s) => Node::Scalar(Scalar::String(s)),
            serde_json::Value::Array(items) => {
                Node::Array(items.into_iter().map(Node::from).collect())
            }
            serde_json::Value::Object(map) => {
                Node::Object(map.into_iter().map(|(k, v)| (k, Node::from(v))).collect())
            }
        }
    }
}

impl From<Scalar> for Node {
    fn from(scalar: Scalar) -> Self {
        Node::Scalar(scalar)
    }
}

impl From<Object> for Node {
    fn from(map: Object) -> Self {
        Node::Object(map)
    }
}

impl From<Vec<Node>> for Node {
    fn from(items: Vec<Node>) -> Self {
        Node::Array(items)
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Node::Object(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
            Node::Array(items) => {
                let mut out = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    out.serialize_element(item)?;
                }
                out.end()
            }
            Node::Scalar(scalar) => scalar.serialize(serializer),
        }
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Scalar::Null => serializer.serialize_unit(),
            Scalar::Bool(b) => serializer.serialize_bool(*b),
            Scalar::Number(n) => n.serialize(serializer),
            Scalar::String(s) => serializer.serialize_str(s),
            Scalar::Date(d) => serializer.serialize_str(&to_iso_string(d)),
        }
    }
}
