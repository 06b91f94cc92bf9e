//! Recursive key and value rewriting over [`Node`] trees.
//!
//! [`TreeMapper`] pairs a key function with a value function and applies them
//! to every level of a tree. The value function always receives the original
//! (wire) key, since date detection is keyed off the wire name.
//!
//! ```
//! use wirecall::mapper::{from_wire_format, to_wire_format};
//! use wirecall::Node;
//! use serde_json::json;
//!
//! let wire = to_wire_format(Node::from(json!({"orgName": "acme", "seatCount": 3})));
//! assert_eq!(wire.to_json(), json!({"org_name": "acme", "seat_count": 3}));
//!
//! let back = from_wire_format(wire);
//! assert_eq!(back.to_json(), json!({"orgName": "acme", "seatCount": 3}));
//! ```

use crate::case::{to_camel, to_snake};
use crate::date;
use crate::tree::{Node, Object, Scalar};

/// A key function and a value function applied across a whole tree.
pub struct TreeMapper<K, V> {
    key_fn: K,
    value_fn: V,
}

impl<K, V> TreeMapper<K, V>
where
    K: Fn(&str, &Node) -> String,
    V: Fn(&str, Scalar) -> Scalar,
{
    pub fn new(key_fn: K, value_fn: V) -> Self {
        Self { key_fn, value_fn }
    }

    /// Rewrites `node`, returning a freshly built tree.
    ///
    /// Node kinds never change. When two keys of one object map to the same
    /// new key, the later value wins and keeps the earlier position.
    pub fn map(&self, node: Node) -> Node {
        match node {
            Node::Scalar(scalar) => Node::Scalar((self.value_fn)("", scalar)),
            Node::Array(items) => Node::Array(items.into_iter().map(|n| self.map(n)).collect()),
            Node::Object(map) => {
                let mut out = Object::with_capacity(map.len());
                for (key, value) in map {
                    let new_key = (self.key_fn)(&key, &value);
                    let new_value = match value {
                        Node::Scalar(scalar) => Node::Scalar((self.value_fn)(&key, scalar)),
                        composite => self.map(composite),
                    };
                    out.insert(new_key, new_value);
                }
                Node::Object(out)
            }
        }
    }
}

/// Converts an in-memory tree to the wire format: snake_case keys, values
/// untouched. Dates become ISO strings when the tree is serialized.
pub fn to_wire_format(node: Node) -> Node {
    TreeMapper::new(|key: &str, _: &Node| to_snake(key), |_: &str, v: Scalar| v).map(node)
}

/// Converts a wire tree to the in-memory format: camelCase keys, and strings
/// under temporal keys parsed into dates where possible.
pub fn from_wire_format(node: Node) -> Node {
    TreeMapper::new(|key: &str, _: &Node| to_camel(key), date::maybe_parse).map(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use std::cell::RefCell;

    #[test]
    fn test_nested_objects_and_arrays() {
        let wire = Node::from(json!({
            "org_name": "acme",
            "members": [
                {"user_id": 1, "display_name": "Ada"},
                {"user_id": 2, "display_name": "Grace"}
            ],
            "ipv4_block": {"cidr_range": "10.0.0.0/8"}
        }));

        let mapped = from_wire_format(wire);

        assert_eq!(
            mapped.to_json(),
            json!({
                "orgName": "acme",
                "members": [
                    {"userId": 1, "displayName": "Ada"},
                    {"userId": 2, "displayName": "Grace"}
                ],
                "ipv4Block": {"cidrRange": "10.0.0.0/8"}
            })
        );
    }

    #[test]
    fn test_value_fn_sees_original_key() {
        let seen = RefCell::new(Vec::new());
        let mapper = TreeMapper::new(
            |key: &str, _: &Node| to_camel(key),
            |key: &str, v: Scalar| {
                seen.borrow_mut().push(key.to_string());
                v
            },
        );

        mapper.map(Node::from(json!({"time_created": "x", "nested": {"org_id": 1}})));

        assert_eq!(*seen.borrow(), vec!["time_created", "org_id"]);
    }

    #[test]
    fn test_dates_parsed_only_under_temporal_keys() {
        let mapped = from_wire_format(Node::from(json!({
            "time_created": "2024-03-01T12:00:00.5Z",
            "comment": "2024-03-01T12:00:00.5Z",
            "expiration": "never"
        })));

        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
            + chrono::Duration::milliseconds(500);
        assert_eq!(mapped.get("timeCreated").and_then(Node::as_date), Some(&expected));
        assert_eq!(
            mapped.get("comment").and_then(Node::as_str),
            Some("2024-03-01T12:00:00.5Z")
        );
        assert_eq!(mapped.get("expiration").and_then(Node::as_str), Some("never"));
    }

    #[test]
    fn test_top_level_scalars_and_arrays() {
        assert_eq!(from_wire_format(Node::string("a_b")), Node::string("a_b"));

        let mapped = from_wire_format(Node::from(json!([{"a_b": 1}, 2, null])));
        assert_eq!(mapped.to_json(), json!([{"aB": 1}, 2, null]));
    }

    #[test]
    fn test_round_trip() {
        let original = Node::from(json!({
            "orgName": "acme",
            "requestId": "req_123",
            "ipv4Block": ["10.0.0.1", "10.0.0.2"],
            "settings": {"isEnabled": true, "maxSeats": 25, "notes": null}
        }));

        let back = from_wire_format(to_wire_format(original.clone()));
        assert_eq!(back, original);
    }

    #[test]
    fn test_round_trip_with_dates() {
        let when = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        let mut map = Object::new();
        map.insert("timeCreated".to_string(), Node::date(when));

        let wire_text = serde_json::to_string(&to_wire_format(Node::Object(map.clone()))).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&wire_text).unwrap();
        assert_eq!(from_wire_format(Node::from(parsed)), Node::Object(map));
    }

    #[test]
    fn test_key_collision_last_write_wins() {
        let mapped = to_wire_format(Node::from(json!({"a_b": 1, "aB": 2, "c": 3})));
        let map = mapped.as_object().unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.get_index(0).map(|(k, _)| k.as_str()), Some("a_b"));
        assert_eq!(map.get("a_b").unwrap().to_json(), json!(2));
    }
}
