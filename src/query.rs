//! Query string encoding for request parameters.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::case::to_snake;
use crate::tree::{to_iso_string, Node, Scalar};

/// Everything except the characters `encodeURIComponent` leaves alone.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Encodes query parameters into a `?`-prefixed query string.
///
/// Keys are snake_cased. Arrays expand into repeated `key=value` pairs, null
/// values (and null array elements) are skipped, dates render as ISO strings
/// and nested objects as compact JSON. Returns an empty string when nothing
/// remains, or when `params` is not an object.
///
/// # Examples
///
/// ```
/// use wirecall::query::encode_query;
/// use wirecall::Node;
/// use serde_json::json;
///
/// let params = Node::from(json!({"pageSize": 10, "tag": ["a b", "c"], "cursor": null}));
/// assert_eq!(encode_query(&params), "?page_size=10&tag=a%20b&tag=c");
/// ```
pub fn encode_query(params: &Node) -> String {
    let Some(map) = params.as_object() else {
        return String::new();
    };

    let mut pairs = Vec::new();
    for (key, value) in map {
        let key = encode(&to_snake(key));
        match value {
            Node::Array(items) => {
                for item in items {
                    if let Some(v) = render(item) {
                        pairs.push(format!("{}={}", key, encode(&v)));
                    }
                }
            }
            other => {
                if let Some(v) = render(other) {
                    pairs.push(format!("{}={}", key, encode(&v)));
                }
            }
        }
    }

    if pairs.is_empty() {
        String::new()
    } else {
        format!("?{}", pairs.join("&"))
    }
}

fn encode(s: &str) -> String {
    utf8_percent_encode(s, COMPONENT).to_string()
}

fn render(node: &Node) -> Option<String> {
    match node {
        Node::Scalar(Scalar::Null) => None,
        Node::Scalar(Scalar::Bool(b)) => Some(b.to_string()),
        Node::Scalar(Scalar::Number(n)) => Some(n.to_string()),
        Node::Scalar(Scalar::String(s)) => Some(s.clone()),
        Node::Scalar(Scalar::Date(d)) => Some(to_iso_string(d)),
        composite => Some(composite.to_json().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn test_empty_params() {
        assert_eq!(encode_query(&Node::from(json!({}))), "");
        assert_eq!(encode_query(&Node::from(json!({"a": null}))), "");
        assert_eq!(encode_query(&Node::string("nope")), "");
    }

    #[test]
    fn test_keys_are_snake_cased_and_encoded() {
        let q = encode_query(&Node::from(json!({"orgName": "a&b=c", "limit": 5, "active": true})));
        assert_eq!(q, "?org_name=a%26b%3Dc&limit=5&active=true");
    }

    #[test]
    fn test_arrays_repeat_and_skip_nulls() {
        let q = encode_query(&Node::from(json!({"id": [1, null, 3]})));
        assert_eq!(q, "?id=1&id=3");
    }

    #[test]
    fn test_unreserved_characters_survive() {
        let q = encode_query(&Node::from(json!({"q": "a-b_c.d!e~f*g'h(i)"})));
        assert_eq!(q, "?q=a-b_c.d!e~f*g'h(i)");
    }

    #[test]
    fn test_dates_render_as_iso() {
        let mut map = crate::tree::Object::new();
        map.insert(
            "since".to_string(),
            Node::date(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
        );
        assert_eq!(
            encode_query(&Node::Object(map)),
            "?since=2024-01-01T00%3A00%3A00.000Z"
        );
    }
}
