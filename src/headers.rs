//! Header collections and their case-insensitive union.

use http::{HeaderMap, HeaderName, HeaderValue};
use std::collections::BTreeMap;

use crate::{Error, Result};

/// Headers in any of the representations a caller may hand over.
///
/// All three normalize to the same canonical [`HeaderMap`].
#[derive(Debug, Clone)]
pub enum HeadersInit {
    /// A plain name-to-value mapping.
    Map(BTreeMap<String, String>),
    /// A native header collection.
    Native(HeaderMap),
    /// An ordered list of `(name, value)` pairs. Repeated names keep every value.
    Pairs(Vec<(String, String)>),
}

impl HeadersInit {
    /// Normalizes into a canonical header collection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigurationError`] for an invalid header name or value.
    pub fn into_header_map(self) -> Result<HeaderMap> {
        match self {
            HeadersInit::Native(map) => Ok(map),
            HeadersInit::Map(map) => collect_pairs(map),
            HeadersInit::Pairs(pairs) => collect_pairs(pairs),
        }
    }
}

fn collect_pairs<I, N, V>(pairs: I) -> Result<HeaderMap>
where
    I: IntoIterator<Item = (N, V)>,
    N: AsRef<str>,
    V: AsRef<str>,
{
    let mut map = HeaderMap::new();
    for (name, value) in pairs {
        let (name, value) = parse_header(name.as_ref(), value.as_ref())?;
        map.append(name, value);
    }
    Ok(map)
}

/// Validates a header name and value.
pub(crate) fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue)> {
    let name = HeaderName::try_from(name)
        .map_err(|e| Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
    let value = HeaderValue::try_from(value)
        .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
    Ok((name, value))
}

/// Unions two header collections. For every name present in `overrides`, all
/// of its values replace whatever `base` had under that name.
pub fn merge_headers(mut base: HeaderMap, overrides: HeaderMap) -> HeaderMap {
    let mut current: Option<HeaderName> = None;
    for (name, value) in overrides {
        // `HeaderMap::into_iter` yields the name only for the first value of each run.
        if let Some(name) = name {
            base.remove(&name);
            current = Some(name);
        }
        if let Some(name) = &current {
            base.append(name.clone(), value);
        }
    }
    base
}

impl From<HeaderMap> for HeadersInit {
    fn from(map: HeaderMap) -> Self {
        HeadersInit::Native(map)
    }
}

impl From<BTreeMap<String, String>> for HeadersInit {
    fn from(map: BTreeMap<String, String>) -> Self {
        HeadersInit::Map(map)
    }
}

impl From<std::collections::HashMap<String, String>> for HeadersInit {
    fn from(map: std::collections::HashMap<String, String>) -> Self {
        HeadersInit::Map(map.into_iter().collect())
    }
}

impl From<Vec<(String, String)>> for HeadersInit {
    fn from(pairs: Vec<(String, String)>) -> Self {
        HeadersInit::Pairs(pairs)
    }
}

impl<const N: usize> From<[(&str, &str); N]> for HeadersInit {
    fn from(pairs: [(&str, &str); N]) -> Self {
        HeadersInit::Pairs(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}
