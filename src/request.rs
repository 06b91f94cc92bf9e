//! Per-call request description.

use http::Method;
use serde::Serialize;
use url::Url;

use crate::params::RequestOptions;
use crate::tree::Node;
use crate::Result;

/// Everything a single call needs beyond the client's own configuration.
///
/// Query and body are kept in the in-memory format; the client converts them
/// to the wire format when the request is sent.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    /// The HTTP method (GET, POST, etc.).
    pub method: Method,

    /// The request path, appended to the host.
    pub path: String,

    /// Query parameters, as an object tree.
    pub query: Option<Node>,

    /// The request body.
    pub body: Option<Node>,

    /// Per-call overrides, merged over the client's options.
    pub options: Option<RequestOptions>,

    /// Sends this call to another host than the configured one.
    pub host: Option<Url>,
}

impl RequestDescriptor {
    /// Creates a new `RequestDescriptor` with the given method and path.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            body: None,
            options: None,
            host: None,
        }
    }

    /// Sets the query parameters from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be represented as JSON.
    pub fn with_query<Q: Serialize + ?Sized>(mut self, query: &Q) -> Result<Self> {
        self.query = Some(Node::from_serialize(query)?);
        Ok(self)
    }

    /// Sets the body from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be represented as JSON.
    pub fn with_body<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        self.body = Some(Node::from_serialize(body)?);
        Ok(self)
    }

    /// Sets the body from an already built tree (which may hold dates).
    pub fn with_body_node(mut self, body: Node) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = Some(options);
        self
    }

    pub fn with_host(mut self, host: Url) -> Self {
        self.host = Some(host);
        self
    }
}

impl Default for RequestDescriptor {
    fn default() -> Self {
        Self::new(Method::GET, "")
    }
}
