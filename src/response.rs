//! Classification of raw transport responses into typed outcomes.
//!
//! [`handle_response`] reads the body once, parses it as JSON, converts it to
//! the in-memory format and tags the result as [`Outcome::Success`],
//! [`Outcome::ApiError`] or [`Outcome::ClientError`]. Nothing here validates
//! the body against a schema: the data is handed over as an untyped [`Node`],
//! and typed views are opt-in.

use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use std::future::Future;

use crate::mapper::from_wire_format;
use crate::tree::Node;
use crate::{Error, Result};

/// A transport response whose body has not been read yet.
pub trait RawResponse: Send {
    fn status(&self) -> StatusCode;

    fn headers(&self) -> &HeaderMap;

    /// Reads the full body as text. Consumes the response, so the body can
    /// only be read once.
    fn text(self) -> impl Future<Output = Result<String>> + Send;
}

impl RawResponse for reqwest::Response {
    fn status(&self) -> StatusCode {
        reqwest::Response::status(self)
    }

    fn headers(&self) -> &HeaderMap {
        reqwest::Response::headers(self)
    }

    fn text(self) -> impl Future<Output = Result<String>> + Send {
        async move { reqwest::Response::text(self).await.map_err(Error::from) }
    }
}

/// The classified result of a call.
///
/// # Examples
///
/// ```
/// use wirecall::response::{ErrorBody, Outcome};
/// use wirecall::Node;
/// use http::{HeaderMap, StatusCode};
/// use serde_json::json;
///
/// let outcome = Outcome::ApiError {
///     status: StatusCode::NOT_FOUND,
///     headers: HeaderMap::new(),
///     data: Node::from(json!({"message": "no such org", "requestId": "req_1"})),
/// };
///
/// let body = outcome.error_body().unwrap();
/// assert_eq!(body.message, "no such org");
/// assert_eq!(body.error_code, None);
/// ```
#[derive(Debug)]
pub enum Outcome {
    /// A 2xx response whose body parsed (an empty body reads as `{}`).
    Success {
        status: StatusCode,
        headers: HeaderMap,
        data: Node,
    },

    /// A non-2xx response whose body parsed. `data` is expected to follow the
    /// [`ErrorBody`] envelope but is not checked.
    ApiError {
        status: StatusCode,
        headers: HeaderMap,
        data: Node,
    },

    /// A response whose body was not valid JSON, whatever its status.
    ClientError {
        status: StatusCode,
        headers: HeaderMap,
        /// The body exactly as received.
        raw_text: String,
        error: serde_json::Error,
    },
}

impl Outcome {
    pub fn status(&self) -> StatusCode {
        match self {
            Outcome::Success { status, .. }
            | Outcome::ApiError { status, .. }
            | Outcome::ClientError { status, .. } => *status,
        }
    }

    pub fn headers(&self) -> &HeaderMap {
        match self {
            Outcome::Success { headers, .. }
            | Outcome::ApiError { headers, .. }
            | Outcome::ClientError { headers, .. } => headers,
        }
    }

    /// Returns a header value by name, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers().get(name)?.to_str().ok()
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    /// The parsed body of a `Success` or `ApiError`.
    pub fn data(&self) -> Option<&Node> {
        match self {
            Outcome::Success { data, .. } | Outcome::ApiError { data, .. } => Some(data),
            Outcome::ClientError { .. } => None,
        }
    }

    /// The body of an `ApiError` viewed as the service's error envelope.
    pub fn error_body(&self) -> Option<ErrorBody> {
        match self {
            Outcome::ApiError { data, .. } => Some(ErrorBody::from_node(data)),
            _ => None,
        }
    }

    /// Deserializes the data of a `Success` into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedOutcome`] for `ApiError` and `ClientError`,
    /// and [`Error::DataMismatch`] if the data does not fit `T`.
    pub fn into_result<T: DeserializeOwned>(self) -> Result<T> {
        match self {
            Outcome::Success { data, .. } => data.deserialize_into().map_err(Error::DataMismatch),
            other => Err(Error::UnexpectedOutcome {
                status: other.status(),
            }),
        }
    }
}

/// The service's error envelope, after key conversion.
///
/// Built leniently: missing or mistyped fields read as `None` or empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorBody {
    pub error_code: Option<String>,
    pub message: String,
    pub request_id: String,
}

impl ErrorBody {
    /// Reads the envelope out of an in-memory (camelCase) tree.
    pub fn from_node(node: &Node) -> Self {
        let text = |key: &str| node.get(key).and_then(Node::as_str).map(str::to_string);
        Self {
            error_code: text("errorCode"),
            message: text("message").unwrap_or_default(),
            request_id: text("requestId").unwrap_or_default(),
        }
    }
}

/// Classifies a raw response.
///
/// 1. The body is read as text, once.
/// 2. Empty text stands for an empty object.
/// 3. Otherwise the text is parsed as JSON; on failure the result is
///    [`Outcome::ClientError`] carrying the text verbatim.
/// 4. Parsed data is converted with [`from_wire_format`].
/// 5. A non-2xx status gives [`Outcome::ApiError`], anything else
///    [`Outcome::Success`].
///
/// # Errors
///
/// Only a failure to read the body is an error; it is a transport failure.
pub async fn handle_response<R: RawResponse>(response: R) -> Result<Outcome> {
    let status = response.status();
    let headers = response.headers().clone();
    let raw_text = response.text().await?;

    let parsed = if raw_text.is_empty() {
        Node::empty_object()
    } else {
        match serde_json::from_str::<serde_json::Value>(&raw_text) {
            Ok(value) => Node::from(value),
            Err(error) => {
                tracing::error!(
                    status = status.as_u16(),
                    error = %error,
                    raw_response = %raw_text,
                    "Failed to parse response body"
                );
                return Ok(Outcome::ClientError {
                    status,
                    headers,
                    raw_text,
                    error,
                });
            }
        }
    };

    let data = from_wire_format(parsed);

    if status.is_success() {
        Ok(Outcome::Success {
            status,
            headers,
            data,
        })
    } else {
        if status.is_client_error() {
            tracing::warn!(status = status.as_u16(), "Client error (4xx)");
        } else if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), "Server error (5xx)");
        }
        Ok(Outcome::ApiError {
            status,
            headers,
            data,
        })
    }
}

/// An in-memory response, used where no transport is involved.
#[derive(Debug, Clone)]
pub struct BufferedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl BufferedResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }
}

impl RawResponse for BufferedResponse {
    fn status(&self) -> StatusCode {
        self.status
    }

    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn text(self) -> impl Future<Output = Result<String>> + Send {
        std::future::ready(Ok(self.body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[tokio::test]
    async fn test_empty_body_is_empty_object() {
        for code in [200, 204] {
            let status = StatusCode::from_u16(code).unwrap();
            let outcome = handle_response(BufferedResponse::new(status, "")).await.unwrap();
            match outcome {
                Outcome::Success { data, .. } => assert_eq!(data, Node::empty_object()),
                other => panic!("expected success, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_client_error() {
        let outcome = handle_response(BufferedResponse::new(StatusCode::OK, "not json"))
            .await
            .unwrap();
        match outcome {
            Outcome::ClientError {
                raw_text, error, ..
            } => {
                assert_eq!(raw_text, "not json");
                assert!(error.is_syntax());
            }
            other => panic!("expected client error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_status_decides_between_success_and_api_error() {
        let body = r#"{"error_code":"bad_input","message":"nope","request_id":"req_9"}"#;

        let outcome = handle_response(BufferedResponse::new(StatusCode::BAD_REQUEST, body))
            .await
            .unwrap();
        assert_eq!(
            outcome.error_body(),
            Some(ErrorBody {
                error_code: Some("bad_input".to_string()),
                message: "nope".to_string(),
                request_id: "req_9".to_string(),
            })
        );

        let outcome = handle_response(BufferedResponse::new(StatusCode::OK, body))
            .await
            .unwrap();
        assert!(outcome.is_success());
        assert_eq!(
            outcome.data().unwrap().to_json(),
            json!({"errorCode": "bad_input", "message": "nope", "requestId": "req_9"})
        );
    }

    #[tokio::test]
    async fn test_api_error_shape_is_not_validated() {
        let outcome = handle_response(BufferedResponse::new(StatusCode::BAD_GATEWAY, "[1,2]"))
            .await
            .unwrap();
        assert!(matches!(outcome, Outcome::ApiError { .. }));
        assert_eq!(outcome.error_body(), Some(ErrorBody::default()));
    }

    #[tokio::test]
    async fn test_into_result() {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Org {
            org_name: String,
            time_created: String,
        }

        let body = r#"{"org_name":"acme","time_created":"2024-01-01T00:00:00.123456Z"}"#;
        let outcome = handle_response(BufferedResponse::new(StatusCode::OK, body))
            .await
            .unwrap();
        let org: Org = outcome.into_result().unwrap();
        assert_eq!(org.org_name, "acme");
        assert_eq!(org.time_created, "2024-01-01T00:00:00.123Z");

        let outcome = handle_response(BufferedResponse::new(StatusCode::CONFLICT, "{}"))
            .await
            .unwrap();
        assert!(matches!(
            outcome.into_result::<Org>(),
            Err(Error::UnexpectedOutcome { status }) if status == StatusCode::CONFLICT
        ));
    }
}
