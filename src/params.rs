//! Partial request configuration and its field-by-field merge.
//!
//! A call's effective options are built by layering the base options, the
//! client's options and the per-call overrides with [`merge_params`]. Later
//! layers win field by field, except for headers, which are unioned.

use http::HeaderMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::headers::{merge_headers, HeadersInit};
use crate::Result;

/// Whether ambient credentials (`Cookie`) travel with a request. An explicit
/// `Authorization` header is sent regardless.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credentials {
    /// Never send credentials.
    Omit,
    /// Send credentials only to the configured host's origin.
    SameOrigin,
    /// Always send credentials.
    Include,
}

/// How redirects are handled by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RedirectPolicy {
    /// Follow redirects (up to the transport's limit).
    Follow,
    /// Treat a redirect as a transport failure.
    Error,
    /// Return the redirect response as is.
    Manual,
}

/// Whether a `Referer` header may be sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferrerPolicy {
    /// Strip any `Referer` header.
    NoReferrer,
    /// Send a caller-provided `Referer` header unchanged.
    UnsafeUrl,
}

/// Cancellation handle passed through to the transport.
///
/// Cloning yields a handle to the same signal.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    token: CancellationToken,
}

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Aborts every request carrying this signal.
    pub fn abort(&self) {
        self.token.cancel();
    }

    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes once the signal is aborted.
    pub async fn aborted(&self) {
        self.token.cancelled().await
    }
}

impl From<CancellationToken> for AbortSignal {
    fn from(token: CancellationToken) -> Self {
        Self { token }
    }
}

/// A partial request configuration. Unset fields defer to earlier layers.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub headers: Option<HeadersInit>,
    pub credentials: Option<Credentials>,
    pub redirect: Option<RedirectPolicy>,
    pub referrer_policy: Option<ReferrerPolicy>,
    pub signal: Option<AbortSignal>,
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// The transport defaults every client starts from: same-origin
    /// credentials, a JSON content type, redirects followed, no referrer.
    pub fn base() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static("application/json"),
        );
        Self {
            headers: Some(HeadersInit::Native(headers)),
            credentials: Some(Credentials::SameOrigin),
            redirect: Some(RedirectPolicy::Follow),
            referrer_policy: Some(ReferrerPolicy::NoReferrer),
            signal: None,
            timeout: None,
        }
    }

    pub fn headers(mut self, headers: impl Into<HeadersInit>) -> Self {
        self.headers = Some(headers.into());
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn redirect(mut self, redirect: RedirectPolicy) -> Self {
        self.redirect = Some(redirect);
        self
    }

    pub fn referrer_policy(mut self, policy: ReferrerPolicy) -> Self {
        self.referrer_policy = Some(policy);
        self
    }

    pub fn signal(mut self, signal: AbortSignal) -> Self {
        self.signal = Some(signal);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The headers normalized into a native collection, empty when unset.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::ConfigurationError`] for an invalid header.
    pub fn header_map(&self) -> Result<HeaderMap> {
        match &self.headers {
            Some(headers) => headers.clone().into_header_map(),
            None => Ok(HeaderMap::new()),
        }
    }
}

/// Merges two partial configurations, `overrides` taking precedence.
///
/// Headers from both sides are normalized and unioned, with `overrides`
/// winning per (case-insensitive) name. The result always carries a native
/// header collection, empty if neither side had headers.
///
/// # Errors
///
/// Returns [`crate::Error::ConfigurationError`] if either side holds an
/// invalid header.
///
/// # Examples
///
/// ```
/// use wirecall::params::{merge_params, RequestOptions};
///
/// let merged = merge_params(
///     RequestOptions::new().headers([("Content-Type", "x")]),
///     RequestOptions::new().headers([("content-type", "y")]),
/// )?;
/// assert_eq!(merged.header_map()?["content-type"], "y");
/// # Ok::<(), wirecall::Error>(())
/// ```
pub fn merge_params(base: RequestOptions, overrides: RequestOptions) -> Result<RequestOptions> {
    let headers = merge_headers(base.header_map()?, overrides.header_map()?);
    Ok(RequestOptions {
        headers: Some(HeadersInit::Native(headers)),
        credentials: overrides.credentials.or(base.credentials),
        redirect: overrides.redirect.or(base.redirect),
        referrer_policy: overrides.referrer_policy.or(base.referrer_policy),
        signal: overrides.signal.or(base.signal),
        timeout: overrides.timeout.or(base.timeout),
    })
}
