//! HTTP client tying transcoding, option merging, retries and classification
//! together.
//!
//! The [`Client`] type is the entry point generated API code calls into.
//! Use [`ClientBuilder`] to configure and create clients.

use crate::{
    headers::{parse_header, HeadersInit},
    mapper::to_wire_format,
    params::{merge_params, AbortSignal, Credentials, RedirectPolicy, ReferrerPolicy, RequestOptions},
    query::encode_query,
    request::RequestDescriptor,
    response::{handle_response, Outcome},
    retry::{execute_with_retry, Backoff, RetryOptions, RetryPolicy, RetryPredicate, RetryStrategy},
    Error, Result,
};
use http::{header, HeaderMap, Method};
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// The immutable configuration a [`Client`] is built from.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL every request path is appended to.
    pub host: Url,

    /// Options applied to every request: the transport defaults, the
    /// client-level options and the bearer token header, already merged.
    pub options: RequestOptions,

    /// Options for the retrying executor.
    pub retry_options: RetryOptions,
}

/// An HTTP client for generated API code.
///
/// The client is cheap to clone and meant to be shared; every clone uses the
/// same configuration and connection pools.
///
/// # Examples
///
/// ```no_run
/// use wirecall::{Client, Outcome, RetryStrategy};
/// use serde::{Deserialize, Serialize};
/// use std::time::Duration;
///
/// #[derive(Serialize)]
/// #[serde(rename_all = "camelCase")]
/// struct CreateOrg {
///     org_name: String,
/// }
///
/// #[derive(Deserialize)]
/// #[serde(rename_all = "camelCase")]
/// struct Org {
///     org_id: String,
///     org_name: String,
/// }
///
/// # async fn example() -> Result<(), wirecall::Error> {
/// let client = Client::builder()
///     .host("https://api.example.com")?
///     .token("secret")
///     .retry_strategy(RetryStrategy::ExponentialBackoff {
///         initial_delay: Duration::from_millis(100),
///         max_delay: Duration::from_secs(10),
///         max_retries: 3,
///         jitter: true,
///     })
///     .build()?;
///
/// let outcome = client
///     .post("/orgs", &CreateOrg { org_name: "acme".to_string() })
///     .await?;
///
/// match outcome {
///     Outcome::Success { .. } => {
///         let org: Org = outcome.into_result()?;
///         println!("Created {} ({})", org.org_name, org.org_id);
///     }
///     Outcome::ApiError { status, .. } => {
///         let body = outcome.error_body().unwrap_or_default();
///         eprintln!("{}: {} (request {})", status, body.message, body.request_id);
///     }
///     Outcome::ClientError { raw_text, .. } => eprintln!("Unreadable body: {}", raw_text),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ClientConfig,
    transports: Transports,
    retry_policy: Box<dyn RetryPolicy<Error>>,
}

/// One reqwest client per redirect policy, since reqwest fixes redirect
/// handling at client construction.
struct Transports {
    follow: reqwest::Client,
    error: reqwest::Client,
    manual: reqwest::Client,
}

impl Transports {
    fn new() -> Result<Self> {
        Ok(Self {
            follow: build_transport(RedirectPolicy::Follow)?,
            error: build_transport(RedirectPolicy::Error)?,
            manual: build_transport(RedirectPolicy::Manual)?,
        })
    }

    fn get(&self, policy: RedirectPolicy) -> &reqwest::Client {
        match policy {
            RedirectPolicy::Follow => &self.follow,
            RedirectPolicy::Error => &self.error,
            RedirectPolicy::Manual => &self.manual,
        }
    }
}

fn build_transport(policy: RedirectPolicy) -> Result<reqwest::Client> {
    let redirect = match policy {
        RedirectPolicy::Follow => reqwest::redirect::Policy::default(),
        RedirectPolicy::Manual => reqwest::redirect::Policy::none(),
        RedirectPolicy::Error => {
            reqwest::redirect::Policy::custom(|attempt| attempt.error("redirects are not allowed"))
        }
    };
    reqwest::Client::builder()
        .redirect(redirect)
        .referer(false)
        .build()
        .map_err(|e| Error::ConfigurationError(format!("Failed to build HTTP client: {}", e)))
}

/// A fully prepared request, sent once per attempt.
struct PreparedRequest<'a> {
    transport: &'a reqwest::Client,
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
    timeout: Option<Duration>,
    signal: Option<AbortSignal>,
}

impl PreparedRequest<'_> {
    async fn send(&self, attempt: usize) -> Result<reqwest::Response> {
        tracing::debug!(
            method = %self.method,
            url = %self.url,
            attempt = attempt,
            "Executing HTTP request"
        );

        let mut request = self
            .transport
            .request(self.method.clone(), self.url.clone())
            .headers(self.headers.clone());

        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        if let Some(body) = &self.body {
            request = request.body(body.clone());
        }

        abortable(self.signal.as_ref(), async { Ok(request.send().await?) }).await
    }
}

/// Races `work` against the abort signal, if there is one.
async fn abortable<T, F>(signal: Option<&AbortSignal>, work: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match signal {
        Some(signal) => tokio::select! {
            biased;
            _ = signal.aborted() => Err(Error::Aborted),
            result = work => result,
        },
        None => work.await,
    }
}

impl Client {
    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Performs a call and classifies its response.
    ///
    /// The client's options and the descriptor's options are merged, the
    /// query and body are converted to the wire format, and the request is
    /// sent through the retry policy. Transport failures that the policy
    /// gives up on are returned as `Err` unchanged; every response that
    /// arrives becomes an [`Outcome`].
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use wirecall::{Client, RequestDescriptor, RequestOptions};
    /// use http::Method;
    /// use serde_json::json;
    ///
    /// # async fn example() -> Result<(), wirecall::Error> {
    /// let client = Client::builder()
    ///     .host("https://api.example.com")?
    ///     .build()?;
    ///
    /// let descriptor = RequestDescriptor::new(Method::GET, "/orgs")
    ///     .with_query(&json!({"pageSize": 50, "tag": ["a", "b"]}))?
    ///     .with_options(RequestOptions::new().headers([("X-Request-Id", "abc")]));
    ///
    /// let outcome = client.execute(descriptor).await?;
    /// println!("Status: {}", outcome.status());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn execute(&self, descriptor: RequestDescriptor) -> Result<Outcome> {
        let start_time = Instant::now();
        let RequestDescriptor {
            method,
            path,
            query,
            body,
            options,
            host,
        } = descriptor;

        let options = merge_params(self.inner.config.options.clone(), options.unwrap_or_default())?;
        let host = host.unwrap_or_else(|| self.inner.config.host.clone());
        let url = self.build_url(&host, &path, query.as_ref())?;
        let headers = self.apply_policies(options.header_map()?, &options, &url);

        let body = body
            .map(|node| serde_json::to_vec(&to_wire_format(node)))
            .transpose()
            .map_err(|e| Error::SerializationFailed(e.to_string()))?;

        let prepared = PreparedRequest {
            transport: self.inner.transports.get(options.redirect.unwrap_or(RedirectPolicy::Follow)),
            method,
            url,
            headers,
            body,
            timeout: options.timeout,
            signal: options.signal,
        };

        let label = format!("{} {}", prepared.method, path);
        let request = &prepared;
        let mut attempt = 0;
        let response = execute_with_retry(
            move || {
                attempt += 1;
                request.send(attempt)
            },
            &label,
            &self.inner.config.retry_options,
            &*self.inner.retry_policy,
        )
        .await?;

        tracing::info!(
            status = response.status().as_u16(),
            latency_ms = start_time.elapsed().as_millis(),
            label = %label,
            "Received HTTP response"
        );

        abortable(prepared.signal.as_ref(), handle_response(response)).await
    }

    /// Performs a call and deserializes a successful response into `T`.
    ///
    /// # Errors
    ///
    /// Besides transport failures, returns [`Error::UnexpectedOutcome`] when
    /// the response is not a success and [`Error::DataMismatch`] when the
    /// data does not fit `T`.
    pub async fn call<T: DeserializeOwned>(&self, descriptor: RequestDescriptor) -> Result<T> {
        self.execute(descriptor).await?.into_result()
    }

    /// Makes a GET request to the specified path.
    pub async fn get(&self, path: impl Into<String>) -> Result<Outcome> {
        self.execute(RequestDescriptor::new(Method::GET, path)).await
    }

    /// Makes a POST request to the specified path with a JSON body.
    pub async fn post<B: Serialize + ?Sized>(&self, path: impl Into<String>, body: &B) -> Result<Outcome> {
        let descriptor = RequestDescriptor::new(Method::POST, path).with_body(body)?;
        self.execute(descriptor).await
    }

    /// Makes a PUT request to the specified path with a JSON body.
    pub async fn put<B: Serialize + ?Sized>(&self, path: impl Into<String>, body: &B) -> Result<Outcome> {
        let descriptor = RequestDescriptor::new(Method::PUT, path).with_body(body)?;
        self.execute(descriptor).await
    }

    /// Makes a PATCH request to the specified path with a JSON body.
    pub async fn patch<B: Serialize + ?Sized>(&self, path: impl Into<String>, body: &B) -> Result<Outcome> {
        let descriptor = RequestDescriptor::new(Method::PATCH, path).with_body(body)?;
        self.execute(descriptor).await
    }

    /// Makes a DELETE request to the specified path.
    pub async fn delete(&self, path: impl Into<String>) -> Result<Outcome> {
        self.execute(RequestDescriptor::new(Method::DELETE, path)).await
    }

    fn build_url(&self, host: &Url, path: &str, query: Option<&crate::Node>) -> Result<Url> {
        let query = query.map(encode_query).unwrap_or_default();
        let url = format!("{}{}{}", host.as_str().trim_end_matches('/'), path, query);
        Ok(Url::parse(&url)?)
    }

    /// Applies the credentials and referrer policies to the merged headers.
    ///
    /// The credentials mode governs ambient credentials (`Cookie`) only. An
    /// explicit `Authorization` header, including the bearer token, is always
    /// sent.
    fn apply_policies(&self, mut headers: HeaderMap, options: &RequestOptions, url: &Url) -> HeaderMap {
        let send_cookies = match options.credentials.unwrap_or(Credentials::SameOrigin) {
            Credentials::Include => true,
            Credentials::Omit => false,
            Credentials::SameOrigin => url.origin() == self.inner.config.host.origin(),
        };
        if !send_cookies {
            headers.remove(header::COOKIE);
        }
        if options.referrer_policy.unwrap_or(ReferrerPolicy::NoReferrer) == ReferrerPolicy::NoReferrer {
            headers.remove(header::REFERER);
        }
        headers
    }
}

/// Builder for configuring and creating a [`Client`].
///
/// # Examples
///
/// ```no_run
/// use wirecall::{ClientBuilder, RetryStrategy};
/// use std::time::Duration;
///
/// # fn example() -> Result<(), wirecall::Error> {
/// let client = ClientBuilder::new()
///     .host("https://api.example.com")?
///     .token("secret")
///     .timeout(Duration::from_secs(30))
///     .retry_strategy(RetryStrategy::Linear {
///         delay: Duration::from_millis(200),
///         max_retries: 2,
///     })
///     .default_header("User-Agent", "my-app/1.0")?
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    host: Option<Url>,
    token: Option<String>,
    options: RequestOptions,
    default_headers: HeaderMap,
    retry_strategy: RetryStrategy,
    retry_predicate: Option<Box<dyn RetryPredicate>>,
    retry_policy: Option<Box<dyn RetryPolicy<Error>>>,
    retry_options: RetryOptions,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            host: None,
            token: None,
            options: RequestOptions::new(),
            default_headers: HeaderMap::new(),
            retry_strategy: RetryStrategy::None,
            retry_predicate: None,
            retry_policy: None,
            retry_options: RetryOptions::default(),
        }
    }

    /// Sets the base URL for all requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn host(mut self, url: impl AsRef<str>) -> Result<Self> {
        self.host = Some(Url::parse(url.as_ref())?);
        Ok(self)
    }

    /// Sends `Authorization: Bearer <token>` with every request.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Adds a default header that will be included in all requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let (name, value) = parse_header(name.as_ref(), value.as_ref())?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Sets client-level request options, merged over the transport defaults.
    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets a per-request timeout forwarded to the transport.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    /// Sets the delay schedule used by the default [`Backoff`] policy.
    pub fn retry_strategy(mut self, strategy: RetryStrategy) -> Self {
        self.retry_strategy = strategy;
        self
    }

    /// Sets the predicate used by the default [`Backoff`] policy.
    ///
    /// By default, requests are retried based on `Error::is_retryable()`.
    pub fn retry_predicate(mut self, predicate: Box<dyn RetryPredicate>) -> Self {
        self.retry_predicate = Some(predicate);
        self
    }

    /// Replaces the retry policy entirely. Takes precedence over
    /// [`retry_strategy`](Self::retry_strategy) and
    /// [`retry_predicate`](Self::retry_predicate).
    pub fn retry_policy(mut self, policy: impl RetryPolicy<Error> + 'static) -> Self {
        self.retry_policy = Some(Box::new(policy));
        self
    }

    pub fn retry_options(mut self, options: RetryOptions) -> Self {
        self.retry_options = options;
        self
    }

    /// Builds the configured `Client`.
    ///
    /// # Errors
    ///
    /// Returns an error if no host was provided, if a header is invalid, or
    /// if the transport cannot be created.
    pub fn build(self) -> Result<Client> {
        let host = self
            .host
            .ok_or_else(|| Error::ConfigurationError("Host is required".to_string()))?;

        let mut client_layer = RequestOptions::new().headers(self.default_headers);
        if let Some(token) = &self.token {
            let (name, value) = parse_header("Authorization", &format!("Bearer {}", token))?;
            let mut auth = HeaderMap::new();
            auth.insert(name, value);
            client_layer = merge_params(client_layer, RequestOptions::new().headers(HeadersInit::Native(auth)))?;
        }
        let options = merge_params(
            merge_params(RequestOptions::base(), client_layer)?,
            self.options,
        )?;

        let retry_policy = match self.retry_policy {
            Some(policy) => policy,
            None => {
                let mut backoff = Backoff::new(self.retry_strategy);
                if let Some(predicate) = self.retry_predicate {
                    backoff = backoff.with_boxed_predicate(predicate);
                }
                Box::new(backoff) as Box<dyn RetryPolicy<Error>>
            }
        };

        Ok(Client {
            inner: Arc::new(ClientInner {
                config: ClientConfig {
                    host,
                    options,
                    retry_options: self.retry_options,
                },
                transports: Transports::new()?,
                retry_policy,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(token: Option<&str>) -> Client {
        let mut builder = Client::builder().host("https://api.example.com/v1").unwrap();
        if let Some(token) = token {
            builder = builder.token(token);
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_build_requires_host() {
        assert!(matches!(
            Client::builder().build(),
            Err(Error::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_config_carries_base_options_and_token() {
        let client = client(Some("t0k"));
        let options = &client.config().options;
        let headers = options.header_map().unwrap();

        assert_eq!(headers["content-type"], "application/json");
        assert_eq!(headers["authorization"], "Bearer t0k");
        assert_eq!(options.credentials, Some(Credentials::SameOrigin));
        assert_eq!(options.redirect, Some(RedirectPolicy::Follow));
        assert_eq!(options.referrer_policy, Some(ReferrerPolicy::NoReferrer));
    }

    #[test]
    fn test_build_url_keeps_host_path() {
        let client = client(None);
        let query = crate::Node::from(serde_json::json!({"pageSize": 2}));
        let url = client
            .build_url(&client.config().host, "/orgs", Some(&query))
            .unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1/orgs?page_size=2");
    }

    #[test]
    fn test_credentials_policies() {
        let client = Client::builder()
            .host("https://api.example.com/v1")
            .unwrap()
            .token("t0k")
            .default_header("Cookie", "session=1")
            .unwrap()
            .build()
            .unwrap();
        let same = Url::parse("https://api.example.com/v1/x").unwrap();
        let other = Url::parse("https://elsewhere.example.com/x").unwrap();
        let base = client.config().options.clone();

        let kept = client.apply_policies(base.header_map().unwrap(), &base, &same);
        assert!(kept.contains_key(header::COOKIE));
        assert!(kept.contains_key(header::AUTHORIZATION));

        let cross = client.apply_policies(base.header_map().unwrap(), &base, &other);
        assert!(!cross.contains_key(header::COOKIE));
        assert_eq!(cross[header::AUTHORIZATION], "Bearer t0k");

        let include = merge_params(base.clone(), RequestOptions::new().credentials(Credentials::Include)).unwrap();
        let kept = client.apply_policies(include.header_map().unwrap(), &include, &other);
        assert!(kept.contains_key(header::COOKIE));

        let omit = merge_params(base, RequestOptions::new().credentials(Credentials::Omit)).unwrap();
        let stripped = client.apply_policies(omit.header_map().unwrap(), &omit, &same);
        assert!(!stripped.contains_key(header::COOKIE));
        assert_eq!(stripped[header::AUTHORIZATION], "Bearer t0k");
    }
}
