//! # Wirecall - runtime for generated JSON API clients
//!
//! Wirecall is the small library generated API clients embed to talk to a
//! JSON-over-HTTP service whose wire convention (snake_case keys, ISO-8601
//! date strings) differs from the in-memory one (camelCase keys, native
//! dates). It is built on top of `reqwest`.
//!
//! ## Quick Start
//!
//! ```no_run
//! use wirecall::{Client, RetryStrategy};
//! use serde::Deserialize;
//! use std::time::Duration;
//!
//! #[derive(Deserialize)]
//! #[serde(rename_all = "camelCase")]
//! struct Org {
//!     org_name: String,
//!     time_created: chrono::DateTime<chrono::Utc>,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), wirecall::Error> {
//!     let client = Client::builder()
//!         .host("https://api.example.com")?
//!         .token("secret")
//!         .retry_strategy(RetryStrategy::ExponentialBackoff {
//!             initial_delay: Duration::from_millis(100),
//!             max_delay: Duration::from_secs(10),
//!             max_retries: 3,
//!             jitter: true,
//!         })
//!         .build()?;
//!
//!     // `{"org_name": ..., "time_created": "2024-01-01T00:00:00.000Z"}` on the wire
//!     let org: Org = client.get("/orgs/acme").await?.into_result()?;
//!     println!("{} created at {}", org.org_name, org.time_created);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Wire transcoding** - recursive snake_case/camelCase key conversion and
//!   key-driven date parsing over arbitrary JSON trees ([`mapper`])
//! - **Option merging** - layered request options with case-insensitive header
//!   union ([`params`])
//! - **Pluggable retries** - a policy-agnostic retry loop ([`retry`])
//! - **Typed outcomes** - every response becomes [`Outcome::Success`],
//!   [`Outcome::ApiError`] or [`Outcome::ClientError`] ([`response`])
//! - **Automatic logging** - structured logging with `tracing`
//!
//! ## Outcomes
//!
//! Transport failures are errors; anything the server sends back is an
//! outcome:
//!
//! ```no_run
//! use wirecall::{Client, Error, Outcome};
//!
//! # async fn example() -> Result<(), Error> {
//! # let client = Client::builder().host("https://api.example.com")?.build()?;
//! match client.delete("/orgs/acme").await? {
//!     Outcome::Success { status, .. } => println!("Deleted ({})", status),
//!     outcome @ Outcome::ApiError { .. } => {
//!         let body = outcome.error_body().unwrap_or_default();
//!         eprintln!("{:?}: {}", body.error_code, body.message);
//!     }
//!     Outcome::ClientError { raw_text, error, .. } => {
//!         eprintln!("Malformed body ({}): {}", error, raw_text);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod case;
mod client;
pub mod date;
mod error;
pub mod headers;
pub mod mapper;
pub mod params;
pub mod query;
mod request;
pub mod response;
pub mod retry;
pub mod tree;

pub use client::{Client, ClientBuilder, ClientConfig};
pub use error::{Error, Result};
pub use headers::HeadersInit;
pub use mapper::{from_wire_format, to_wire_format};
pub use params::{merge_params, AbortSignal, RequestOptions};
pub use request::RequestDescriptor;
pub use response::{handle_response, ErrorBody, Outcome};
pub use retry::{execute_with_retry, RetryDecision, RetryPolicy, RetryPredicate, RetryStrategy};
pub use tree::{Node, Scalar};
