//! Example demonstrating retry policies.
//!
//! This example shows how to:
//! - Combine retry predicates with AND/OR logic under a backoff schedule
//! - Write a policy as a closure over the attempt state
//! - Use the retrying executor directly, without a client
//!
//! Run with: `cargo run --example custom_retry`

use std::time::Duration;
use wirecall::retry::{
    execute_with_retry, AndPredicate, AttemptState, OrPredicate, RetryDecision,
    RetryOnConnectionError, RetryOnTimeout, RetryOptions,
};
use wirecall::{Client, Error, RetryPredicate, RetryStrategy};

/// Custom predicate: Only retry for the first N attempts
struct MaxAttempts(usize);

impl RetryPredicate for MaxAttempts {
    fn should_retry(&self, _error: &Error, attempt: usize) -> bool {
        attempt <= self.0
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("wirecall=info,custom_retry=info")
        .init();

    println!("=== Example 1: Combining Predicates ===");
    // Retry on (timeouts OR connection errors) AND only for the first 2 attempts
    let predicate = AndPredicate::new(vec![
        Box::new(OrPredicate::new(vec![
            Box::new(RetryOnTimeout),
            Box::new(RetryOnConnectionError),
        ])),
        Box::new(MaxAttempts(2)),
    ]);

    let client = Client::builder()
        .host("http://127.0.0.1:1")?
        .retry_strategy(RetryStrategy::ExponentialBackoff {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            max_retries: 5, // Strategy allows 5, but predicate limits to 2
            jitter: true,
        })
        .retry_predicate(Box::new(predicate))
        .build()?;

    match client.get("/anything").await {
        Ok(outcome) => println!("Unexpected response: {}", outcome.status()),
        Err(e) => println!("Gave up: {}", e),
    }
    println!();

    println!("=== Example 2: Closure Policy ===");
    let client = Client::builder()
        .host("http://127.0.0.1:1")?
        .retry_policy(|error: &Error, state: &AttemptState| {
            if error.is_retryable() && state.elapsed < Duration::from_secs(1) {
                RetryDecision::RetryAfter(Duration::from_millis(200))
            } else {
                RetryDecision::GiveUp
            }
        })
        .build()?;

    match client.get("/anything").await {
        Ok(outcome) => println!("Unexpected response: {}", outcome.status()),
        Err(e) => println!("Gave up within a second: {}", e),
    }
    println!();

    println!("=== Example 3: Executor Without a Client ===");
    let mut remaining = 2;
    let result: Result<&str, String> = execute_with_retry(
        move || {
            remaining -= 1;
            let outcome = if remaining > 0 {
                Err(format!("{} failures left", remaining))
            } else {
                Ok("done")
            };
            std::future::ready(outcome)
        },
        "local",
        &RetryOptions::default(),
        &|_: &String, _: &AttemptState| RetryDecision::Retry,
    )
    .await;
    println!("Result: {:?}", result);

    Ok(())
}
