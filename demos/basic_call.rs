//! Basic example demonstrating calls against a snake_case JSON API.
//!
//! This example shows how to:
//! - Create a client with a host and bearer token
//! - Send camelCase request bodies that go out as snake_case
//! - Tell success, service errors and malformed bodies apart
//! - Read typed data out of a successful outcome
//!
//! Run with: `cargo run --example basic_call`

use serde::{Deserialize, Serialize};
use wirecall::{Client, Error, Outcome};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)]
struct Post {
    user_id: u32,
    id: u32,
    title: String,
    body: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewPost {
    title: String,
    body: String,
    user_id: u32,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("wirecall=debug,basic_call=info")
        .init();

    let client = Client::builder()
        .host("https://jsonplaceholder.typicode.com")?
        .token("demo-token")
        .build()?;

    println!("=== GET Request Example ===");
    let outcome = client.get("/posts/1").await?;
    println!("Status code: {}", outcome.status());
    let post: Post = outcome.into_result()?;
    println!("Post ID: {}", post.id);
    println!("Title: {}", post.title);
    println!();

    println!("=== POST Request Example ===");
    let new_post = NewPost {
        title: "My New Post".to_string(),
        body: "This is the content of my new post!".to_string(),
        user_id: 1,
    };

    // Sent as {"title": ..., "body": ..., "user_id": 1}
    match client.post("/posts", &new_post).await? {
        Outcome::Success { status, data, .. } => {
            println!("Created ({}): {}", status, data.to_json());
        }
        outcome @ Outcome::ApiError { .. } => {
            let body = outcome.error_body().unwrap_or_default();
            println!("Service error: {} (request {})", body.message, body.request_id);
        }
        Outcome::ClientError { raw_text, error, .. } => {
            println!("Malformed body ({}): {}", error, raw_text);
        }
    }
    println!();

    println!("=== Service Error Example ===");
    let outcome = client.get("/posts/does-not-exist").await?;
    println!("Status code: {}", outcome.status());
    println!("Content-Type: {:?}", outcome.header("content-type"));

    Ok(())
}
