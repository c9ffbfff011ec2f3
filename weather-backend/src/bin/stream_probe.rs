//! Stream Probe
//!
//! A minimal harness for watching the /predict SSE stream without a browser.
//!
//! Usage:
//!   PROBE_INTRODUCTION="I am visiting Paris next week." \
//!   PROBE_CITY="Paris" \
//!   cargo run --bin stream_probe

use serde_json::json;
use std::env;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let url = env::var("PROBE_URL").unwrap_or_else(|_| "http://localhost:8080/predict".to_string());
    let introduction = env::var("PROBE_INTRODUCTION")
        .unwrap_or_else(|_| "I am visiting Paris next week.".to_string());
    let city = env::var("PROBE_CITY").unwrap_or_else(|_| "Paris".to_string());

    println!("POST {}", url);
    println!("  introduction: {}", introduction);
    println!("  city: {}", city);
    println!();

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(120))
        .build()?;

    let mut response = client
        .post(&url)
        .json(&json!({ "introduction": introduction, "city": city }))
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        eprintln!("Request failed with {}: {}", status, body);
        std::process::exit(1);
    }

    while let Some(chunk) = response.chunk().await? {
        print!("{}", String::from_utf8_lossy(&chunk));
    }

    Ok(())
}
