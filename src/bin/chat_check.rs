//! Chat-completion credential check.
//!
//! Sends the upstream API the same request shape the device sends through
//! the proxy, printing the full exchange so an operator can confirm the key
//! and the network path before flashing anything.

use anyhow::Result;
use reqwest::StatusCode;
use std::time::Duration;

use voicebridge::config::{self, mask_secret};
use voicebridge::upstream;

/// Well-known endpoint for the pre-flight connectivity probe.
const CONNECTIVITY_PROBE_URL: &str = "http://httpbin.org/get";

/// Deadline for the connectivity probe.
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Deadline for the chat request, matching what the proxy uses.
const CHAT_TIMEOUT: Duration = Duration::from_secs(30);

/// User-Agent identifying this check upstream.
const CHECK_USER_AGENT: &str = "voicebridge-check/1.0";

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    println!("{}", "=".repeat(60));
    println!("Chat-completion API check");
    println!("{}", "=".repeat(60));

    let client = reqwest::Client::new();
    check_basic_connectivity(&client).await;
    check_chat_api(&client).await?;

    println!();
    println!("{}", "=".repeat(60));
    println!("Check complete");
    println!("{}", "=".repeat(60));
    Ok(())
}

/// Plain-HTTP pre-flight before the authenticated call.
async fn check_basic_connectivity(client: &reqwest::Client) {
    println!();
    println!("Checking basic http connectivity...");
    match client
        .get(CONNECTIVITY_PROBE_URL)
        .timeout(PROBE_TIMEOUT)
        .send()
        .await
    {
        Ok(response) => {
            let status = response.status();
            let length = response.bytes().await.map(|body| body.len()).unwrap_or(0);
            println!("Http status: {}", status);
            println!("Content length: {} bytes", length);
            if status == StatusCode::OK {
                println!("✓ Http connectivity ok");
            } else {
                println!("✗ Http probe returned an error status");
            }
        }
        Err(err) => println!("✗ Http probe failed: {}", err),
    }
}

/// Sends the probe chat request and reports the outcome in detail.
async fn check_chat_api(client: &reqwest::Client) -> Result<()> {
    let app = config::load_app_config();
    let api_url = config::chat_api_url(&app);
    let api_key = config::chat_api_key()?;

    println!();
    println!("Checking the chat-completion endpoint...");
    println!("Api url: {}", api_url);
    println!("Api key: {}", mask_secret(&api_key));

    let request = upstream::probe_request();
    println!();
    println!("Sending request:");
    println!("{}", serde_json::to_string_pretty(&request)?);

    let result = upstream::send_chat(
        client,
        &api_url,
        &api_key,
        CHECK_USER_AGENT,
        CHAT_TIMEOUT,
        &request,
    )
    .await;
    match result {
        Ok(response) => report_chat_response(response).await,
        Err(err) if err.is_timeout() => println!("✗ Request timed out: {}", err),
        Err(err) if err.is_connect() => println!("✗ Connection error: {}", err),
        Err(err) => println!("✗ Request failed: {}", err),
    }
    Ok(())
}

/// Prints status, headers, and body, then the assistant reply if present.
async fn report_chat_response(response: reqwest::Response) {
    let status = response.status();
    println!();
    println!("Response status: {}", status);
    println!("Response headers:");
    for (name, value) in response.headers() {
        println!("  {}: {}", name, value.to_str().unwrap_or("<binary>"));
    }

    let body = match response.text().await {
        Ok(body) => body,
        Err(err) => {
            println!("✗ Failed to read response body: {}", err);
            return;
        }
    };
    println!("Content length: {} bytes", body.len());

    if status != StatusCode::OK {
        println!("✗ Request failed");
        println!("Error: {}", body);
        return;
    }
    println!("✓ Request succeeded");

    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(value) => {
            println!(
                "Response: {}",
                serde_json::to_string_pretty(&value).unwrap_or_else(|_| body.clone())
            );
            match serde_json::from_value::<upstream::ChatResponse>(value) {
                Ok(parsed) => match upstream::extract_reply(&parsed) {
                    Some(reply) => println!("Assistant reply: {}", reply),
                    None => println!("⚠ Response contained no choices"),
                },
                Err(err) => println!("✗ Unexpected response shape: {}", err),
            }
        }
        Err(err) => println!("✗ Failed to decode response JSON: {}", err),
    }
}
