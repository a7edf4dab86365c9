//! Speech service OAuth token check.
//!
//! The device exchanges its client credentials for an access token before it
//! can stream audio to the speech API. This module performs the same exchange
//! once so an operator can confirm the keys are live.

use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

use crate::config::{mask_secret, SpeechCredentials};

/// OAuth2 client-credentials token endpoint of the speech service.
pub const TOKEN_URL: &str = "https://aip.baidubce.com/oauth/2.0/token";

/// Deadline for the single token request.
const TOKEN_TIMEOUT: Duration = Duration::from_secs(15);

/// Decoded token endpoint reply.
///
/// The endpoint reports failures in-band through the `error` fields.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// Requests an access token with the client-credentials grant.
///
/// # Parameters
/// * `client` - The HTTP client to send with.
/// * `token_url` - The token endpoint.
/// * `api_key` - OAuth client id.
/// * `secret_key` - OAuth client secret.
///
/// # Returns
/// The raw response; the caller inspects status and body.
///
/// # Errors
/// Returns the transport error untouched.
pub async fn request_token(
    client: &reqwest::Client,
    token_url: &str,
    api_key: &str,
    secret_key: &str,
) -> Result<reqwest::Response, reqwest::Error> {
    let params = [
        ("grant_type", "client_credentials"),
        ("client_id", api_key),
        ("client_secret", secret_key),
    ];
    client
        .post(token_url)
        .form(&params)
        .timeout(TOKEN_TIMEOUT)
        .send()
        .await
}

/// Reports whether a decoded reply carries a usable token.
///
/// # Parameters
/// * `response` - The decoded token reply.
///
/// # Returns
/// `true` iff `access_token` is present and non-empty.
pub fn token_is_valid(response: &TokenResponse) -> bool {
    !response.access_token.is_empty()
}

/// Runs the full credential check, printing every step for inspection.
///
/// # Parameters
/// * `credentials` - The client credentials read from the environment.
///
/// # Returns
/// `true` when the endpoint granted a token, `false` otherwise. Transport
/// errors, non-200 statuses, undecodable bodies, and token-less replies all
/// count as failure.
pub async fn run_token_check(credentials: &SpeechCredentials) -> bool {
    println!("{}", "=".repeat(50));
    println!("Speech service token check");
    println!("{}", "=".repeat(50));
    if let Some(app_id) = &credentials.app_id {
        println!("App id:     {}", app_id);
    }
    println!("Api key:    {}", mask_secret(&credentials.api_key));
    println!("Secret key: {}", mask_secret(&credentials.secret_key));
    println!("Token url:  {}", TOKEN_URL);
    println!();
    println!("Requesting token...");

    let client = reqwest::Client::new();
    let response = match request_token(
        &client,
        TOKEN_URL,
        &credentials.api_key,
        &credentials.secret_key,
    )
    .await
    {
        Ok(response) => response,
        Err(err) => {
            println!("✗ Token request failed: {}", err);
            return false;
        }
    };

    let status = response.status();
    println!("Http status: {}", status);
    let body = match response.text().await {
        Ok(body) => body,
        Err(err) => {
            println!("✗ Failed to read token response: {}", err);
            return false;
        }
    };
    println!("Response length: {} bytes", body.len());

    if status != StatusCode::OK {
        println!("✗ Http error: {}", status);
        println!("Error body: {}", body);
        return false;
    }
    println!("Response body: {}", body);

    let token: TokenResponse = match serde_json::from_str(&body) {
        Ok(token) => token,
        Err(err) => {
            println!("✗ Failed to decode token response: {}", err);
            return false;
        }
    };

    if token_is_valid(&token) {
        println!();
        println!("✓ Access token granted");
        println!("Token:      {}", mask_secret(&token.access_token));
        println!("Expires in: {} seconds", token.expires_in);
        true
    } else {
        if let Some(error) = &token.error {
            println!("Error: {}", error);
        }
        if let Some(description) = &token.error_description {
            println!("Description: {}", description);
        }
        println!();
        println!("✗ Response is missing the access_token field");
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[test]
    fn token_validity_requires_a_non_empty_token() {
        let granted: TokenResponse =
            serde_json::from_str(r#"{"access_token":"24.abcdef0123456789","expires_in":2592000}"#)
                .expect("parse granted reply");
        assert!(token_is_valid(&granted));

        let rejected: TokenResponse = serde_json::from_str(
            r#"{"error":"invalid_client","error_description":"unknown client id"}"#,
        )
        .expect("parse rejected reply");
        assert!(!token_is_valid(&rejected));

        let empty: TokenResponse =
            serde_json::from_str(r#"{"access_token":""}"#).expect("parse empty token");
        assert!(!token_is_valid(&empty));
    }

    #[tokio::test]
    async fn request_token_sends_the_client_credentials_grant() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/oauth/2.0/token")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body_contains("grant_type=client_credentials")
                    .body_contains("client_id=key-123")
                    .body_contains("client_secret=secret-456");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(r#"{"access_token":"24.token","expires_in":2592000}"#);
            })
            .await;

        let client = reqwest::Client::new();
        let response = request_token(
            &client,
            &server.url("/oauth/2.0/token"),
            "key-123",
            "secret-456",
        )
        .await
        .expect("token request");

        assert_eq!(response.status(), StatusCode::OK);
        let token: TokenResponse = response.json().await.expect("decode token");
        assert!(token_is_valid(&token));
        assert_eq!(token.expires_in, 2592000);
        mock.assert_async().await;
    }
}
