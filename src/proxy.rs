/*
 * @file proxy.rs
 * @brief HTTP-to-HTTPS chat relay the device calls
 * @author Kevin Thomas
 * @date 2025
 *
 * MIT License
 *
 * Copyright (c) 2025 Kevin Thomas
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy
 * of this software and associated documentation files (the "Software"), to deal
 * in the Software without restriction, including without limitation the rights
 * to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
 * copies of the Software, and to permit persons to whom the Software is
 * furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in all
 * copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
 * FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
 * AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
 * LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
 * SOFTWARE.
 */

//! Chat proxy routes.
//!
//! The ESP32 speaks plain HTTP; the upstream chat API requires HTTPS and a
//! bearer token. These handlers bridge the two: `/chat` relays bodies
//! unmodified in both directions, `/health` answers unconditionally, and
//! `/test` fires a fixed probe at the upstream.

use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::ProxyConfig;
use crate::upstream;

/// Service name reported by the health route.
const SERVICE_NAME: &str = "voicebridge chat proxy";

/// User-Agent attached to relayed device requests.
const PROXY_USER_AGENT: &str = "voicebridge-proxy/1.0";

/// User-Agent attached to `/test` probe requests.
const PROBE_USER_AGENT: &str = "voicebridge-proxy-test/1.0";

/// Shared state handed to every handler.
///
/// # Details
/// Holds the one HTTP client and the immutable configuration. Handlers keep
/// no other state, so concurrent requests never coordinate.
#[derive(Clone)]
pub struct ProxyState {
    pub client: reqwest::Client,
    pub config: Arc<ProxyConfig>,
}

impl ProxyState {
    /// Creates the shared state from a loaded configuration.
    pub fn new(config: ProxyConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config: Arc::new(config),
        }
    }
}

/// Builds the proxy router with all three routes.
///
/// # Arguments
/// * `config` - The resolved proxy configuration.
///
/// # Returns
/// An axum [`Router`] ready to serve.
pub fn router(config: ProxyConfig) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/health", get(health))
        .route("/test", get(api_test))
        .with_state(ProxyState::new(config))
}

/// Relays a chat-completion request to the upstream API.
///
/// # Details
/// The body is forwarded byte-for-byte with the bearer header attached; no
/// parsing or validation happens here. A 200 reply is relayed verbatim, a
/// non-200 reply keeps its status with the upstream text embedded in an
/// error envelope, a timeout maps to 408, and any other transport failure
/// maps to 500.
///
/// # Arguments
/// * `state` - Shared client and configuration.
/// * `body` - The raw request body from the device.
///
/// # Returns
/// The relayed upstream response or an error envelope.
pub async fn chat(State(state): State<ProxyState>, body: Bytes) -> Response {
    info!(bytes = body.len(), "relaying chat request");
    let result = state
        .client
        .post(&state.config.api_url)
        .header(header::AUTHORIZATION, format!("Bearer {}", state.config.api_key))
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::USER_AGENT, PROXY_USER_AGENT)
        .timeout(state.config.upstream_timeout)
        .body(body)
        .send()
        .await;
    match result {
        Ok(response) => relay_upstream(response).await,
        Err(err) if err.is_timeout() => {
            warn!("chat upstream timed out");
            error_response(
                StatusCode::REQUEST_TIMEOUT,
                format!("chat upstream timed out: {}", err),
            )
        }
        Err(err) => {
            warn!("chat upstream request failed: {}", err);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("chat upstream request failed: {}", err),
            )
        }
    }
}

/// Health check. Answers regardless of upstream availability.
///
/// # Returns
/// `200 {"status":"ok","service":...}`.
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "service": SERVICE_NAME }))
}

/// Sends the fixed probe request upstream to validate reachability.
///
/// # Details
/// Unlike `/chat`, this route parses the upstream reply and wraps it in a
/// verdict envelope for the operator.
///
/// # Arguments
/// * `state` - Shared client and configuration.
///
/// # Returns
/// A success envelope wrapping the upstream JSON, or an error envelope
/// carrying the upstream status and body text.
pub async fn api_test(State(state): State<ProxyState>) -> Response {
    let request = upstream::probe_request();
    let result = upstream::send_chat(
        &state.client,
        &state.config.api_url,
        &state.config.api_key,
        PROBE_USER_AGENT,
        state.config.upstream_timeout,
        &request,
    )
    .await;
    let response = match result {
        Ok(response) => response,
        Err(err) => {
            warn!("chat upstream probe failed: {}", err);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "error",
                    "message": format!("chat upstream probe failed: {}", err),
                })),
            )
                .into_response();
        }
    };
    let status = response.status();
    if status == StatusCode::OK {
        match response.json::<serde_json::Value>().await {
            Ok(payload) => (
                StatusCode::OK,
                Json(json!({
                    "status": "success",
                    "message": "chat upstream reachable",
                    "response": payload,
                })),
            )
                .into_response(),
            Err(err) => error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("failed to decode chat upstream reply: {}", err),
            ),
        }
    } else {
        let text = response.text().await.unwrap_or_default();
        (
            status,
            Json(json!({
                "status": "error",
                "message": format!("chat upstream error: {}", status),
                "error": text,
            })),
        )
            .into_response()
    }
}

/// Converts an upstream reply into the device-facing response.
///
/// # Details
/// A 200 body is passed through untouched; anything else keeps the upstream
/// status with the body text folded into the error envelope.
async fn relay_upstream(response: reqwest::Response) -> Response {
    let status = response.status();
    if status == StatusCode::OK {
        match response.bytes().await {
            Ok(payload) => {
                info!(bytes = payload.len(), "chat upstream replied");
                (
                    StatusCode::OK,
                    [(header::CONTENT_TYPE, "application/json")],
                    payload,
                )
                    .into_response()
            }
            Err(err) => error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("failed to read chat upstream reply: {}", err),
            ),
        }
    } else {
        let text = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), "chat upstream returned an error");
        error_response(status, format!("chat upstream error: {} - {}", status, text))
    }
}

/// Builds the JSON error envelope shared by every failure path.
fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use std::time::Duration;

    fn state_for(api_url: String, timeout: Duration) -> ProxyState {
        ProxyState::new(ProxyConfig {
            api_url,
            api_key: "test-key".to_string(),
            bind_addr: "127.0.0.1:0".to_string(),
            upstream_timeout: timeout,
        })
    }

    async fn read_body(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read response body")
            .to_vec()
    }

    async fn read_json(response: Response) -> serde_json::Value {
        serde_json::from_slice(&read_body(response).await).expect("parse response json")
    }

    #[tokio::test]
    async fn chat_forwards_the_body_and_relays_success_verbatim() {
        let server = MockServer::start_async().await;
        let request_body = concat!(
            r#"{"model":"deepseek-chat","messages":[{"role":"user","content":"hi"}],"#,
            r#""max_tokens":10,"stream":false}"#,
        );
        let upstream_body = r#"{"choices":[{"message":{"content":"hello"}}]}"#;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .header("authorization", "Bearer test-key")
                    .header("content-type", "application/json")
                    .body(request_body);
                then.status(200)
                    .header("content-type", "application/json")
                    .body(upstream_body);
            })
            .await;

        let state = state_for(server.url("/v1/chat/completions"), Duration::from_secs(5));
        let response = chat(State(state), Bytes::from(request_body)).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_body(response).await, upstream_body.as_bytes());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn chat_maps_a_timeout_to_408() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/slow");
                then.status(200).body("{}").delay(Duration::from_millis(500));
            })
            .await;

        let state = state_for(server.url("/slow"), Duration::from_millis(50));
        let response = chat(State(state), Bytes::from_static(b"{}")).await;

        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
        let payload = read_json(response).await;
        assert!(!payload["error"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn chat_relays_an_upstream_error_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/limited");
                then.status(429).body("rate limited");
            })
            .await;

        let state = state_for(server.url("/limited"), Duration::from_secs(5));
        let response = chat(State(state), Bytes::from_static(b"{}")).await;

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let payload = read_json(response).await;
        assert!(payload["error"].as_str().unwrap().contains("rate limited"));
    }

    #[tokio::test]
    async fn chat_maps_a_connection_failure_to_500() {
        // Nothing listens on port 9 (discard); the connect fails immediately.
        let state = state_for("http://127.0.0.1:9/chat".to_string(), Duration::from_secs(2));
        let response = chat(State(state), Bytes::from_static(b"{}")).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let payload = read_json(response).await;
        assert!(!payload["error"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn health_answers_without_an_upstream() {
        let Json(payload) = health().await;
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["service"], SERVICE_NAME);
    }

    #[tokio::test]
    async fn test_route_wraps_the_probe_reply() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/probe")
                    .header("authorization", "Bearer test-key")
                    .json_body_partial(r#"{"model": "deepseek-chat", "stream": false}"#);
                then.status(200)
                    .header("content-type", "application/json")
                    .body(r#"{"choices":[{"message":{"role":"assistant","content":"hi"}}]}"#);
            })
            .await;

        let state = state_for(server.url("/probe"), Duration::from_secs(5));
        let response = api_test(State(state)).await;

        assert_eq!(response.status(), StatusCode::OK);
        let payload = read_json(response).await;
        assert_eq!(payload["status"], "success");
        assert!(payload["response"]["choices"].is_array());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_route_relays_a_probe_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/probe");
                then.status(401).body("bad key");
            })
            .await;

        let state = state_for(server.url("/probe"), Duration::from_secs(5));
        let response = api_test(State(state)).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let payload = read_json(response).await;
        assert_eq!(payload["status"], "error");
        assert!(payload["error"].as_str().unwrap().contains("bad key"));
    }
}
