//! Chat-completion upstream client.
//!
//! This module holds the wire types the device and the proxy share and the
//! single outbound call everything else is built on.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Model the assistant firmware requests.
pub const DEFAULT_MODEL: &str = "deepseek-chat";

/// System prompt used by the fixed probe request.
const PROBE_SYSTEM_PROMPT: &str = "You are a helpful assistant";

/// One message in a chat-completion conversation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    /// Creates a system-role message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// Creates a user-role message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Request body for the chat-completion endpoint.
///
/// The field set matches what the firmware sends through the proxy:
/// `model`, `messages`, `max_tokens`, and `stream`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub stream: bool,
}

/// One completion choice returned by the upstream.
#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

/// Parsed chat-completion response, reduced to what the tools inspect.
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

/// Builds the fixed sample request used to probe upstream reachability.
///
/// # Returns
/// A [`ChatRequest`] with a short system/user exchange, a small token
/// budget, and streaming disabled.
pub fn probe_request() -> ChatRequest {
    ChatRequest {
        model: DEFAULT_MODEL.to_string(),
        messages: vec![
            ChatMessage::system(PROBE_SYSTEM_PROMPT),
            ChatMessage::user("Hello"),
        ],
        max_tokens: 50,
        stream: false,
    }
}

/// Sends a chat-completion request to the upstream API.
///
/// # Arguments
/// * `client` - The shared HTTP client.
/// * `api_url` - The chat-completion endpoint.
/// * `api_key` - Bearer credential for the `Authorization` header.
/// * `user_agent` - Caller identification sent upstream.
/// * `timeout` - Hard deadline for the whole exchange.
/// * `request` - The body to serialize and send.
///
/// # Returns
/// The raw [`reqwest::Response`]; callers decide how to read the body.
///
/// # Errors
/// Returns the transport error untouched so callers can distinguish
/// timeouts from connection failures.
pub async fn send_chat(
    client: &reqwest::Client,
    api_url: &str,
    api_key: &str,
    user_agent: &str,
    timeout: Duration,
    request: &ChatRequest,
) -> Result<reqwest::Response, reqwest::Error> {
    client
        .post(api_url)
        .header(AUTHORIZATION, format!("Bearer {}", api_key))
        .header(CONTENT_TYPE, "application/json")
        .header(USER_AGENT, user_agent)
        .timeout(timeout)
        .json(request)
        .send()
        .await
}

/// Pulls the assistant's reply text out of a parsed response.
///
/// # Arguments
/// * `response` - The decoded chat-completion response.
///
/// # Returns
/// * `Some(&str)` - The first choice's message content.
/// * `None` - The response carried no choices.
pub fn extract_reply(response: &ChatResponse) -> Option<&str> {
    response
        .choices
        .first()
        .map(|choice| choice.message.content.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_request_matches_the_device_shape() {
        let request = probe_request();
        let value = serde_json::to_value(&request).expect("serialize probe");
        assert_eq!(value["model"], DEFAULT_MODEL);
        assert_eq!(value["max_tokens"], 50);
        assert_eq!(value["stream"], false);
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["role"], "user");
        assert_eq!(value["messages"][1]["content"], "Hello");
    }

    #[test]
    fn extract_reply_reads_the_first_choice() {
        let response: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"hello"}}]}"#,
        )
        .expect("parse response");
        assert_eq!(extract_reply(&response), Some("hello"));
    }

    #[test]
    fn extract_reply_handles_missing_choices() {
        let response: ChatResponse = serde_json::from_str(r#"{"id":"x"}"#).expect("parse response");
        assert_eq!(extract_reply(&response), None);
    }

    #[test]
    fn response_parse_tolerates_missing_role() {
        let response: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":"hi"}}]}"#)
                .expect("parse response");
        assert_eq!(extract_reply(&response), Some("hi"));
    }
}
