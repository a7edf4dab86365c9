/*
 * @file config.rs
 * @brief Environment and file-backed configuration loading
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

//! Runtime configuration for the proxy and the check scripts.
//!
//! Non-secret defaults come from `config.json` with baked fallbacks; every
//! value can be overridden through the environment. Credentials are read from
//! the environment only and are never written to or read from the config file.

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::{env, fs, time::Duration};

/// Path to the JSON configuration file that holds runtime defaults.
const CONFIG_PATH: &str = "config.json";

/// Default upstream chat-completion endpoint when no config exists.
const FALLBACK_API_URL: &str = "https://api.deepseek.com/v1/chat/completions";

/// Default proxy listen address. All interfaces, so the device can reach it.
const FALLBACK_BIND_ADDR: &str = "0.0.0.0:5000";

/// Default serial device the diagnostic uses to reach the ESP32-S3.
const FALLBACK_SERIAL_PORT: &str = "COM5";

/// Default baud rate for the device UART.
const DEFAULT_SERIAL_BAUD: u32 = 115_200;

/// Fixed timeout for relayed chat-completion requests.
const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// Number of leading characters left visible when masking a credential.
const MASK_VISIBLE_CHARS: usize = 8;

/// Strongly typed representation of `config.json`.
#[derive(Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "fallback_api_url")]
    pub default_api_url: String,
    #[serde(default = "fallback_bind_addr")]
    pub default_bind_addr: String,
    #[serde(default = "fallback_serial_port")]
    pub default_serial_port: String,
    #[serde(default = "default_serial_baud")]
    pub default_serial_baud: u32,
}

/// Provides default configuration values when config.json is missing or invalid.
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_api_url: fallback_api_url(),
            default_bind_addr: fallback_bind_addr(),
            default_serial_port: fallback_serial_port(),
            default_serial_baud: default_serial_baud(),
        }
    }
}

/// Resolved runtime configuration for the chat proxy.
///
/// # Details
/// Holds the upstream endpoint, the bearer credential, the listen address,
/// and the fixed upstream timeout. Built once at startup and shared
/// immutably with every request handler.
#[derive(Clone)]
pub struct ProxyConfig {
    pub api_url: String,
    pub api_key: String,
    pub bind_addr: String,
    pub upstream_timeout: Duration,
}

impl ProxyConfig {
    /// Loads the proxy configuration from the environment and `config.json`.
    ///
    /// # Returns
    /// A ready-to-use [`ProxyConfig`].
    ///
    /// # Errors
    /// Returns an error when `DEEPSEEK_API_KEY` is not set; the key is
    /// required and is never read from the config file.
    pub fn load() -> Result<Self> {
        let app = load_app_config();
        Ok(Self {
            api_url: chat_api_url(&app),
            api_key: chat_api_key()?,
            bind_addr: env::var("PROXY_BIND_ADDR").unwrap_or_else(|_| app.default_bind_addr.clone()),
            upstream_timeout: UPSTREAM_TIMEOUT,
        })
    }
}

/// Client-credentials material for the speech service token check.
pub struct SpeechCredentials {
    pub api_key: String,
    pub secret_key: String,
    /// Application id, shown for operator reference only.
    pub app_id: Option<String>,
}

/// Loads configuration from `config.json`, falling back to baked defaults when missing.
///
/// # Details
/// Attempts to read and parse the configuration file. If the file doesn't exist
/// or contains invalid JSON, returns a default configuration and logs the error.
///
/// # Returns
/// * `AppConfig` - The loaded or default configuration.
pub fn load_app_config() -> AppConfig {
    match fs::read_to_string(CONFIG_PATH) {
        Ok(raw) => match serde_json::from_str(&raw) {
            Ok(cfg) => cfg,
            Err(err) => {
                eprintln!("Config parse error ({}): {}", CONFIG_PATH, err);
                AppConfig::default()
            }
        },
        Err(err) => {
            eprintln!("Config load error ({}): {}", CONFIG_PATH, err);
            AppConfig::default()
        }
    }
}

/// Determines the upstream chat endpoint from environment or configuration.
///
/// # Arguments
/// * `config` - The loaded application configuration.
///
/// # Returns
/// * `String` - The chat-completion URL to call.
pub fn chat_api_url(config: &AppConfig) -> String {
    env::var("DEEPSEEK_API_URL").unwrap_or_else(|_| config.default_api_url.clone())
}

/// Reads the chat API bearer key from the environment.
///
/// # Returns
/// * `String` - The credential to attach as `Authorization: Bearer`.
///
/// # Errors
/// Returns an error when the variable is unset.
pub fn chat_api_key() -> Result<String> {
    env::var("DEEPSEEK_API_KEY")
        .map_err(|_| anyhow!("DEEPSEEK_API_KEY must be set in the environment or .env"))
}

/// Reads the speech service client credentials from the environment.
///
/// # Details
/// `BAIDU_API_KEY` and `BAIDU_SECRET_KEY` are required; `BAIDU_APP_ID` is
/// optional and only echoed in the check script output.
///
/// # Returns
/// * `SpeechCredentials` - The material for the OAuth token request.
///
/// # Errors
/// Returns an error naming the first missing required variable.
pub fn speech_credentials() -> Result<SpeechCredentials> {
    let api_key = env::var("BAIDU_API_KEY")
        .map_err(|_| anyhow!("BAIDU_API_KEY must be set in the environment or .env"))?;
    let secret_key = env::var("BAIDU_SECRET_KEY")
        .map_err(|_| anyhow!("BAIDU_SECRET_KEY must be set in the environment or .env"))?;
    Ok(SpeechCredentials {
        api_key,
        secret_key,
        app_id: env::var("BAIDU_APP_ID").ok(),
    })
}

/// Determines the serial port path from environment variable or configuration.
///
/// # Arguments
/// * `config` - The loaded application configuration.
///
/// # Returns
/// * `String` - The serial port device path to use.
pub fn serial_port_path(config: &AppConfig) -> String {
    env::var("VOICEBRIDGE_SERIAL_PORT").unwrap_or_else(|_| config.default_serial_port.clone())
}

/// Determines the serial baud rate from environment variable or configuration.
///
/// # Details
/// Checks the VOICEBRIDGE_SERIAL_BAUD environment variable and parses it as a
/// u32. Falls back to the configured default if not set or invalid.
///
/// # Arguments
/// * `config` - The loaded application configuration.
///
/// # Returns
/// * `u32` - The baud rate to use for serial communication.
pub fn serial_baud_rate(config: &AppConfig) -> u32 {
    env::var("VOICEBRIDGE_SERIAL_BAUD")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(config.default_serial_baud)
}

/// Renders a credential as a short prefix plus an ellipsis.
///
/// # Details
/// Secrets are printed by the check scripts and logged by the proxy at
/// startup; only the first few characters are ever shown. Values shorter
/// than the visible prefix are fully redacted.
///
/// # Arguments
/// * `secret` - The credential to mask.
///
/// # Returns
/// * `String` - The masked rendering, safe to print.
pub fn mask_secret(secret: &str) -> String {
    if secret.chars().count() <= MASK_VISIBLE_CHARS {
        return "********".to_string();
    }
    let prefix: String = secret.chars().take(MASK_VISIBLE_CHARS).collect();
    format!("{}...", prefix)
}

/// Returns the fallback upstream chat endpoint.
///
/// # Details
/// This function exists to satisfy serde's default attribute requirements.
fn fallback_api_url() -> String {
    FALLBACK_API_URL.to_string()
}

/// Returns the fallback proxy listen address.
///
/// # Details
/// This function exists to satisfy serde's default attribute requirements.
fn fallback_bind_addr() -> String {
    FALLBACK_BIND_ADDR.to_string()
}

/// Returns the fallback serial device path.
///
/// # Details
/// This function exists to satisfy serde's default attribute requirements.
fn fallback_serial_port() -> String {
    FALLBACK_SERIAL_PORT.to_string()
}

/// Returns the default UART baud rate.
///
/// # Details
/// This function exists to satisfy serde's default attribute requirements.
fn default_serial_baud() -> u32 {
    DEFAULT_SERIAL_BAUD
}
