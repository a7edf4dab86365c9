/*
 * @file lib.rs
 * @brief Voicebridge library root
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

//! Voicebridge - host-side bridge tools for an ESP32 voice assistant.
//!
//! The device records speech and plays replies on its own; everything that
//! needs a real TLS stack or a credential lives on the host instead:
//! - A plain-HTTP chat proxy the device calls, which relays requests to the
//!   upstream chat-completion API with the bearer token attached
//!   (`voicebridge` binary).
//! - One-shot credential checks for the chat API and for the speech service's
//!   OAuth token endpoint (`chat_check`, `speech_token_check` binaries).
//! - A serial diagnostic that drives the device firmware over UART
//!   (`serial_diag` binary).
//!
//! # Example
//! ```no_run
//! use anyhow::Result;
//! use voicebridge::{config::ProxyConfig, proxy};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     dotenv::dotenv().ok();
//!     let config = ProxyConfig::load()?;
//!     let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
//!     axum::serve(listener, proxy::router(config)).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod proxy;
pub mod serial;
pub mod speech;
pub mod upstream;
