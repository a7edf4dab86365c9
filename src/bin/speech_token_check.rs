//! Speech service credential check.
//!
//! Performs one OAuth client-credentials exchange against the speech API and
//! reports whether the keys in the environment are accepted.

use anyhow::Result;

use voicebridge::config;
use voicebridge::speech;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let credentials = config::speech_credentials()?;
    let success = speech::run_token_check(&credentials).await;

    println!();
    println!("{}", "=".repeat(50));
    if success {
        println!("✓ Speech service credentials verified");
    } else {
        println!("✗ Speech service credential check failed");
    }
    Ok(())
}
