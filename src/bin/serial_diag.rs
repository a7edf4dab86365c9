//! Serial diagnostic entry point.
//!
//! Drives the device firmware's console commands over UART and echoes what
//! it prints back. Any failure surfaces as a single diagnostic line.

use voicebridge::config;
use voicebridge::serial;

fn main() {
    dotenv::dotenv().ok();
    let app = config::load_app_config();
    let path = config::serial_port_path(&app);
    let baud = config::serial_baud_rate(&app);
    if let Err(err) = serial::run_diagnostic(&path, baud) {
        eprintln!("Error: {:#}", err);
    }
}
