/*
 * @file serial.rs
 * @brief UART diagnostic for the voice-assistant firmware
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

//! Serial diagnostic for the device firmware.
//!
//! Sends the firmware's plaintext console commands over UART and echoes the
//! replies. Everything is blocking and time-boxed; there is no
//! acknowledgement protocol beyond watching for the firmware's own log tags.

use anyhow::{Context, Result};
use serialport::SerialPort;
use std::io::{Read, Write};
use std::time::{Duration, Instant};

/// Commands sent during the probe phase, in order.
const PROBE_COMMANDS: [&str; 2] = ["button", "status"];

/// Time to let the device finish booting after the port opens.
const BOOT_SETTLE_DELAY: Duration = Duration::from_secs(3);

/// Minimum spacing between consecutive UART commands.
const COMMAND_DELAY: Duration = Duration::from_millis(500);

/// How long to echo replies after the probe commands.
const STATUS_WINDOW: Duration = Duration::from_secs(5);

/// Delay between `record` and the simulated speech window.
const RECORD_START_DELAY: Duration = Duration::from_secs(1);

/// Simulated speech window before `stop` is sent.
const RECORD_CAPTURE_DELAY: Duration = Duration::from_secs(2);

/// How long to wait for the recognition outcome after `stop`.
const RECOGNITION_WINDOW: Duration = Duration::from_secs(10);

/// Read timeout on the port; reads poll rather than block.
const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Sleep between input-buffer polls when nothing is pending.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Firmware log tags that end the recognition window early. The firmware
/// reports its outcome with the recognition-result tag or an ASR error line.
const RECOGNITION_MARKERS: [&str; 2] = ["识别结果", "ASR error"];

/// Runs the full diagnostic sequence against the device.
///
/// # Details
/// Opens the port, lets the device settle, discards stale input, then runs
/// two phases: a probe (`button`, `status`) with a fixed echo window, and a
/// recording exercise (`record`, wait, `stop`) whose echo window ends early
/// once the firmware prints a recognition result or an ASR error.
///
/// # Arguments
/// * `path` - The serial device path.
/// * `baud` - The UART baud rate.
///
/// # Returns
/// `Ok(())` when the sequence completes or stops on a recognition marker.
///
/// # Errors
/// Returns an error if the port cannot be opened or any write/read fails.
pub fn run_diagnostic(path: &str, baud: u32) -> Result<()> {
    let mut port = open_port(path, baud)?;
    println!("Connected to {} at {} baud", path, baud);

    println!("Waiting for the device to finish booting...");
    std::thread::sleep(BOOT_SETTLE_DELAY);
    discard_pending(port.as_mut())?;

    println!("Sending probe commands...");
    for command in PROBE_COMMANDS {
        send_command(port.as_mut(), command)?;
        std::thread::sleep(COMMAND_DELAY);
    }

    println!();
    println!("=== Device responses ===");
    echo_output(port.as_mut(), STATUS_WINDOW, &[])?;

    println!();
    println!("=== Recording test ===");
    println!("Sending record command...");
    send_command(port.as_mut(), "record")?;
    std::thread::sleep(RECORD_START_DELAY);
    println!("Waiting through the capture window...");
    std::thread::sleep(RECORD_CAPTURE_DELAY);
    send_command(port.as_mut(), "stop")?;

    println!();
    println!("=== Recognition result ===");
    echo_output(port.as_mut(), RECOGNITION_WINDOW, &RECOGNITION_MARKERS)?;

    println!();
    println!("Diagnostic complete");
    Ok(())
}

/// Opens the serial port with the polling read timeout.
///
/// # Arguments
/// * `path` - The device path (e.g., "COM5" or "/dev/ttyUSB0").
/// * `baud` - The baud rate (e.g., 115200).
///
/// # Returns
/// * `Ok(Box<dyn SerialPort>)` - Opened serial port ready for I/O.
///
/// # Errors
/// Returns an error if the port cannot be opened at the given path and baud.
fn open_port(path: &str, baud: u32) -> Result<Box<dyn SerialPort>> {
    serialport::new(path, baud)
        .timeout(READ_TIMEOUT)
        .open()
        .with_context(|| format!("Failed to open {}", path))
}

/// Discards anything the device printed before the diagnostic started.
fn discard_pending(port: &mut dyn SerialPort) -> Result<()> {
    port.clear(serialport::ClearBuffer::All)
        .context("Failed to clear serial buffers")
}

/// Writes one newline-terminated command and flushes it out.
///
/// # Arguments
/// * `port` - The open serial port.
/// * `command` - The command text, without terminator.
///
/// # Errors
/// Returns an error if the write or flush fails.
fn send_command(port: &mut dyn SerialPort, command: &str) -> Result<()> {
    port.write_all(command.as_bytes())
        .with_context(|| format!("Failed to send '{}'", command))?;
    port.write_all(b"\n")
        .with_context(|| format!("Failed to terminate '{}'", command))?;
    port.flush().context("Failed to flush serial output")?;
    Ok(())
}

/// Echoes decoded device lines until the window closes.
///
/// # Details
/// Polls the input buffer, accumulates bytes, and prints each complete line.
/// When `stop_markers` is non-empty, a line containing any marker ends the
/// window early. Blank lines are skipped.
///
/// # Arguments
/// * `port` - The open serial port.
/// * `window` - Wall-clock budget for the echo loop.
/// * `stop_markers` - Substrings that terminate the loop when seen.
///
/// # Errors
/// Returns an error if querying or reading the input fails.
fn echo_output(port: &mut dyn SerialPort, window: Duration, stop_markers: &[&str]) -> Result<()> {
    let deadline = Instant::now() + window;
    let mut pending: Vec<u8> = Vec::new();
    let mut chunk = [0u8; 256];
    while Instant::now() < deadline {
        let available = port
            .bytes_to_read()
            .context("Failed to query serial input")? as usize;
        if available == 0 {
            std::thread::sleep(POLL_INTERVAL);
            continue;
        }
        let wanted = available.min(chunk.len());
        let read = match port.read(&mut chunk[..wanted]) {
            Ok(count) => count,
            Err(err) if err.kind() == std::io::ErrorKind::TimedOut => continue,
            Err(err) => return Err(err).context("Failed to read from serial port"),
        };
        pending.extend_from_slice(&chunk[..read]);
        for line in take_lines(&mut pending) {
            if line.is_empty() {
                continue;
            }
            println!("{}", line);
            if hits_stop_marker(&line, stop_markers) {
                return Ok(());
            }
        }
    }
    Ok(())
}

/// Drains every complete line out of the accumulation buffer.
fn take_lines(pending: &mut Vec<u8>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(pos) = pending.iter().position(|&byte| byte == b'\n') {
        let raw: Vec<u8> = pending.drain(..=pos).collect();
        lines.push(decode_line(&raw[..raw.len() - 1]));
    }
    lines
}

/// Decodes one raw line, tolerating whatever encoding the firmware emits.
fn decode_line(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).trim().to_string()
}

/// Reports whether a line contains any of the stop markers.
fn hits_stop_marker(line: &str, markers: &[&str]) -> bool {
    markers.iter().any(|marker| line.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_lines_splits_on_newlines_and_keeps_the_remainder() {
        let mut pending = b"[BUTTON] ready\r\n[STATUS] ok\npartial".to_vec();
        let lines = take_lines(&mut pending);
        assert_eq!(lines, vec!["[BUTTON] ready", "[STATUS] ok"]);
        assert_eq!(pending, b"partial");

        pending.extend_from_slice(b" line\n");
        assert_eq!(take_lines(&mut pending), vec!["partial line"]);
        assert!(pending.is_empty());
    }

    #[test]
    fn decode_line_is_lossy_and_trimmed() {
        assert_eq!(decode_line(b"  status ok \r"), "status ok");
        // Invalid UTF-8 bytes degrade to replacement characters instead of failing.
        assert_eq!(decode_line(&[0xff, b'o', b'k']), "\u{fffd}ok");
    }

    #[test]
    fn recognition_markers_end_the_window() {
        assert!(hits_stop_marker(
            "[ASR] 识别结果: 你好",
            &RECOGNITION_MARKERS
        ));
        assert!(hits_stop_marker("ASR error: no audio", &RECOGNITION_MARKERS));
        assert!(!hits_stop_marker("[BUTTON] pressed", &RECOGNITION_MARKERS));
    }

    #[test]
    fn probe_phase_ignores_markers() {
        assert!(!hits_stop_marker("[ASR] 识别结果: 你好", &[]));
    }
}
