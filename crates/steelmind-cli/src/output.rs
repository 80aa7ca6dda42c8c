//! Output formatting for worker messages.
//!
//! One JSON document per line by default, for piping into other tools.
//! `--pretty` switches to indented JSON for reading in a terminal.

use anyhow::{Context, Result};
use std::io::Write;
use steelmind_core::dispatch::WorkerMessage;

/// Encodes one message.
pub fn format_message(message: &WorkerMessage, pretty: bool) -> Result<String> {
    let text = if pretty {
        serde_json::to_string_pretty(message)
    } else {
        serde_json::to_string(message)
    };
    text.context("Failed to encode worker message")
}

/// Writes one message followed by a newline and flushes it.
pub fn write_message<W: Write>(out: &mut W, message: &WorkerMessage, pretty: bool) -> Result<()> {
    let text = format_message(message, pretty)?;
    writeln!(out, "{}", text).context("Failed to write output")?;
    out.flush().context("Failed to flush output")
}
