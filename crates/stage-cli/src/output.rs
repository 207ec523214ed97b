//! Shared output layer for human/JSON parity across all CLI commands.
//!
//! JSON output is a stable envelope on stdout: `{"success": true, "data":
//! {...}}` for success, `{"success": false, "data": "<message>"}` for
//! failure. Human output prints the same information as plain lines and
//! errors go to stderr.

use serde::Serialize;
use std::io::{self, Write};

/// The two output modes supported by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable lines.
    Human,
    /// Machine-readable JSON envelope.
    Json,
}

impl OutputMode {
    /// Returns `true` if JSON output was requested.
    #[must_use]
    pub fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }
}

/// A failure to report to the caller.
#[derive(Debug, Serialize)]
pub struct CliError {
    /// Human-readable error message.
    pub message: String,
    /// Machine-readable error code (e.g. "E4002").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl CliError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error_code: None,
        }
    }

    #[must_use]
    pub fn with_code(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error_code: Some(code.into()),
        }
    }
}

impl From<&stage_core::Error> for CliError {
    fn from(error: &stage_core::Error) -> Self {
        Self::with_code(error.to_string(), error.code())
    }
}

/// Render a successful result: the JSON envelope in JSON mode, or the
/// supplied line writer in human mode.
///
/// # Errors
///
/// Returns an error when stdout cannot be written.
pub fn render<T: Serialize>(
    mode: OutputMode,
    data: &T,
    human: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match mode {
        OutputMode::Json => {
            let wrapper = serde_json::json!({
                "success": true,
                "data": data,
            });
            serde_json::to_writer_pretty(&mut out, &wrapper)?;
            writeln!(out)?;
        }
        OutputMode::Human => {
            human(data, &mut out)?;
        }
    }
    Ok(())
}

/// Render a success carrying only a message.
///
/// # Errors
///
/// Returns an error when stdout cannot be written.
pub fn render_message(mode: OutputMode, message: &str) -> anyhow::Result<()> {
    render(mode, &message, |message, out| {
        writeln!(out, "{message}")
    })
}

/// Render a failure. JSON mode emits the envelope on stdout so callers can
/// parse one stream; human mode writes to stderr.
///
/// # Errors
///
/// Returns an error when the output stream cannot be written.
pub fn render_error(mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    match mode {
        OutputMode::Json => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            let wrapper = serde_json::json!({
                "success": false,
                "data": error.message,
                "error_code": error.error_code,
            });
            serde_json::to_writer_pretty(&mut out, &wrapper)?;
            writeln!(out)?;
        }
        OutputMode::Human => {
            let stderr = io::stderr();
            let mut out = stderr.lock();
            writeln!(out, "error: {}", error.message)?;
        }
    }
    Ok(())
}

/// Report a domain error and return it as a failed exit.
///
/// # Errors
///
/// Always returns `Err` carrying the original message.
pub fn fail(mode: OutputMode, error: &stage_core::Error) -> anyhow::Result<()> {
    render_error(mode, &CliError::from(error))?;
    anyhow::bail!("{error}")
}
