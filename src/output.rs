// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Supports normal, quiet (CI), and JSON output modes.

use serde::Serialize;
use std::time::Instant;

use crate::diagnostics::Warning;

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    Normal,
    /// Minimal output for CI (only final result)
    Quiet,
    /// JSON lines for scripting
    Json,
}

impl OutputMode {
    pub fn from_flags(quiet: bool, json: bool) -> Self {
        if json {
            OutputMode::Json
        } else if quiet {
            OutputMode::Quiet
        } else {
            OutputMode::Normal
        }
    }
}

/// Handles CLI output based on the configured mode.
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn duration(&self) -> Option<f64> {
        self.start_time.map(|_| self.elapsed_secs())
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    /// Print a success message with optional timing.
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => match self.duration() {
                Some(elapsed) => println!("{message} ({elapsed:.1}s)"),
                None => println!("{message}"),
            },
            OutputMode::Quiet => println!("{message}"),
            OutputMode::Json => self.emit_stdout(&JsonEvent {
                event: "success",
                message,
                duration_secs: self.duration(),
                data: None,
            }),
        }
    }

    /// Print a structured result. Normal and quiet modes show `summary`;
    /// JSON mode emits `data` in full.
    pub fn result<T: Serialize>(&self, summary: &str, data: &T) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => println!("{summary}"),
            OutputMode::Json => {
                let data = serde_json::to_value(data).ok();
                self.emit_stdout(&JsonEvent {
                    event: "result",
                    message: summary,
                    duration_secs: self.duration(),
                    data,
                });
            }
        }
    }

    pub fn warning(&self, warning: &Warning) {
        match self.mode {
            OutputMode::Normal => eprintln!("Warning: {}", warning.message),
            OutputMode::Quiet => {}
            OutputMode::Json => {
                let data = serde_json::to_value(warning).ok();
                self.emit_stderr(&JsonEvent {
                    event: "warning",
                    message: &warning.message,
                    duration_secs: None,
                    data,
                });
            }
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => eprintln!("Error: {message}"),
            OutputMode::Json => self.emit_stderr(&JsonEvent {
                event: "error",
                message,
                duration_secs: self.duration(),
                data: None,
            }),
        }
    }

    fn emit_stdout(&self, event: &JsonEvent<'_>) {
        if let Ok(json) = serde_json::to_string(event) {
            println!("{json}");
        }
    }

    fn emit_stderr(&self, event: &JsonEvent<'_>) {
        if let Ok(json) = serde_json::to_string(event) {
            eprintln!("{json}");
        }
    }
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
}
