// src/core/pass.rs

//! The "collect exceptions in a list, surface the first" accumulator every
//! reconciliation pass is built from.

use crate::core::errors::CoreError;

/// Outcome of one reconciliation pass: how many items were processed,
/// non-fatal warnings collected along the way, and — if any item raised
/// an error other than a counted/skipped one — the first such error.
/// Matches the propagation policy: every item gets a chance, but only the
/// first error is surfaced as the pass's terminal outcome.
#[derive(Debug, Default)]
pub struct PassOutcome {
    pub processed: u32,
    pub warnings: Vec<String>,
    pub first_error: Option<CoreError>,
}

impl PassOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn record_error(&mut self, error: CoreError) {
        if self.first_error.is_none() {
            self.first_error = Some(error);
        }
    }

    pub fn is_success(&self) -> bool {
        self.first_error.is_none()
    }

    /// Renders the outcome as the captured-log-style text the HTTP
    /// handlers return as a response body.
    pub fn as_log_text(&self) -> String {
        let mut lines = vec![format!("processed {} item(s)", self.processed)];
        for warning in &self.warnings {
            lines.push(format!("warning: {warning}"));
        }
        if let Some(err) = &self.first_error {
            lines.push(format!("error: {err}"));
        }
        lines.join("\n")
    }
}
