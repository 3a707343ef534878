// src/core/log_capture.rs

//! Captures the log lines emitted during one async task and returns them
//! as a string, the structured equivalent of wrapping a handler in an
//! ad hoc string-buffer log handler.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

tokio::task_local! {
    static CAPTURE_BUFFER: Arc<Mutex<Vec<String>>>;
}

/// A `tracing_subscriber::Layer` that appends every event's formatted
/// message to the current task's capture buffer, if one is active.
pub struct CaptureLayer;

struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let _ = CAPTURE_BUFFER.try_with(|buffer| {
            let mut visitor = MessageVisitor(String::new());
            event.record(&mut visitor);
            buffer.lock().push(format!("{} {}", event.metadata().level(), visitor.0));
        });
    }
}

/// Runs `fut` with a fresh capture buffer active, returning its result
/// alongside the captured log text.
pub async fn capture<F, T>(fut: F) -> (T, String)
where
    F: std::future::Future<Output = T>,
{
    let buffer = Arc::new(Mutex::new(Vec::new()));
    let result = CAPTURE_BUFFER.scope(buffer.clone(), fut).await;
    let text = buffer.lock().join("\n");
    (result, text)
}
