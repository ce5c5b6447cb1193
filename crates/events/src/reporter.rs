//! Console rendering of pipeline events.
//!
//! [`ConsoleReporter`] subscribes to the [`EventBus`](crate::bus::EventBus)
//! and writes every console message to an output stream. It runs as a
//! long-lived background task and exits when the bus is dropped.

use std::io::Write;

use tokio::sync::broadcast;

use crate::bus::{FlowEvent, FlowEventKind, Severity};

/// How events are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    /// Console messages only, errors prefixed with `ERROR: `.
    #[default]
    Text,
    /// Every event as one JSON object per line.
    Json,
}

/// Background service that renders events to a writer.
pub struct ConsoleReporter;

impl ConsoleReporter {
    /// Run the render loop until the channel is closed.
    pub async fn run<W: Write + Send>(
        mut receiver: broadcast::Receiver<FlowEvent>,
        mut out: W,
        format: ReportFormat,
    ) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let Err(e) = Self::render(&mut out, &event, format) {
                        tracing::error!(error = %e, "Failed to write console output");
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Console reporter lagged, output was dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::debug!("Event bus closed, console reporter shutting down");
                    break;
                }
            }
        }
    }

    /// Render a single event. Returns without writing for events the format
    /// does not show.
    pub fn render<W: Write>(out: &mut W, event: &FlowEvent, format: ReportFormat) -> std::io::Result<()> {
        match format {
            ReportFormat::Json => {
                let line = serde_json::to_string(event).map_err(std::io::Error::other)?;
                writeln!(out, "{line}")?;
            }
            ReportFormat::Text => match &event.kind {
                FlowEventKind::Message {
                    severity: Severity::Error,
                    text,
                } => writeln!(out, "ERROR: {text}")?,
                FlowEventKind::Message { text, .. } => writeln!(out, "{text}")?,
                _ => return Ok(()),
            },
        }
        out.flush()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use fabflow_core::DesignState;

    use super::*;

    fn render_text(event: &FlowEvent) -> String {
        let mut buf = Vec::new();
        ConsoleReporter::render(&mut buf, event, ReportFormat::Text).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn text_format_prefixes_errors() {
        assert_eq!(render_text(&FlowEvent::error("boom")), "ERROR: boom\n");
        assert_eq!(render_text(&FlowEvent::info("50%")), "50%\n");
    }

    #[test]
    fn text_format_hides_state_events() {
        let event = FlowEvent::new(FlowEventKind::DesignStateChanged {
            from: DesignState::Uninitialized,
            to: DesignState::Synthesized,
        });
        assert_eq!(render_text(&event), "");
    }

    #[tokio::test]
    async fn run_exits_when_bus_is_dropped() {
        let bus = crate::bus::EventBus::default();
        let rx = bus.subscribe();
        bus.info("Batch Done.");
        drop(bus);

        let mut buf = Vec::new();
        ConsoleReporter::run(rx, &mut buf, ReportFormat::Json).await;

        let text = String::from_utf8(buf).unwrap();
        let value: serde_json::Value = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(value["type"], "message");
        assert_eq!(value["text"], "Batch Done.");
    }
}
