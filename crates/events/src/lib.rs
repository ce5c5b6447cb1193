//! fabflow event bus and console reporting.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`FlowEvent`]: the event envelope published by the orchestrator.
//! - [`ConsoleReporter`]: background task rendering console messages.

pub mod bus;
pub mod reporter;

pub use bus::{EventBus, FlowEvent, FlowEventKind, Severity, WorkerExit};
pub use reporter::{ConsoleReporter, ReportFormat};
