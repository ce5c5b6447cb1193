use std::sync::Arc;

use fabflow_events::EventBus;
use fabflow_script::OutputSink;

/// Interpreter output delivered as console messages on the event bus.
#[derive(Clone)]
pub struct BusOutput {
    bus: Arc<EventBus>,
}

impl BusOutput {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }
}

impl OutputSink for BusOutput {
    fn write_line(&self, line: &str) {
        self.bus.info(line);
    }
}
