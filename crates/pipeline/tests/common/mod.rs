//! Shared helpers for pipeline integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use fabflow_events::{FlowEvent, FlowEventKind, Severity};
use fabflow_pipeline::{
    DispatchMode, EngineConfig, EngineHandle, EngineStatus, Session, SessionOptions,
};
use fabflow_script::BufferedOutput;
use tokio::sync::broadcast;

/// Short progress loops so stages finish in milliseconds.
pub fn fast_config() -> EngineConfig {
    EngineConfig {
        step_interval: Duration::from_millis(2),
        progress_steps: 3,
        ..EngineConfig::default()
    }
}

/// Progress loops long enough to stop a stage mid-flight.
pub fn slow_config() -> EngineConfig {
    EngineConfig {
        step_interval: Duration::from_millis(50),
        progress_steps: 200,
        ..EngineConfig::default()
    }
}

pub fn engine() -> EngineHandle {
    EngineHandle::spawn(fast_config())
}

pub fn session(engine: &EngineHandle, mode: DispatchMode) -> (Session, BufferedOutput) {
    let output = BufferedOutput::new();
    let session = Session::new(
        engine.clone(),
        SessionOptions {
            mode,
            base_dir: None,
            output: Some(Arc::new(output.clone())),
        },
    );
    (session, output)
}

pub async fn status(engine: &EngineHandle) -> EngineStatus {
    engine.status().await.expect("engine should be running")
}

pub async fn idle(engine: &EngineHandle) {
    tokio::time::timeout(Duration::from_secs(10), engine.wait_idle())
        .await
        .expect("workers should finish")
        .expect("engine should be running");
}

/// Every event received so far.
pub fn drain(rx: &mut broadcast::Receiver<FlowEvent>) -> Vec<FlowEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn messages(events: &[FlowEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| e.message().map(|(_, text)| text.to_string()))
        .collect()
}

pub fn errors(events: &[FlowEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e.message() {
            Some((Severity::Error, text)) => Some(text.to_string()),
            _ => None,
        })
        .collect()
}

pub fn batch_finished(events: &[FlowEvent]) -> Option<bool> {
    events.iter().find_map(|e| match e.kind {
        FlowEventKind::BatchFinished { success } => Some(success),
        _ => None,
    })
}
