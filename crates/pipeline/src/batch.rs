//! Batch worker.
//!
//! A batch runs a script in its own interpreter, seeded with a full
//! snapshot of the master session. Compile commands inside the batch run
//! inline. When the script ends, a variables-only snapshot of the batch
//! interpreter becomes the engine's batch result for `update_result`.

use std::path::PathBuf;
use std::sync::Arc;

use fabflow_script::{CloneMode, Interpreter, SessionSnapshot};

use crate::commands::{self, CommandContext, DispatchMode};
use crate::engine::{EngineHandle, WorkerResult};
use crate::sink::BusOutput;
use crate::stages::{StageContext, StageOutcome};

/// Everything a batch worker needs from the master session.
#[derive(Debug, Clone)]
pub struct BatchJob {
    /// Payload script.
    pub script: String,
    /// Master state replayed before the payload runs.
    pub snapshot: SessionSnapshot,
    /// Directory relative file paths resolve against.
    pub base_dir: Option<PathBuf>,
}

/// What a finished batch hands back to the engine.
#[derive(Debug, Clone)]
pub(crate) struct BatchOutput {
    pub snapshot: SessionSnapshot,
    /// Whether the payload evaluated without error.
    pub success: bool,
}

pub(crate) async fn run(job: BatchJob, ctx: StageContext, engine: EngineHandle) -> WorkerResult {
    ctx.message("Running batch...");
    tracing::info!(snapshot_entries = job.snapshot.len(), "Batch started");

    let mut interp = Interpreter::with_output(Arc::new(BusOutput::new(Arc::clone(&ctx.bus))));
    commands::register(
        &mut interp,
        CommandContext {
            engine,
            mode: DispatchMode::Batch,
            base_dir: job.base_dir,
        },
    );
    interp.replay(&job.snapshot);

    let evaluated = tokio::select! {
        result = interp.eval(&job.script) => Some(result),
        _ = ctx.stop.cancelled() => None,
    };

    let Some(result) = evaluated else {
        tracing::info!("Batch cancelled");
        return WorkerResult::from(StageOutcome::Cancelled);
    };

    match &result {
        Ok(value) if !value.is_empty() => ctx.message(value.clone()),
        Ok(_) => {}
        Err(e) if e.is_reported() => {}
        Err(e) => ctx.bus.error(e.to_string()),
    }
    ctx.message("Batch Done.");

    let snapshot = interp.snapshot(CloneMode::VariablesOnly);
    tracing::info!(success = result.is_ok(), variables = snapshot.len(), "Batch finished");

    WorkerResult {
        outcome: StageOutcome::Completed,
        batch: Some(BatchOutput {
            snapshot,
            success: result.is_ok(),
        }),
    }
}
