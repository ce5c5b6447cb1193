use std::path::PathBuf;

use fabflow_core::{CoreError, Stage, StageRejection};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A previous stage error poisoned this compile attempt.
    #[error("Compile skipped: a previous error was not cleared")]
    HardError,

    #[error("Stage {0} is still running")]
    Busy(Stage),

    /// Precondition check failed; the stage body never ran.
    #[error("{0}")]
    Rejected(StageRejection),

    #[error("{stage} failed: {message}")]
    StageFailed { stage: Stage, message: String },

    #[error("{0} was stopped")]
    Cancelled(Stage),

    #[error("No batch result available")]
    NoBatchResult,

    #[error("Cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Compile engine is not running")]
    Closed,
}

impl EngineError {
    /// Whether the engine already published this error on the event bus.
    pub fn is_published(&self) -> bool {
        matches!(self, Self::Rejected(_) | Self::StageFailed { .. })
    }
}
