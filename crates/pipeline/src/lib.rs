//! fabflow compile pipeline.
//!
//! - [`EngineHandle`]: client of the execution engine actor that owns the
//!   design state, task ledger, error and stop flags and worker registry.
//! - [`StageBody`]: pluggable long-running body of a pipeline stage.
//! - [`Session`]: master interpreter with the pipeline command set.
//! - [`commands`]: the command dispatch boundary shared by master and
//!   batch interpreters.

pub mod batch;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod registry;
pub mod session;
pub mod sink;
pub mod stages;

pub use batch::BatchJob;
pub use commands::{CommandContext, DispatchMode};
pub use config::EngineConfig;
pub use engine::{CompileMode, CompileOutcome, EngineBuilder, EngineHandle, EngineStatus};
pub use error::EngineError;
pub use registry::{WorkerHandle, WorkerInfo, WorkerRegistry};
pub use session::{Session, SessionOptions};
pub use sink::BusOutput;
pub use stages::{SimulatedStage, StageBodies, StageBody, StageContext, StageOutcome, StopSignal};
