//! Domain model of the fabflow compile pipeline.
//!
//! Pure types and rules with no async runtime or I/O: the stage registry
//! and design state machine, the task ledger, and the design and constraint
//! stores the orchestrator drives.

pub mod constraints;
pub mod design;
pub mod error;
pub mod stage;
pub mod task;

pub use constraints::ConstraintStore;
pub use design::{Design, DesignFileSet, DesignStore, InMemoryDesignStore, Language};
pub use error::CoreError;
pub use stage::{DesignState, Stage, StageRejection};
pub use task::{StatusChange, TaskId, TaskLedger, TaskRecord, TaskStatus};
