//! Compile stage registry and the design-level state machine.
//!
//! [`Stage`] enumerates the fixed, ordered set of pipeline steps. Each stage
//! knows which [`DesignState`] it produces, whether it may auto-create a
//! design, and which command names trigger it. [`Stage::check`] is the
//! precondition table; [`DesignState::apply`] is the transition function.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::task::TaskId;

// ---------------------------------------------------------------------------
// DesignState
// ---------------------------------------------------------------------------

/// Furthest completed stage of the active design.
///
/// Exactly one value is live at a time; each successful stage overwrites it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DesignState {
    #[default]
    Uninitialized,
    IpGenerated,
    Synthesized,
    Packed,
    GloballyPlaced,
    Placed,
    Routed,
}

impl DesignState {
    /// State after `stage` completes successfully from `self`.
    ///
    /// Stages that produce no persisted state leave `self` unchanged.
    pub fn apply(self, stage: Stage) -> DesignState {
        stage.produces().unwrap_or(self)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::IpGenerated => "ip_generated",
            Self::Synthesized => "synthesized",
            Self::Packed => "packed",
            Self::GloballyPlaced => "globally_placed",
            Self::Placed => "placed",
            Self::Routed => "routed",
        }
    }
}

impl fmt::Display for DesignState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// One step of the compile pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    IpGen,
    Synthesis,
    Pack,
    Global,
    Detailed,
    Routing,
    Sta,
    Power,
    Bitstream,
    Batch,
}

/// Why a stage refused to run against the current design.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageRejection {
    NoDesign,
    NotPacked,
}

impl fmt::Display for StageRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoDesign => f.write_str("No design specified"),
            Self::NotPacked => f.write_str("Design needs to be in packed state"),
        }
    }
}

impl std::error::Error for StageRejection {}

impl Stage {
    /// All stages in pipeline order.
    pub const ALL: [Stage; 10] = [
        Stage::IpGen,
        Stage::Synthesis,
        Stage::Pack,
        Stage::Global,
        Stage::Detailed,
        Stage::Routing,
        Stage::Sta,
        Stage::Power,
        Stage::Bitstream,
        Stage::Batch,
    ];

    /// Primary command name.
    pub fn command(self) -> &'static str {
        self.commands()[0]
    }

    /// Every command name (primary first, then aliases) that runs this stage.
    pub fn commands(self) -> &'static [&'static str] {
        match self {
            Self::IpGen => &["ipgenerate"],
            Self::Synthesis => &["synthesize", "synth"],
            Self::Pack => &["packing"],
            Self::Global => &["global_placement", "globp"],
            Self::Detailed => &["detailed_placement", "place"],
            Self::Routing => &["route"],
            Self::Sta => &["sta"],
            Self::Power => &["power"],
            Self::Bitstream => &["bitstream"],
            Self::Batch => &["batch"],
        }
    }

    /// Look up a stage by any of its command names.
    pub fn from_command(name: &str) -> Option<Stage> {
        Self::ALL
            .into_iter()
            .find(|stage| stage.commands().contains(&name))
    }

    /// Name given to the worker that runs this stage.
    pub fn worker_name(self) -> &'static str {
        match self {
            Self::IpGen => "ip_th",
            Self::Synthesis => "synth_th",
            Self::Pack => "pack_th",
            Self::Global => "glob_th",
            Self::Detailed => "place_th",
            Self::Routing => "route_th",
            Self::Sta => "sta_th",
            Self::Power => "power_th",
            Self::Bitstream => "bitstream_th",
            Self::Batch => "batch_th",
        }
    }

    /// Ledger task tracking this stage. `Batch` has no ledger-visible task.
    pub fn task_id(self) -> Option<TaskId> {
        match self {
            Self::IpGen => Some(TaskId::IpGenerate),
            Self::Synthesis => Some(TaskId::Synthesis),
            Self::Pack => Some(TaskId::Packing),
            Self::Global => Some(TaskId::GlobalPlacement),
            Self::Detailed => Some(TaskId::Placement),
            Self::Routing => Some(TaskId::Routing),
            Self::Sta => Some(TaskId::TimingSignOff),
            Self::Power => Some(TaskId::Power),
            Self::Bitstream => Some(TaskId::Bitstream),
            Self::Batch => None,
        }
    }

    /// Design state persisted after a successful run, if any.
    pub fn produces(self) -> Option<DesignState> {
        match self {
            Self::IpGen => Some(DesignState::IpGenerated),
            Self::Synthesis => Some(DesignState::Synthesized),
            Self::Pack => Some(DesignState::Packed),
            Self::Global => Some(DesignState::GloballyPlaced),
            Self::Detailed => Some(DesignState::Placed),
            Self::Routing => Some(DesignState::Routed),
            Self::Sta | Self::Power | Self::Bitstream | Self::Batch => None,
        }
    }

    /// Entry stages create a default design instead of failing when none is
    /// active. Every later stage is strict.
    pub fn auto_creates_design(self) -> bool {
        matches!(self, Self::IpGen | Self::Synthesis)
    }

    /// Precondition check against the current design.
    ///
    /// `design_active` must reflect any auto-creation already performed for
    /// entry stages.
    pub fn check(self, state: DesignState, design_active: bool) -> Result<(), StageRejection> {
        if self == Self::Batch {
            return Ok(());
        }
        if !design_active {
            return Err(StageRejection::NoDesign);
        }
        if self == Self::Global
            && !matches!(state, DesignState::Packed | DesignState::GloballyPlaced)
        {
            return Err(StageRejection::NotPacked);
        }
        Ok(())
    }

    pub fn can_run(self, state: DesignState, design_active: bool) -> bool {
        self.check(state, design_active).is_ok()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
