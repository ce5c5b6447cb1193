//! Per-stage task ledger.
//!
//! The ledger is a plain map from [`TaskId`] to [`TaskRecord`] plus the
//! command bound to each task. It holds no business logic: callers decide
//! when a status changes, and every mutation returns a [`StatusChange`] so
//! the owner can publish it to observers.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::stage::Stage;

// ---------------------------------------------------------------------------
// Identifiers and statuses
// ---------------------------------------------------------------------------

/// Ledger-visible task. One per compile stage except batch runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskId {
    IpGenerate,
    Synthesis,
    Packing,
    GlobalPlacement,
    Placement,
    Routing,
    TimingSignOff,
    Power,
    Bitstream,
}

impl TaskId {
    pub const ALL: [TaskId; 9] = [
        TaskId::IpGenerate,
        TaskId::Synthesis,
        TaskId::Packing,
        TaskId::GlobalPlacement,
        TaskId::Placement,
        TaskId::Routing,
        TaskId::TimingSignOff,
        TaskId::Power,
        TaskId::Bitstream,
    ];

    pub fn stage(self) -> Stage {
        match self {
            Self::IpGenerate => Stage::IpGen,
            Self::Synthesis => Stage::Synthesis,
            Self::Packing => Stage::Pack,
            Self::GlobalPlacement => Stage::Global,
            Self::Placement => Stage::Detailed,
            Self::Routing => Stage::Routing,
            Self::TimingSignOff => Stage::Sta,
            Self::Power => Stage::Power,
            Self::Bitstream => Stage::Bitstream,
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::IpGenerate => "ip_generate",
            Self::Synthesis => "synthesis",
            Self::Packing => "packing",
            Self::GlobalPlacement => "global_placement",
            Self::Placement => "placement",
            Self::Routing => "routing",
            Self::TimingSignOff => "timing_sign_off",
            Self::Power => "power",
            Self::Bitstream => "bitstream",
        };
        f.write_str(name)
    }
}

/// Lifecycle status of a ledger task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Success,
    Fail,
    /// Stopped by an abort request before completing.
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Fail | Self::Cancelled)
    }
}

/// A single observable status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub task: TaskId,
    pub from: TaskStatus,
    pub to: TaskStatus,
}

/// Current state of one ledger task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub status: TaskStatus,
    /// Command evaluated by [`TaskLedger::bound_command`] consumers to
    /// trigger this task without knowing the command string up front.
    pub run_command: Option<String>,
}

// ---------------------------------------------------------------------------
// TaskLedger
// ---------------------------------------------------------------------------

/// Status map for every ledger-visible task.
#[derive(Debug, Clone)]
pub struct TaskLedger {
    records: BTreeMap<TaskId, TaskRecord>,
}

impl Default for TaskLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskLedger {
    /// One pending record per known task, with no bound commands.
    pub fn new() -> Self {
        let records = TaskId::ALL
            .into_iter()
            .map(|id| {
                (
                    id,
                    TaskRecord {
                        id,
                        status: TaskStatus::Pending,
                        run_command: None,
                    },
                )
            })
            .collect();
        Self { records }
    }

    /// Bind every task to its stage's primary short command.
    pub fn with_stage_commands() -> Self {
        let mut ledger = Self::new();
        for id in TaskId::ALL {
            // Short alias when one exists.
            if let Some(command) = id.stage().commands().last() {
                ledger.bind_run_command(id, *command);
            }
        }
        ledger
    }

    /// Set the status of `id`, returning the transition if the value changed.
    pub fn set_status(&mut self, id: TaskId, status: TaskStatus) -> Option<StatusChange> {
        let record = self.records.get_mut(&id)?;
        if record.status == status {
            return None;
        }
        let change = StatusChange {
            task: id,
            from: record.status,
            to: status,
        };
        record.status = status;
        Some(change)
    }

    /// Current status of a task; unknown ids read as the default status.
    pub fn status(&self, id: TaskId) -> TaskStatus {
        self.records
            .get(&id)
            .map(|r| r.status)
            .unwrap_or_default()
    }

    pub fn bind_run_command(&mut self, id: TaskId, command: impl Into<String>) {
        if let Some(record) = self.records.get_mut(&id) {
            record.run_command = Some(command.into());
        }
    }

    pub fn bound_command(&self, id: TaskId) -> Option<&str> {
        self.records.get(&id)?.run_command.as_deref()
    }

    /// Mark every in-progress task as cancelled.
    pub fn stop_current(&mut self) -> Vec<StatusChange> {
        let running: Vec<TaskId> = self
            .records
            .values()
            .filter(|r| r.status == TaskStatus::InProgress)
            .map(|r| r.id)
            .collect();
        running
            .into_iter()
            .filter_map(|id| self.set_status(id, TaskStatus::Cancelled))
            .collect()
    }

    pub fn records(&self) -> impl Iterator<Item = &TaskRecord> {
        self.records.values()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_ledger_has_one_pending_record_per_task() {
        let ledger = TaskLedger::new();
        assert_eq!(ledger.records().count(), TaskId::ALL.len());
        assert!(ledger.records().all(|r| r.status == TaskStatus::Pending));
    }

    #[test]
    fn set_status_reports_transition_once() {
        let mut ledger = TaskLedger::new();
        let change = ledger
            .set_status(TaskId::Synthesis, TaskStatus::InProgress)
            .expect("status changed");
        assert_eq!(change.from, TaskStatus::Pending);
        assert_eq!(change.to, TaskStatus::InProgress);
        assert!(ledger
            .set_status(TaskId::Synthesis, TaskStatus::InProgress)
            .is_none());
    }

    #[test]
    fn stage_commands_are_bound() {
        let ledger = TaskLedger::with_stage_commands();
        assert_eq!(ledger.bound_command(TaskId::Synthesis), Some("synth"));
        assert_eq!(ledger.bound_command(TaskId::GlobalPlacement), Some("globp"));
        assert_eq!(ledger.bound_command(TaskId::Placement), Some("place"));
        assert_eq!(ledger.bound_command(TaskId::TimingSignOff), Some("sta"));
        assert_eq!(ledger.bound_command(TaskId::IpGenerate), Some("ipgenerate"));
    }

    #[test]
    fn stop_current_cancels_only_running_tasks() {
        let mut ledger = TaskLedger::new();
        ledger.set_status(TaskId::Synthesis, TaskStatus::Success);
        ledger.set_status(TaskId::Packing, TaskStatus::InProgress);

        let changes = ledger.stop_current();

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].task, TaskId::Packing);
        assert_eq!(ledger.status(TaskId::Packing), TaskStatus::Cancelled);
        assert_eq!(ledger.status(TaskId::Synthesis), TaskStatus::Success);
    }

    #[test]
    fn task_ids_map_back_to_their_stage() {
        for id in TaskId::ALL {
            assert_eq!(id.stage().task_id(), Some(id));
        }
    }
}
