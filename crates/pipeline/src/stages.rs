//! Pluggable stage bodies.
//!
//! The engine runs a [`StageBody`] on a worker for every compile. Bodies
//! write progress through the event bus and poll their [`StopSignal`] at
//! each step; a body that observes a stop returns
//! [`StageOutcome::Cancelled`] and the engine leaves the design state
//! untouched.
//!
//! [`SimulatedStage`] is the default body for every stage: it prints the
//! stage messages and, for synthesis and global placement, walks a timed
//! progress loop.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fabflow_core::Stage;
use fabflow_events::EventBus;
use tokio_util::sync::CancellationToken;

/// How a stage body ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Completed,
    Failed(String),
    /// Stopped on request before completing.
    Cancelled,
}

/// Stop request as seen by one worker: the engine-wide StopFlag plus the
/// worker's own cancellation token (tripped by an abort sweep).
#[derive(Debug, Clone)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
    token: CancellationToken,
}

impl StopSignal {
    pub fn new(flag: Arc<AtomicBool>, token: CancellationToken) -> Self {
        Self { flag, token }
    }

    /// A signal that only stops when its token is cancelled.
    pub fn detached() -> Self {
        Self::new(Arc::new(AtomicBool::new(false)), CancellationToken::new())
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::SeqCst) || self.token.is_cancelled()
    }

    /// Sleep for `period`, waking early if the worker is cancelled. Returns
    /// whether a stop was observed.
    pub async fn sleep(&self, period: Duration) -> bool {
        tokio::select! {
            _ = self.token.cancelled() => {}
            _ = tokio::time::sleep(period) => {}
        }
        self.is_stopped()
    }

    /// Resolves once the worker is swept.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }
}

/// Everything a stage body gets to see.
#[derive(Clone)]
pub struct StageContext {
    pub stage: Stage,
    /// Name of the active design, empty for batch runs without one.
    pub design: String,
    /// Constraints recorded so far, in file order.
    pub constraints: Vec<String>,
    /// Names synthesis must preserve.
    pub keeps: Vec<String>,
    pub stop: StopSignal,
    pub bus: Arc<EventBus>,
    pub step_interval: Duration,
    pub progress_steps: u32,
}

impl StageContext {
    /// Write a console message.
    pub fn message(&self, text: impl Into<String>) {
        self.bus.info(text);
    }

    /// Walk the progress loop, printing each percentage with `format` and
    /// polling for a stop after every step. Returns `false` if stopped.
    pub async fn progress(&self, format: impl Fn(u32) -> String) -> bool {
        let steps = self.progress_steps.max(1);
        for step in 0..steps {
            self.message(format(percent(step, steps)));
            if self.stop.sleep(self.step_interval).await {
                return false;
            }
        }
        true
    }
}

/// Share of `steps` completed after `step`, in whole percent.
fn percent(step: u32, steps: u32) -> u32 {
    (u64::from(step) * 100 / u64::from(steps.max(1))) as u32
}

#[async_trait]
pub trait StageBody: Send + Sync {
    async fn run(&self, ctx: &StageContext) -> StageOutcome;
}

/// Default body printing the stage messages of the product's dummy
/// compiler.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimulatedStage;

#[async_trait]
impl StageBody for SimulatedStage {
    async fn run(&self, ctx: &StageContext) -> StageOutcome {
        let name = &ctx.design;
        match ctx.stage {
            Stage::Synthesis => {
                ctx.message(format!("Synthesizing design: {name}..."));
                for constraint in &ctx.constraints {
                    ctx.message(format!("Constraint: {constraint}"));
                }
                for keep in &ctx.keeps {
                    ctx.message(format!("Keep name: {keep}"));
                }
                if !ctx.progress(|pct| format!("{pct:>2}%")).await {
                    return StageOutcome::Cancelled;
                }
                ctx.message(format!("Design {name} is synthesized!"));
            }
            Stage::Global => {
                ctx.message(format!("Global Placement for design: {name}..."));
                if !ctx.progress(|pct| format!("{pct}%")).await {
                    return StageOutcome::Cancelled;
                }
                ctx.message(format!("Design {name} is globally placed!"));
            }
            stage => {
                let (action, done) = match stage {
                    Stage::IpGen => ("IP generation", "IPs are generated"),
                    Stage::Pack => ("Packing", "is packed"),
                    Stage::Detailed => ("Placement", "is placed"),
                    Stage::Routing => ("Routing", "is routed"),
                    Stage::Sta => ("Timing analysis", "is analyzed"),
                    Stage::Power => ("Power analysis", "is analyzed"),
                    Stage::Bitstream => ("Bitstream generation", "bitstream is generated"),
                    Stage::Synthesis | Stage::Global | Stage::Batch => {
                        return StageOutcome::Failed(format!("{stage} has no simulated body"));
                    }
                };
                ctx.message(format!("{action} for design: {name}..."));
                if ctx.stop.is_stopped() {
                    return StageOutcome::Cancelled;
                }
                ctx.message(format!("Design {name} {done}!"));
            }
        }
        StageOutcome::Completed
    }
}

/// Stage → body table. Stages without an override run [`SimulatedStage`].
#[derive(Clone, Default)]
pub struct StageBodies {
    overrides: HashMap<Stage, Arc<dyn StageBody>>,
}

impl StageBodies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, stage: Stage, body: Arc<dyn StageBody>) -> Self {
        self.overrides.insert(stage, body);
        self
    }

    pub fn get(&self, stage: Stage) -> Arc<dyn StageBody> {
        self.overrides
            .get(&stage)
            .cloned()
            .unwrap_or_else(|| Arc::new(SimulatedStage))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
