//! Execution engine.
//!
//! A single actor task owns the design state, the task ledger, the
//! HardErrorFlag, the StopFlag, the live-worker registry, the design and
//! constraint stores and the last batch result. Callers talk to it through
//! a cloneable [`EngineHandle`]; stage workers report back over the same
//! request channel. The actor never awaits while handling a request, so a
//! stop always gets through while stages are running.
//!
//! Compile sequence:
//! 1. A second non-batch stage while one is registered is rejected as busy.
//! 2. A set HardErrorFlag is cleared and the compile fails without running.
//! 3. The StopFlag is cleared and the ledger task goes `InProgress`.
//! 4. Entry stages create the default design when none is active.
//! 5. Preconditions are checked; a rejection is a stage error.
//! 6. A worker is spawned and registered. Inline compiles reply when the
//!    worker finishes; async compiles reply immediately.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use fabflow_core::constraints::PinLocation;
use fabflow_core::{
    ConstraintStore, Design, DesignFileSet, DesignState, DesignStore, InMemoryDesignStore, Stage,
    TaskId, TaskLedger, TaskRecord, TaskStatus,
};
use fabflow_events::{EventBus, FlowEvent, FlowEventKind, WorkerExit};
use fabflow_script::SessionSnapshot;
use futures::future::{BoxFuture, FutureExt};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::batch::{self, BatchJob, BatchOutput};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::registry::{WorkerHandle, WorkerInfo, WorkerRegistry};
use crate::stages::{StageBodies, StageBody, StageContext, StageOutcome, StopSignal};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Where the caller waits for the stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileMode {
    /// Reply once the stage body has finished.
    Inline,
    /// Reply as soon as the worker is spawned.
    Async,
}

/// How a compile request was carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileOutcome {
    /// The stage ran to completion before the reply.
    Completed,
    /// The stage runs on the registered worker `worker_id`.
    Spawned { worker_id: Uuid },
}

/// Point-in-time view of the engine.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub state: DesignState,
    pub design: Option<Design>,
    pub hard_error: bool,
    pub stop_requested: bool,
    /// Registered workers.
    pub workers: Vec<WorkerInfo>,
    /// Workers that have not reported back yet, swept ones included.
    pub running: usize,
    pub tasks: Vec<TaskRecord>,
    pub constraints: Vec<String>,
    pub pins: Vec<PinLocation>,
}

impl EngineStatus {
    pub fn task_status(&self, id: TaskId) -> TaskStatus {
        self.tasks
            .iter()
            .find(|record| record.id == id)
            .map(|record| record.status)
            .unwrap_or_default()
    }
}

/// Outcome a worker reports back to the engine.
pub(crate) struct WorkerResult {
    pub outcome: StageOutcome,
    pub batch: Option<BatchOutput>,
}

impl From<StageOutcome> for WorkerResult {
    fn from(outcome: StageOutcome) -> Self {
        Self {
            outcome,
            batch: None,
        }
    }
}

type Reply<T> = oneshot::Sender<Result<T, EngineError>>;

enum DesignOp {
    Create(Option<String>),
    SetTopModule(String),
    AddFiles(DesignFileSet),
    AddConstraintFile(PathBuf),
    SetAsTarget { kind: String, name: String },
    PinLoc(Vec<String>),
    RegionLoc(Vec<String>),
}

enum Request {
    Compile {
        stage: Stage,
        mode: CompileMode,
        batch: Option<BatchJob>,
        reply: Reply<CompileOutcome>,
    },
    WorkerDone {
        worker_id: Uuid,
        stage: Stage,
        result: WorkerResult,
    },
    Stop {
        sweep: bool,
        reply: oneshot::Sender<usize>,
    },
    ReportError {
        message: String,
    },
    Design {
        op: DesignOp,
        reply: Reply<()>,
    },
    IngestConstraints {
        path: PathBuf,
        text: String,
        reply: Reply<usize>,
    },
    Status {
        reply: oneshot::Sender<EngineStatus>,
    },
    BoundCommand {
        task: TaskId,
        reply: oneshot::Sender<Option<String>>,
    },
    BindCommand {
        task: TaskId,
        command: String,
    },
    BatchResult {
        reply: oneshot::Sender<Option<SessionSnapshot>>,
    },
    WaitIdle {
        reply: oneshot::Sender<()>,
    },
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Configures and starts an engine. Defaults to a fresh bus, an in-memory
/// design store and simulated stage bodies.
pub struct EngineBuilder {
    config: EngineConfig,
    bus: Option<Arc<EventBus>>,
    store: Box<dyn DesignStore>,
    bodies: StageBodies,
}

impl EngineBuilder {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            bus: None,
            store: Box::new(InMemoryDesignStore::new()),
            bodies: StageBodies::new(),
        }
    }

    /// Publish on an existing bus instead of creating one.
    pub fn bus(mut self, bus: Arc<EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn design_store(mut self, store: Box<dyn DesignStore>) -> Self {
        self.store = store;
        self
    }

    pub fn stage_body(mut self, stage: Stage, body: Arc<dyn StageBody>) -> Self {
        self.bodies = self.bodies.with(stage, body);
        self
    }

    /// Start the engine task. Must be called inside a Tokio runtime.
    ///
    /// The engine runs until every [`EngineHandle`] and every worker is
    /// gone.
    pub fn spawn(self) -> EngineHandle {
        let bus = self
            .bus
            .unwrap_or_else(|| Arc::new(EventBus::new(self.config.event_capacity)));
        let (tx, rx) = mpsc::channel(self.config.request_capacity.max(1));

        let engine = Engine {
            config: self.config,
            bus: Arc::clone(&bus),
            bodies: self.bodies,
            store: self.store,
            constraints: ConstraintStore::new(),
            state: DesignState::default(),
            ledger: TaskLedger::with_stage_commands(),
            hard_error: false,
            stop: Arc::new(AtomicBool::new(false)),
            registry: WorkerRegistry::new(),
            running: HashSet::new(),
            owners: HashMap::new(),
            inline_replies: HashMap::new(),
            idle_waiters: Vec::new(),
            batch_result: None,
            requests: tx.downgrade(),
        };
        tokio::spawn(engine.run(rx));

        EngineHandle { requests: tx, bus }
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Cloneable client of the engine actor.
#[derive(Clone)]
pub struct EngineHandle {
    requests: mpsc::Sender<Request>,
    bus: Arc<EventBus>,
}

impl EngineHandle {
    /// Start an engine with default collaborators.
    pub fn spawn(config: EngineConfig) -> Self {
        EngineBuilder::new(config).spawn()
    }

    pub fn builder(config: EngineConfig) -> EngineBuilder {
        EngineBuilder::new(config)
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FlowEvent> {
        self.bus.subscribe()
    }

    async fn send(&self, request: Request) -> Result<(), EngineError> {
        self.requests
            .send(request)
            .await
            .map_err(|_| EngineError::Closed)
    }

    async fn call<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Request) -> Result<T, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.send(make(reply)).await?;
        rx.await.map_err(|_| EngineError::Closed)
    }

    /// Run a pipeline stage.
    pub async fn compile(&self, stage: Stage, mode: CompileMode) -> Result<CompileOutcome, EngineError> {
        self.call(|reply| Request::Compile {
            stage,
            mode,
            batch: None,
            reply,
        })
        .await?
    }

    /// Start a batch worker. Always asynchronous; returns the worker id.
    pub async fn compile_batch(&self, job: BatchJob) -> Result<Uuid, EngineError> {
        let outcome = self
            .call(|reply| Request::Compile {
                stage: Stage::Batch,
                mode: CompileMode::Async,
                batch: Some(job),
                reply,
            })
            .await??;
        match outcome {
            CompileOutcome::Spawned { worker_id } => Ok(worker_id),
            CompileOutcome::Completed => Ok(Uuid::nil()),
        }
    }

    /// `stop` / `abort`: raise the StopFlag, mark the running task stopped
    /// and sweep the worker registry. Returns the number of workers swept.
    ///
    /// Returns once the registry is cleared, without waiting for the
    /// workers to exit.
    pub async fn stop(&self) -> Result<usize, EngineError> {
        self.call(|reply| Request::Stop { sweep: true, reply }).await
    }

    /// Raise the StopFlag and mark the running task stopped, leaving the
    /// registry alone.
    pub async fn request_stop(&self) -> Result<(), EngineError> {
        self.call(|reply| Request::Stop { sweep: false, reply })
            .await
            .map(|_| ())
    }

    /// Publish an error and set the HardErrorFlag.
    pub async fn report_error(&self, message: impl Into<String>) -> Result<(), EngineError> {
        self.send(Request::ReportError {
            message: message.into(),
        })
        .await
    }

    pub async fn status(&self) -> Result<EngineStatus, EngineError> {
        self.call(|reply| Request::Status { reply }).await
    }

    pub async fn has_active_design(&self) -> Result<bool, EngineError> {
        Ok(self.status().await?.design.is_some())
    }

    async fn design_op(&self, op: DesignOp) -> Result<(), EngineError> {
        self.call(|reply| Request::Design { op, reply }).await?
    }

    /// Create the active design; `None` uses the configured default name.
    pub async fn create_design(&self, name: Option<String>) -> Result<(), EngineError> {
        self.design_op(DesignOp::Create(name)).await
    }

    pub async fn set_top_module(&self, name: impl Into<String>) -> Result<(), EngineError> {
        self.design_op(DesignOp::SetTopModule(name.into())).await
    }

    pub async fn add_design_files(&self, files: DesignFileSet) -> Result<(), EngineError> {
        self.design_op(DesignOp::AddFiles(files)).await
    }

    pub async fn add_constraint_file(&self, path: PathBuf) -> Result<(), EngineError> {
        self.design_op(DesignOp::AddConstraintFile(path)).await
    }

    pub async fn set_as_target(&self, kind: impl Into<String>, name: impl Into<String>) -> Result<(), EngineError> {
        self.design_op(DesignOp::SetAsTarget {
            kind: kind.into(),
            name: name.into(),
        })
        .await
    }

    pub async fn set_pin_loc(&self, args: Vec<String>) -> Result<(), EngineError> {
        self.design_op(DesignOp::PinLoc(args)).await
    }

    pub async fn set_region_loc(&self, args: Vec<String>) -> Result<(), EngineError> {
        self.design_op(DesignOp::RegionLoc(args)).await
    }

    /// Record the contents of a constraint file. Returns the number of
    /// constraints read.
    pub async fn ingest_constraints(&self, path: PathBuf, text: String) -> Result<usize, EngineError> {
        self.call(|reply| Request::IngestConstraints { path, text, reply })
            .await?
    }

    /// Command bound to a ledger task.
    pub async fn bound_command(&self, task: TaskId) -> Result<Option<String>, EngineError> {
        self.call(|reply| Request::BoundCommand { task, reply }).await
    }

    pub async fn bind_run_command(&self, task: TaskId, command: impl Into<String>) -> Result<(), EngineError> {
        self.send(Request::BindCommand {
            task,
            command: command.into(),
        })
        .await
    }

    /// Variables published by the last finished batch.
    pub async fn batch_result(&self) -> Result<Option<SessionSnapshot>, EngineError> {
        self.call(|reply| Request::BatchResult { reply }).await
    }

    /// Resolves once every spawned worker has reported back.
    pub async fn wait_idle(&self) -> Result<(), EngineError> {
        self.call(|reply| Request::WaitIdle { reply }).await
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

struct Engine {
    config: EngineConfig,
    bus: Arc<EventBus>,
    bodies: StageBodies,
    store: Box<dyn DesignStore>,
    constraints: ConstraintStore,
    state: DesignState,
    ledger: TaskLedger,
    hard_error: bool,
    stop: Arc<AtomicBool>,
    registry: WorkerRegistry,
    /// Spawned workers that have not reported back.
    running: HashSet<Uuid>,
    /// Worker currently owning each ledger task.
    owners: HashMap<TaskId, Uuid>,
    inline_replies: HashMap<Uuid, Reply<CompileOutcome>>,
    idle_waiters: Vec<oneshot::Sender<()>>,
    batch_result: Option<SessionSnapshot>,
    requests: mpsc::WeakSender<Request>,
}

impl Engine {
    async fn run(mut self, mut requests: mpsc::Receiver<Request>) {
        tracing::info!("Compile engine started");
        while let Some(request) = requests.recv().await {
            self.handle(request);
        }
        let swept = self.registry.sweep();
        tracing::info!(swept, "Compile engine stopped");
    }

    fn handle(&mut self, request: Request) {
        match request {
            Request::Compile {
                stage,
                mode,
                batch,
                reply,
            } => self.compile(stage, mode, batch, reply),
            Request::WorkerDone {
                worker_id,
                stage,
                result,
            } => self.worker_done(worker_id, stage, result),
            Request::Stop { sweep, reply } => {
                let _ = reply.send(self.stop(sweep));
            }
            Request::ReportError { message } => self.report_error(message),
            Request::Design { op, reply } => {
                let _ = reply.send(self.design_op(op));
            }
            Request::IngestConstraints { path, text, reply } => {
                let _ = reply.send(self.ingest(&path, &text));
            }
            Request::Status { reply } => {
                let _ = reply.send(self.status());
            }
            Request::BoundCommand { task, reply } => {
                let _ = reply.send(self.ledger.bound_command(task).map(str::to_string));
            }
            Request::BindCommand { task, command } => self.ledger.bind_run_command(task, command),
            Request::BatchResult { reply } => {
                let _ = reply.send(self.batch_result.clone());
            }
            Request::WaitIdle { reply } => {
                if self.running.is_empty() {
                    let _ = reply.send(());
                } else {
                    self.idle_waiters.push(reply);
                }
            }
        }
    }

    // -- compile ------------------------------------------------------------

    fn compile(
        &mut self,
        stage: Stage,
        mode: CompileMode,
        batch: Option<BatchJob>,
        reply: Reply<CompileOutcome>,
    ) {
        if stage != Stage::Batch {
            if let Some(busy) = self.registry.busy_stage() {
                tracing::info!(stage = %stage, running = %busy, "Compile rejected, stage in flight");
                let _ = reply.send(Err(EngineError::Busy(busy)));
                return;
            }
        }

        if self.hard_error {
            self.hard_error = false;
            tracing::info!(stage = %stage, "Compile skipped, hard error consumed");
            let _ = reply.send(Err(EngineError::HardError));
            return;
        }

        self.stop.store(false, Ordering::SeqCst);
        let task = stage.task_id();
        if let Some(task) = task {
            self.set_status(task, TaskStatus::InProgress);
        }

        if stage.auto_creates_design() && !self.store.has_active_design() {
            let name = self.config.default_design.clone();
            if let Err(e) = self.create_design(&name) {
                self.fail_stage(task, e.to_string());
                let _ = reply.send(Err(EngineError::StageFailed {
                    stage,
                    message: e.to_string(),
                }));
                return;
            }
        }

        if let Err(rejection) = stage.check(self.state, self.store.has_active_design()) {
            tracing::info!(stage = %stage, reason = %rejection, "Stage precondition failed");
            self.fail_stage(task, rejection.to_string());
            let _ = reply.send(Err(EngineError::Rejected(rejection)));
            return;
        }

        let Some(requests) = self.requests.upgrade() else {
            let _ = reply.send(Err(EngineError::Closed));
            return;
        };

        let worker_id = self.spawn_worker(stage, batch, requests);
        if let Some(task) = task {
            self.owners.insert(task, worker_id);
        }

        match mode {
            CompileMode::Inline => {
                self.inline_replies.insert(worker_id, reply);
            }
            CompileMode::Async => {
                let _ = reply.send(Ok(CompileOutcome::Spawned { worker_id }));
            }
        }
    }

    fn spawn_worker(
        &mut self,
        stage: Stage,
        batch: Option<BatchJob>,
        requests: mpsc::Sender<Request>,
    ) -> Uuid {
        let token = CancellationToken::new();
        let handle = WorkerHandle::new(stage, token.clone());
        let worker_id = handle.id;
        let name = handle.name();

        let ctx = StageContext {
            stage,
            design: self
                .store
                .active_design()
                .map(|design| design.name.clone())
                .unwrap_or_default(),
            constraints: self.constraints.constraints().to_vec(),
            keeps: self.constraints.keeps().to_vec(),
            stop: StopSignal::new(Arc::clone(&self.stop), token),
            bus: Arc::clone(&self.bus),
            step_interval: self.config.step_interval,
            progress_steps: self.config.progress_steps,
        };

        let work: BoxFuture<'static, WorkerResult> = match batch {
            Some(job) => {
                let engine = EngineHandle {
                    requests: requests.clone(),
                    bus: Arc::clone(&self.bus),
                };
                batch::run(job, ctx, engine).boxed()
            }
            None => {
                let body = self.bodies.get(stage);
                async move { WorkerResult::from(body.run(&ctx).await) }.boxed()
            }
        };

        tokio::spawn(async move {
            let result = match tokio::spawn(work).await {
                Ok(result) => result,
                Err(e) => WorkerResult::from(StageOutcome::Failed(format!(
                    "Worker {name} aborted: {e}"
                ))),
            };
            if requests
                .send(Request::WorkerDone {
                    worker_id,
                    stage,
                    result,
                })
                .await
                .is_err()
            {
                tracing::warn!(worker_id = %worker_id, worker = name, "Engine gone before worker finished");
            }
        });

        self.registry.register(handle);
        self.running.insert(worker_id);
        tracing::info!(stage = %stage, worker_id = %worker_id, worker = name, "Stage worker spawned");
        self.bus.publish(FlowEvent::new(FlowEventKind::WorkerStarted {
            worker_id,
            name: name.to_string(),
            stage,
        }));
        worker_id
    }

    fn worker_done(&mut self, worker_id: Uuid, stage: Stage, result: WorkerResult) {
        let registered = self.registry.remove(worker_id).is_some();
        self.running.remove(&worker_id);

        // A task whose worker was stopped (or superseded) is no longer ours
        // to update.
        let task = stage.task_id();
        let owns = match task {
            Some(task) if self.owners.get(&task) == Some(&worker_id) => {
                self.owners.remove(&task);
                true
            }
            Some(_) => false,
            None => true,
        };

        let exit = match result.outcome {
            StageOutcome::Completed => WorkerExit::Completed,
            StageOutcome::Failed(_) => WorkerExit::Failed,
            StageOutcome::Cancelled => WorkerExit::Cancelled,
        };
        tracing::info!(
            stage = %stage,
            worker_id = %worker_id,
            exit = ?exit,
            registered,
            "Stage worker finished",
        );
        self.bus.publish(FlowEvent::new(FlowEventKind::WorkerFinished {
            worker_id,
            name: stage.worker_name().to_string(),
            stage,
            exit,
        }));

        let reply = match result.outcome {
            StageOutcome::Completed if owns => {
                if let Some(next) = stage.produces() {
                    self.transition(next);
                }
                if let Some(task) = task {
                    self.set_status(task, TaskStatus::Success);
                }
                Ok(CompileOutcome::Completed)
            }
            StageOutcome::Completed => Err(EngineError::Cancelled(stage)),
            StageOutcome::Failed(message) => {
                if owns {
                    self.fail_stage(task, message.clone());
                } else {
                    tracing::warn!(stage = %stage, error = %message, "Stopped stage failed");
                }
                Err(EngineError::StageFailed { stage, message })
            }
            StageOutcome::Cancelled => {
                if owns {
                    if let Some(task) = task {
                        self.set_status(task, TaskStatus::Cancelled);
                    }
                }
                Err(EngineError::Cancelled(stage))
            }
        };

        if let Some(output) = result.batch {
            self.bus.publish(FlowEvent::new(FlowEventKind::BatchFinished {
                success: output.success,
            }));
            self.batch_result = Some(output.snapshot);
        }

        if let Some(waiting) = self.inline_replies.remove(&worker_id) {
            let _ = waiting.send(reply);
        }

        if self.running.is_empty() {
            for waiter in self.idle_waiters.drain(..) {
                let _ = waiter.send(());
            }
        }
    }

    // -- stop / errors ------------------------------------------------------

    fn stop(&mut self, sweep: bool) -> usize {
        self.stop.store(true, Ordering::SeqCst);
        for change in self.ledger.stop_current() {
            self.owners.remove(&change.task);
            self.bus
                .publish(FlowEvent::new(FlowEventKind::TaskStatusChanged(change)));
        }
        if !sweep {
            tracing::info!("Stop requested");
            return 0;
        }
        let count = self.registry.sweep();
        tracing::info!(swept = count, "Stop requested, worker registry swept");
        self.bus
            .publish(FlowEvent::new(FlowEventKind::WorkersSwept { count }));
        count
    }

    fn report_error(&mut self, message: String) {
        self.bus.error(message);
        self.hard_error = true;
    }

    /// Stage error: message, HardErrorFlag for the next compile, ledger
    /// `Fail`.
    fn fail_stage(&mut self, task: Option<TaskId>, message: String) {
        self.report_error(message);
        if let Some(task) = task {
            self.owners.remove(&task);
            self.set_status(task, TaskStatus::Fail);
        }
    }

    fn set_status(&mut self, task: TaskId, status: TaskStatus) {
        if let Some(change) = self.ledger.set_status(task, status) {
            tracing::debug!(task = %task, from = ?change.from, to = ?change.to, "Task status changed");
            self.bus
                .publish(FlowEvent::new(FlowEventKind::TaskStatusChanged(change)));
        }
    }

    fn transition(&mut self, next: DesignState) {
        let from = self.state;
        self.state = next;
        if from != next {
            tracing::info!(from = %from, to = %next, "Design state changed");
            self.bus
                .publish(FlowEvent::new(FlowEventKind::DesignStateChanged { from, to: next }));
        }
    }

    // -- design and constraints ---------------------------------------------

    fn create_design(&mut self, name: &str) -> Result<(), EngineError> {
        self.store.create_design(name)?;
        self.state = DesignState::Uninitialized;
        self.bus.info(format!("Created design source: {name}"));
        Ok(())
    }

    fn design_op(&mut self, op: DesignOp) -> Result<(), EngineError> {
        match op {
            DesignOp::Create(name) => {
                let name = name.unwrap_or_else(|| self.config.default_design.clone());
                self.create_design(&name)
            }
            DesignOp::SetTopModule(name) => Ok(self.store.set_top_module(&name)?),
            DesignOp::AddFiles(files) => Ok(self.store.add_design_files(files)?),
            DesignOp::AddConstraintFile(path) => Ok(self.store.add_constraint_file(path)?),
            DesignOp::SetAsTarget { kind, name } => Ok(self.store.set_as_target(&kind, &name)?),
            DesignOp::PinLoc(args) => {
                let args: Vec<&str> = args.iter().map(String::as_str).collect();
                Ok(self.constraints.set_pin_loc(&args)?)
            }
            DesignOp::RegionLoc(args) => {
                let args: Vec<&str> = args.iter().map(String::as_str).collect();
                Ok(self.constraints.set_region_loc(&args)?)
            }
        }
    }

    fn ingest(&mut self, path: &Path, text: &str) -> Result<usize, EngineError> {
        let count = self.constraints.ingest(path, text)?;
        tracing::debug!(path = %path.display(), count, "Constraints recorded");
        Ok(count)
    }

    fn status(&self) -> EngineStatus {
        EngineStatus {
            state: self.state,
            design: self.store.active_design().cloned(),
            hard_error: self.hard_error,
            stop_requested: self.stop.load(Ordering::SeqCst),
            workers: self.registry.infos(),
            running: self.running.len(),
            tasks: self.ledger.records().cloned().collect(),
            constraints: self.constraints.constraints().to_vec(),
            pins: self.constraints.pins().to_vec(),
        }
    }
}
