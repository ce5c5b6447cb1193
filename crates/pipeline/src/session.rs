//! The master session: an interpreter wired to the engine.

use std::path::PathBuf;
use std::sync::Arc;

use fabflow_core::TaskId;
use fabflow_script::{Interpreter, OutputSink, ScriptError, ScriptResult};

use crate::commands::{self, CommandContext, DispatchMode};
use crate::engine::EngineHandle;
use crate::sink::BusOutput;

pub struct SessionOptions {
    pub mode: DispatchMode,
    /// Directory relative file paths resolve against, usually the
    /// directory of the script being run.
    pub base_dir: Option<PathBuf>,
    /// Interpreter output; defaults to console messages on the engine bus.
    pub output: Option<Arc<dyn OutputSink>>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            mode: DispatchMode::Interactive,
            base_dir: None,
            output: None,
        }
    }
}

pub struct Session {
    interp: Interpreter,
    engine: EngineHandle,
    mode: DispatchMode,
}

impl Session {
    pub fn new(engine: EngineHandle, options: SessionOptions) -> Self {
        let output: Arc<dyn OutputSink> = match options.output {
            Some(output) => output,
            None => Arc::new(BusOutput::new(Arc::clone(engine.bus()))),
        };
        let mut interp = Interpreter::with_output(output);
        commands::register(
            &mut interp,
            CommandContext {
                engine: engine.clone(),
                mode: options.mode,
                base_dir: options.base_dir,
            },
        );
        interp.set_interactive(options.mode == DispatchMode::Interactive);

        Self {
            interp,
            engine,
            mode: options.mode,
        }
    }

    /// Interactive session with default options.
    pub fn interactive(engine: EngineHandle) -> Self {
        Self::new(engine, SessionOptions::default())
    }

    pub async fn eval(&mut self, script: &str) -> ScriptResult {
        self.interp.eval(script).await
    }

    /// Run the command bound to a ledger task, as a progress UI would.
    pub async fn run_task(&mut self, task: TaskId) -> ScriptResult {
        let command = self
            .engine
            .bound_command(task)
            .await
            .map_err(|e| ScriptError::failed(e.to_string()))?
            .ok_or_else(|| ScriptError::failed(format!("No command bound to task {task}")))?;
        tracing::debug!(task = %task, command = %command, "Running bound task command");
        self.interp.eval(&command).await
    }

    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interp
    }

    pub fn interpreter_mut(&mut self) -> &mut Interpreter {
        &mut self.interp
    }
}
