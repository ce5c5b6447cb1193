//! Command dispatch boundary.
//!
//! The named commands a session exposes to its interpreter. Each handler
//! validates its arguments, delegates to the engine and maps the outcome to
//! the interpreter's result. Usage errors are published as console errors
//! and returned as [`ScriptError::Reported`]; they never touch the
//! HardErrorFlag.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use fabflow_core::design::resolve_path;
use fabflow_core::{DesignFileSet, Stage};
use fabflow_script::{CloneMode, CommandHandler, Interpreter, ScriptError, ScriptResult};

use crate::batch::BatchJob;
use crate::engine::{CompileMode, EngineHandle};
use crate::error::EngineError;

/// Which command set a session gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Stages run on spawned workers; `batch` and `update_result` exist.
    Interactive,
    /// Stages run inline; no `batch` / `update_result`.
    Batch,
}

impl DispatchMode {
    pub fn compile_mode(self) -> CompileMode {
        match self {
            Self::Interactive => CompileMode::Async,
            Self::Batch => CompileMode::Inline,
        }
    }
}

#[derive(Clone)]
pub struct CommandContext {
    pub engine: EngineHandle,
    pub mode: DispatchMode,
    /// Directory of the script being run; relative paths resolve against it.
    pub base_dir: Option<PathBuf>,
}

impl CommandContext {
    fn usage(&self, message: impl Into<String>) -> ScriptError {
        let message = message.into();
        self.engine.bus().error(message.clone());
        ScriptError::Reported(message)
    }

    fn engine_error(&self, e: EngineError) -> ScriptError {
        if e.is_published() {
            ScriptError::Reported(e.to_string())
        } else {
            self.usage(e.to_string())
        }
    }

    fn resolve(&self, file: &str) -> PathBuf {
        resolve_path(file, self.base_dir.as_deref())
    }

    /// Read a constraint file and hand its contents to the engine.
    async fn ingest_file(&self, path: PathBuf) -> Result<usize, ScriptError> {
        let text = read_constraints(&path)
            .await
            .map_err(|e| self.engine_error(e))?;
        self.engine
            .ingest_constraints(path, text)
            .await
            .map_err(|e| self.engine_error(e))
    }

    async fn require_design(&self) -> Result<(), ScriptError> {
        match self.engine.has_active_design().await {
            Ok(true) => Ok(()),
            Ok(false) => Err(self.usage(fabflow_core::CoreError::NoActiveDesign.to_string())),
            Err(e) => Err(self.engine_error(e)),
        }
    }
}

/// Register the command set for `ctx.mode` into `interp`.
pub fn register(interp: &mut Interpreter, ctx: CommandContext) {
    let shared = Arc::new(ctx);

    interp.register("help", Help);
    interp.register("create_design", CreateDesign(Arc::clone(&shared)));
    interp.register("set_top_module", SetTopModule(Arc::clone(&shared)));
    interp.register("add_design_file", AddDesignFile(Arc::clone(&shared)));
    interp.register("add_constraint_file", AddConstraintFile(Arc::clone(&shared)));
    interp.register("read_sdc", ReadSdc(Arc::clone(&shared)));
    interp.register("set_pin_loc", SetPinLoc(Arc::clone(&shared)));
    interp.register("set_region_loc", SetRegionLoc(Arc::clone(&shared)));
    interp.register("set_as_target", SetAsTarget(Arc::clone(&shared)));

    for stage in Stage::ALL {
        if stage == Stage::Batch {
            continue;
        }
        let handler: Arc<dyn CommandHandler> = Arc::new(Compile {
            ctx: Arc::clone(&shared),
            stage,
        });
        for name in stage.commands() {
            interp.register_shared(*name, Arc::clone(&handler));
        }
    }

    let stop: Arc<dyn CommandHandler> = Arc::new(Stop(Arc::clone(&shared)));
    interp.register_shared("stop", Arc::clone(&stop));
    interp.register_shared("abort", stop);

    if shared.mode == DispatchMode::Interactive {
        interp.register("batch", Batch(Arc::clone(&shared)));
        interp.register("update_result", UpdateResult(shared));
    }
}

type Ctx = Arc<CommandContext>;

// ---------------------------------------------------------------------------
// Project commands
// ---------------------------------------------------------------------------

const HELP: &[&str] = &[
    "-------------------------",
    "-----  FABFLOW HELP  -----",
    "-------------------------",
    "Commands:",
    "   help                       : This help",
    "   create_design <name>       : Creates a design with <name> name",
    "   add_design_file <file>... <type> (-VHDL_1987, -VHDL_1993, -VHDL_2000, -VHDL_2008, \
     -V_1995, -V_2001, -SV_2005, -SV_2009, -SV_2012, -SV_2017)",
    "   set_top_module <top>       : Sets the top module",
    "   add_constraint_file <file> : Sets SDC + location constraints",
    "     Constraints: set_pin_loc, set_region_loc, all SDC commands",
    "   set_as_target <type> <name>: Marks a file as the target of its type",
    "   ipgenerate",
    "   synthesize (synth)",
    "   packing",
    "   global_placement (globp)",
    "   detailed_placement (place)",
    "   route",
    "   sta",
    "   power",
    "   bitstream",
    "   stop / abort               : Stops every running stage",
    "   batch <command>...         : Runs commands in a background interpreter",
    "   update_result              : Copies the batch variables into this session",
    "-------------------------",
];

struct Help;

#[async_trait]
impl CommandHandler for Help {
    async fn call(&self, interp: &mut Interpreter, _argv: &[String]) -> ScriptResult {
        for line in HELP {
            interp.write_line(line);
        }
        Ok(String::new())
    }
}

struct CreateDesign(Ctx);

#[async_trait]
impl CommandHandler for CreateDesign {
    async fn call(&self, _interp: &mut Interpreter, argv: &[String]) -> ScriptResult {
        let name = match argv {
            [_] => None,
            [_, name] => Some(name.clone()),
            _ => return Err(self.0.usage("Usage: create_design ?name?")),
        };
        self.0
            .engine
            .create_design(name)
            .await
            .map_err(|e| self.0.engine_error(e))?;
        Ok(String::new())
    }
}

struct SetTopModule(Ctx);

#[async_trait]
impl CommandHandler for SetTopModule {
    async fn call(&self, _interp: &mut Interpreter, argv: &[String]) -> ScriptResult {
        let [_, name] = argv else {
            return Err(self.0.usage("Specify a top module name"));
        };
        self.0.require_design().await?;
        self.0
            .engine
            .set_top_module(name.clone())
            .await
            .map_err(|e| self.0.engine_error(e))?;
        Ok(String::new())
    }
}

struct AddDesignFile(Ctx);

#[async_trait]
impl CommandHandler for AddDesignFile {
    async fn call(&self, _interp: &mut Interpreter, argv: &[String]) -> ScriptResult {
        self.0.require_design().await?;
        let files = DesignFileSet::from_args(&argv[1..], self.0.base_dir.as_deref())
            .map_err(|e| self.0.usage(e.to_string()))?;

        self.0.engine.bus().info(format!(
            "Adding {} {}",
            files.language,
            files.tokens.join(" ")
        ));
        self.0
            .engine
            .add_design_files(files)
            .await
            .map_err(|e| self.0.engine_error(e))?;
        Ok(String::new())
    }
}

struct AddConstraintFile(Ctx);

#[async_trait]
impl CommandHandler for AddConstraintFile {
    async fn call(&self, _interp: &mut Interpreter, argv: &[String]) -> ScriptResult {
        self.0.require_design().await?;
        let [_, file] = argv else {
            return Err(self.0.usage("Specify a constraint file name"));
        };
        let path = self.0.resolve(file);

        self.0
            .engine
            .bus()
            .info(format!("Adding constraint file {}", path.display()));
        self.0
            .engine
            .add_constraint_file(path.clone())
            .await
            .map_err(|e| self.0.engine_error(e))?;

        self.0.ingest_file(path).await?;
        Ok(String::new())
    }
}

struct ReadSdc(Ctx);

#[async_trait]
impl CommandHandler for ReadSdc {
    async fn call(&self, _interp: &mut Interpreter, argv: &[String]) -> ScriptResult {
        let [_, file] = argv else {
            return Err(self.0.usage("Usage: read_sdc <file>"));
        };
        self.0.ingest_file(self.0.resolve(file)).await?;
        Ok(String::new())
    }
}

async fn read_constraints(path: &Path) -> Result<String, EngineError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| EngineError::Io {
            path: path.to_path_buf(),
            source,
        })
}

struct SetPinLoc(Ctx);

#[async_trait]
impl CommandHandler for SetPinLoc {
    async fn call(&self, _interp: &mut Interpreter, argv: &[String]) -> ScriptResult {
        self.0
            .engine
            .set_pin_loc(argv[1..].to_vec())
            .await
            .map_err(|e| self.0.engine_error(e))?;
        Ok(String::new())
    }
}

struct SetRegionLoc(Ctx);

#[async_trait]
impl CommandHandler for SetRegionLoc {
    async fn call(&self, _interp: &mut Interpreter, argv: &[String]) -> ScriptResult {
        self.0
            .engine
            .set_region_loc(argv[1..].to_vec())
            .await
            .map_err(|e| self.0.engine_error(e))?;
        Ok(String::new())
    }
}

struct SetAsTarget(Ctx);

#[async_trait]
impl CommandHandler for SetAsTarget {
    async fn call(&self, _interp: &mut Interpreter, argv: &[String]) -> ScriptResult {
        let [_, kind, name] = argv else {
            return Err(self.0.usage("Usage: set_as_target ?type? ?target name?"));
        };
        self.0
            .engine
            .set_as_target(kind.clone(), name.clone())
            .await
            .map_err(|e| self.0.engine_error(e))?;
        Ok(String::new())
    }
}

// ---------------------------------------------------------------------------
// Stage commands
// ---------------------------------------------------------------------------

struct Compile {
    ctx: Ctx,
    stage: Stage,
}

#[async_trait]
impl CommandHandler for Compile {
    async fn call(&self, _interp: &mut Interpreter, _argv: &[String]) -> ScriptResult {
        self.ctx
            .engine
            .compile(self.stage, self.ctx.mode.compile_mode())
            .await
            .map_err(|e| self.ctx.engine_error(e))?;
        Ok(String::new())
    }
}

struct Stop(Ctx);

#[async_trait]
impl CommandHandler for Stop {
    async fn call(&self, _interp: &mut Interpreter, _argv: &[String]) -> ScriptResult {
        let swept = self
            .0
            .engine
            .stop()
            .await
            .map_err(|e| self.0.engine_error(e))?;
        tracing::debug!(swept, "stop command");
        Ok(String::new())
    }
}

// ---------------------------------------------------------------------------
// Session transfer commands (interactive only)
// ---------------------------------------------------------------------------

struct Batch(Ctx);

#[async_trait]
impl CommandHandler for Batch {
    async fn call(&self, interp: &mut Interpreter, argv: &[String]) -> ScriptResult {
        if argv.len() < 2 {
            return Err(self.0.usage("Usage: batch <command>..."));
        }
        let job = BatchJob {
            script: argv[1..].join(" "),
            snapshot: interp.snapshot(CloneMode::Full),
            base_dir: self.0.base_dir.clone(),
        };
        self.0
            .engine
            .compile_batch(job)
            .await
            .map_err(|e| self.0.engine_error(e))?;
        Ok(String::new())
    }
}

struct UpdateResult(Ctx);

#[async_trait]
impl CommandHandler for UpdateResult {
    async fn call(&self, interp: &mut Interpreter, _argv: &[String]) -> ScriptResult {
        let snapshot = self
            .0
            .engine
            .batch_result()
            .await
            .map_err(|e| self.0.engine_error(e))?
            .ok_or_else(|| self.0.engine_error(EngineError::NoBatchResult))?;
        interp.replay(&snapshot);
        Ok(String::new())
    }
}
