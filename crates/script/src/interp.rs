//! The command interpreter.
//!
//! [`Interpreter`] evaluates scripts against a name→handler dispatch map.
//! Built-in commands and host commands share the same [`CommandHandler`]
//! contract; user procedures defined with `proc` shadow both.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use indexmap::IndexMap;

use crate::builtins;
use crate::error::{ScriptError, ScriptResult};
use crate::output::{DiscardOutput, OutputSink};
use crate::parser::{self, quote_element, split_list, Part};
use crate::value::{is_truthy, Procedure, Value};

/// Global flag enabling echo of top-level command results.
pub const INTERACTIVE_VAR: &str = "interactive";

/// Global holding the message of the most recent error.
pub const ERROR_INFO_VAR: &str = "errorInfo";

const MAX_DEPTH: usize = 256;

/// A named command callable from scripts.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Run the command. `argv[0]` is the name it was invoked under.
    async fn call(&self, interp: &mut Interpreter, argv: &[String]) -> ScriptResult;
}

/// Non-local exits unwinding through nested evaluation.
enum Interrupt {
    Error(ScriptError),
    Return(String),
}

impl From<ScriptError> for Interrupt {
    fn from(e: ScriptError) -> Self {
        Self::Error(e)
    }
}

#[derive(Default)]
struct Frame {
    locals: IndexMap<String, Value>,
    /// Names declared with `global` in this frame.
    linked: HashSet<String>,
}

pub struct Interpreter {
    globals: IndexMap<String, Value>,
    frames: Vec<Frame>,
    procs: IndexMap<String, Procedure>,
    commands: HashMap<String, Arc<dyn CommandHandler>>,
    output: Arc<dyn OutputSink>,
    depth: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// An interpreter whose output is discarded.
    pub fn new() -> Self {
        Self::with_output(Arc::new(DiscardOutput))
    }

    pub fn with_output(output: Arc<dyn OutputSink>) -> Self {
        let mut interp = Self {
            globals: IndexMap::new(),
            frames: Vec::new(),
            procs: IndexMap::new(),
            commands: HashMap::new(),
            output,
            depth: 0,
        };
        builtins::register(&mut interp);
        interp
    }

    // -- commands -----------------------------------------------------------

    pub fn register(&mut self, name: impl Into<String>, handler: impl CommandHandler + 'static) {
        self.commands.insert(name.into(), Arc::new(handler));
    }

    /// Register one handler under several names.
    pub fn register_shared(&mut self, name: impl Into<String>, handler: Arc<dyn CommandHandler>) {
        self.commands.insert(name.into(), handler);
    }

    pub fn has_command(&self, name: &str) -> bool {
        self.commands.contains_key(name) || self.procs.contains_key(name)
    }

    /// Names of all registered commands, sorted.
    pub fn command_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn output(&self) -> Arc<dyn OutputSink> {
        Arc::clone(&self.output)
    }

    pub fn write_line(&self, line: &str) {
        self.output.write_line(line);
    }

    // -- evaluation ---------------------------------------------------------

    /// Evaluate a script and return the result of its last command.
    ///
    /// Errors are also stored in `errorInfo`. When `interactive` is set, a
    /// non-empty result of a top-level evaluation is echoed to the output.
    pub async fn eval(&mut self, script: &str) -> ScriptResult {
        let top_level = self.depth == 0;
        let result = match self.eval_script(script).await {
            Ok(value) | Err(Interrupt::Return(value)) => Ok(value),
            Err(Interrupt::Error(e)) => Err(e),
        };
        match &result {
            Ok(value) if top_level && !value.is_empty() && self.is_interactive() => {
                self.output.write_line(value);
            }
            Ok(_) => {}
            Err(e) => {
                self.globals
                    .insert(ERROR_INFO_VAR.to_string(), Value::scalar(e.to_string()));
            }
        }
        result
    }

    /// Invoke a single command with already-substituted words.
    pub async fn invoke_command(&mut self, argv: Vec<String>) -> ScriptResult {
        match self.invoke(argv).await {
            Ok(value) | Err(Interrupt::Return(value)) => Ok(value),
            Err(Interrupt::Error(e)) => Err(e),
        }
    }

    fn eval_script<'a>(&'a mut self, script: &'a str) -> BoxFuture<'a, Result<String, Interrupt>> {
        async move {
            let commands = parser::parse(script)?;
            let mut result = String::new();
            for command in &commands {
                let mut argv = Vec::with_capacity(command.len());
                for word in command {
                    argv.push(self.substitute(word).await?);
                }
                result = self.invoke(argv).await?;
            }
            Ok(result)
        }
        .boxed()
    }

    fn substitute<'a>(&'a mut self, word: &'a [Part]) -> BoxFuture<'a, Result<String, Interrupt>> {
        async move {
            let mut out = String::new();
            for part in word {
                match part {
                    Part::Text(text) => out.push_str(text),
                    Part::Var { name, key } => out.push_str(&self.read_var(name, key.as_deref())?),
                    Part::Script(script) => out.push_str(&self.eval_script(script).await?),
                }
            }
            Ok(out)
        }
        .boxed()
    }

    fn invoke(&mut self, argv: Vec<String>) -> BoxFuture<'_, Result<String, Interrupt>> {
        async move {
            if argv.is_empty() {
                return Ok(String::new());
            }
            if self.depth >= MAX_DEPTH {
                return Err(ScriptError::RecursionLimit.into());
            }
            self.depth += 1;
            let result = self.dispatch(&argv).await;
            self.depth -= 1;
            result
        }
        .boxed()
    }

    async fn dispatch(&mut self, argv: &[String]) -> Result<String, Interrupt> {
        let name = argv[0].as_str();

        if name == "return" {
            return match argv {
                [_] => Err(Interrupt::Return(String::new())),
                [_, value] => Err(Interrupt::Return(value.clone())),
                _ => Err(ScriptError::WrongArgs("return ?value?".into()).into()),
            };
        }

        if let Some(procedure) = self.procs.get(name).cloned() {
            return self.call_proc(procedure, argv).await;
        }

        let handler = self
            .commands
            .get(name)
            .cloned()
            .ok_or_else(|| ScriptError::UnknownCommand(name.to_string()))?;
        tracing::trace!(command = name, "dispatch");
        Ok(handler.call(self, argv).await?)
    }

    async fn call_proc(&mut self, procedure: Procedure, argv: &[String]) -> Result<String, Interrupt> {
        let frame = bind_params(&procedure, &argv[1..])?;
        self.frames.push(frame);
        let result = self.eval_script(&procedure.body).await;
        self.frames.pop();
        match result {
            Err(Interrupt::Return(value)) => Ok(value),
            other => other,
        }
    }

    // -- procedures ---------------------------------------------------------

    pub fn define_proc(&mut self, procedure: Procedure) {
        self.procs.insert(procedure.name.clone(), procedure);
    }

    pub fn procedure(&self, name: &str) -> Option<&Procedure> {
        self.procs.get(name)
    }

    /// User-defined procedures in definition order.
    pub fn procedures(&self) -> impl Iterator<Item = &Procedure> {
        self.procs.values()
    }

    // -- globals ------------------------------------------------------------

    pub fn global(&self, name: &str) -> Option<&Value> {
        self.globals.get(name)
    }

    /// Global scalar value, if set and not an array.
    pub fn scalar(&self, name: &str) -> Option<&str> {
        self.globals.get(name).and_then(Value::as_scalar)
    }

    /// Global variables in creation order.
    pub fn globals(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.globals.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Assign a global scalar, replacing whatever was there.
    pub fn set_global(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.globals.insert(name.into(), Value::Scalar(value.into()));
    }

    pub fn set_global_array(&mut self, name: impl Into<String>, entries: IndexMap<String, String>) {
        self.globals.insert(name.into(), Value::Array(entries));
    }

    pub fn unset_global(&mut self, name: &str) -> Option<Value> {
        self.globals.shift_remove(name)
    }

    pub fn is_interactive(&self) -> bool {
        self.scalar(INTERACTIVE_VAR).is_some_and(is_truthy)
    }

    pub fn set_interactive(&mut self, on: bool) {
        self.set_global(INTERACTIVE_VAR, if on { "1" } else { "0" });
    }

    /// Run `f` with interactive echo disabled, restoring the flag exactly
    /// as it was afterwards.
    pub fn without_interactive<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let saved = self.globals.get(INTERACTIVE_VAR).cloned();
        if saved.is_some() {
            self.set_interactive(false);
        }
        let result = f(self);
        match saved {
            Some(value) => {
                self.globals.insert(INTERACTIVE_VAR.to_string(), value);
            }
            None => {
                self.globals.shift_remove(INTERACTIVE_VAR);
            }
        }
        result
    }

    // -- scoped variable access (used by built-ins) --------------------------

    fn lookup(&self, name: &str) -> Option<&Value> {
        match self.frames.last() {
            Some(frame) if !frame.linked.contains(name) => frame.locals.get(name),
            _ => self.globals.get(name),
        }
    }

    fn table_mut(&mut self, name: &str) -> &mut IndexMap<String, Value> {
        match self.frames.last_mut() {
            Some(frame) if !frame.linked.contains(name) => &mut frame.locals,
            _ => &mut self.globals,
        }
    }

    pub(crate) fn in_proc(&self) -> bool {
        !self.frames.is_empty()
    }

    pub(crate) fn link_global(&mut self, name: &str) {
        if let Some(frame) = self.frames.last_mut() {
            frame.linked.insert(name.to_string());
        }
    }

    pub(crate) fn var_exists(&self, name: &str, key: Option<&str>) -> bool {
        match (self.lookup(name), key) {
            (Some(Value::Scalar(_)), None) | (Some(Value::Array(_)), None) => true,
            (Some(Value::Array(map)), Some(key)) => map.contains_key(key),
            _ => false,
        }
    }

    /// Read a variable in the current scope.
    pub fn read_var(&self, name: &str, key: Option<&str>) -> ScriptResult {
        match (self.lookup(name), key) {
            (None, None) => Err(ScriptError::NoSuchVariable(name.to_string())),
            (None, Some(key)) => Err(ScriptError::NoSuchVariable(format!("{name}({key})"))),
            (Some(Value::Scalar(value)), None) => Ok(value.clone()),
            (Some(Value::Scalar(_)), Some(key)) => Err(ScriptError::failed(format!(
                "can't read \"{name}({key})\": variable isn't array"
            ))),
            (Some(Value::Array(_)), None) => Err(ScriptError::failed(format!(
                "can't read \"{name}\": variable is array"
            ))),
            (Some(Value::Array(map)), Some(key)) => map.get(key).cloned().ok_or_else(|| {
                ScriptError::failed(format!(
                    "can't read \"{name}({key})\": no such element in array"
                ))
            }),
        }
    }

    /// Write a variable in the current scope and return the new value.
    pub fn write_var(&mut self, name: &str, key: Option<&str>, value: String) -> ScriptResult {
        match key {
            None => {
                let table = self.table_mut(name);
                if table.get(name).is_some_and(Value::is_array) {
                    return Err(ScriptError::failed(format!(
                        "can't set \"{name}\": variable is array"
                    )));
                }
                table.insert(name.to_string(), Value::Scalar(value.clone()));
            }
            Some(key) => {
                self.array_mut(name)?.insert(key.to_string(), value.clone());
            }
        }
        Ok(value)
    }

    pub(crate) fn remove_var(&mut self, name: &str, key: Option<&str>) -> bool {
        let table = self.table_mut(name);
        match key {
            None => table.shift_remove(name).is_some(),
            Some(key) => match table.get_mut(name) {
                Some(Value::Array(map)) => map.shift_remove(key).is_some(),
                _ => false,
            },
        }
    }

    /// The array `name` in the current scope, created empty if missing.
    pub(crate) fn array_mut(&mut self, name: &str) -> ScriptResult<&mut IndexMap<String, String>> {
        let value = self
            .table_mut(name)
            .entry(name.to_string())
            .or_insert_with(|| Value::Array(IndexMap::new()));
        match value {
            Value::Array(map) => Ok(map),
            Value::Scalar(_) => Err(ScriptError::failed(format!(
                "can't set \"{name}\": variable isn't array"
            ))),
        }
    }

    pub(crate) fn array(&self, name: &str) -> Option<&IndexMap<String, String>> {
        match self.lookup(name) {
            Some(Value::Array(map)) => Some(map),
            _ => None,
        }
    }

    /// Names visible as globals, for `info globals`.
    pub(crate) fn global_names(&self) -> Vec<String> {
        self.globals.keys().cloned().collect()
    }
}

/// Split `name(key)` into its array name and element key.
pub(crate) fn split_element(name: &str) -> (&str, Option<&str>) {
    match (name.find('('), name.strip_suffix(')')) {
        (Some(open), Some(inner)) if open > 0 => (&name[..open], Some(&inner[open + 1..])),
        _ => (name, None),
    }
}

fn bind_params(procedure: &Procedure, args: &[String]) -> ScriptResult<Frame> {
    let wrong_args = || {
        let usage = std::iter::once(procedure.name.as_str())
            .chain(procedure.params.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");
        ScriptError::WrongArgs(usage)
    };

    let mut frame = Frame::default();
    let mut rest = args.iter();
    let last = procedure.params.len().saturating_sub(1);

    for (index, param) in procedure.params.iter().enumerate() {
        let parts = split_list(param)?;
        let (name, default) = match parts.as_slice() {
            [name] => (name.clone(), None),
            [name, default] => (name.clone(), Some(default.clone())),
            _ => {
                return Err(ScriptError::Syntax(format!(
                    "bad parameter \"{param}\" in procedure \"{}\"",
                    procedure.name
                )))
            }
        };

        if name == "args" && index == last {
            let collected: Vec<String> = rest.by_ref().map(|arg| quote_element(arg)).collect();
            frame.locals.insert(name, Value::Scalar(collected.join(" ")));
            break;
        }

        let value = match rest.next() {
            Some(arg) => arg.clone(),
            None => default.ok_or_else(wrong_args)?,
        };
        frame.locals.insert(name, Value::Scalar(value));
    }

    if rest.next().is_some() {
        return Err(wrong_args());
    }
    Ok(frame)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::output::BufferedOutput;

    struct Echo;

    #[async_trait]
    impl CommandHandler for Echo {
        async fn call(&self, _interp: &mut Interpreter, argv: &[String]) -> ScriptResult {
            Ok(argv[1..].join(" "))
        }
    }

    #[tokio::test]
    async fn host_commands_receive_substituted_words() {
        let mut interp = Interpreter::new();
        interp.register("echo", Echo);
        interp.eval("set who world").await.unwrap();
        assert_eq!(interp.eval("echo hello $who [set who]").await.unwrap(), "hello world world");
    }

    #[tokio::test]
    async fn unknown_command_sets_error_info() {
        let mut interp = Interpreter::new();
        let err = interp.eval("frobnicate 1").await.unwrap_err();
        assert_eq!(err, ScriptError::UnknownCommand("frobnicate".into()));
        assert_eq!(interp.scalar(ERROR_INFO_VAR), Some("invalid command name \"frobnicate\""));
    }

    #[tokio::test]
    async fn procedures_have_local_scope() {
        let mut interp = Interpreter::new();
        interp
            .eval("set x outer; proc f {a {b 2}} { set x [append a $b]; return $x }")
            .await
            .unwrap();
        assert_eq!(interp.eval("f 1").await.unwrap(), "12");
        assert_eq!(interp.eval("f 1 5").await.unwrap(), "15");
        assert_eq!(interp.scalar("x"), Some("outer"));
        assert_matches!(interp.eval("f").await, Err(ScriptError::WrongArgs(_)));
    }

    #[tokio::test]
    async fn global_links_into_procedure() {
        let mut interp = Interpreter::new();
        interp
            .eval("set count 1; proc bump {} { global count; incr count }")
            .await
            .unwrap();
        interp.eval("bump; bump").await.unwrap();
        assert_eq!(interp.scalar("count"), Some("3"));
    }

    #[tokio::test]
    async fn variadic_args_collect_the_rest() {
        let mut interp = Interpreter::new();
        interp.eval("proc all {first args} { return $args }").await.unwrap();
        assert_eq!(interp.eval("all a b {c d}").await.unwrap(), "b {c d}");
    }

    #[tokio::test]
    async fn runaway_recursion_is_bounded() {
        let mut interp = Interpreter::new();
        interp.eval("proc loop {} { loop }").await.unwrap();
        assert_matches!(interp.eval("loop").await, Err(ScriptError::RecursionLimit));
    }

    #[tokio::test]
    async fn interactive_echoes_top_level_results_only() {
        let out = BufferedOutput::new();
        let mut interp = Interpreter::with_output(Arc::new(out.clone()));
        interp.eval("set a 1").await.unwrap();
        assert!(out.lines().is_empty());

        interp.set_interactive(true);
        interp.eval("proc f {} { set b 2; set c 3 }").await.unwrap();
        interp.eval("f").await.unwrap();
        assert_eq!(out.take(), vec!["3"]);
    }

    #[test]
    fn without_interactive_restores_previous_flag() {
        let mut interp = Interpreter::new();
        interp.without_interactive(|i| assert!(!i.is_interactive()));
        assert!(interp.global(INTERACTIVE_VAR).is_none());

        interp.set_global(INTERACTIVE_VAR, "yes");
        interp.without_interactive(|i| assert!(!i.is_interactive()));
        assert_eq!(interp.scalar(INTERACTIVE_VAR), Some("yes"));
    }

    #[test]
    fn element_names_split() {
        assert_eq!(split_element("a(k)"), ("a", Some("k")));
        assert_eq!(split_element("a(x y)"), ("a", Some("x y")));
        assert_eq!(split_element("plain"), ("plain", None));
        assert_eq!(split_element("(odd)"), ("(odd)", None));
    }
}
