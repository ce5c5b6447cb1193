//! Embeddable command interpreter for fabflow sessions.
//!
//! A small Tcl-flavoured language: whitespace-separated words, `{}` literal
//! words, `""` words with substitution, `$var` / `$arr(key)` / `[cmd]`
//! substitution. Hosts extend it by registering [`CommandHandler`]s.
//!
//! The [`snapshot`] module implements the session state transfer used to
//! seed batch interpreters and reflect their results back.

mod builtins;
pub mod error;
pub mod interp;
pub mod output;
mod parser;
pub mod snapshot;
pub mod value;

pub use error::{ScriptError, ScriptResult};
pub use interp::{CommandHandler, Interpreter, ERROR_INFO_VAR, INTERACTIVE_VAR};
pub use output::{BufferedOutput, DiscardOutput, OutputSink, StdoutOutput};
pub use parser::{quote_element, split_list};
pub use snapshot::{CloneMode, SessionSnapshot, SnapshotEntry};
pub use value::{is_truthy, Procedure, Value};
