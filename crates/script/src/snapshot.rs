//! Session state transfer between interpreters.
//!
//! A [`SessionSnapshot`] captures the user-visible state of one interpreter
//! (procedures and scalar globals) as an ordered list of entries, and
//! replays it into another. The master session seeds a batch interpreter
//! with a full snapshot before the batch runs, and absorbs a variables-only
//! snapshot of the batch interpreter when it finishes.
//!
//! Array-valued globals and the deny-listed globals ([`INTERACTIVE_VAR`],
//! [`ERROR_INFO_VAR`]) are never captured.

use serde::{Deserialize, Serialize};

use crate::interp::{Interpreter, ERROR_INFO_VAR, INTERACTIVE_VAR};
use crate::parser::quote_element;
use crate::value::{Procedure, Value};

/// Globals that never travel between sessions.
pub const EXCLUDED_GLOBALS: [&str; 2] = [INTERACTIVE_VAR, ERROR_INFO_VAR];

/// What a snapshot includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloneMode {
    /// Procedures, then scalar globals.
    Full,
    /// Scalar globals only.
    VariablesOnly,
}

/// One replayable definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SnapshotEntry {
    Procedure {
        name: String,
        params: Vec<String>,
        body: String,
    },
    Variable {
        name: String,
        value: String,
    },
}

impl SnapshotEntry {
    /// The entry written as the script statement it stands for.
    pub fn to_script(&self) -> String {
        match self {
            Self::Procedure { name, params, body } => format!(
                "proc {} {{{}}} {{{body}}}",
                quote_element(name),
                params.iter().map(|p| quote_element(p)).collect::<Vec<_>>().join(" "),
            ),
            Self::Variable { name, value } => {
                format!("set {} {}", quote_element(name), quote_element(value))
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    entries: Vec<SnapshotEntry>,
}

impl SessionSnapshot {
    /// Capture the state of `interp`.
    pub fn capture(interp: &Interpreter, mode: CloneMode) -> Self {
        let mut entries = Vec::new();

        if mode == CloneMode::Full {
            entries.extend(interp.procedures().map(|p| SnapshotEntry::Procedure {
                name: p.name.clone(),
                params: p.params.clone(),
                body: p.body.clone(),
            }));
        }

        for (name, value) in interp.globals() {
            if EXCLUDED_GLOBALS.contains(&name) {
                continue;
            }
            match value {
                Value::Scalar(value) => entries.push(SnapshotEntry::Variable {
                    name: name.to_string(),
                    value: value.clone(),
                }),
                Value::Array(_) => {
                    tracing::trace!(variable = name, "Array variable not transferred");
                }
            }
        }

        Self { entries }
    }

    /// Apply every entry to `interp`, in order.
    pub fn replay_into(&self, interp: &mut Interpreter) {
        for entry in &self.entries {
            match entry {
                SnapshotEntry::Procedure { name, params, body } => {
                    interp.define_proc(Procedure {
                        name: name.clone(),
                        params: params.clone(),
                        body: body.clone(),
                    });
                }
                SnapshotEntry::Variable { name, value } => {
                    interp.set_global(name.clone(), value.clone());
                }
            }
        }
    }

    pub fn entries(&self) -> &[SnapshotEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Captured value of a variable.
    pub fn variable(&self, name: &str) -> Option<&str> {
        self.entries.iter().rev().find_map(|entry| match entry {
            SnapshotEntry::Variable { name: n, value } if n == name => Some(value.as_str()),
            _ => None,
        })
    }

    /// The snapshot as a script, one statement per line.
    pub fn to_script(&self) -> String {
        self.entries
            .iter()
            .map(SnapshotEntry::to_script)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Interpreter {
    /// Capture this interpreter's state with interactive echo suspended.
    pub fn snapshot(&mut self, mode: CloneMode) -> SessionSnapshot {
        self.without_interactive(|interp| SessionSnapshot::capture(interp, mode))
    }

    /// Replay a snapshot into this interpreter with interactive echo
    /// suspended.
    pub fn replay(&mut self, snapshot: &SessionSnapshot) {
        self.without_interactive(|interp| snapshot.replay_into(interp));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use assert_matches::assert_matches;

    use crate::output::BufferedOutput;

    use super::*;

    async fn seeded() -> Interpreter {
        let mut interp = Interpreter::new();
        interp
            .eval(
                "set top counter; set path {a b/c.v}; array set pins {clk A1}\n\
                 proc greet {name {greeting hello}} { return \"$greeting $name\" }",
            )
            .await
            .unwrap();
        interp
    }

    #[tokio::test]
    async fn full_snapshot_lists_procedures_before_variables() {
        let interp = seeded().await;
        let snapshot = SessionSnapshot::capture(&interp, CloneMode::Full);

        assert_matches!(&snapshot.entries()[0], SnapshotEntry::Procedure { name, .. } if name == "greet");
        assert_eq!(snapshot.variable("top"), Some("counter"));
        assert_eq!(snapshot.variable("path"), Some("a b/c.v"));
        assert_eq!(snapshot.len(), 3);
    }

    #[tokio::test]
    async fn replay_reproduces_scalars_and_procedures_but_not_arrays() {
        let mut source = seeded().await;
        let snapshot = source.snapshot(CloneMode::Full);

        let mut target = Interpreter::new();
        target.replay(&snapshot);

        assert_eq!(target.scalar("top"), Some("counter"));
        assert_eq!(target.scalar("path"), Some("a b/c.v"));
        assert!(target.global("pins").is_none());
        assert_eq!(target.eval("greet world").await.unwrap(), "hello world");
    }

    #[tokio::test]
    async fn variables_only_skips_procedures() {
        let mut source = seeded().await;
        let snapshot = source.snapshot(CloneMode::VariablesOnly);
        assert!(snapshot
            .entries()
            .iter()
            .all(|e| matches!(e, SnapshotEntry::Variable { .. })));

        let mut target = Interpreter::new();
        target.replay(&snapshot);
        assert!(target.procedure("greet").is_none());
    }

    #[tokio::test]
    async fn deny_listed_globals_are_excluded_and_flag_is_restored() {
        let out = BufferedOutput::new();
        let mut source = Interpreter::with_output(Arc::new(out.clone()));
        source.set_interactive(true);
        let _ = source.eval("nope").await;
        source.eval("set kept 1").await.unwrap();

        let snapshot = source.snapshot(CloneMode::Full);
        assert_eq!(snapshot.variable(INTERACTIVE_VAR), None);
        assert_eq!(snapshot.variable(ERROR_INFO_VAR), None);
        assert_eq!(snapshot.variable("kept"), Some("1"));
        assert!(source.is_interactive());

        let mut target = Interpreter::new();
        target.set_global(INTERACTIVE_VAR, "1");
        target.replay(&snapshot);
        assert_eq!(target.scalar(INTERACTIVE_VAR), Some("1"));
    }

    #[tokio::test]
    async fn script_form_evaluates_to_the_same_state() {
        let source = seeded().await;
        let snapshot = SessionSnapshot::capture(&source, CloneMode::Full);

        let mut target = Interpreter::new();
        target.eval(&snapshot.to_script()).await.unwrap();
        assert_eq!(target.scalar("path"), Some("a b/c.v"));
        assert_eq!(target.eval("greet you hi").await.unwrap(), "hi you");
    }

    #[tokio::test]
    async fn script_form_keeps_values_with_unbalanced_braces() {
        let mut source = Interpreter::new();
        source
            .eval("set open \"a{\"; set close \"}b\"; set slash \"x\\\\\"")
            .await
            .unwrap();
        let snapshot = source.snapshot(CloneMode::Full);

        let mut target = Interpreter::new();
        target.eval(&snapshot.to_script()).await.unwrap();
        assert_eq!(target.scalar("open"), Some("a{"));
        assert_eq!(target.scalar("close"), Some("}b"));
        assert_eq!(target.scalar("slash"), Some("x\\"));
    }

    #[test]
    fn snapshot_serializes_as_tagged_entries() {
        let mut interp = Interpreter::new();
        interp.set_global("x", "1");
        let json = serde_json::to_value(SessionSnapshot::capture(&interp, CloneMode::Full)).unwrap();
        assert_eq!(json["entries"][0]["kind"], "variable");
        assert_eq!(json["entries"][0]["name"], "x");
    }
}
