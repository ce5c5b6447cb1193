//! Active design model and the design store contract.
//!
//! The orchestrator only needs to know whether a design is active and to
//! create one; the remaining operations back the project commands
//! (`set_top_module`, `add_design_file`, `add_constraint_file`,
//! `set_as_target`). [`InMemoryDesignStore`] is the default implementation.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Language
// ---------------------------------------------------------------------------

/// HDL dialect of a design file set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    Vhdl1987,
    Vhdl1993,
    Vhdl2000,
    Vhdl2008,
    Verilog1995,
    Verilog2001,
    SystemVerilog2005,
    SystemVerilog2009,
    SystemVerilog2012,
    SystemVerilog2017,
}

impl Language {
    /// Parse a command-line tag such as `-SV_2012`.
    pub fn from_tag(tag: &str) -> Option<Language> {
        let lang = match tag {
            "-VHDL_1987" => Self::Vhdl1987,
            "-VHDL_1993" => Self::Vhdl1993,
            "-VHDL_2000" => Self::Vhdl2000,
            "-VHDL_2008" => Self::Vhdl2008,
            "-V_1995" => Self::Verilog1995,
            "-V_2001" => Self::Verilog2001,
            "-SV_2005" => Self::SystemVerilog2005,
            "-SV_2009" => Self::SystemVerilog2009,
            "-SV_2012" => Self::SystemVerilog2012,
            "-SV_2017" => Self::SystemVerilog2017,
            _ => return None,
        };
        Some(lang)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vhdl1987 => "VHDL_1987",
            Self::Vhdl1993 => "VHDL_1993",
            Self::Vhdl2000 => "VHDL_2000",
            Self::Vhdl2008 => "VHDL_2008",
            Self::Verilog1995 => "VERILOG_1995",
            Self::Verilog2001 => "VERILOG_2001",
            Self::SystemVerilog2005 => "SV_2005",
            Self::SystemVerilog2009 => "SV_2009",
            Self::SystemVerilog2012 => "SV_2012",
            Self::SystemVerilog2017 => "SV_2017",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Design file sets
// ---------------------------------------------------------------------------

/// Files (and pass-through tokens) added by one `add_design_file` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignFileSet {
    pub language: Language,
    /// File paths, `-D` macro definitions and unrecognised tags, in order.
    pub tokens: Vec<String>,
}

impl DesignFileSet {
    /// Build a file set from `add_design_file` arguments.
    ///
    /// Language tags select the dialect; every other token is kept verbatim,
    /// except relative file paths which are resolved against `base_dir` when
    /// one is given.
    pub fn from_args(args: &[String], base_dir: Option<&Path>) -> Result<Self, CoreError> {
        let first = args.first().ok_or_else(|| {
            CoreError::Validation(
                "Incorrect syntax for add_design_file <file(s)> <type (-VHDL_1987, -VHDL_1993, \
                 -VHDL_2000, -VHDL_2008, -V_1995, -V_2001, -SV_2005, -SV_2009, -SV_2012, \
                 -SV_2017)>"
                    .to_string(),
            )
        })?;

        let mut language = if first.contains(".vhd") {
            Language::Vhdl2008
        } else {
            Language::Verilog2001
        };
        let mut tokens = Vec::with_capacity(args.len());

        for arg in args {
            if let Some(lang) = Language::from_tag(arg) {
                language = lang;
            } else if arg.starts_with('-') {
                tokens.push(arg.clone());
            } else {
                tokens.push(resolve_path(arg, base_dir).display().to_string());
            }
        }

        Ok(Self { language, tokens })
    }
}

/// Resolve `file` against `base_dir` unless it is already absolute.
pub fn resolve_path(file: &str, base_dir: Option<&Path>) -> PathBuf {
    let path = PathBuf::from(file);
    match base_dir {
        Some(dir) if path.is_relative() => dir.join(path),
        _ => path,
    }
}

// ---------------------------------------------------------------------------
// Design
// ---------------------------------------------------------------------------

/// The active design and its project settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Design {
    pub name: String,
    pub top_module: Option<String>,
    pub file_sets: Vec<DesignFileSet>,
    pub constraint_files: Vec<PathBuf>,
    /// `(type, name)` pairs recorded by `set_as_target`.
    pub targets: Vec<(String, String)>,
}

impl Design {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            top_module: None,
            file_sets: Vec::new(),
            constraint_files: Vec::new(),
            targets: Vec::new(),
        }
    }
}

/// Project store supplying the active design.
pub trait DesignStore: Send {
    fn active_design(&self) -> Option<&Design>;

    fn create_design(&mut self, name: &str) -> Result<(), CoreError>;

    fn set_top_module(&mut self, name: &str) -> Result<(), CoreError>;

    fn add_design_files(&mut self, files: DesignFileSet) -> Result<(), CoreError>;

    fn add_constraint_file(&mut self, path: PathBuf) -> Result<(), CoreError>;

    fn set_as_target(&mut self, kind: &str, name: &str) -> Result<(), CoreError>;

    fn has_active_design(&self) -> bool {
        self.active_design().is_some()
    }
}

/// Design store that keeps a single design in memory.
#[derive(Debug, Default)]
pub struct InMemoryDesignStore {
    active: Option<Design>,
}

impl InMemoryDesignStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn active_mut(&mut self) -> Result<&mut Design, CoreError> {
        self.active.as_mut().ok_or(CoreError::NoActiveDesign)
    }
}

impl DesignStore for InMemoryDesignStore {
    fn active_design(&self) -> Option<&Design> {
        self.active.as_ref()
    }

    fn create_design(&mut self, name: &str) -> Result<(), CoreError> {
        if self.active.is_some() {
            return Err(CoreError::DesignExists);
        }
        if name.trim().is_empty() {
            return Err(CoreError::Validation(
                "Design name must not be empty".to_string(),
            ));
        }
        self.active = Some(Design::new(name));
        Ok(())
    }

    fn set_top_module(&mut self, name: &str) -> Result<(), CoreError> {
        self.active_mut()?.top_module = Some(name.to_string());
        Ok(())
    }

    fn add_design_files(&mut self, files: DesignFileSet) -> Result<(), CoreError> {
        self.active_mut()?.file_sets.push(files);
        Ok(())
    }

    fn add_constraint_file(&mut self, path: PathBuf) -> Result<(), CoreError> {
        self.active_mut()?.constraint_files.push(path);
        Ok(())
    }

    fn set_as_target(&mut self, kind: &str, name: &str) -> Result<(), CoreError> {
        self.active_mut()?
            .targets
            .push((kind.to_string(), name.to_string()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
