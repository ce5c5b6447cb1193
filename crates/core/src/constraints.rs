//! Constraint store.
//!
//! Records constraint files and the directives read from them. The
//! orchestrator only enumerates these for logging; placement and routing
//! bodies are free to consume the pin and region assignments. `keep`
//! directives name nets synthesis must not optimize away.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// `set_pin_loc <port> <pin>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinLocation {
    pub port: String,
    pub pin: String,
}

/// `set_region_loc <instance> <region>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionLocation {
    pub instance: String,
    pub region: String,
}

impl PinLocation {
    fn parse(args: &[&str]) -> Result<Self, CoreError> {
        let [port, pin] = args else {
            return Err(CoreError::Validation(
                "Usage: set_pin_loc <port> <pin>".to_string(),
            ));
        };
        Ok(Self {
            port: port.to_string(),
            pin: pin.to_string(),
        })
    }
}

impl RegionLocation {
    fn parse(args: &[&str]) -> Result<Self, CoreError> {
        let [instance, region] = args else {
            return Err(CoreError::Validation(
                "Usage: set_region_loc <instance> <region>".to_string(),
            ));
        };
        Ok(Self {
            instance: instance.to_string(),
            region: region.to_string(),
        })
    }
}

/// Constraint files read so far and the directives they contained.
#[derive(Debug, Clone, Default)]
pub struct ConstraintStore {
    files: Vec<PathBuf>,
    constraints: Vec<String>,
    pins: Vec<PinLocation>,
    regions: Vec<RegionLocation>,
    keeps: Vec<String>,
}

impl ConstraintStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the contents of a constraint file.
    ///
    /// Every non-empty, non-comment line is kept as a constraint. Pin and
    /// region directives are additionally parsed. Returns the number of
    /// constraints recorded. A malformed directive rejects the whole file
    /// and leaves the store unchanged.
    pub fn ingest(&mut self, path: &Path, text: &str) -> Result<usize, CoreError> {
        let mut constraints = Vec::new();
        let mut pins = Vec::new();
        let mut regions = Vec::new();
        let mut keeps = Vec::new();

        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let words: Vec<&str> = line.split_whitespace().collect();
            let parsed = match words.first().copied() {
                Some("set_pin_loc") => PinLocation::parse(&words[1..]).map(|pin| pins.push(pin)),
                Some("set_region_loc") => {
                    RegionLocation::parse(&words[1..]).map(|region| regions.push(region))
                }
                Some("keep") if words.len() < 2 => Err(CoreError::Validation(
                    "Usage: keep <name> ?<name> ...?".to_string(),
                )),
                Some("keep") => {
                    keeps.extend(words[1..].iter().map(|name| name.to_string()));
                    Ok(())
                }
                _ => Ok(()),
            };
            parsed.map_err(|e| {
                CoreError::Validation(format!("{}:{}: {e}", path.display(), index + 1))
            })?;
            constraints.push(line.to_string());
        }

        let count = constraints.len();
        self.constraints.extend(constraints);
        self.pins.extend(pins);
        self.regions.extend(regions);
        self.keeps.extend(keeps);
        self.files.push(path.to_path_buf());
        Ok(count)
    }

    /// Record a pin assignment from directive arguments.
    pub fn set_pin_loc(&mut self, args: &[&str]) -> Result<(), CoreError> {
        self.pins.push(PinLocation::parse(args)?);
        Ok(())
    }

    /// Record a region assignment from directive arguments.
    pub fn set_region_loc(&mut self, args: &[&str]) -> Result<(), CoreError> {
        self.regions.push(RegionLocation::parse(args)?);
        Ok(())
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn constraints(&self) -> &[String] {
        &self.constraints
    }

    pub fn pins(&self) -> &[PinLocation] {
        &self.pins
    }

    pub fn regions(&self) -> &[RegionLocation] {
        &self.regions
    }

    /// Names from `keep` directives, in file order.
    pub fn keeps(&self) -> &[String] {
        &self.keeps
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const SDC: &str = "\
# clocks
create_clock -period 10 clk

set_pin_loc clk A12
set_region_loc u_core R0
";

    #[test]
    fn ingest_records_directives_and_skips_comments() {
        let mut store = ConstraintStore::new();
        let count = store.ingest(Path::new("top.sdc"), SDC).unwrap();

        assert_eq!(count, 3);
        assert_eq!(store.constraints()[0], "create_clock -period 10 clk");
        assert_eq!(
            store.pins(),
            &[PinLocation {
                port: "clk".into(),
                pin: "A12".into()
            }]
        );
        assert_eq!(store.regions()[0].region, "R0");
        assert_eq!(store.files(), &[PathBuf::from("top.sdc")]);
    }

    #[test]
    fn malformed_directive_reports_line() {
        let mut store = ConstraintStore::new();
        let err = store
            .ingest(Path::new("bad.sdc"), "set_pin_loc clk\n")
            .unwrap_err();
        assert_matches!(&err, CoreError::Validation(msg) if msg.starts_with("bad.sdc:1:"));
        assert!(store.files().is_empty());
    }

    #[test]
    fn failed_ingest_leaves_store_untouched() {
        let mut store = ConstraintStore::new();
        store.ingest(Path::new("top.sdc"), SDC).unwrap();

        let err = store
            .ingest(
                Path::new("x.sdc"),
                "create_clock clk\nset_pin_loc a B1\nset_region_loc u R1\nset_pin_loc bad\n",
            )
            .unwrap_err();
        assert_matches!(&err, CoreError::Validation(msg) if msg.starts_with("x.sdc:4:"));

        assert_eq!(store.constraints().len(), 3);
        assert_eq!(store.pins().len(), 1);
        assert_eq!(store.regions().len(), 1);
        assert_eq!(store.files(), &[PathBuf::from("top.sdc")]);
    }

    #[test]
    fn keep_directives_collect_names() {
        let mut store = ConstraintStore::new();
        let count = store
            .ingest(Path::new("keep.sdc"), "keep u_fifo/wr_ptr
keep a b
")
            .unwrap();

        assert_eq!(count, 2);
        assert_eq!(store.keeps(), &["u_fifo/wr_ptr", "a", "b"]);

        let err = store.ingest(Path::new("bad.sdc"), "keep c
keep
").unwrap_err();
        assert_matches!(&err, CoreError::Validation(msg) if msg.starts_with("bad.sdc:2:"));
        assert_eq!(store.keeps().len(), 3);
    }
}
