//! Project and constraint commands of the dispatch boundary.

mod common;

use std::fs;
use std::path::Path;
use std::sync::Arc;

use fabflow_core::{DesignState, Language};
use fabflow_pipeline::{DispatchMode, EngineHandle, Session, SessionOptions};
use fabflow_script::{BufferedOutput, ScriptError};

use common::{drain, errors, idle, messages, status};

fn session_in(engine: &EngineHandle, dir: &Path, mode: DispatchMode) -> Session {
    Session::new(
        engine.clone(),
        SessionOptions {
            mode,
            base_dir: Some(dir.to_path_buf()),
            output: Some(Arc::new(BufferedOutput::new())),
        },
    )
}

#[tokio::test]
async fn constraint_file_is_read_relative_to_the_script() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("pins.sdc"),
        "# clocks\ncreate_clock -period 5 clk\nset_pin_loc clk A1\n\nset_region_loc core R0\n",
    )
    .unwrap();

    let engine = common::engine();
    let mut rx = engine.subscribe();
    let mut session = session_in(&engine, dir.path(), DispatchMode::Batch);

    session
        .eval("create_design foo; add_constraint_file pins.sdc; synthesize")
        .await
        .unwrap();

    let snapshot = status(&engine).await;
    let design = snapshot.design.unwrap();
    assert_eq!(design.constraint_files, vec![dir.path().join("pins.sdc")]);
    assert_eq!(
        snapshot.constraints,
        vec![
            "create_clock -period 5 clk".to_string(),
            "set_pin_loc clk A1".to_string(),
            "set_region_loc core R0".to_string(),
        ]
    );
    assert_eq!(snapshot.pins.len(), 1);
    assert_eq!(snapshot.pins[0].port, "clk");

    let lines = messages(&drain(&mut rx));
    let adding = format!("Adding constraint file {}", dir.path().join("pins.sdc").display());
    assert!(lines.contains(&adding));
    assert!(lines.contains(&"Constraint: create_clock -period 5 clk".to_string()));
    assert!(lines.contains(&"Constraint: set_pin_loc clk A1".to_string()));
}

#[tokio::test]
async fn constraint_file_resolves_once_against_a_relative_base_dir() {
    let dir = tempfile::Builder::new()
        .prefix("scripts")
        .tempdir_in(".")
        .unwrap();
    fs::write(dir.path().join("pins.sdc"), "set_pin_loc clk A1\n").unwrap();
    let relative = Path::new(dir.path().file_name().unwrap());

    let engine = common::engine();
    let mut session = session_in(&engine, relative, DispatchMode::Batch);

    session
        .eval("create_design foo; add_constraint_file pins.sdc")
        .await
        .unwrap();
    session.eval("read_sdc pins.sdc").await.unwrap();

    let snapshot = status(&engine).await;
    assert_eq!(
        snapshot.design.unwrap().constraint_files,
        vec![relative.join("pins.sdc")]
    );
    assert_eq!(snapshot.constraints, vec!["set_pin_loc clk A1", "set_pin_loc clk A1"]);
}

#[tokio::test]
async fn malformed_constraint_file_records_nothing() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("bad.sdc"),
        "create_clock clk\nset_pin_loc a B1\nset_pin_loc bad\n",
    )
    .unwrap();

    let engine = common::engine();
    let mut rx = engine.subscribe();
    let mut session = session_in(&engine, dir.path(), DispatchMode::Batch);

    session.eval("create_design foo").await.unwrap();
    assert!(session.eval("add_constraint_file bad.sdc").await.is_err());

    let snapshot = status(&engine).await;
    assert!(snapshot.constraints.is_empty());
    assert!(snapshot.pins.is_empty());
    let errors = errors(&drain(&mut rx));
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("bad.sdc:3:"), "{}", errors[0]);
}

#[tokio::test]
async fn missing_constraint_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let engine = common::engine();
    let mut rx = engine.subscribe();
    let mut session = session_in(&engine, dir.path(), DispatchMode::Interactive);

    session.eval("create_design foo").await.unwrap();
    let err = session.eval("add_constraint_file nope.sdc").await.unwrap_err();
    assert!(err.is_reported());

    let errors = errors(&drain(&mut rx));
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("Cannot read"), "{}", errors[0]);
    assert!(!status(&engine).await.hard_error);
}

#[tokio::test]
async fn design_files_resolve_against_the_script_directory() {
    let dir = tempfile::tempdir().unwrap();
    let engine = common::engine();
    let mut rx = engine.subscribe();
    let mut session = session_in(&engine, dir.path(), DispatchMode::Interactive);

    session
        .eval("create_design foo; add_design_file rtl/a.vhd rtl/b.vhd -VHDL_1993; set_top_module top")
        .await
        .unwrap();
    session
        .eval("add_design_file /abs/c.sv -DWIDTH=8 -SV_2017")
        .await
        .unwrap();

    let design = status(&engine).await.design.unwrap();
    assert_eq!(design.top_module.as_deref(), Some("top"));
    assert_eq!(design.file_sets.len(), 2);
    assert_eq!(design.file_sets[0].language, Language::Vhdl1993);
    assert_eq!(
        design.file_sets[0].tokens,
        vec![
            dir.path().join("rtl/a.vhd").display().to_string(),
            dir.path().join("rtl/b.vhd").display().to_string(),
        ]
    );
    assert_eq!(design.file_sets[1].language, Language::SystemVerilog2017);
    assert_eq!(design.file_sets[1].tokens, vec!["/abs/c.sv", "-DWIDTH=8"]);

    let lines = messages(&drain(&mut rx));
    assert!(lines.contains(&"Adding SV_2017 /abs/c.sv -DWIDTH=8".to_string()));
}

#[tokio::test]
async fn add_design_file_needs_arguments() {
    let engine = common::engine();
    let mut rx = engine.subscribe();
    let (mut session, _) = common::session(&engine, DispatchMode::Interactive);

    session.eval("create_design").await.unwrap();
    assert!(session.eval("add_design_file").await.is_err());

    let errors = errors(&drain(&mut rx));
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("Incorrect syntax for add_design_file"));
    assert_eq!(
        status(&engine).await.design.map(|d| d.name),
        Some("noname".to_string())
    );
}

#[tokio::test]
async fn pin_and_region_commands_record_locations() {
    let engine = common::engine();
    let (mut session, _) = common::session(&engine, DispatchMode::Batch);

    session
        .eval("set_pin_loc led B2; set_region_loc blk X1Y1")
        .await
        .unwrap();
    assert!(session.eval("set_pin_loc led").await.is_err());

    let snapshot = status(&engine).await;
    assert_eq!(snapshot.pins.len(), 1);
    assert_eq!(snapshot.pins[0].pin, "B2");
}

#[tokio::test]
async fn set_as_target_checks_its_arguments() {
    let engine = common::engine();
    let mut rx = engine.subscribe();
    let (mut session, _) = common::session(&engine, DispatchMode::Interactive);

    assert!(session.eval("set_as_target constraint").await.is_err());
    assert_eq!(
        errors(&drain(&mut rx)),
        vec!["Usage: set_as_target ?type? ?target name?".to_string()]
    );
}

#[tokio::test]
async fn help_lists_every_stage_command() {
    let engine = common::engine();
    let (mut session, output) = common::session(&engine, DispatchMode::Interactive);

    session.eval("help").await.unwrap();
    let text = output.take().join("\n");
    for command in ["ipgenerate", "synth", "packing", "globp", "place", "route", "bitstream"] {
        assert!(text.contains(command), "help is missing {command}");
    }
}

#[tokio::test]
async fn aliases_run_the_same_stage() {
    let engine = common::engine();
    let (mut session, _) = common::session(&engine, DispatchMode::Batch);

    session
        .eval("create_design foo; synth; packing; globp; place; route; sta; power; bitstream")
        .await
        .unwrap();
    idle(&engine).await;

    assert_eq!(status(&engine).await.state, DesignState::Routed);
}

#[tokio::test]
async fn interactive_results_are_echoed() {
    let engine = common::engine();
    let (mut session, output) = common::session(&engine, DispatchMode::Interactive);

    session.eval("set greeting hello").await.unwrap();
    assert_eq!(output.take(), vec!["hello".to_string()]);

    let (mut quiet, output) = common::session(&engine, DispatchMode::Batch);
    quiet.eval("set greeting hello").await.unwrap();
    assert!(output.take().is_empty());
}

#[tokio::test]
async fn unknown_commands_fail_without_publishing() {
    let engine = common::engine();
    let mut rx = engine.subscribe();
    let (mut session, _) = common::session(&engine, DispatchMode::Interactive);

    let err = session.eval("frobnicate").await.unwrap_err();
    assert_eq!(err, ScriptError::UnknownCommand("frobnicate".into()));
    assert!(errors(&drain(&mut rx)).is_empty());
}
