//! Background batch sessions and `update_result`.

mod common;

use assert_matches::assert_matches;
use fabflow_core::{DesignState, TaskId, TaskStatus};
use fabflow_pipeline::{DispatchMode, EngineHandle};
use fabflow_script::{ScriptError, Value};

use common::{batch_finished, drain, errors, idle, messages, session, slow_config, status};

#[tokio::test]
async fn batch_variables_come_back_through_update_result() {
    let engine = common::engine();
    let mut rx = engine.subscribe();
    let (mut session, _) = session(&engine, DispatchMode::Interactive);

    session
        .eval(
            "set top counter\n\
             array set pins {clk A1}\n\
             proc bump {v} { return [incr v] }",
        )
        .await
        .unwrap();
    session
        .eval("batch {set result [bump 41]; set top changed-$top; array set local {a b}}")
        .await
        .unwrap();
    idle(&engine).await;

    // Nothing moves until the user asks for it.
    assert_eq!(session.interpreter().scalar("result"), None);

    session.eval("update_result").await.unwrap();
    let interp = session.interpreter();
    assert_eq!(interp.scalar("result"), Some("42"));
    assert_eq!(interp.scalar("top"), Some("changed-counter"));
    assert!(interp.global("local").is_none());
    assert_matches!(interp.global("pins"), Some(Value::Array(_)));

    let events = drain(&mut rx);
    assert_eq!(batch_finished(&events), Some(true));
    let lines = messages(&events);
    assert!(lines.contains(&"Running batch...".to_string()));
    assert!(lines.contains(&"Batch Done.".to_string()));
}

#[tokio::test]
async fn update_result_can_be_replayed() {
    let engine = common::engine();
    let (mut session, _) = session(&engine, DispatchMode::Interactive);

    session.eval("batch set answer 42").await.unwrap();
    idle(&engine).await;

    session.eval("update_result; set answer 0").await.unwrap();
    session.eval("update_result").await.unwrap();
    assert_eq!(session.interpreter().scalar("answer"), Some("42"));
}

#[tokio::test]
async fn batch_runs_stages_inline_in_order() {
    let engine = common::engine();
    let (mut session, _) = session(&engine, DispatchMode::Interactive);

    session.eval("create_design foo").await.unwrap();
    session.eval("batch {synth; packing; globp}").await.unwrap();
    idle(&engine).await;

    let snapshot = status(&engine).await;
    assert_eq!(snapshot.state, DesignState::GloballyPlaced);
    for task in [TaskId::Synthesis, TaskId::Packing, TaskId::GlobalPlacement] {
        assert_eq!(snapshot.task_status(task), TaskStatus::Success);
    }
    assert!(snapshot.workers.is_empty());
}

#[tokio::test]
async fn failed_stage_inside_batch_poisons_the_next_compile() {
    let engine = common::engine();
    let mut rx = engine.subscribe();
    let (mut session, _) = session(&engine, DispatchMode::Interactive);

    session.eval("batch {globp; set after yes}").await.unwrap();
    idle(&engine).await;

    let events = drain(&mut rx);
    assert_eq!(batch_finished(&events), Some(false));
    assert_eq!(errors(&events), vec!["No design specified".to_string()]);

    let snapshot = status(&engine).await;
    assert!(snapshot.hard_error);
    assert_eq!(snapshot.task_status(TaskId::GlobalPlacement), TaskStatus::Fail);

    session.eval("update_result").await.unwrap();
    assert_eq!(session.interpreter().scalar("after"), None);
}

#[tokio::test]
async fn update_result_without_a_batch_is_a_usage_error() {
    let engine = common::engine();
    let mut rx = engine.subscribe();
    let (mut session, _) = session(&engine, DispatchMode::Interactive);

    let err = session.eval("update_result").await.unwrap_err();
    assert!(err.is_reported());
    assert_eq!(errors(&drain(&mut rx)), vec!["No batch result available".to_string()]);
    assert!(!status(&engine).await.hard_error);
}

#[tokio::test]
async fn batch_sessions_do_not_nest() {
    let engine = common::engine();
    let (mut session, _) = session(&engine, DispatchMode::Batch);

    let err = session.eval("batch set x 1").await.unwrap_err();
    assert_eq!(err, ScriptError::UnknownCommand("batch".into()));
    let err = session.eval("update_result").await.unwrap_err();
    assert_eq!(err, ScriptError::UnknownCommand("update_result".into()));
}

#[tokio::test]
async fn abort_cancels_a_running_batch() {
    let engine = EngineHandle::spawn(slow_config());
    let mut rx = engine.subscribe();
    let (mut session, _) = session(&engine, DispatchMode::Interactive);

    session.eval("batch {synth; set finished yes}").await.unwrap();
    while status(&engine).await.workers.len() < 2 {
        tokio::task::yield_now().await;
    }

    assert_eq!(engine.stop().await.unwrap(), 2);
    idle(&engine).await;

    let snapshot = status(&engine).await;
    assert!(snapshot.workers.is_empty());
    assert_eq!(snapshot.task_status(TaskId::Synthesis), TaskStatus::Cancelled);
    assert_eq!(snapshot.state, DesignState::Uninitialized);

    let events = drain(&mut rx);
    assert_eq!(batch_finished(&events), None);
    assert!(engine.batch_result().await.unwrap().is_none());
}
