//! Line-oriented command console on stdin.

use fabflow_pipeline::Session;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Evaluate a script in the session, publishing any error not already shown.
/// Returns whether evaluation succeeded.
pub async fn eval(session: &mut Session, script: &str) -> bool {
    match session.eval(script).await {
        Ok(_) => true,
        Err(e) => {
            if !e.is_reported() {
                session.engine().bus().error(e.to_string());
            }
            false
        }
    }
}

/// Read commands until EOF or `exit`. Lines are joined while braces or
/// brackets are still open.
pub async fn run(session: &mut Session) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut pending = String::new();

    while let Some(line) = lines.next_line().await? {
        if pending.is_empty() && matches!(line.trim(), "exit" | "quit") {
            break;
        }
        pending.push_str(&line);
        pending.push('\n');
        if !is_complete(&pending) {
            continue;
        }

        let command = std::mem::take(&mut pending);
        if !command.trim().is_empty() {
            eval(session, &command).await;
        }
    }

    if !pending.trim().is_empty() {
        tracing::warn!("Unterminated command discarded at end of input");
    }
    Ok(())
}

/// Whether every `{` and `[` in `text` is closed.
fn is_complete(text: &str) -> bool {
    let mut braces = 0i32;
    let mut brackets = 0i32;
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '{' => braces += 1,
            '}' => braces -= 1,
            '[' => brackets += 1,
            ']' => brackets -= 1,
            _ => {}
        }
    }
    braces <= 0 && brackets <= 0
}
