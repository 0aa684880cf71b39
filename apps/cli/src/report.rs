use std::future::Future;
use std::io::{IsTerminal, Write};

use anyhow::Result;
use rolld::{FindResult, LoadResult, ScanMode, ScanProgress};
use serde::Serialize;
use tokio::sync::watch;

/// Runs `op` while echoing scan progress to stderr.
pub(crate) async fn with_progress<T>(
    rx: watch::Receiver<ScanProgress>,
    op: impl Future<Output = T>,
) -> T {
    let live = std::io::stderr().is_terminal();
    tokio::select! {
        out = op => {
            if live {
                eprint!("\r\x1b[2K");
            }
            out
        }
        () = follow(rx, live) => unreachable!("progress follower never finishes"),
    }
}

async fn follow(mut rx: watch::Receiver<ScanProgress>, live: bool) {
    while rx.changed().await.is_ok() {
        let line = progress_line(&rx.borrow_and_update());
        if live {
            eprint!("\r\x1b[2K{line}");
            let _ = std::io::stderr().flush();
        }
    }
    std::future::pending::<()>().await;
}

pub(crate) fn progress_line(progress: &ScanProgress) -> String {
    let verb = match progress.mode {
        ScanMode::Search => "searching",
        ScanMode::Load => "loading",
    };
    if progress.done {
        format!("{verb}: done, {} users", progress.scanned)
    } else {
        format!("{verb}: round {}, {} users", progress.round + 1, progress.scanned)
    }
}

#[derive(Serialize)]
struct FindReport<'a> {
    query: &'a str,
    #[serde(flatten)]
    result: &'a FindResult,
}

pub(crate) fn print_find(query: &str, result: &FindResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&FindReport { query, result })?);
        return Ok(());
    }
    println!("{}", find_summary(query, result));
    Ok(())
}

pub(crate) fn find_summary(query: &str, result: &FindResult) -> String {
    let scope = if result.complete { "in the full roster" } else { "after scanning" };
    match &result.found_entry {
        Some(entry) => format!(
            "found {query}: {} {} ({scope}, {} users)",
            entry.display_name,
            entry.username,
            result.list.len()
        ),
        None if result.found => format!("found {query} ({scope}, {} users)", result.list.len()),
        None => format!("not found: {query} ({scope}, {} users)", result.list.len()),
    }
}

pub(crate) fn print_load(result: &LoadResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }
    if result.list.is_empty() {
        println!("no user rows recognized; pick a specific reaction tab and retry");
        return Ok(());
    }
    for line in &result.list {
        println!("{line}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn progress_lines_follow_mode() {
        let running = ScanProgress {
            mode: ScanMode::Load,
            round: 3,
            scanned: 42,
            done: false,
        };
        assert_eq!(progress_line(&running), "loading: round 4, 42 users");

        let done = ScanProgress {
            mode: ScanMode::Search,
            done: true,
            ..running
        };
        assert_eq!(progress_line(&done), "searching: done, 42 users");
    }

    #[test]
    fn miss_summary_reports_scope() {
        let result = FindResult {
            list: vec!["1. A @a".to_string()],
            complete: true,
            ..FindResult::default()
        };
        assert_eq!(
            find_summary("@b", &result),
            "not found: @b (in the full roster, 1 users)"
        );
    }
}
