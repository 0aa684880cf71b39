use std::env;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rollcore_host::{Clipboard, ClipboardError};
use tracing::debug;

/// Largest base64 payload most terminals accept in one OSC 52 write.
const MAX_OSC52_PAYLOAD: usize = 74_994;

/// Clipboard for a terminal session: a desktop clipboard tool when one is
/// installed, otherwise an OSC 52 write that the terminal copies for us.
#[derive(Debug, Default)]
pub struct TerminalClipboard;

#[async_trait(?Send)]
impl Clipboard for TerminalClipboard {
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let Some((cmd, args)) = detect_tool() else {
            return Err(ClipboardError::NotAvailable);
        };
        debug!(cmd, "copying through clipboard tool");
        run_with_input(cmd, args, text)
    }

    fn copy_via_selection(&self, text: &str) -> Result<bool, ClipboardError> {
        let seq = osc52_sequence(text)?;
        let mut stderr = std::io::stderr().lock();
        stderr
            .write_all(seq.as_bytes())
            .and_then(|()| stderr.flush())
            .map_err(|err| ClipboardError::WriteFailed(err.to_string()))?;
        Ok(true)
    }
}

pub fn osc52_sequence(text: &str) -> Result<String, ClipboardError> {
    let encoded = STANDARD.encode(text.as_bytes());
    if encoded.len() > MAX_OSC52_PAYLOAD {
        return Err(ClipboardError::WriteFailed(format!(
            "roster too large for OSC 52 ({} bytes)",
            encoded.len()
        )));
    }
    Ok(format!("\x1b]52;c;{encoded}\x07"))
}

fn detect_tool() -> Option<(&'static str, &'static [&'static str])> {
    if cfg!(target_os = "macos") && command_exists("pbcopy") {
        return Some(("pbcopy", &[]));
    }
    if cfg!(target_os = "windows") && command_exists("clip") {
        return Some(("clip", &[]));
    }
    if env::var_os("WAYLAND_DISPLAY").is_some() && command_exists("wl-copy") {
        return Some(("wl-copy", &[]));
    }
    if env::var_os("DISPLAY").is_some() {
        if command_exists("xclip") {
            return Some(("xclip", &["-selection", "clipboard"]));
        }
        if command_exists("xsel") {
            return Some(("xsel", &["--clipboard", "--input"]));
        }
    }
    None
}

fn command_exists(command: &str) -> bool {
    if command.contains(std::path::MAIN_SEPARATOR) {
        return Path::new(command).is_file();
    }
    let Some(path_var) = env::var_os("PATH") else {
        return false;
    };
    env::split_paths(&path_var).any(|dir| {
        dir.join(command).is_file()
            || (cfg!(target_os = "windows") && dir.join(format!("{command}.exe")).is_file())
    })
}

fn run_with_input(cmd: &str, args: &[&str], content: &str) -> Result<(), ClipboardError> {
    let mut child = Command::new(cmd)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|err| ClipboardError::WriteFailed(err.to_string()))?;

    if let Some(mut stdin) = child.stdin.take() {
        if let Err(err) = stdin.write_all(content.as_bytes()) {
            drop(stdin);
            let _ = child.kill();
            let _ = child.wait();
            return Err(ClipboardError::WriteFailed(err.to_string()));
        }
    }

    let status = child
        .wait()
        .map_err(|err| ClipboardError::WriteFailed(err.to_string()))?;
    if status.success() {
        Ok(())
    } else {
        Err(ClipboardError::WriteFailed(format!("{cmd} exited with {status}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn osc52_wraps_base64_payload() {
        let seq = osc52_sequence("1. A @a").unwrap();
        assert_eq!(seq, format!("\x1b]52;c;{}\x07", STANDARD.encode("1. A @a")));
    }

    #[test]
    fn oversized_payload_is_refused() {
        let huge = "x".repeat(MAX_OSC52_PAYLOAD);
        assert!(matches!(
            osc52_sequence(&huge),
            Err(ClipboardError::WriteFailed(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn tool_that_closes_stdin_is_reaped() {
        let payload = "x".repeat(1 << 20);
        let err = run_with_input("sh", &["-c", "exec 0<&-; sleep 0"], &payload).unwrap_err();
        assert!(matches!(err, ClipboardError::WriteFailed(_)), "{err:?}");
    }

    #[test]
    fn missing_commands_are_not_found() {
        assert!(!command_exists("rollcall-no-such-clipboard-tool"));
    }
}
