use rollcore_host::Clipboard;
use tracing::{debug, warn};

/// Copies `text`, falling back to the selection path when the clipboard
/// write fails. Empty text is never copied.
pub async fn copy_text<C: Clipboard + ?Sized>(clipboard: &C, text: &str) -> bool {
    if text.is_empty() {
        return false;
    }

    match clipboard.write_text(text).await {
        Ok(()) => return true,
        Err(err) => debug!(%err, "clipboard write failed, trying selection copy"),
    }

    match clipboard.copy_via_selection(text) {
        Ok(copied) => copied,
        Err(err) => {
            warn!(%err, "selection copy failed");
            false
        }
    }
}
