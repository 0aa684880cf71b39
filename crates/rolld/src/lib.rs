pub mod clipboard;
pub mod dialog;
pub mod roster;
pub mod scan;
pub mod service;
pub mod session;

pub use clipboard::copy_text;
pub use dialog::{active_selection_fingerprint, is_reaction_dialog, locate_reaction_dialog};
pub use roster::format_roster;
pub use scan::{ScanMode, ScanOptions, ScanOutcome, ScanProgress, Scanner, Termination};
pub use service::{mark_found, FindResult, LoadResult};
pub use session::{RosterSession, SessionError};
