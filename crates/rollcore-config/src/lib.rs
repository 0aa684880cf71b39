use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables for a single roster scan. Field defaults are the values the
/// scanner was tuned with against the live reaction dialog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// Hard ceiling on scan rounds, regardless of host behavior.
    pub max_rounds: usize,
    /// Stagnant rounds tolerated once the viewport sits at its end.
    pub idle_break_rounds: usize,
    /// Stagnant rounds tolerated without a viewport or without any rows.
    pub stall_break_rounds: usize,
    pub base_wait_ms: u64,
    pub stagnant_wait_ms: u64,
    pub top_reset_wait_ms: u64,
    /// Stagnant rounds after which the longer wait and the last-row nudge kick in.
    pub slow_down_after_stagnant: usize,
    /// Rounds at the start of a scan that always nudge the last row into view.
    pub warmup_rounds: usize,
    pub min_scroll_step: f64,
    pub scroll_step_ratio: f64,
    /// Distance from the end of the viewport that still counts as "at the end".
    pub end_slack: f64,
    /// Overflow required before an element is considered a scroll candidate.
    pub scrollable_slack: f64,
    pub probe_scroll_delta: f64,
    /// Wheel delta used when no viewport could be located.
    pub rowless_wheel_delta: f64,
    pub entry_cache_capacity: usize,
    /// Marker attribute carried by mounted control surfaces.
    pub control_marker_attr: String,
    pub avatar_cdn_host: String,
    /// Normalized titles that identify the reaction dialog.
    pub dialog_titles: Vec<String>,
    pub dialog_preview_chars: usize,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            max_rounds: 700,
            idle_break_rounds: 12,
            stall_break_rounds: 6,
            base_wait_ms: 120,
            stagnant_wait_ms: 170,
            top_reset_wait_ms: 120,
            slow_down_after_stagnant: 2,
            warmup_rounds: 2,
            min_scroll_step: 180.0,
            scroll_step_ratio: 0.95,
            end_slack: 4.0,
            scrollable_slack: 32.0,
            probe_scroll_delta: 12.0,
            rowless_wheel_delta: 800.0,
            entry_cache_capacity: 4096,
            control_marker_attr: "data-reaction-checker-ui".to_string(),
            avatar_cdn_host: "cdn.discordapp.com".to_string(),
            dialog_titles: vec!["reactions".to_string(), "反应".to_string()],
            dialog_preview_chars: 120,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read settings from {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ScanSettings {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn base_wait(&self) -> Duration {
        Duration::from_millis(self.base_wait_ms)
    }

    pub fn stagnant_wait(&self) -> Duration {
        Duration::from_millis(self.stagnant_wait_ms)
    }

    pub fn top_reset_wait(&self) -> Duration {
        Duration::from_millis(self.top_reset_wait_ms)
    }

    /// Scroll advance for a viewport of the given visible height.
    pub fn scroll_step(&self, client_height: f64) -> f64 {
        (client_height * self.scroll_step_ratio)
            .floor()
            .max(self.min_scroll_step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_json_keeps_defaults() {
        let settings = ScanSettings::from_json_str(r#"{ "max_rounds": 40, "base_wait_ms": 5 }"#)
            .unwrap();
        assert_eq!(settings.max_rounds, 40);
        assert_eq!(settings.base_wait(), Duration::from_millis(5));
        assert_eq!(settings.idle_break_rounds, 12);
        assert_eq!(settings.dialog_titles, ScanSettings::default().dialog_titles);
    }

    #[test]
    fn scroll_step_has_floor() {
        let settings = ScanSettings::default();
        assert_eq!(settings.scroll_step(100.0), 180.0);
        assert_eq!(settings.scroll_step(500.0), 475.0);
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            ScanSettings::from_json_str("{ max_rounds: }"),
            Err(ConfigError::Parse(_))
        ));
    }
}
