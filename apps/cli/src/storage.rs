use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rollcore_config::ScanSettings;
use rollcore_host::fixture::ReactionFixture;

/// Explicit settings must exist; the per-user file is optional.
pub(crate) fn load_settings(explicit: Option<&Path>) -> Result<ScanSettings> {
    if let Some(path) = explicit {
        return ScanSettings::from_path(path)
            .with_context(|| format!("loading settings from {}", path.display()));
    }

    let path = settings_path();
    if !path.is_file() {
        return Ok(ScanSettings::default());
    }
    ScanSettings::from_path(&path)
        .with_context(|| format!("loading settings from {}", path.display()))
}

pub(crate) fn load_fixture(path: &Path) -> Result<ReactionFixture> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading fixture {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing fixture {}", path.display()))
}

/// Writes the roster, one user per line.
pub(crate) fn persist_roster(path: &Path, lines: &[String]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let mut content = lines.join("\n");
    content.push('\n');
    std::fs::write(path, content).with_context(|| format!("writing {}", path.display()))
}

fn settings_path() -> PathBuf {
    config_base().join("rollcall").join("settings.json")
}

fn config_base() -> PathBuf {
    if let Some(dir) = env::var_os("ROLLCALL_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    if let Some(dir) = env::var_os("XDG_CONFIG_HOME") {
        return PathBuf::from(dir);
    }
    if let Some(dir) = env::var_os("APPDATA") {
        return PathBuf::from(dir);
    }
    env::var_os("HOME")
        .map(|home| PathBuf::from(home).join(".config"))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scratch(name: &str) -> PathBuf {
        let dir = env::temp_dir().join(format!("rollcall-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn explicit_settings_must_exist() {
        let dir = scratch("missing");
        assert!(load_settings(Some(&dir.join("absent.json"))).is_err());
    }

    #[test]
    fn explicit_settings_are_parsed() {
        let dir = scratch("settings");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("settings.json");
        std::fs::write(&path, r#"{ "base_wait_ms": 5 }"#).unwrap();

        let settings = load_settings(Some(&path)).unwrap();
        assert_eq!(settings.base_wait_ms, 5);
        assert_eq!(settings.max_rounds, ScanSettings::default().max_rounds);
    }

    #[test]
    fn roster_is_written_line_per_user() {
        let dir = scratch("roster");
        let path = dir.join("out").join("roster.txt");
        persist_roster(&path, &["1. A @a".to_string(), "2. B @b".to_string()]).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "1. A @a\n2. B @b\n");
    }

    #[test]
    fn bundled_demo_fixture_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/reactions.json");
        let fixture = load_fixture(&path).unwrap();
        assert_eq!(fixture.tabs.len(), 2);
        assert_eq!(fixture.tabs[0].users.len(), 80);
    }
}
