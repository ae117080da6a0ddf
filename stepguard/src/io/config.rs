//! Backtracking configuration stored as TOML.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::core::types::Settings;

/// Upper bound accepted for `max_backtracks`.
pub const MAX_BACKTRACKS_LIMIT: u32 = 64;

/// Engine configuration (TOML).
///
/// Missing fields default to the values used by [`BacktrackConfig::default`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BacktrackConfig {
    /// Retries allowed after the first attempt of a top-level call.
    pub max_backtracks: u32,

    /// Force soft-constraint bypass on the final attempt so the call returns.
    pub bypass_soft_on_final: bool,

    /// Initial hard-constraint bypass flag of new execution contexts.
    pub bypass_hard: bool,

    /// Initial soft-constraint bypass flag of new execution contexts.
    pub bypass_soft: bool,
}

impl Default for BacktrackConfig {
    fn default() -> Self {
        Self {
            max_backtracks: 2,
            bypass_soft_on_final: true,
            bypass_hard: false,
            bypass_soft: false,
        }
    }
}

impl BacktrackConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_backtracks > MAX_BACKTRACKS_LIMIT {
            return Err(anyhow!(
                "max_backtracks must be <= {MAX_BACKTRACKS_LIMIT} (got {})",
                self.max_backtracks
            ));
        }
        Ok(())
    }

    pub fn settings(&self) -> Settings {
        Settings {
            bypass_hard: self.bypass_hard,
            bypass_soft: self.bypass_soft,
        }
    }
}

/// Load config from a TOML file, or the defaults if there is none.
///
/// Only a parsed file is validated; the defaults are always in range.
pub fn load_config(path: &Path) -> Result<BacktrackConfig> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(BacktrackConfig::default());
        }
        Err(err) => return Err(err).with_context(|| format!("read {}", path.display())),
    };
    let cfg: BacktrackConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Write config next to `path` in a temporary file, then persist it over
/// `path` so readers never see a partial file.
pub fn write_config(path: &Path, cfg: &BacktrackConfig) -> Result<()> {
    cfg.validate()?;
    let rendered = toml::to_string_pretty(cfg).context("serialize config toml")?;

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).with_context(|| format!("create directory {}", dir.display()))?;
    let mut staged = NamedTempFile::new_in(dir)
        .with_context(|| format!("stage config in {}", dir.display()))?;
    writeln!(staged, "{}", rendered.trim_end()).context("write staged config")?;
    staged
        .persist(path)
        .map_err(|err| err.error)
        .with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtrack::Backtracker;
    use crate::context::ExecutionContext;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, BacktrackConfig::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("nested/stepguard.toml");
        let cfg = BacktrackConfig {
            max_backtracks: 5,
            bypass_soft_on_final: false,
            ..BacktrackConfig::default()
        };
        write_config(&path, &cfg).expect("write");
        assert_eq!(load_config(&path).expect("load"), cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("stepguard.toml");
        fs::write(&path, "bypass_hard = true\n").expect("write");

        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.max_backtracks, 2);
        assert!(cfg.bypass_hard);
        assert!(ExecutionContext::from_config(&cfg).settings().bypass_hard);
        assert_eq!(Backtracker::from_config(&cfg), Backtracker::default());
    }

    #[test]
    fn rejects_out_of_range_backtracks() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("stepguard.toml");
        fs::write(&path, "max_backtracks = 1000\n").expect("write");

        let err = load_config(&path).expect_err("invalid");
        assert!(format!("{err:#}").contains("max_backtracks"));
    }

    #[test]
    fn write_replaces_existing_file_without_leftovers() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("stepguard.toml");
        fs::write(&path, "max_backtracks = 9\n").expect("write");

        write_config(&path, &BacktrackConfig::default()).expect("write");

        assert_eq!(load_config(&path).expect("load"), BacktrackConfig::default());
        let entries = fs::read_dir(temp.path()).expect("read dir").count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn write_rejects_invalid_config() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("stepguard.toml");
        let cfg = BacktrackConfig {
            max_backtracks: MAX_BACKTRACKS_LIMIT + 1,
            ..BacktrackConfig::default()
        };

        assert!(write_config(&path, &cfg).is_err());
        assert!(!path.exists());
    }
}
