// config.rs - Tracker configuration.
//
// `for_project()` lays out state under `<root>/.pm/`. An optional
// `.pm/config.toml` can override the tunables:
//
//   max_retries = 5
//   log_events = false

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default number of attempts for an operation that hit a concurrent write.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Root directory of the project.
    pub project_root: PathBuf,

    /// One JSON file per user.
    pub users_dir: PathBuf,

    /// One JSON file per goal.
    pub goals_dir: PathBuf,

    /// One JSON file per task.
    pub tasks_dir: PathBuf,

    /// Hash-chained feedback history.
    pub feedback_log: PathBuf,

    /// Lifecycle event log (JSONL).
    pub events_log: PathBuf,

    /// Held exclusively around every store write, across processes.
    pub lock_file: PathBuf,

    /// Attempts for operations that hit a concurrent modification.
    pub max_retries: u32,

    /// Whether lifecycle events are written to `events_log`.
    pub log_events: bool,
}

/// Keys accepted in `.pm/config.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    max_retries: Option<u32>,
    log_events: Option<bool>,
}

impl TrackerConfig {
    /// Create a config with the standard `.pm/` layout for a project.
    pub fn for_project(project_root: impl AsRef<Path>) -> Self {
        let root = project_root.as_ref().to_path_buf();
        let pm_dir = root.join(".pm");
        Self {
            project_root: root,
            users_dir: pm_dir.join("users"),
            goals_dir: pm_dir.join("goals"),
            tasks_dir: pm_dir.join("tasks"),
            feedback_log: pm_dir.join("feedback.jsonl"),
            events_log: pm_dir.join("events.jsonl"),
            lock_file: pm_dir.join("lock"),
            max_retries: DEFAULT_MAX_RETRIES,
            log_events: true,
        }
    }

    /// The standard layout plus any overrides from `.pm/config.toml`.
    pub fn load(project_root: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut config = Self::for_project(project_root);
        let path = config.config_file();
        if !path.exists() {
            return Ok(config);
        }

        let raw = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let file: ConfigFile = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;

        if let Some(n) = file.max_retries {
            // Zero attempts would turn every call into a no-op.
            config.max_retries = n.max(1);
        }
        if let Some(flag) = file.log_events {
            config.log_events = flag;
        }
        tracing::debug!(path = %path.display(), "loaded config overrides");
        Ok(config)
    }

    pub fn config_file(&self) -> PathBuf {
        self.project_root.join(".pm").join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_layout_under_pm_dir() {
        let config = TrackerConfig::for_project("/srv/team");
        assert_eq!(config.goals_dir, PathBuf::from("/srv/team/.pm/goals"));
        assert_eq!(config.feedback_log, PathBuf::from("/srv/team/.pm/feedback.jsonl"));
        assert_eq!(config.lock_file, PathBuf::from("/srv/team/.pm/lock"));
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
        assert!(config.log_events);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = TrackerConfig::load(dir.path()).unwrap();
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn file_overrides_tunables() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join(".pm")).unwrap();
        fs::write(
            dir.path().join(".pm/config.toml"),
            "max_retries = 7\nlog_events = false\n",
        )
        .unwrap();
        let config = TrackerConfig::load(dir.path()).unwrap();
        assert_eq!(config.max_retries, 7);
        assert!(!config.log_events);
    }

    #[test]
    fn zero_retries_clamped_to_one() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join(".pm")).unwrap();
        fs::write(dir.path().join(".pm/config.toml"), "max_retries = 0\n").unwrap();
        assert_eq!(TrackerConfig::load(dir.path()).unwrap().max_retries, 1);
    }

    #[test]
    fn unknown_keys_rejected() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join(".pm")).unwrap();
        fs::write(dir.path().join(".pm/config.toml"), "database = \"pg\"\n").unwrap();
        assert!(matches!(
            TrackerConfig::load(dir.path()),
            Err(ConfigError::Parse { .. })
        ));
    }
}
