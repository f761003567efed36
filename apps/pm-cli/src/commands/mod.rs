// mod.rs - Shared command plumbing: the opened tracker and who is acting.

pub mod dashboard;
pub mod feedback;
pub mod goal;
pub mod task;
pub mod user;
pub mod verify;

use std::path::Path;

use anyhow::Context;
use pm_identity::Actor;
use pm_service::{with_retry, Tracker, TrackerConfig, TrackerError};

pub struct Session {
    pub tracker: Tracker,
    pub config: TrackerConfig,
    user: Option<String>,
    password: Option<String>,
}

impl Session {
    pub fn open(
        project_root: &Path,
        user: Option<String>,
        password: Option<String>,
    ) -> anyhow::Result<Self> {
        let config = TrackerConfig::load(project_root)?;
        let tracker = Tracker::open(&config)
            .with_context(|| format!("failed to open store under {}", project_root.display()))?;
        tracing::debug!(root = %project_root.display(), "store opened");
        Ok(Self {
            tracker,
            config,
            user,
            password,
        })
    }

    /// Log in with --user/--password (or PM_USER/PM_PASSWORD).
    pub fn actor(&self) -> anyhow::Result<Actor> {
        let (Some(user), Some(password)) = (&self.user, &self.password) else {
            anyhow::bail!("this command needs --user and --password (or PM_USER / PM_PASSWORD)");
        };
        Ok(self.tracker.login(user, password)?)
    }

    /// The --password value, for commands that re-check it.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Re-run `op` on concurrent modification, up to the configured limit.
    pub fn retrying<T>(
        &self,
        op: impl FnMut() -> Result<T, TrackerError>,
    ) -> Result<T, TrackerError> {
        with_retry(self.config.max_retries, op)
    }
}

/// Parse a record id given on the command line.
pub fn parse_id(kind: &str, raw: &str) -> anyhow::Result<uuid::Uuid> {
    uuid::Uuid::parse_str(raw.trim()).with_context(|| format!("'{}' is not a valid {} id", raw, kind))
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_counts_chars() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long goal title", 10), "a very ...");
        assert_eq!(truncate("ééééééééééé", 6), "ééé...");
    }

    #[test]
    fn parse_id_reports_kind() {
        let err = parse_id("goal", "nope").unwrap_err();
        assert!(err.to_string().contains("goal id"));
    }
}
