//! Last-pull ledger deciding when a project needs a refresh.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use crate::store::ProjectError;

const LEDGER_FILE: &str = "pulls.json";

/// JSON file in the cache root mapping project name to last-pull time.
///
/// Read-modify-written whole on every update, last-writer-wins: pulls are
/// idempotent and at most daily, so concurrent runs racing on the file is
/// acceptable.
#[derive(Debug, Clone)]
pub struct RefreshLedger {
    path: PathBuf,
}

impl RefreshLedger {
    pub fn new(cache_root: &Path) -> Self {
        Self {
            path: cache_root.join(LEDGER_FILE),
        }
    }

    /// When was this project last pulled, if ever.
    pub async fn last_pull(&self, project: &str) -> Option<DateTime<Utc>> {
        self.load().await.get(project).copied()
    }

    /// True when the project has never been pulled or the last pull is
    /// older than one day.
    pub async fn needs_refresh(&self, project: &str) -> bool {
        is_stale(self.last_pull(project).await, Utc::now())
    }

    /// Record a successful pull at the current time.
    pub async fn record_pull(&self, project: &str) -> Result<(), ProjectError> {
        let mut entries = self.load().await;
        entries.insert(project.to_string(), Utc::now());
        let json = serde_json::to_string_pretty(&entries)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }

    async fn load(&self) -> HashMap<String, DateTime<Utc>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(_) => return HashMap::new(),
        };
        match serde_json::from_slice(&bytes) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring unreadable pull ledger");
                HashMap::new()
            }
        }
    }
}

fn is_stale(last_pull: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match last_pull {
        None => true,
        Some(at) => now - at > Duration::hours(24),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_pulled_is_stale() {
        assert!(is_stale(None, Utc::now()));
    }

    #[test]
    fn test_recent_pull_is_fresh() {
        let now = Utc::now();
        assert!(!is_stale(Some(now - Duration::hours(23)), now));
    }

    #[test]
    fn test_day_old_pull_is_stale() {
        let now = Utc::now();
        assert!(is_stale(Some(now - Duration::hours(25)), now));
    }

    #[tokio::test]
    async fn test_record_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = RefreshLedger::new(dir.path());

        assert!(ledger.needs_refresh("alpha").await);
        ledger.record_pull("alpha").await.unwrap();
        assert!(!ledger.needs_refresh("alpha").await);
        // Other projects are unaffected.
        assert!(ledger.needs_refresh("beta").await);
    }

    #[tokio::test]
    async fn test_corrupt_ledger_treated_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join(LEDGER_FILE), b"not json")
            .await
            .unwrap();
        let ledger = RefreshLedger::new(dir.path());
        assert!(ledger.needs_refresh("alpha").await);
        // Recording still works and replaces the corrupt file.
        ledger.record_pull("alpha").await.unwrap();
        assert!(!ledger.needs_refresh("alpha").await);
    }
}
