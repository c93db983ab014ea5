//! The project cache: listing, name resolution, and freshness.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::git;
use crate::refresh::RefreshLedger;

/// Errors from the project cache.
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("invalid project name '{0}'")]
    InvalidName(String),

    #[error("project '{0}' not found in the cache and no clone base URL is configured")]
    NotFound(String),

    #[error("{command} failed: {detail}")]
    Git { command: String, detail: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The cache of cloned repositories under one root directory.
///
/// Constructed once at startup and shared by reference; there is no
/// process-wide cached listing, the directory is the source of truth.
#[derive(Debug, Clone)]
pub struct ProjectStore {
    root: PathBuf,
    ledger: RefreshLedger,
    clone_base: Option<String>,
}

impl ProjectStore {
    pub fn new(root: impl Into<PathBuf>, clone_base: Option<String>) -> Self {
        let root = root.into();
        let ledger = RefreshLedger::new(&root);
        Self {
            root,
            ledger,
            clone_base,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Names of every cached project, sorted.
    pub async fn list(&self) -> Result<Vec<String>, ProjectError> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }

    /// Validate a caller-supplied name and return its cache path.
    ///
    /// Names are single path segments; separators and `..` are rejected so
    /// a request can never escape the cache root.
    pub fn resolve(&self, name: &str) -> Result<PathBuf, ProjectError> {
        if name.is_empty()
            || name == "."
            || name == ".."
            || name.contains('/')
            || name.contains('\\')
        {
            return Err(ProjectError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(name))
    }

    /// Whether the project exists in the cache right now.
    pub async fn exists(&self, name: &str) -> bool {
        match self.resolve(name) {
            Ok(path) => tokio::fs::metadata(&path)
                .await
                .map(|m| m.is_dir())
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Make the project available and reasonably fresh, returning its path.
    ///
    /// A missing project is cloned from the configured base URL. An
    /// existing one is pulled when its last pull is older than a day; a
    /// failed pull is logged and the stale copy served - staleness beats
    /// deleting a working checkout over a transient network error.
    pub async fn ensure_fresh(&self, name: &str) -> Result<PathBuf, ProjectError> {
        let path = self.resolve(name)?;

        let present = tokio::fs::metadata(&path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);

        if !present {
            let Some(base) = &self.clone_base else {
                return Err(ProjectError::NotFound(name.to_string()));
            };
            let url = format!("{}/{}", base.trim_end_matches('/'), name);
            git::clone(&url, &path).await?;
            self.ledger.record_pull(name).await?;
            return Ok(path);
        }

        if self.ledger.needs_refresh(name).await {
            match git::pull(&path).await {
                Ok(()) => {
                    info!(project = %name, "Refreshed project");
                    self.ledger.record_pull(name).await?;
                }
                Err(e) => {
                    warn!(project = %name, error = %e, "Pull failed, serving stale copy");
                }
            }
        }

        Ok(path)
    }
}
