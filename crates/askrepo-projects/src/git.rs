//! Thin wrappers around `git` subprocess calls.

use std::path::Path;

use tokio::process::Command;
use tracing::{debug, info};

use crate::store::ProjectError;

/// Clone `url` into `dest`.
pub(crate) async fn clone(url: &str, dest: &Path) -> Result<(), ProjectError> {
    info!(url = %url, dest = %dest.display(), "Cloning repository");
    run_git(&["clone", url, &dest.to_string_lossy()], None).await
}

/// Fast-forward pull in an existing checkout.
pub(crate) async fn pull(dir: &Path) -> Result<(), ProjectError> {
    debug!(dir = %dir.display(), "Pulling repository");
    run_git(&["pull", "--ff-only"], Some(dir)).await
}

async fn run_git(args: &[&str], dir: Option<&Path>) -> Result<(), ProjectError> {
    let mut cmd = Command::new("git");
    cmd.args(args);
    if let Some(dir) = dir {
        cmd.current_dir(dir);
    }

    let output = cmd.output().await?;
    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(ProjectError::Git {
        command: format!("git {}", args.join(" ")),
        detail: stderr.trim().to_string(),
    })
}
