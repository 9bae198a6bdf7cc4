//! Repository download boundary.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::services::process_runner::ProcessRunner;
use scythe_foundation::{GitRepo, ScytheError, ScytheResult};

/// Clones one branch of a repository into a destination directory.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RepositoryDownloader: Send + Sync {
    async fn download(&self, repo: &GitRepo, branch: &str, destination: &Path) -> ScytheResult<()>;
}

/// Downloader shelling out to the git CLI.
pub struct GitCliDownloader {
    runner: ProcessRunner,
    git_binary: PathBuf,
}

impl GitCliDownloader {
    pub fn new(runner: ProcessRunner) -> Self {
        Self {
            runner,
            git_binary: PathBuf::from("git"),
        }
    }
}

#[async_trait]
impl RepositoryDownloader for GitCliDownloader {
    async fn download(&self, repo: &GitRepo, branch: &str, destination: &Path) -> ScytheResult<()> {
        tokio::fs::create_dir_all(destination).await?;
        let checkout = destination.join(&repo.name);
        debug!(url = %repo.url, branch, destination = %checkout.display(), "Cloning repository");
        let args = vec![
            "clone".to_string(),
            "--depth".to_string(),
            "1".to_string(),
            "--branch".to_string(),
            branch.to_string(),
            "--single-branch".to_string(),
            repo.url.clone(),
            checkout.display().to_string(),
        ];
        self.runner
            .run(&self.git_binary, &args, destination)
            .await
            .map_err(|error| ScytheError::download(error.to_string()))?;
        info!(url = %repo.url, branch, "Repository downloaded");
        Ok(())
    }
}
