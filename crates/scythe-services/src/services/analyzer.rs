//! Asynchronous inspection pipeline.
//!
//! Drives an inspection through its lifecycle:
//! ADDED → DOWNLOADING → IN_QUEUE → PROCESSING → COMPLETED | FAILED.
//! Submission is fire-and-forget; the heavy analysis step is serialized
//! through the [`AnalysisQueue`]. Errors at any stage become a FAILED
//! transition and never reach the submitter or the worker.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::services::analysis_queue::AnalysisQueue;
use crate::services::git_downloader::RepositoryDownloader;
use crate::services::process_runner::{canonical_under, ProcessRunner};
use crate::services::report_parser::parse_report;
use crate::services::state_machine::InspectionStateMachine;
use crate::services::store::InspectionStore;
use scythe_config::AppConfig;
use scythe_foundation::{Inspection, InspectionState, ScytheResult};

const DATABASE_FILE: &str = "db.udb";

/// Orchestrates the pipeline for every inspection.
#[derive(Clone)]
pub struct CodeAnalyzer {
    data_dir: PathBuf,
    und_binary: PathBuf,
    unused_script: PathBuf,
    runner: ProcessRunner,
    store: Arc<dyn InspectionStore>,
    state_machine: Arc<InspectionStateMachine>,
    downloader: Arc<dyn RepositoryDownloader>,
    queue: Arc<AnalysisQueue>,
}

impl CodeAnalyzer {
    pub fn new(
        config: &AppConfig,
        store: Arc<dyn InspectionStore>,
        downloader: Arc<dyn RepositoryDownloader>,
        queue: Arc<AnalysisQueue>,
    ) -> Self {
        Self {
            data_dir: config.data_dir.clone(),
            und_binary: config.analyzer.und_binary.clone(),
            unused_script: config.analyzer.unused_script.clone(),
            runner: ProcessRunner::new(Duration::from_secs(config.analyzer.command_timeout_secs)),
            store: store.clone(),
            state_machine: Arc::new(InspectionStateMachine::new(store)),
            downloader,
            queue,
        }
    }

    /// Working directory exclusively owned by the given inspection
    pub fn working_dir(&self, id: &str) -> PathBuf {
        self.data_dir.join(id)
    }

    /// Start the pipeline for an inspection and return immediately.
    ///
    /// Progress is observable only through the store; failures inside the
    /// pipeline transition the inspection to FAILED rather than
    /// propagating.
    pub fn inspect(&self, id: &str) {
        let analyzer = self.clone();
        let id = id.to_string();
        tokio::spawn(async move {
            analyzer.run_pipeline(&id).await;
        });
    }

    async fn run_pipeline(&self, id: &str) {
        let mut inspection = match self.store.find(id).await {
            Ok(Some(inspection)) => inspection,
            Ok(None) => {
                warn!(id, "Inspection disappeared before the pipeline started");
                return;
            }
            Err(find_error) => {
                error!(id, error = %find_error, "Failed to load inspection");
                return;
            }
        };
        if let Err(stage_error) = self.download_and_enqueue(&mut inspection).await {
            self.state_machine.fail(&mut inspection, &stage_error).await;
        }
    }

    /// Synchronous half of the pipeline: cleanup, clone and hand-off to
    /// the analysis worker.
    async fn download_and_enqueue(&self, inspection: &mut Inspection) -> ScytheResult<()> {
        let workdir = self.working_dir(&inspection.id);
        remove_dir_if_exists(&workdir).await?;

        self.state_machine
            .change_state(inspection, InspectionState::Downloading)
            .await?;
        self.downloader
            .download(&inspection.git_repo, &inspection.branch, &workdir)
            .await?;

        self.state_machine
            .change_state(inspection, InspectionState::InQueue)
            .await?;
        let analyzer = self.clone();
        let mut queued = inspection.clone();
        self.queue.submit(async move {
            if let Err(stage_error) = analyzer.analyze(&mut queued).await {
                analyzer.state_machine.fail(&mut queued, &stage_error).await;
            }
        })?;
        Ok(())
    }

    /// Heavy half of the pipeline, run on the single analysis worker.
    async fn analyze(&self, inspection: &mut Inspection) -> ScytheResult<()> {
        self.state_machine
            .change_state(inspection, InspectionState::Processing)
            .await?;

        let workdir = self.working_dir(&inspection.id);
        self.build_database(&workdir, inspection).await?;
        let raw_report = self.run_detection_script(&workdir).await?;

        let repo_root = std::fs::canonicalize(workdir.join(&inspection.git_repo.name))?;
        let findings = parse_report(&raw_report, &repo_root);
        debug!(id = %inspection.id, findings = findings.len(), "Report parsed");

        self.state_machine.complete(inspection, findings).await?;
        Ok(())
    }

    /// Build the analysis database for the checked-out sources, e.g.
    /// `und -db <dir>/db.udb create -languages Java add <dir>/<repo> settings analyze`
    async fn build_database(&self, workdir: &Path, inspection: &Inspection) -> ScytheResult<()> {
        let und = std::fs::canonicalize(&self.und_binary)?;
        let database = canonical_under(workdir, DATABASE_FILE)?;
        let sources = std::fs::canonicalize(workdir.join(&inspection.git_repo.name))?;
        let args = vec![
            "-db".to_string(),
            database.display().to_string(),
            "create".to_string(),
            "-languages".to_string(),
            inspection.language.analyzer_name().to_string(),
            "add".to_string(),
            sources.display().to_string(),
            "settings".to_string(),
            "analyze".to_string(),
        ];
        self.runner.run(&und, &args, workdir).await?;
        Ok(())
    }

    /// Run the detection script against the database, e.g.
    /// `und uperl unused.pl -db <dir>/db.udb`, returning the raw report.
    async fn run_detection_script(&self, workdir: &Path) -> ScytheResult<String> {
        let und = std::fs::canonicalize(&self.und_binary)?;
        let script = std::fs::canonicalize(&self.unused_script)?;
        let database = canonical_under(workdir, DATABASE_FILE)?;
        let args = vec![
            "uperl".to_string(),
            script.display().to_string(),
            "-db".to_string(),
            database.display().to_string(),
        ];
        self.runner.run(&und, &args, workdir).await
    }
}

/// Idempotent cleanup of a stale working directory.
pub async fn remove_dir_if_exists(dir: &Path) -> ScytheResult<()> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => {
            debug!(dir = %dir.display(), "Removed stale working directory");
            Ok(())
        }
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(error) => Err(error.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn remove_dir_if_exists_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("workdir");
        tokio::fs::create_dir_all(target.join("nested")).await.unwrap();

        remove_dir_if_exists(&target).await.unwrap();
        assert!(!target.exists());
        // second call is a no-op
        remove_dir_if_exists(&target).await.unwrap();
    }
}
