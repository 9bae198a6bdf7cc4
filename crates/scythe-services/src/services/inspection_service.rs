//! Caller-facing inspection API.
//!
//! Validation errors are surfaced synchronously and never reach the
//! pipeline; everything past `Added` happens asynchronously and is
//! observable through `get`.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::services::analyzer::{remove_dir_if_exists, CodeAnalyzer};
use crate::services::store::InspectionStore;
use scythe_foundation::validation::check_branch;
use scythe_foundation::{GitRepo, Inspection, ScytheError, ScytheResult, SupportedLanguage};

pub struct InspectionService {
    data_dir: PathBuf,
    store: Arc<dyn InspectionStore>,
    analyzer: CodeAnalyzer,
}

impl InspectionService {
    pub fn new(data_dir: PathBuf, store: Arc<dyn InspectionStore>, analyzer: CodeAnalyzer) -> Self {
        Self {
            data_dir,
            store,
            analyzer,
        }
    }

    /// Submit a new inspection and start its pipeline.
    ///
    /// Returns the record in state `Added`; rejects malformed input and
    /// duplicate in-flight inspections for the same repo+branch pair.
    pub async fn create(
        &self,
        url: &str,
        language: SupportedLanguage,
        branch: &str,
    ) -> ScytheResult<Inspection> {
        let branch = check_branch(branch)?;
        let repo = GitRepo::parse(url)?;
        let inspection = Inspection::new(repo, language, &branch);
        self.store.insert_new(inspection.clone()).await?;
        info!(
            id = %inspection.id,
            url = %inspection.git_repo.url,
            branch = %inspection.branch,
            language = %inspection.language,
            "Inspection created"
        );
        self.analyzer.inspect(&inspection.id);
        Ok(inspection)
    }

    /// Re-run a terminal inspection from `Added`.
    pub async fn refresh(&self, id: &str) -> ScytheResult<Inspection> {
        let refreshed = self.store.reset_if_terminal(id).await?;
        info!(id, "Inspection refresh requested");
        self.analyzer.inspect(id);
        Ok(refreshed)
    }

    pub async fn get(&self, id: &str) -> ScytheResult<Inspection> {
        self.store
            .find(id)
            .await?
            .ok_or_else(|| ScytheError::not_found(id))
    }

    /// Record with findings narrowed to file paths containing `filter`.
    pub async fn get_filtered(&self, id: &str, filter: &str) -> ScytheResult<Inspection> {
        let inspection = self.get(id).await?;
        if filter.is_empty() {
            Ok(inspection)
        } else {
            Ok(inspection.filtered(filter))
        }
    }

    pub async fn list(&self) -> ScytheResult<Vec<Inspection>> {
        self.store.list().await
    }

    /// All inspections recorded for a repository URL, across branches.
    ///
    /// Fails with `RepositoryNotFound` when the repository has never been
    /// inspected.
    pub async fn list_by_repo(&self, url: &str) -> ScytheResult<Vec<Inspection>> {
        let repo = GitRepo::parse(url)?;
        let inspections = self.store.list_by_repo(&repo).await?;
        if inspections.is_empty() {
            return Err(ScytheError::repository_not_found(format!(
                "{}/{}/{}",
                repo.host, repo.owner, repo.name
            )));
        }
        Ok(inspections)
    }

    /// Delete a terminal inspection along with its working directory.
    pub async fn delete(&self, id: &str) -> ScytheResult<()> {
        let inspection = self.store.delete_if_terminal(id).await?;
        let workdir = self.data_dir.join(&inspection.id);
        if let Err(cleanup_error) = remove_dir_if_exists(&workdir).await {
            // the record is already gone; a leftover directory is not fatal
            warn!(id, error = %cleanup_error, "Failed to remove working directory");
        }
        info!(id, "Inspection deleted");
        Ok(())
    }
}
