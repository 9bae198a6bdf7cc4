//! Durable backing for inspection records.
//!
//! The state check and the mutation of conditional operations happen
//! under a single map entry guard, so "is this inspection locked" can
//! never race with the mutation it gates.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use scythe_foundation::{GitRepo, Inspection, InspectionState, ScytheError, ScytheResult};

/// Persistence boundary for inspection records.
///
/// Every state-machine transition calls `save` synchronously, so external
/// readers observe each transition individually.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InspectionStore: Send + Sync {
    async fn save(&self, inspection: Inspection) -> ScytheResult<()>;

    async fn find(&self, id: &str) -> ScytheResult<Option<Inspection>>;

    async fn list(&self) -> ScytheResult<Vec<Inspection>>;

    /// All inspections recorded for a repository, across branches and
    /// states. Empty when the repository has never been inspected.
    async fn list_by_repo(&self, repo: &GitRepo) -> ScytheResult<Vec<Inspection>>;

    /// Insert a fresh inspection, rejecting it with `AlreadyExists` when a
    /// non-terminal inspection for the same repo+branch pair is in flight.
    async fn insert_new(&self, inspection: Inspection) -> ScytheResult<()>;

    /// Remove the record, failing with `Locked` while it is non-terminal.
    async fn delete_if_terminal(&self, id: &str) -> ScytheResult<Inspection>;

    /// Reset a terminal record back to `Added` for a new run, clearing
    /// findings and failure message; fails with `Locked` while the record
    /// is non-terminal.
    async fn reset_if_terminal(&self, id: &str) -> ScytheResult<Inspection>;

    /// True when an in-flight (non-terminal) inspection exists for the
    /// repo+branch pair.
    async fn exists_by_repo_and_branch(&self, repo: &GitRepo, branch: &str) -> ScytheResult<bool>;
}

type RepoBranchKey = (String, String);

fn repo_branch_key(repo: &GitRepo, branch: &str) -> RepoBranchKey {
    (
        format!("{}/{}/{}", repo.host, repo.owner, repo.name),
        branch.to_string(),
    )
}

/// In-memory inspection store.
#[derive(Debug, Default)]
pub struct InMemoryInspectionStore {
    inspections: DashMap<String, Inspection>,
    // Index of the latest inspection per repo+branch; insertion and the
    // duplicate check share one entry guard.
    by_repo_branch: DashMap<RepoBranchKey, String>,
}

impl InMemoryInspectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_in_flight(&self, id: &str) -> bool {
        self.inspections
            .get(id)
            .map(|inspection| !inspection.is_terminal())
            .unwrap_or(false)
    }
}

#[async_trait]
impl InspectionStore for InMemoryInspectionStore {
    async fn save(&self, inspection: Inspection) -> ScytheResult<()> {
        self.inspections.insert(inspection.id.clone(), inspection);
        Ok(())
    }

    async fn find(&self, id: &str) -> ScytheResult<Option<Inspection>> {
        Ok(self.inspections.get(id).map(|entry| entry.value().clone()))
    }

    async fn list(&self) -> ScytheResult<Vec<Inspection>> {
        Ok(self
            .inspections
            .iter()
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn list_by_repo(&self, repo: &GitRepo) -> ScytheResult<Vec<Inspection>> {
        Ok(self
            .inspections
            .iter()
            .filter(|entry| {
                let recorded = &entry.value().git_repo;
                recorded.host == repo.host
                    && recorded.owner == repo.owner
                    && recorded.name == repo.name
            })
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn insert_new(&self, inspection: Inspection) -> ScytheResult<()> {
        let key = repo_branch_key(&inspection.git_repo, &inspection.branch);
        match self.by_repo_branch.entry(key) {
            Entry::Occupied(mut entry) => {
                if self.is_in_flight(entry.get()) {
                    return Err(ScytheError::AlreadyExists {
                        repo: inspection.git_repo.url.clone(),
                        branch: inspection.branch.clone(),
                    });
                }
                entry.insert(inspection.id.clone());
            }
            Entry::Vacant(entry) => {
                entry.insert(inspection.id.clone());
            }
        }
        self.inspections.insert(inspection.id.clone(), inspection);
        Ok(())
    }

    async fn delete_if_terminal(&self, id: &str) -> ScytheResult<Inspection> {
        let inspection = match self.inspections.entry(id.to_string()) {
            Entry::Occupied(entry) => {
                if !entry.get().is_terminal() {
                    return Err(ScytheError::locked(id, entry.get().state));
                }
                let (_, inspection) = entry.remove_entry();
                inspection
            }
            Entry::Vacant(_) => return Err(ScytheError::not_found(id)),
        };
        // entry guard released above; the index can be cleaned up safely
        let key = repo_branch_key(&inspection.git_repo, &inspection.branch);
        self.by_repo_branch
            .remove_if(&key, |_, indexed_id| indexed_id == id);
        Ok(inspection)
    }

    async fn reset_if_terminal(&self, id: &str) -> ScytheResult<Inspection> {
        let refreshed = match self.inspections.entry(id.to_string()) {
            Entry::Occupied(mut entry) => {
                if !entry.get().is_terminal() {
                    return Err(ScytheError::locked(id, entry.get().state));
                }
                let inspection = entry.get_mut();
                inspection.state = InspectionState::Added;
                inspection.state_description =
                    InspectionState::Added.default_description().to_string();
                inspection.dead_code_occurrences.clear();
                inspection.error_message = None;
                inspection.clone()
            }
            Entry::Vacant(_) => return Err(ScytheError::not_found(id)),
        };
        // the refreshed run is in flight again; point the index at it
        let key = repo_branch_key(&refreshed.git_repo, &refreshed.branch);
        self.by_repo_branch.insert(key, refreshed.id.clone());
        Ok(refreshed)
    }

    async fn exists_by_repo_and_branch(&self, repo: &GitRepo, branch: &str) -> ScytheResult<bool> {
        let key = repo_branch_key(repo, branch);
        let in_flight = self
            .by_repo_branch
            .get(&key)
            .map(|entry| self.is_in_flight(entry.value()))
            .unwrap_or(false);
        Ok(in_flight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scythe_foundation::SupportedLanguage;

    fn inspection(url: &str, branch: &str) -> Inspection {
        let repo = GitRepo::parse(url).unwrap();
        Inspection::new(repo, SupportedLanguage::Java, branch)
    }

    #[tokio::test]
    async fn save_and_find_round_trip() {
        let store = InMemoryInspectionStore::new();
        let record = inspection("https://github.com/acme/widget.git", "master");
        store.save(record.clone()).await.unwrap();
        assert_eq!(store.find(&record.id).await.unwrap(), Some(record));
        assert_eq!(store.find("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn list_by_repo_spans_branches_but_not_other_repos() {
        let store = InMemoryInspectionStore::new();
        store
            .insert_new(inspection("https://github.com/acme/widget.git", "master"))
            .await
            .unwrap();
        store
            .insert_new(inspection("https://github.com/acme/widget.git", "develop"))
            .await
            .unwrap();
        store
            .insert_new(inspection("https://github.com/acme/gadget.git", "master"))
            .await
            .unwrap();

        let widget = GitRepo::parse("https://github.com/acme/widget.git").unwrap();
        let found = store.list_by_repo(&widget).await.unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|record| record.git_repo.name == "widget"));

        let unknown = GitRepo::parse("https://github.com/acme/unknown.git").unwrap();
        assert!(store.list_by_repo(&unknown).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_in_flight_inspection_is_rejected() {
        let store = InMemoryInspectionStore::new();
        let first = inspection("https://github.com/acme/widget.git", "master");
        store.insert_new(first.clone()).await.unwrap();

        let second = inspection("https://github.com/acme/widget.git", "master");
        assert!(matches!(
            store.insert_new(second).await,
            Err(ScytheError::AlreadyExists { .. })
        ));

        // a different branch is fine
        let other_branch = inspection("https://github.com/acme/widget.git", "develop");
        store.insert_new(other_branch).await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_allowed_after_first_is_terminal() {
        let store = InMemoryInspectionStore::new();
        let mut first = inspection("https://github.com/acme/widget.git", "master");
        store.insert_new(first.clone()).await.unwrap();

        first.state = InspectionState::Completed;
        store.save(first).await.unwrap();

        let second = inspection("https://github.com/acme/widget.git", "master");
        store.insert_new(second).await.unwrap();
    }

    #[tokio::test]
    async fn delete_rejected_while_non_terminal() {
        let store = InMemoryInspectionStore::new();
        let record = inspection("https://github.com/acme/widget.git", "master");
        store.insert_new(record.clone()).await.unwrap();

        assert!(matches!(
            store.delete_if_terminal(&record.id).await,
            Err(ScytheError::Locked { .. })
        ));
    }

    #[tokio::test]
    async fn delete_succeeds_once_terminal() {
        let store = InMemoryInspectionStore::new();
        let mut record = inspection("https://github.com/acme/widget.git", "master");
        store.insert_new(record.clone()).await.unwrap();

        record.state = InspectionState::Failed;
        store.save(record.clone()).await.unwrap();

        let deleted = store.delete_if_terminal(&record.id).await.unwrap();
        assert_eq!(deleted.id, record.id);
        assert_eq!(store.find(&record.id).await.unwrap(), None);

        // repo+branch slot is free again
        let repo = GitRepo::parse("https://github.com/acme/widget.git").unwrap();
        assert!(!store.exists_by_repo_and_branch(&repo, "master").await.unwrap());
    }

    #[tokio::test]
    async fn delete_unknown_id_is_not_found() {
        let store = InMemoryInspectionStore::new();
        assert!(matches!(
            store.delete_if_terminal("missing").await,
            Err(ScytheError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn reset_clears_outputs_and_relocks_slot() {
        let store = InMemoryInspectionStore::new();
        let mut record = inspection("https://github.com/acme/widget.git", "master");
        store.insert_new(record.clone()).await.unwrap();

        assert!(matches!(
            store.reset_if_terminal(&record.id).await,
            Err(ScytheError::Locked { .. })
        ));

        record.state = InspectionState::Failed;
        record.error_message = Some("boom".to_string());
        store.save(record.clone()).await.unwrap();

        let refreshed = store.reset_if_terminal(&record.id).await.unwrap();
        assert_eq!(refreshed.state, InspectionState::Added);
        assert!(refreshed.dead_code_occurrences.is_empty());
        assert!(refreshed.error_message.is_none());

        let repo = GitRepo::parse("https://github.com/acme/widget.git").unwrap();
        assert!(store.exists_by_repo_and_branch(&repo, "master").await.unwrap());
    }

    #[tokio::test]
    async fn exists_tracks_in_flight_only() {
        let store = InMemoryInspectionStore::new();
        let repo = GitRepo::parse("https://github.com/acme/widget.git").unwrap();
        assert!(!store.exists_by_repo_and_branch(&repo, "master").await.unwrap());

        let mut record = inspection("https://github.com/acme/widget.git", "master");
        store.insert_new(record.clone()).await.unwrap();
        assert!(store.exists_by_repo_and_branch(&repo, "master").await.unwrap());

        record.state = InspectionState::Completed;
        store.save(record).await.unwrap();
        assert!(!store.exists_by_repo_and_branch(&repo, "master").await.unwrap());
    }
}
