//! State machine owning inspection lifecycle transitions.
//!
//! Every method performs exactly one store write, so each transition is
//! individually durable and observable by concurrent readers. Only one
//! terminal transition is ever accepted per inspection.

use std::sync::Arc;
use tracing::{error, info, warn};

use crate::services::store::InspectionStore;
use scythe_foundation::{DeadCodeOccurrence, Inspection, InspectionState, ScytheError, ScytheResult};

pub struct InspectionStateMachine {
    store: Arc<dyn InspectionStore>,
}

impl InspectionStateMachine {
    pub fn new(store: Arc<dyn InspectionStore>) -> Self {
        Self { store }
    }

    /// Move the inspection into `new_state` with that state's default
    /// description and persist it.
    ///
    /// Transitions out of a terminal state are rejected with `Locked`.
    pub async fn change_state(
        &self,
        inspection: &mut Inspection,
        new_state: InspectionState,
    ) -> ScytheResult<()> {
        if inspection.is_terminal() {
            warn!(
                id = %inspection.id,
                current = %inspection.state,
                requested = %new_state,
                "Refusing state change on finalized inspection"
            );
            return Err(ScytheError::locked(&inspection.id, inspection.state));
        }
        inspection.state = new_state;
        inspection.state_description = new_state.default_description().to_string();
        self.store.save(inspection.clone()).await?;
        info!(id = %inspection.id, state = %new_state, "Inspection state updated");
        Ok(())
    }

    /// Finalize the inspection as completed, attaching its findings.
    ///
    /// Only valid from `Processing`.
    pub async fn complete(
        &self,
        inspection: &mut Inspection,
        findings: Vec<DeadCodeOccurrence>,
    ) -> ScytheResult<()> {
        if inspection.state != InspectionState::Processing {
            warn!(
                id = %inspection.id,
                current = %inspection.state,
                "Refusing completion outside of PROCESSING"
            );
            return Err(ScytheError::locked(&inspection.id, inspection.state));
        }
        inspection.state = InspectionState::Completed;
        inspection.state_description = InspectionState::Completed
            .default_description()
            .to_string();
        inspection.dead_code_occurrences = findings;
        inspection.error_message = None;
        self.store.save(inspection.clone()).await?;
        info!(
            id = %inspection.id,
            findings = inspection.dead_code_occurrences.len(),
            "Inspection completed"
        );
        Ok(())
    }

    /// Finalize the inspection as failed with a message derived from the
    /// error.
    ///
    /// Valid from any non-terminal state; a failure reported for an
    /// already-finalized inspection is logged and ignored so double
    /// finalization can never happen. This is the last-resort error path,
    /// so a store write failure here is only logged.
    pub async fn fail(&self, inspection: &mut Inspection, error: &ScytheError) {
        if inspection.is_terminal() {
            warn!(
                id = %inspection.id,
                current = %inspection.state,
                error = %error,
                "Ignoring failure reported for finalized inspection"
            );
            return;
        }
        inspection.state = InspectionState::Failed;
        inspection.state_description = InspectionState::Failed.default_description().to_string();
        inspection.error_message = Some(error.to_string());
        if let Err(save_error) = self.store.save(inspection.clone()).await {
            error!(id = %inspection.id, error = %save_error, "Failed to persist FAILED state");
        }
        error!(id = %inspection.id, error = %error, "Inspection failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::store::MockInspectionStore;
    use scythe_foundation::{DeadCodeKind, GitRepo, SupportedLanguage};

    fn inspection() -> Inspection {
        let repo = GitRepo::parse("https://github.com/acme/widget.git").unwrap();
        Inspection::new(repo, SupportedLanguage::Java, "master")
    }

    fn store_expecting_saves(count: usize) -> Arc<MockInspectionStore> {
        let mut store = MockInspectionStore::new();
        store.expect_save().times(count).returning(|_| Ok(()));
        Arc::new(store)
    }

    #[tokio::test]
    async fn change_state_persists_exactly_once() {
        let machine = InspectionStateMachine::new(store_expecting_saves(1));
        let mut record = inspection();
        machine
            .change_state(&mut record, InspectionState::Downloading)
            .await
            .unwrap();
        assert_eq!(record.state, InspectionState::Downloading);
        assert_eq!(record.state_description, "Downloading repository");
    }

    #[tokio::test]
    async fn change_state_rejected_on_terminal_inspection() {
        let machine = InspectionStateMachine::new(store_expecting_saves(0));
        let mut record = inspection();
        record.state = InspectionState::Completed;
        assert!(matches!(
            machine
                .change_state(&mut record, InspectionState::Processing)
                .await,
            Err(ScytheError::Locked { .. })
        ));
        assert_eq!(record.state, InspectionState::Completed);
    }

    #[tokio::test]
    async fn complete_attaches_findings_from_processing() {
        let machine = InspectionStateMachine::new(store_expecting_saves(1));
        let mut record = inspection();
        record.state = InspectionState::Processing;
        let findings = vec![DeadCodeOccurrence {
            kind: DeadCodeKind::PrivateMethod,
            name: "foo".to_string(),
            file: "src/A.java".to_string(),
            line: 10,
            column: 3,
        }];
        machine.complete(&mut record, findings.clone()).await.unwrap();
        assert_eq!(record.state, InspectionState::Completed);
        assert_eq!(record.dead_code_occurrences, findings);
        assert!(record.error_message.is_none());
    }

    #[tokio::test]
    async fn complete_rejected_outside_processing() {
        let machine = InspectionStateMachine::new(store_expecting_saves(0));
        let mut record = inspection();
        record.state = InspectionState::InQueue;
        assert!(machine.complete(&mut record, Vec::new()).await.is_err());
        assert_eq!(record.state, InspectionState::InQueue);
    }

    #[tokio::test]
    async fn fail_records_message_from_any_non_terminal_state() {
        for state in [
            InspectionState::Added,
            InspectionState::Downloading,
            InspectionState::InQueue,
            InspectionState::Processing,
        ] {
            let machine = InspectionStateMachine::new(store_expecting_saves(1));
            let mut record = inspection();
            record.state = state;
            machine
                .fail(&mut record, &ScytheError::download("clone failed"))
                .await;
            assert_eq!(record.state, InspectionState::Failed);
            assert_eq!(
                record.error_message.as_deref(),
                Some("Repository download failed: clone failed")
            );
        }
    }

    #[tokio::test]
    async fn fail_on_terminal_inspection_is_ignored() {
        let machine = InspectionStateMachine::new(store_expecting_saves(0));
        let mut record = inspection();
        record.state = InspectionState::Completed;
        machine.fail(&mut record, &ScytheError::QueueFull).await;
        assert_eq!(record.state, InspectionState::Completed);
        assert!(record.error_message.is_none());
    }
}
