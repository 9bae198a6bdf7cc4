//! Inspection record and its lifecycle states.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::{DeadCodeOccurrence, GitRepo, SupportedLanguage};

/// Lifecycle state of an inspection.
///
/// `Completed` and `Failed` are terminal and mutually exclusive; every
/// other state is "locked": refresh and delete requests against a
/// non-terminal inspection are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InspectionState {
    Added,
    Downloading,
    InQueue,
    Processing,
    Completed,
    Failed,
}

impl InspectionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Human-readable description attached on every transition into this state
    pub fn default_description(&self) -> &'static str {
        match self {
            Self::Added => "Inspection created",
            Self::Downloading => "Downloading repository",
            Self::InQueue => "Inspection is waiting in the analysis queue",
            Self::Processing => "Analyzing repository",
            Self::Completed => "Inspection completed",
            Self::Failed => "Inspection failed",
        }
    }
}

impl fmt::Display for InspectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Added => "ADDED",
            Self::Downloading => "DOWNLOADING",
            Self::InQueue => "IN_QUEUE",
            Self::Processing => "PROCESSING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// One requested analysis run over a specific repository branch.
///
/// Mutated only through the state machine and the store's conditional
/// resets, never directly by callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inspection {
    pub id: String,
    pub git_repo: GitRepo,
    pub branch: String,
    pub language: SupportedLanguage,
    pub state: InspectionState,
    pub state_description: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub dead_code_occurrences: Vec<DeadCodeOccurrence>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl Inspection {
    /// Create a new inspection in the `Added` state with a fresh id
    pub fn new(git_repo: GitRepo, language: SupportedLanguage, branch: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            git_repo,
            branch: branch.into(),
            language,
            state: InspectionState::Added,
            state_description: InspectionState::Added.default_description().to_string(),
            created_at: Utc::now(),
            dead_code_occurrences: Vec::new(),
            error_message: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Copy of this inspection keeping only findings whose file path
    /// contains the given substring
    pub fn filtered(&self, filter: &str) -> Self {
        let mut filtered = self.clone();
        filtered
            .dead_code_occurrences
            .retain(|occurrence| occurrence.file.contains(filter));
        filtered
    }
}
