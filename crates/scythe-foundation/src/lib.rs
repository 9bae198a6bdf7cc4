//! Foundation layer for scythe: core model types, the error taxonomy and
//! request validation helpers shared by every other crate in the workspace.

pub mod error;
pub mod model;
pub mod validation;

pub use error::{ScytheError, ScytheResult};
pub use model::{
    DeadCodeKind, DeadCodeOccurrence, GitRepo, Inspection, InspectionState, SupportedLanguage,
};
