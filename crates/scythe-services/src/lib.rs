//! Runtime services for the scythe dead-code inspection pipeline.

pub mod services;

// Re-export commonly used types at crate root for convenience
pub use services::{
    AnalysisQueue, CodeAnalyzer, GitCliDownloader, InMemoryInspectionStore, InspectionService,
    InspectionStateMachine, InspectionStore, ProcessRunner, RepositoryDownloader,
};
