//! Services for running inspections end to end

pub mod analysis_queue;
pub mod analyzer;
pub mod git_downloader;
pub mod inspection_service;
pub mod process_runner;
pub mod report_parser;
pub mod state_machine;
pub mod store;

pub use analysis_queue::AnalysisQueue;
pub use analyzer::CodeAnalyzer;
pub use git_downloader::{GitCliDownloader, RepositoryDownloader};
pub use inspection_service::InspectionService;
pub use process_runner::ProcessRunner;
pub use state_machine::InspectionStateMachine;
pub use store::{InMemoryInspectionStore, InspectionStore};
