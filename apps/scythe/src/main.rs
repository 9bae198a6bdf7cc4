//! scythe main binary

use anyhow::bail;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;

use scythe_config::AppConfig;
use scythe_foundation::{InspectionState, SupportedLanguage};
use scythe_services::{
    AnalysisQueue, CodeAnalyzer, GitCliDownloader, InMemoryInspectionStore, InspectionService,
    InspectionStore, ProcessRunner, RepositoryDownloader,
};

#[derive(Parser)]
#[command(name = "scythe")]
#[command(about = "Dead-code inspection service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single inspection end to end and print it as JSON
    Inspect {
        /// Remote repository URL
        #[arg(long)]
        url: String,
        /// Language to build the analysis database for
        #[arg(long)]
        language: SupportedLanguage,
        /// Branch to inspect
        #[arg(long, default_value = "master")]
        branch: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load()?;
    scythe_config::logging::initialize(&config);

    match cli.command {
        Commands::Inspect {
            url,
            language,
            branch,
        } => run_inspection(config, &url, language, &branch).await,
    }
}

async fn run_inspection(
    config: AppConfig,
    url: &str,
    language: SupportedLanguage,
    branch: &str,
) -> anyhow::Result<()> {
    tracing::info!(url, branch, language = %language, "Starting inspection");

    let store: Arc<dyn InspectionStore> = Arc::new(InMemoryInspectionStore::new());
    let queue = Arc::new(AnalysisQueue::start(config.analyzer.queue_capacity));
    let runner = ProcessRunner::new(Duration::from_secs(config.analyzer.command_timeout_secs));
    let downloader: Arc<dyn RepositoryDownloader> = Arc::new(GitCliDownloader::new(runner));
    let analyzer = CodeAnalyzer::new(&config, store.clone(), downloader, queue);
    let service = InspectionService::new(config.data_dir.clone(), store, analyzer);

    let created = service.create(url, language, branch).await?;

    let finished = loop {
        tokio::time::sleep(Duration::from_millis(500)).await;
        let current = service.get(&created.id).await?;
        if current.is_terminal() {
            break current;
        }
        tracing::debug!(id = %current.id, state = %current.state, "Inspection in progress");
    };

    println!("{}", serde_json::to_string_pretty(&finished)?);
    if finished.state == InspectionState::Failed {
        bail!(
            "inspection failed: {}",
            finished
                .error_message
                .unwrap_or_else(|| "unknown error".to_string())
        );
    }
    Ok(())
}
