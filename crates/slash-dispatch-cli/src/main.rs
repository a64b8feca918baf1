use anyhow::Result;
use clap::Parser;
use slash_dispatch_cli::bootstrap_helpers::init_tracing;
use slash_dispatch_cli::{build_runtime_config, Cli};
use slash_dispatch_github::comment_event::GithubRunMetadata;
use slash_dispatch_github::dispatch_runtime::{run_comment_dispatch, DispatchRunOutcome};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = build_runtime_config(&cli, GithubRunMetadata::from_env());
    match run_comment_dispatch(&config).await? {
        DispatchRunOutcome::Skipped { action } => {
            tracing::debug!(action = %action, "comment event skipped");
        }
        DispatchRunOutcome::Completed(report) => {
            tracing::debug!(dispatched = report.dispatched_count(), "comment event handled");
        }
    }
    Ok(())
}
