//! Per-event runtime: loads the triggering comment event, resolves the
//! registered commands and drives the core pipeline against GitHub.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use slash_dispatch_core::command_config::{resolve_command_configs, CommandConfigSource};
use slash_dispatch_core::dispatch_pipeline::{
    run_dispatch_pipeline, DispatchReport, DispatchRequest,
};
use slash_dispatch_core::repo_ref::RepoRef;

use crate::comment_event::{CommentEvent, GithubContext, GithubRunMetadata};
use crate::github_api_client::GithubApiClient;
use crate::github_dispatch_collaborator::GithubDispatchCollaborator;
use crate::github_transport_helpers::RetryPolicy;
use crate::step_output::{StepOutputWriter, ERROR_MESSAGE_OUTPUT};

#[derive(Debug, Clone)]
/// Public struct `DispatchRuntimeConfig` used across slash-dispatch components.
pub struct DispatchRuntimeConfig {
    pub token: Option<String>,
    /// Token for comment reactions; falls back to `token`.
    pub reaction_token: Option<String>,
    pub reactions: bool,
    pub config_source: CommandConfigSource,
    /// Repository the comment was posted in (`owner/repo`).
    pub repository: String,
    pub api_base: String,
    pub event_name: String,
    pub event_path: PathBuf,
    pub actor: String,
    pub output_path: Option<PathBuf>,
    pub request_timeout_ms: u64,
    pub retry_max_attempts: usize,
    pub retry_base_delay_ms: u64,
    pub run_metadata: GithubRunMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Enumerates supported `DispatchRunOutcome` values.
pub enum DispatchRunOutcome {
    /// The comment action is neither `created` nor `edited`.
    Skipped { action: String },
    Completed(DispatchReport),
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Handles one `issue_comment` event end to end.
pub async fn run_comment_dispatch(config: &DispatchRuntimeConfig) -> Result<DispatchRunOutcome> {
    let event = CommentEvent::load(&config.event_path)?;
    let Some(context) = event.trigger_context() else {
        tracing::warn!("Event type '{}' not supported.", event.action.as_str());
        return Ok(DispatchRunOutcome::Skipped {
            action: event.action.as_str().to_string(),
        });
    };

    let token = non_empty(config.token.as_deref())
        .ok_or_else(|| anyhow!("Missing required input 'token'."))?;

    let configs = resolve_command_configs(&config.config_source, &config.repository)?;
    tracing::debug!(?configs, "commands config");
    tracing::debug!(comment_body = %event.comment_body, comment_id = event.comment_id, "comment");

    let source_repo = RepoRef::parse(&config.repository)
        .context("failed to resolve the repository the comment was posted in")?;
    let retry = RetryPolicy::new(config.retry_max_attempts, config.retry_base_delay_ms);
    let client = GithubApiClient::new(&config.api_base, token, config.request_timeout_ms, retry)?;
    let reaction_client = if config.reactions {
        let reaction_token = non_empty(config.reaction_token.as_deref()).unwrap_or(token);
        Some(GithubApiClient::new(
            &config.api_base,
            reaction_token,
            config.request_timeout_ms,
            retry,
        )?)
    } else {
        None
    };

    let github_context = GithubContext::new(
        &event,
        &config.event_name,
        &config.actor,
        &config.api_base,
        config.run_metadata.clone(),
    );
    let collaborator = GithubDispatchCollaborator::new(
        client,
        reaction_client,
        source_repo.clone(),
        event.comment_id,
        event.is_pull_request.then_some(event.issue_number),
        github_context,
    );
    let request = DispatchRequest {
        comment_body: event.comment_body.clone(),
        context,
        repository: source_repo,
        actor: config.actor.clone(),
    };

    let report = run_dispatch_pipeline(&request, &configs, &collaborator).await?;
    if let Some(message) = report.rejection_message() {
        StepOutputWriter::new(config.output_path.clone()).set_output(ERROR_MESSAGE_OUTPUT, message)?;
    }
    Ok(DispatchRunOutcome::Completed(report))
}
