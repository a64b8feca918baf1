use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use slash_dispatch_core::command_config::CommandConfig;
use slash_dispatch_core::dispatch_pipeline::{DispatchCollaborator, DispatchOutcome};
use slash_dispatch_core::dispatch_target::{dispatch_target_for, DispatchTarget};
use slash_dispatch_core::permission_level::PermissionLevel;
use slash_dispatch_core::repo_ref::RepoRef;
use slash_dispatch_core::slash_command_payload::SlashCommandPayload;

use crate::comment_event::{build_client_payload, build_dispatch_context, GithubContext};
use crate::github_api_client::{CommentReaction, GithubApiClient};

/// Dispatch collaborator backed by the GitHub REST API.
pub struct GithubDispatchCollaborator {
    client: GithubApiClient,
    /// `None` disables reactions.
    reaction_client: Option<GithubApiClient>,
    source_repo: RepoRef,
    comment_id: u64,
    /// Set when the triggering ticket is a pull request.
    pull_request_number: Option<u64>,
    github_context: GithubContext,
}

impl GithubDispatchCollaborator {
    pub fn new(
        client: GithubApiClient,
        reaction_client: Option<GithubApiClient>,
        source_repo: RepoRef,
        comment_id: u64,
        pull_request_number: Option<u64>,
        github_context: GithubContext,
    ) -> Self {
        Self {
            client,
            reaction_client,
            source_repo,
            comment_id,
            pull_request_number,
            github_context,
        }
    }

    async fn react(&self, reaction: CommentReaction) {
        let Some(client) = self.reaction_client.as_ref() else {
            return;
        };
        if let Err(error) = client
            .add_comment_reaction(&self.source_repo, self.comment_id, reaction)
            .await
        {
            tracing::debug!(error = %format!("{error:#}"), "reaction request failed");
            tracing::warn!("Failed to set reaction on comment ID {}.", self.comment_id);
        }
    }
}

#[async_trait]
impl DispatchCollaborator for GithubDispatchCollaborator {
    async fn lookup_permission(&self, repo: &RepoRef, actor: &str) -> Result<PermissionLevel> {
        self.client.collaborator_permission(repo, actor).await
    }

    async fn dispatch_context(&self) -> Result<Value> {
        let pull_request = match self.pull_request_number {
            Some(number) => Some(self.client.pull_request(&self.source_repo, number).await?),
            None => None,
        };
        build_dispatch_context(&self.github_context, pull_request)
    }

    async fn emit_dispatch(
        &self,
        config: &CommandConfig,
        payload: &SlashCommandPayload,
        context: &Value,
    ) -> Result<DispatchOutcome> {
        match dispatch_target_for(config, payload)? {
            DispatchTarget::Repository { repo, event_type } => {
                let client_payload = build_client_payload(context, payload)?;
                self.client
                    .create_repository_dispatch(&repo, &event_type, &client_payload)
                    .await?;
                tracing::info!(
                    "Command '{}' dispatched to '{}' with event type '{}'.",
                    config.command,
                    config.repository,
                    event_type
                );
                Ok(DispatchOutcome::Dispatched)
            }
            DispatchTarget::Workflow {
                repo,
                workflow_id,
                git_ref,
                inputs,
            } => {
                let git_ref = match git_ref {
                    Some(git_ref) => git_ref,
                    None => self.client.default_branch(&repo).await?,
                };
                tracing::debug!(%workflow_id, %git_ref, ?inputs, "workflow dispatch");
                let outcome = self
                    .client
                    .create_workflow_dispatch(&repo, &workflow_id, &git_ref, &inputs)
                    .await?;
                match &outcome {
                    DispatchOutcome::Dispatched => tracing::info!(
                        "Command '{}' dispatched to workflow '{}' in '{}'.",
                        config.command,
                        workflow_id,
                        config.repository
                    ),
                    DispatchOutcome::Rejected { message } => tracing::warn!("{message}"),
                }
                Ok(outcome)
            }
        }
    }

    async fn command_acknowledged(&self) {
        self.react(CommentReaction::Eyes).await;
    }

    async fn dispatches_completed(&self) {
        self.react(CommentReaction::Rocket).await;
    }
}
