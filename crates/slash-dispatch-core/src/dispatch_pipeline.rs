//! Sequential driver that takes one comment through matching and dispatch.
//!
//! Remote work is delegated to a [`DispatchCollaborator`]. The permission
//! lookup only happens once the local stages leave at least one candidate, and
//! dispatches are awaited one at a time in configuration order.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::command_config::CommandConfig;
use crate::command_line::parse_command_line;
use crate::command_matching::{match_command_configs, NoMatch, TriggerContext};
use crate::permission_level::PermissionLevel;
use crate::repo_ref::RepoRef;
use crate::slash_command_payload::{build_slash_command_payload, SlashCommandPayload};

#[derive(Debug, Clone, PartialEq, Eq)]
/// Result of emitting one dispatch.
pub enum DispatchOutcome {
    Dispatched,
    /// The remote service refused the dispatch with an informational validation error.
    Rejected { message: String },
}

/// Remote capabilities the pipeline relies on.
#[async_trait]
pub trait DispatchCollaborator: Send + Sync {
    /// Returns the actor's level on `repo`, or [`PermissionLevel::None`] when unknown.
    async fn lookup_permission(&self, repo: &RepoRef, actor: &str) -> Result<PermissionLevel>;

    /// Builds the event context shared by every dispatch of this comment.
    async fn dispatch_context(&self) -> Result<Value> {
        Ok(Value::Null)
    }

    async fn emit_dispatch(
        &self,
        config: &CommandConfig,
        payload: &SlashCommandPayload,
        context: &Value,
    ) -> Result<DispatchOutcome>;

    /// Called once the command is known to be registered for this context.
    async fn command_acknowledged(&self) {}

    /// Called after every surviving configuration has been dispatched.
    async fn dispatches_completed(&self) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Input for one triggering comment.
pub struct DispatchRequest {
    pub comment_body: String,
    pub context: TriggerContext,
    /// Repository the comment was posted in, used for the permission lookup.
    pub repository: RepoRef,
    pub actor: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Record of one emitted dispatch.
pub struct DispatchRecord {
    pub command: String,
    pub repository: String,
    pub event_type: String,
    pub outcome: DispatchOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Enumerates supported `DispatchReport` values.
pub enum DispatchReport {
    NotACommand,
    NoMatch(NoMatch),
    Dispatched {
        actor_permission: PermissionLevel,
        records: Vec<DispatchRecord>,
    },
}

impl DispatchReport {
    pub fn dispatched_count(&self) -> usize {
        match self {
            Self::Dispatched { records, .. } => records
                .iter()
                .filter(|record| record.outcome == DispatchOutcome::Dispatched)
                .count(),
            _ => 0,
        }
    }

    /// First informational rejection message, if any dispatch was refused.
    pub fn rejection_message(&self) -> Option<&str> {
        match self {
            Self::Dispatched { records, .. } => records.iter().find_map(|record| match &record.outcome {
                DispatchOutcome::Rejected { message } => Some(message.as_str()),
                DispatchOutcome::Dispatched => None,
            }),
            _ => None,
        }
    }
}

/// Matches the comment against `configs` and dispatches every surviving configuration.
pub async fn run_dispatch_pipeline(
    request: &DispatchRequest,
    configs: &[CommandConfig],
    collaborator: &dyn DispatchCollaborator,
) -> Result<DispatchReport> {
    let Some(parsed) = parse_command_line(&request.comment_body) else {
        tracing::debug!("The first line of the comment is not a valid slash command.");
        return Ok(DispatchReport::NotACommand);
    };
    tracing::debug!(tokens = ?parsed.tokens, "command tokens");

    let pending = match match_command_configs(configs, parsed.command(), request.context) {
        Ok(pending) => pending,
        Err(no_match) => {
            tracing::info!("{no_match}");
            return Ok(DispatchReport::NoMatch(no_match));
        }
    };

    collaborator.command_acknowledged().await;

    let actor_permission = collaborator
        .lookup_permission(&request.repository, &request.actor)
        .await?;
    tracing::debug!(%actor_permission, "actor permission");

    let matched = match pending.match_permission(actor_permission) {
        Ok(matched) => matched,
        Err(no_match) => {
            tracing::info!("{no_match}");
            return Ok(DispatchReport::NoMatch(no_match));
        }
    };
    tracing::info!("Command '{}' to be dispatched.", parsed.command());

    let context = collaborator.dispatch_context().await?;
    let mut records = Vec::with_capacity(matched.len());
    for config in &matched {
        let payload = build_slash_command_payload(&parsed.tokens, &config.static_args);
        tracing::debug!(?payload, "slash command payload");
        let outcome = collaborator.emit_dispatch(config, &payload, &context).await?;
        records.push(DispatchRecord {
            command: config.command.clone(),
            repository: config.repository.clone(),
            event_type: config.event_type(),
            outcome,
        });
    }

    collaborator.dispatches_completed().await;
    Ok(DispatchReport::Dispatched {
        actor_permission,
        records,
    })
}
