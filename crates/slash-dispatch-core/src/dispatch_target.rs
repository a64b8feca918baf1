use anyhow::{Context, Result};

use crate::command_config::{CommandConfig, DispatchKind};
use crate::repo_ref::RepoRef;
use crate::slash_command_payload::SlashCommandPayload;

/// Maximum number of named arguments forwarded as workflow inputs.
pub const MAX_WORKFLOW_INPUTS: usize = 10;
/// Named argument selecting the branch a workflow dispatch runs on.
pub const WORKFLOW_REF_ARG: &str = "ref";

#[derive(Debug, Clone, PartialEq, Eq)]
/// Enumerates supported `DispatchTarget` values.
pub enum DispatchTarget {
    Repository {
        repo: RepoRef,
        event_type: String,
    },
    Workflow {
        repo: RepoRef,
        workflow_id: String,
        /// `None` means the repository's default branch.
        git_ref: Option<String>,
        inputs: Vec<(String, String)>,
    },
}

impl DispatchTarget {
    pub fn repo(&self) -> &RepoRef {
        match self {
            Self::Repository { repo, .. } | Self::Workflow { repo, .. } => repo,
        }
    }
}

/// Canonical non-negative integer keys, which JSON object consumers enumerate
/// ahead of all other keys in ascending numeric order.
fn integer_key(key: &str) -> Option<u32> {
    if key.is_empty() || (key.len() > 1 && key.starts_with('0')) {
        return None;
    }
    if !key.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    key.parse::<u32>().ok().filter(|value| *value < u32::MAX)
}

/// Named arguments in workflow-input order: integer keys ascending, then the
/// remaining keys in insertion order. `ref` is excluded and the list is capped.
fn workflow_inputs(payload: &SlashCommandPayload) -> Vec<(String, String)> {
    let mut ordered = payload
        .args
        .named
        .iter()
        .filter(|(key, _)| *key != WORKFLOW_REF_ARG)
        .collect::<Vec<_>>();
    // Stable sort keeps insertion order among non-integer keys.
    ordered.sort_by_key(|(key, _)| match integer_key(key) {
        Some(index) => (0, index),
        None => (1, 0),
    });
    ordered
        .into_iter()
        .take(MAX_WORKFLOW_INPUTS)
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

/// Derives where and how a matched configuration is dispatched.
pub fn dispatch_target_for(
    config: &CommandConfig,
    payload: &SlashCommandPayload,
) -> Result<DispatchTarget> {
    let repo = RepoRef::parse(&config.repository).with_context(|| {
        format!(
            "command '{}' has an invalid target repository",
            config.command
        )
    })?;
    Ok(match config.dispatch_type {
        DispatchKind::Repository => DispatchTarget::Repository {
            repo,
            event_type: config.event_type(),
        },
        DispatchKind::Workflow => DispatchTarget::Workflow {
            repo,
            workflow_id: format!("{}.yml", config.event_type()),
            git_ref: payload
                .args
                .named
                .get(WORKFLOW_REF_ARG)
                .map(ToOwned::to_owned),
            inputs: workflow_inputs(payload),
        },
    })
}
