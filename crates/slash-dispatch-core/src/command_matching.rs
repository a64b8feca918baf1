use std::fmt;

use crate::command_config::CommandConfig;
use crate::permission_level::{actor_has_permission, PermissionLevel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Describes the ticket and comment action that triggered matching.
pub struct TriggerContext {
    pub is_pull_request: bool,
    pub is_edit: bool,
}

impl TriggerContext {
    pub fn issue_type_label(&self) -> &'static str {
        if self.is_pull_request {
            "pull request"
        } else {
            "issue"
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Enumerates matching stages in evaluation order.
pub enum MatchStage {
    Name,
    Applicability,
    EditPolicy,
    Permission,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Terminal state reached when a stage leaves no candidate configuration.
pub struct NoMatch {
    pub stage: MatchStage,
    pub command: String,
    pub actor_permission: Option<PermissionLevel>,
    pub issue_type: &'static str,
}

impl fmt::Display for NoMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.stage {
            MatchStage::Name => write!(
                f,
                "Command '{}' is not registered for dispatch.",
                self.command
            ),
            MatchStage::Applicability => write!(
                f,
                "Command '{}' is not configured for the issue type '{}'.",
                self.command, self.issue_type
            ),
            MatchStage::EditPolicy => write!(
                f,
                "Command '{}' is not configured to allow edits.",
                self.command
            ),
            MatchStage::Permission => write!(
                f,
                "Command '{}' is not configured for the user's permission level '{}'.",
                self.command,
                self.actor_permission.unwrap_or(PermissionLevel::None)
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Candidates that survived name, applicability and edit-policy matching and
/// now wait on the actor's permission level.
pub struct PendingPermissionMatch {
    command: String,
    context: TriggerContext,
    candidates: Vec<CommandConfig>,
}

impl PendingPermissionMatch {
    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn candidates(&self) -> &[CommandConfig] {
        &self.candidates
    }

    /// Applies the permission stage and returns the configurations to dispatch.
    pub fn match_permission(self, actor: PermissionLevel) -> Result<Vec<CommandConfig>, NoMatch> {
        let matched = self
            .candidates
            .into_iter()
            .filter(|config| actor_has_permission(actor, config.permission))
            .collect::<Vec<_>>();
        tracing::debug!(?matched, "config matches on 'permission'");
        if matched.is_empty() {
            return Err(NoMatch {
                stage: MatchStage::Permission,
                command: self.command,
                actor_permission: Some(actor),
                issue_type: self.context.issue_type_label(),
            });
        }
        Ok(matched)
    }
}

fn require_candidates(
    candidates: Vec<CommandConfig>,
    stage: MatchStage,
    command: &str,
    context: &TriggerContext,
) -> Result<Vec<CommandConfig>, NoMatch> {
    if candidates.is_empty() {
        return Err(NoMatch {
            stage,
            command: command.to_string(),
            actor_permission: None,
            issue_type: context.issue_type_label(),
        });
    }
    Ok(candidates)
}

/// Runs the stages that need no remote lookup: name, applicability and, for
/// edits only, edit policy. Stops at the first stage that empties the set.
pub fn match_command_configs(
    configs: &[CommandConfig],
    command: &str,
    context: TriggerContext,
) -> Result<PendingPermissionMatch, NoMatch> {
    let by_name = configs
        .iter()
        .filter(|config| config.command == command)
        .cloned()
        .collect::<Vec<_>>();
    tracing::debug!(?by_name, "config matches on 'command'");
    let by_name = require_candidates(by_name, MatchStage::Name, command, &context)?;

    let by_issue_type = by_name
        .into_iter()
        .filter(|config| config.issue_type.applies_to(context.is_pull_request))
        .collect::<Vec<_>>();
    tracing::debug!(?by_issue_type, "config matches on 'issue_type'");
    let mut candidates =
        require_candidates(by_issue_type, MatchStage::Applicability, command, &context)?;

    if context.is_edit {
        let by_edit_policy = candidates
            .into_iter()
            .filter(|config| config.allow_edits)
            .collect::<Vec<_>>();
        tracing::debug!(?by_edit_policy, "config matches on 'allow_edits'");
        candidates = require_candidates(by_edit_policy, MatchStage::EditPolicy, command, &context)?;
    }

    Ok(PendingPermissionMatch {
        command: command.to_string(),
        context,
        candidates,
    })
}

#[cfg(test)]
mod tests {
    use super::{match_command_configs, MatchStage, TriggerContext};
    use crate::command_config::{CommandConfig, DispatchKind, IssueApplicability};
    use crate::permission_level::PermissionLevel;

    fn config(command: &str, repository: &str) -> CommandConfig {
        CommandConfig {
            command: command.to_string(),
            permission: PermissionLevel::Write,
            issue_type: IssueApplicability::Both,
            allow_edits: false,
            repository: repository.to_string(),
            event_type_suffix: "-command".to_string(),
            static_args: Vec::new(),
            dispatch_type: DispatchKind::Repository,
        }
    }

    const CREATED_ISSUE: TriggerContext = TriggerContext {
        is_pull_request: false,
        is_edit: false,
    };

    #[test]
    fn unit_match_command_configs_reports_unregistered_command() {
        let error = match_command_configs(&[config("deploy", "o/r")], "rollback", CREATED_ISSUE)
            .expect_err("no match");
        assert_eq!(error.stage, MatchStage::Name);
        assert_eq!(
            error.to_string(),
            "Command 'rollback' is not registered for dispatch."
        );
    }

    #[test]
    fn functional_match_command_configs_halts_on_issue_type() {
        let mut deploy = config("deploy", "o/r");
        deploy.issue_type = IssueApplicability::PullRequest;
        let error =
            match_command_configs(&[deploy], "deploy", CREATED_ISSUE).expect_err("no match");
        assert_eq!(error.stage, MatchStage::Applicability);
        assert_eq!(
            error.to_string(),
            "Command 'deploy' is not configured for the issue type 'issue'."
        );
    }

    #[test]
    fn functional_match_command_configs_applies_edit_policy_only_to_edits() {
        let configs = vec![config("deploy", "o/r")];
        let edited = TriggerContext {
            is_pull_request: true,
            is_edit: true,
        };
        let error = match_command_configs(&configs, "deploy", edited).expect_err("no match");
        assert_eq!(error.stage, MatchStage::EditPolicy);

        let created = TriggerContext {
            is_pull_request: true,
            is_edit: false,
        };
        let pending = match_command_configs(&configs, "deploy", created).expect("pending");
        assert_eq!(pending.candidates().len(), 1);
    }

    #[test]
    fn integration_match_command_configs_keeps_every_surviving_registration() {
        let mut admin_only = config("deploy", "o/prod");
        admin_only.permission = PermissionLevel::Admin;
        let mut editable = config("deploy", "o/staging");
        editable.allow_edits = true;
        let mut issue_only = config("deploy", "o/docs");
        issue_only.issue_type = IssueApplicability::Issue;
        issue_only.allow_edits = true;
        let configs = vec![admin_only, editable, issue_only, config("other", "o/r")];

        let pending = match_command_configs(&configs, "deploy", CREATED_ISSUE).expect("pending");
        assert_eq!(pending.command(), "deploy");
        let matched = pending
            .clone()
            .match_permission(PermissionLevel::Write)
            .expect("matched");
        assert_eq!(
            matched
                .iter()
                .map(|config| config.repository.as_str())
                .collect::<Vec<_>>(),
            vec!["o/staging", "o/docs"]
        );

        let all = pending
            .match_permission(PermissionLevel::Admin)
            .expect("matched");
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn regression_match_permission_reports_actor_level() {
        let pending =
            match_command_configs(&[config("deploy", "o/r")], "deploy", CREATED_ISSUE)
                .expect("pending");
        let error = pending
            .match_permission(PermissionLevel::Read)
            .expect_err("denied");
        assert_eq!(error.stage, MatchStage::Permission);
        assert_eq!(
            error.to_string(),
            "Command 'deploy' is not configured for the user's permission level 'read'."
        );
    }
}
