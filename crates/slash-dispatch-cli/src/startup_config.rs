use slash_dispatch_core::command_config::{CommandConfigSource, CommandTemplate};
use slash_dispatch_github::comment_event::GithubRunMetadata;
use slash_dispatch_github::dispatch_runtime::DispatchRuntimeConfig;

use crate::cli_args::Cli;

/// Maps parsed flags onto the per-event runtime configuration.
pub fn build_runtime_config(cli: &Cli, run_metadata: GithubRunMetadata) -> DispatchRuntimeConfig {
    let source_repository = cli.github_repository.clone().unwrap_or_default();
    let target_repository = cli
        .repository
        .clone()
        .filter(|repository| !repository.trim().is_empty())
        .unwrap_or_else(|| source_repository.clone());

    let template = CommandTemplate {
        permission: cli.permission.clone(),
        issue_type: cli.issue_type.clone(),
        allow_edits: cli.allow_edits,
        repository: target_repository,
        event_type_suffix: cli.event_type_suffix.clone(),
        static_args: cli.static_arg_list(),
        dispatch_type: cli.dispatch_type.clone(),
    };
    let config_source = CommandConfigSource::select(
        cli.config_from_file.clone(),
        cli.config.clone(),
        cli.command_names(),
        template,
    );

    DispatchRuntimeConfig {
        token: cli.resolved_token(),
        reaction_token: cli.reaction_token.clone(),
        reactions: cli.reactions,
        config_source,
        repository: source_repository,
        api_base: cli.api_base.clone(),
        event_name: cli.event_name.clone(),
        event_path: cli.event_path.clone(),
        actor: cli.actor.clone().unwrap_or_default(),
        output_path: cli.output_path.clone(),
        request_timeout_ms: cli.request_timeout_ms,
        retry_max_attempts: cli.retry_max_attempts,
        retry_base_delay_ms: cli.retry_base_delay_ms,
        run_metadata,
    }
}
