use std::path::PathBuf;

use clap::{ArgAction, Parser};
use slash_dispatch_github::github_api_client::DEFAULT_GITHUB_API_BASE;

fn parse_positive_usize(value: &str) -> Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

/// Splits a list input on commas and newlines, trimming entries and dropping empties.
pub fn split_list_input(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(['\n', ','])
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Parser)]
#[command(
    name = "slash-dispatch",
    about = "Dispatch repository and workflow events from slash commands in issue comments",
    version
)]
/// Public struct `Cli` used across slash-dispatch components.
pub struct Cli {
    #[arg(
        long,
        env = "SLASH_DISPATCH_TOKEN",
        hide_env_values = true,
        help = "Token used for permission lookups and dispatches"
    )]
    pub token: Option<String>,

    #[arg(
        long = "github-token",
        env = "GITHUB_TOKEN",
        hide_env_values = true,
        hide = true
    )]
    pub github_token: Option<String>,

    #[arg(
        long = "reaction-token",
        env = "SLASH_DISPATCH_REACTION_TOKEN",
        hide_env_values = true,
        help = "Token used for comment reactions; defaults to --token"
    )]
    pub reaction_token: Option<String>,

    #[arg(
        long,
        env = "SLASH_DISPATCH_REACTIONS",
        default_value_t = true,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        help = "Add eyes and rocket reactions to the triggering comment"
    )]
    pub reactions: bool,

    #[arg(
        long,
        env = "SLASH_DISPATCH_COMMANDS",
        help = "Comma or newline separated command names sharing the flat configuration"
    )]
    pub commands: Option<String>,

    #[arg(
        long,
        env = "SLASH_DISPATCH_PERMISSION",
        default_value = "write",
        help = "Minimum permission level: none, read, triage, write, maintain or admin"
    )]
    pub permission: String,

    #[arg(
        long = "issue-type",
        env = "SLASH_DISPATCH_ISSUE_TYPE",
        default_value = "both",
        help = "Ticket kind the commands apply to: issue, pull-request or both"
    )]
    pub issue_type: String,

    #[arg(
        long = "allow-edits",
        env = "SLASH_DISPATCH_ALLOW_EDITS",
        default_value_t = false,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        help = "Dispatch commands found in edited comments"
    )]
    pub allow_edits: bool,

    #[arg(
        long,
        env = "SLASH_DISPATCH_REPOSITORY",
        help = "Target repository (owner/repo); defaults to the repository of the comment"
    )]
    pub repository: Option<String>,

    #[arg(
        long = "github-repository",
        env = "GITHUB_REPOSITORY",
        help = "Repository the triggering comment was posted in"
    )]
    pub github_repository: Option<String>,

    #[arg(
        long = "event-type-suffix",
        env = "SLASH_DISPATCH_EVENT_TYPE_SUFFIX",
        default_value = "-command",
        allow_hyphen_values = true,
        help = "Suffix appended to the command name to form the event type"
    )]
    pub event_type_suffix: String,

    #[arg(
        long = "static-args",
        env = "SLASH_DISPATCH_STATIC_ARGS",
        allow_hyphen_values = true,
        help = "Comma or newline separated arguments prepended to every invocation"
    )]
    pub static_args: Option<String>,

    #[arg(
        long = "dispatch-type",
        env = "SLASH_DISPATCH_DISPATCH_TYPE",
        default_value = "repository",
        help = "Dispatch kind: repository or workflow"
    )]
    pub dispatch_type: String,

    #[arg(
        long,
        env = "SLASH_DISPATCH_CONFIG",
        help = "Inline JSON array of command configurations"
    )]
    pub config: Option<String>,

    #[arg(
        long = "config-from-file",
        env = "SLASH_DISPATCH_CONFIG_FROM_FILE",
        help = "Path to a JSON file holding command configurations"
    )]
    pub config_from_file: Option<PathBuf>,

    #[arg(
        long = "api-base",
        env = "GITHUB_API_URL",
        default_value = DEFAULT_GITHUB_API_BASE,
        help = "GitHub REST API base URL"
    )]
    pub api_base: String,

    #[arg(
        long = "event-path",
        env = "GITHUB_EVENT_PATH",
        help = "Path to the issue_comment webhook payload"
    )]
    pub event_path: PathBuf,

    #[arg(
        long = "event-name",
        env = "GITHUB_EVENT_NAME",
        default_value = "issue_comment",
        help = "Name of the triggering event"
    )]
    pub event_name: String,

    #[arg(
        long,
        env = "GITHUB_ACTOR",
        help = "Login of the user who posted the comment"
    )]
    pub actor: Option<String>,

    #[arg(
        long = "output-path",
        env = "GITHUB_OUTPUT",
        help = "File receiving step outputs"
    )]
    pub output_path: Option<PathBuf>,

    #[arg(
        long = "request-timeout-ms",
        env = "SLASH_DISPATCH_REQUEST_TIMEOUT_MS",
        default_value_t = 30_000,
        value_parser = parse_positive_u64,
        help = "Timeout for each GitHub API request"
    )]
    pub request_timeout_ms: u64,

    #[arg(
        long = "retry-max-attempts",
        env = "SLASH_DISPATCH_RETRY_MAX_ATTEMPTS",
        default_value_t = 3,
        value_parser = parse_positive_usize,
        help = "Attempts per GitHub API request, including the first"
    )]
    pub retry_max_attempts: usize,

    #[arg(
        long = "retry-base-delay-ms",
        env = "SLASH_DISPATCH_RETRY_BASE_DELAY_MS",
        default_value_t = 500,
        value_parser = parse_positive_u64,
        help = "Base delay for exponential retry backoff"
    )]
    pub retry_base_delay_ms: u64,
}

impl Cli {
    /// Dispatch token, preferring `--token` over `GITHUB_TOKEN`.
    pub fn resolved_token(&self) -> Option<String> {
        self.token
            .as_deref()
            .or(self.github_token.as_deref())
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
    }

    pub fn command_names(&self) -> Vec<String> {
        split_list_input(self.commands.as_deref())
    }

    pub fn static_arg_list(&self) -> Vec<String> {
        split_list_input(self.static_args.as_deref())
    }
}
