use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::permission_level::PermissionLevel;

pub const DEFAULT_PERMISSION: &str = "write";
pub const DEFAULT_ISSUE_TYPE: &str = "both";
pub const DEFAULT_ALLOW_EDITS: bool = false;
pub const DEFAULT_EVENT_TYPE_SUFFIX: &str = "-command";
pub const DEFAULT_DISPATCH_TYPE: &str = "repository";

#[derive(Debug, Error)]
/// Errors raised while resolving or validating registered command configuration.
pub enum CommandConfigError {
    #[error("failed to read command configuration from '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse command configuration JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
    #[error("command configuration JSON must be an array of command entries")]
    NotAnArray,
    #[error("command configuration entry {index} is malformed: {source}")]
    InvalidEntry {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("command configuration entry {index} is missing required field 'command'")]
    MissingCommand { index: usize },
    #[error("'{value}' is not a valid '{field}'.")]
    InvalidValue { field: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
/// Which kind of ticket a command applies to.
pub enum IssueApplicability {
    Issue,
    PullRequest,
    Both,
}

impl IssueApplicability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Issue => "issue",
            Self::PullRequest => "pull-request",
            Self::Both => "both",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "issue" => Some(Self::Issue),
            "pull-request" => Some(Self::PullRequest),
            "both" => Some(Self::Both),
            _ => None,
        }
    }

    pub fn applies_to(&self, is_pull_request: bool) -> bool {
        match self {
            Self::Both => true,
            Self::Issue => !is_pull_request,
            Self::PullRequest => is_pull_request,
        }
    }
}

impl fmt::Display for IssueApplicability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// How a matched command notifies its target repository.
pub enum DispatchKind {
    Repository,
    Workflow,
}

impl DispatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Repository => "repository",
            Self::Workflow => "workflow",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "repository" => Some(Self::Repository),
            "workflow" => Some(Self::Workflow),
            _ => None,
        }
    }
}

impl fmt::Display for DispatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// A command configuration whose enumerated fields have not been validated yet.
pub struct CommandConfigRecord {
    pub command: String,
    pub permission: String,
    pub issue_type: String,
    pub allow_edits: bool,
    pub repository: String,
    pub event_type_suffix: String,
    pub static_args: Vec<String>,
    pub dispatch_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// A validated registered command.
pub struct CommandConfig {
    pub command: String,
    pub permission: PermissionLevel,
    pub issue_type: IssueApplicability,
    pub allow_edits: bool,
    pub repository: String,
    pub event_type_suffix: String,
    pub static_args: Vec<String>,
    pub dispatch_type: DispatchKind,
}

impl CommandConfig {
    /// Event type (and workflow stem) addressed by this command.
    pub fn event_type(&self) -> String {
        format!("{}{}", self.command, self.event_type_suffix)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Flat configuration replicated across every listed command name.
pub struct CommandTemplate {
    pub permission: String,
    pub issue_type: String,
    pub allow_edits: bool,
    pub repository: String,
    pub event_type_suffix: String,
    pub static_args: Vec<String>,
    pub dispatch_type: String,
}

impl CommandTemplate {
    /// Template populated with the global defaults for `repository`.
    pub fn with_defaults(repository: impl Into<String>) -> Self {
        Self {
            permission: DEFAULT_PERMISSION.to_string(),
            issue_type: DEFAULT_ISSUE_TYPE.to_string(),
            allow_edits: DEFAULT_ALLOW_EDITS,
            repository: repository.into(),
            event_type_suffix: DEFAULT_EVENT_TYPE_SUFFIX.to_string(),
            static_args: Vec::new(),
            dispatch_type: DEFAULT_DISPATCH_TYPE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Where the registered command configuration comes from.
pub enum CommandConfigSource {
    File(PathBuf),
    Json(String),
    Template {
        commands: Vec<String>,
        template: CommandTemplate,
    },
}

impl CommandConfigSource {
    /// Picks the file, then inline JSON, then the flat template.
    pub fn select(
        config_from_file: Option<PathBuf>,
        config: Option<String>,
        commands: Vec<String>,
        template: CommandTemplate,
    ) -> Self {
        if let Some(path) = config_from_file.filter(|path| !path.as_os_str().is_empty()) {
            return Self::File(path);
        }
        if let Some(json) = config.filter(|json| !json.trim().is_empty()) {
            return Self::Json(json);
        }
        Self::Template { commands, template }
    }

    /// Resolves the source into records. `repository` is the default target repository.
    pub fn resolve(&self, repository: &str) -> Result<Vec<CommandConfigRecord>, CommandConfigError> {
        match self {
            Self::File(path) => {
                tracing::info!("Using JSON configuration from file '{}'.", path.display());
                load_command_configs_from_file(path, repository)
            }
            Self::Json(json) => {
                tracing::info!("Using JSON configuration from 'config' input.");
                command_configs_from_json(json, repository)
            }
            Self::Template { commands, template } => {
                tracing::info!("Using configuration from flat inputs.");
                Ok(command_configs_from_template(commands, template))
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum FlexibleBool {
    Bool(bool),
    Text(String),
}

impl FlexibleBool {
    fn resolve(&self, default: bool) -> bool {
        match self {
            Self::Bool(value) => *value,
            Self::Text(text) if text.is_empty() => default,
            Self::Text(text) => text == "true",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CommandConfigEntry {
    #[serde(default)]
    command: Option<String>,
    #[serde(default)]
    permission: Option<String>,
    #[serde(default)]
    issue_type: Option<String>,
    #[serde(default)]
    allow_edits: Option<FlexibleBool>,
    #[serde(default)]
    repository: Option<String>,
    #[serde(default)]
    event_type_suffix: Option<String>,
    #[serde(default)]
    static_args: Option<Vec<String>>,
    #[serde(default)]
    dispatch_type: Option<String>,
}

fn non_empty_or(value: Option<String>, default: &str) -> String {
    value
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Replicates `template` across every command name.
pub fn command_configs_from_template(
    commands: &[String],
    template: &CommandTemplate,
) -> Vec<CommandConfigRecord> {
    tracing::debug!(?commands, "building command configuration from template");
    commands
        .iter()
        .map(|command| CommandConfigRecord {
            command: command.clone(),
            permission: template.permission.clone(),
            issue_type: template.issue_type.clone(),
            allow_edits: template.allow_edits,
            repository: template.repository.clone(),
            event_type_suffix: template.event_type_suffix.clone(),
            static_args: template.static_args.clone(),
            dispatch_type: template.dispatch_type.clone(),
        })
        .collect()
}

/// Parses a JSON array of partial command entries, filling omitted fields with defaults.
pub fn command_configs_from_json(
    json: &str,
    repository: &str,
) -> Result<Vec<CommandConfigRecord>, CommandConfigError> {
    let parsed = serde_json::from_str::<Value>(json).map_err(CommandConfigError::InvalidJson)?;
    tracing::debug!(config = %parsed, "parsed JSON command configuration");
    let Value::Array(entries) = parsed else {
        return Err(CommandConfigError::NotAnArray);
    };

    let mut records = Vec::with_capacity(entries.len());
    for (index, raw_entry) in entries.into_iter().enumerate() {
        let entry = serde_json::from_value::<CommandConfigEntry>(raw_entry)
            .map_err(|source| CommandConfigError::InvalidEntry { index, source })?;
        let command = entry
            .command
            .filter(|command| !command.trim().is_empty())
            .ok_or(CommandConfigError::MissingCommand { index })?;
        records.push(CommandConfigRecord {
            command,
            permission: non_empty_or(entry.permission, DEFAULT_PERMISSION),
            issue_type: non_empty_or(entry.issue_type, DEFAULT_ISSUE_TYPE),
            allow_edits: entry
                .allow_edits
                .map(|value| value.resolve(DEFAULT_ALLOW_EDITS))
                .unwrap_or(DEFAULT_ALLOW_EDITS),
            repository: non_empty_or(entry.repository, repository),
            event_type_suffix: non_empty_or(entry.event_type_suffix, DEFAULT_EVENT_TYPE_SUFFIX),
            static_args: entry.static_args.unwrap_or_default(),
            dispatch_type: non_empty_or(entry.dispatch_type, DEFAULT_DISPATCH_TYPE),
        });
    }
    Ok(records)
}

pub fn load_command_configs_from_file(
    path: &Path,
    repository: &str,
) -> Result<Vec<CommandConfigRecord>, CommandConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| CommandConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    command_configs_from_json(&raw, repository)
}

/// Validates every record; the first invalid value rejects the whole set.
pub fn validate_command_configs(
    records: &[CommandConfigRecord],
) -> Result<Vec<CommandConfig>, CommandConfigError> {
    records
        .iter()
        .map(|record| {
            let permission = PermissionLevel::parse(&record.permission).ok_or_else(|| {
                CommandConfigError::InvalidValue {
                    field: "permission",
                    value: record.permission.clone(),
                }
            })?;
            let issue_type = IssueApplicability::parse(&record.issue_type).ok_or_else(|| {
                CommandConfigError::InvalidValue {
                    field: "issue-type",
                    value: record.issue_type.clone(),
                }
            })?;
            let dispatch_type = DispatchKind::parse(&record.dispatch_type).ok_or_else(|| {
                CommandConfigError::InvalidValue {
                    field: "dispatch-type",
                    value: record.dispatch_type.clone(),
                }
            })?;
            Ok(CommandConfig {
                command: record.command.clone(),
                permission,
                issue_type,
                allow_edits: record.allow_edits,
                repository: record.repository.clone(),
                event_type_suffix: record.event_type_suffix.clone(),
                static_args: record.static_args.clone(),
                dispatch_type,
            })
        })
        .collect()
}

/// Resolves and validates a configuration source in one step.
pub fn resolve_command_configs(
    source: &CommandConfigSource,
    repository: &str,
) -> Result<Vec<CommandConfig>, CommandConfigError> {
    let records = source.resolve(repository)?;
    tracing::debug!(?records, "resolved command configuration");
    validate_command_configs(&records)
}
