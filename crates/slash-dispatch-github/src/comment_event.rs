use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use slash_dispatch_core::command_matching::TriggerContext;
use slash_dispatch_core::slash_command_payload::SlashCommandPayload;

use crate::github_transport_helpers::truncate_chars;

/// Issue and pull-request bodies are cut to this many characters in dispatch payloads.
pub const MAX_PAYLOAD_BODY_CHARS: usize = 1_000;

const DEFAULT_SERVER_URL: &str = "https://github.com";
const DEFAULT_GRAPHQL_URL: &str = "https://api.github.com/graphql";

#[derive(Debug, Clone, PartialEq, Eq)]
/// Enumerates supported `CommentAction` values.
pub enum CommentAction {
    Created,
    Edited,
    Other(String),
}

impl CommentAction {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "created" => Self::Created,
            "edited" => Self::Edited,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Created => "created",
            Self::Edited => "edited",
            Self::Other(raw) => raw,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
/// The parts of an `issue_comment` webhook payload the dispatcher reads.
pub struct CommentEvent {
    pub action: CommentAction,
    pub issue_number: u64,
    pub is_pull_request: bool,
    pub comment_id: u64,
    pub comment_body: String,
    pub payload: Value,
}

impl CommentEvent {
    pub fn from_payload(payload: Value) -> Result<Self> {
        let action = payload.get("action").and_then(Value::as_str);
        let issue = payload.get("issue").filter(|issue| issue.is_object());
        let comment = payload.get("comment").filter(|comment| comment.is_object());
        let (Some(action), Some(issue), Some(comment)) = (action, issue, comment) else {
            bail!("Required context properties are missing.");
        };
        if action.is_empty() {
            bail!("Required context properties are missing.");
        }

        let issue_number = issue
            .get("number")
            .and_then(Value::as_u64)
            .context("issue payload is missing 'number'")?;
        let comment_id = comment
            .get("id")
            .and_then(Value::as_u64)
            .context("comment payload is missing 'id'")?;
        let comment_body = comment
            .get("body")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let is_pull_request = issue.get("pull_request").is_some();

        Ok(Self {
            action: CommentAction::parse(action),
            issue_number,
            is_pull_request,
            comment_id,
            comment_body,
            payload,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read event payload {}", path.display()))?;
        let payload = serde_json::from_str::<Value>(&raw)
            .with_context(|| format!("failed to parse event payload {}", path.display()))?;
        Self::from_payload(payload)
    }

    /// Matching context for supported actions; `None` for anything other than
    /// `created` and `edited`.
    pub fn trigger_context(&self) -> Option<TriggerContext> {
        let is_edit = match self.action {
            CommentAction::Created => false,
            CommentAction::Edited => true,
            CommentAction::Other(_) => return None,
        };
        Some(TriggerContext {
            is_pull_request: self.is_pull_request,
            is_edit,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Workflow run metadata read from the runner environment.
pub struct GithubRunMetadata {
    pub sha: Option<String>,
    pub git_ref: Option<String>,
    pub workflow: Option<String>,
    pub action: Option<String>,
    pub job: Option<String>,
    pub run_number: Option<u64>,
    pub run_id: Option<u64>,
    pub run_attempt: Option<u64>,
    pub server_url: Option<String>,
    pub graphql_url: Option<String>,
}

impl GithubRunMetadata {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let text = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let number = |key: &str| text(key).and_then(|value| value.trim().parse::<u64>().ok());
        Self {
            sha: text("GITHUB_SHA"),
            git_ref: text("GITHUB_REF"),
            workflow: text("GITHUB_WORKFLOW"),
            action: text("GITHUB_ACTION"),
            job: text("GITHUB_JOB"),
            run_number: number("GITHUB_RUN_NUMBER"),
            run_id: number("GITHUB_RUN_ID"),
            run_attempt: number("GITHUB_RUN_ATTEMPT"),
            server_url: text("GITHUB_SERVER_URL"),
            graphql_url: text("GITHUB_GRAPHQL_URL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
/// Workflow context forwarded under `github` in every client payload.
pub struct GithubContext {
    pub payload: Value,
    pub event_name: String,
    pub sha: Option<String>,
    #[serde(rename = "ref")]
    pub git_ref: Option<String>,
    pub workflow: Option<String>,
    pub action: Option<String>,
    pub actor: String,
    pub job: Option<String>,
    pub run_number: Option<u64>,
    pub run_id: Option<u64>,
    pub run_attempt: Option<u64>,
    pub api_url: String,
    pub server_url: String,
    pub graphql_url: String,
}

impl GithubContext {
    /// Builds the context for `event`, truncating the issue body.
    pub fn new(
        event: &CommentEvent,
        event_name: &str,
        actor: &str,
        api_url: &str,
        metadata: GithubRunMetadata,
    ) -> Self {
        let mut payload = event.payload.clone();
        if let Some(issue) = payload.get_mut("issue") {
            truncate_body(issue);
        }
        Self {
            payload,
            event_name: event_name.to_string(),
            sha: metadata.sha,
            git_ref: metadata.git_ref,
            workflow: metadata.workflow,
            action: metadata.action,
            actor: actor.to_string(),
            job: metadata.job,
            run_number: metadata.run_number,
            run_id: metadata.run_id,
            run_attempt: metadata.run_attempt,
            api_url: api_url.trim_end_matches('/').to_string(),
            server_url: metadata
                .server_url
                .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string()),
            graphql_url: metadata
                .graphql_url
                .unwrap_or_else(|| DEFAULT_GRAPHQL_URL.to_string()),
        }
    }
}

/// Cuts a string `body` field down to [`MAX_PAYLOAD_BODY_CHARS`] characters.
pub fn truncate_body(entity: &mut Value) {
    let Some(body) = entity.get_mut("body") else {
        return;
    };
    if let Value::String(text) = body {
        let keep = truncate_chars(text, MAX_PAYLOAD_BODY_CHARS).len();
        text.truncate(keep);
    }
}

/// Context shared by every dispatch of one comment: `github` plus an optional
/// `pull_request` whose body is truncated.
pub fn build_dispatch_context(github: &GithubContext, pull_request: Option<Value>) -> Result<Value> {
    let mut context = Map::new();
    context.insert(
        "github".to_string(),
        serde_json::to_value(github).context("failed to encode github context")?,
    );
    if let Some(mut pull_request) = pull_request {
        truncate_body(&mut pull_request);
        context.insert("pull_request".to_string(), pull_request);
    }
    Ok(Value::Object(context))
}

/// Adds `slash_command` to the shared context to form a `client_payload`.
pub fn build_client_payload(context: &Value, slash_command: &SlashCommandPayload) -> Result<Value> {
    let mut payload = match context {
        Value::Object(map) => map.clone(),
        Value::Null => Map::new(),
        other => bail!("dispatch context must be a JSON object, got {other}"),
    };
    payload.insert(
        "slash_command".to_string(),
        serde_json::to_value(slash_command).context("failed to encode slash command payload")?,
    );
    Ok(Value::Object(payload))
}

#[cfg(test)]
mod tests {
    use super::{
        build_client_payload, build_dispatch_context, CommentAction, CommentEvent, GithubContext,
        GithubRunMetadata, MAX_PAYLOAD_BODY_CHARS,
    };
    use serde_json::json;
    use slash_dispatch_core::slash_command_payload::build_slash_command_payload;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn event_payload(action: &str, pull_request: bool) -> serde_json::Value {
        let mut issue = json!({"number": 42, "title": "Flaky", "body": "issue body"});
        if pull_request {
            issue["pull_request"] = json!({"url": "https://api.github.com/repos/o/r/pulls/42"});
        }
        json!({
            "action": action,
            "issue": issue,
            "comment": {"id": 9001, "body": "/deploy env=prod\r\nplease"},
            "repository": {"full_name": "o/r"}
        })
    }

    #[test]
    fn unit_from_payload_reads_comment_and_ticket_kind() {
        let event = CommentEvent::from_payload(event_payload("edited", true)).expect("event");
        assert_eq!(event.action, CommentAction::Edited);
        assert_eq!(event.issue_number, 42);
        assert_eq!(event.comment_id, 9001);
        assert!(event.is_pull_request);
        let context = event.trigger_context().expect("supported");
        assert!(context.is_edit);
        assert!(context.is_pull_request);
    }

    #[test]
    fn regression_from_payload_requires_action_issue_and_comment() {
        let mut payload = event_payload("created", false);
        payload.as_object_mut().expect("object").remove("comment");
        let error = CommentEvent::from_payload(payload).expect_err("missing comment");
        assert_eq!(error.to_string(), "Required context properties are missing.");

        let error = CommentEvent::from_payload(json!({"action": "created"})).expect_err("missing");
        assert_eq!(error.to_string(), "Required context properties are missing.");
    }

    #[test]
    fn unit_trigger_context_skips_unsupported_actions() {
        let event = CommentEvent::from_payload(event_payload("deleted", false)).expect("event");
        assert_eq!(event.action, CommentAction::Other("deleted".to_string()));
        assert_eq!(event.action.as_str(), "deleted");
        assert!(event.trigger_context().is_none());
    }

    #[test]
    fn functional_load_reads_event_file() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("event.json");
        std::fs::write(&path, event_payload("created", false).to_string()).expect("write");
        let event = CommentEvent::load(&path).expect("event");
        assert_eq!(event.comment_body, "/deploy env=prod\r\nplease");
        assert!(!event.is_pull_request);

        std::fs::write(&path, "not json").expect("write");
        let error = CommentEvent::load(&path).expect_err("invalid json");
        assert!(error.to_string().contains("failed to parse event payload"));
    }

    #[test]
    fn unit_run_metadata_from_lookup_parses_numbers() {
        let env = HashMap::from([
            ("GITHUB_SHA", "abc123"),
            ("GITHUB_RUN_ID", "77"),
            ("GITHUB_RUN_NUMBER", "not-a-number"),
            ("GITHUB_JOB", " "),
        ]);
        let metadata =
            GithubRunMetadata::from_lookup(|key| env.get(key).map(|value| value.to_string()));
        assert_eq!(metadata.sha.as_deref(), Some("abc123"));
        assert_eq!(metadata.run_id, Some(77));
        assert_eq!(metadata.run_number, None);
        assert_eq!(metadata.job, None);
    }

    #[test]
    fn integration_client_payload_truncates_bodies_and_adds_slash_command() {
        let mut payload = event_payload("created", true);
        payload["issue"]["body"] = json!("x".repeat(MAX_PAYLOAD_BODY_CHARS + 50));
        let event = CommentEvent::from_payload(payload).expect("event");
        let github = GithubContext::new(
            &event,
            "issue_comment",
            "alice",
            "https://api.github.com/",
            GithubRunMetadata::default(),
        );
        let pull = json!({"number": 42, "body": "é".repeat(1_200), "head": {"ref": "feature"}});
        let context = build_dispatch_context(&github, Some(pull)).expect("context");

        let tokens = vec!["deploy".to_string(), "env=prod".to_string()];
        let slash_command = build_slash_command_payload(&tokens, &[]);
        let client_payload = build_client_payload(&context, &slash_command).expect("payload");

        assert_eq!(client_payload["slash_command"]["command"], "deploy");
        assert_eq!(client_payload["slash_command"]["args"]["named"]["env"], "prod");
        assert_eq!(client_payload["github"]["eventName"], "issue_comment");
        assert_eq!(client_payload["github"]["apiUrl"], "https://api.github.com");
        assert_eq!(client_payload["github"]["serverUrl"], "https://github.com");
        assert_eq!(
            client_payload["github"]["payload"]["issue"]["body"]
                .as_str()
                .expect("body")
                .chars()
                .count(),
            MAX_PAYLOAD_BODY_CHARS
        );
        assert_eq!(
            client_payload["pull_request"]["body"]
                .as_str()
                .expect("body")
                .chars()
                .count(),
            MAX_PAYLOAD_BODY_CHARS
        );
        assert_eq!(client_payload["pull_request"]["head"]["ref"], "feature");
    }

    #[test]
    fn regression_client_payload_without_pull_request_omits_key() {
        let event = CommentEvent::from_payload(event_payload("created", false)).expect("event");
        let github = GithubContext::new(
            &event,
            "issue_comment",
            "alice",
            "https://api.github.com",
            GithubRunMetadata::default(),
        );
        let context = build_dispatch_context(&github, None).expect("context");
        let slash_command = build_slash_command_payload(&["deploy".to_string()], &[]);
        let client_payload = build_client_payload(&context, &slash_command).expect("payload");
        assert!(client_payload.get("pull_request").is_none());
        assert_eq!(client_payload["github"]["payload"]["issue"]["body"], "issue body");
    }
}
