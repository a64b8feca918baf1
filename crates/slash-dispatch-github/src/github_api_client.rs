use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use slash_dispatch_core::dispatch_pipeline::DispatchOutcome;
use slash_dispatch_core::permission_level::PermissionLevel;
use slash_dispatch_core::repo_ref::RepoRef;

use crate::github_transport_helpers::{
    is_retryable_github_status, is_retryable_transport_error, parse_retry_after,
    truncate_for_error, RetryPolicy,
};

pub const DEFAULT_GITHUB_API_BASE: &str = "https://api.github.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Reactions posted on the triggering comment.
pub enum CommentReaction {
    Eyes,
    Rocket,
}

impl CommentReaction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eyes => "eyes",
            Self::Rocket => "rocket",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CollaboratorPermissions {
    #[serde(default)]
    admin: bool,
    #[serde(default)]
    maintain: bool,
    #[serde(default)]
    push: bool,
    #[serde(default)]
    triage: bool,
    #[serde(default)]
    pull: bool,
}

impl CollaboratorPermissions {
    fn highest_level(&self) -> PermissionLevel {
        if self.admin {
            PermissionLevel::Admin
        } else if self.maintain {
            PermissionLevel::Maintain
        } else if self.push {
            PermissionLevel::Write
        } else if self.triage {
            PermissionLevel::Triage
        } else if self.pull {
            PermissionLevel::Read
        } else {
            PermissionLevel::None
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CollaboratorPermissionUser {
    #[serde(default)]
    permissions: Option<CollaboratorPermissions>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CollaboratorPermissionResponse {
    #[serde(default)]
    user: Option<CollaboratorPermissionUser>,
}

#[derive(Clone)]
/// GitHub REST client used for permission lookups, reactions and dispatches.
pub struct GithubApiClient {
    http: reqwest::Client,
    api_base: String,
    retry: RetryPolicy,
}

impl GithubApiClient {
    pub fn new(
        api_base: &str,
        token: &str,
        request_timeout_ms: u64,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("slash-command-dispatch"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            reqwest::header::HeaderValue::from_static("2022-11-28"),
        );
        let auth_header = format!("Bearer {}", token.trim());
        headers.insert(
            reqwest::header::AUTHORIZATION,
            reqwest::header::HeaderValue::from_str(&auth_header)
                .context("invalid github authorization header")?,
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(request_timeout_ms.max(1)))
            .build()
            .context("failed to create github api client")?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            retry,
        })
    }

    fn repo_url(&self, repo: &RepoRef, path: &str) -> String {
        format!(
            "{}/repos/{}/{}{}",
            self.api_base, repo.owner, repo.name, path
        )
    }

    /// Highest permission the actor holds on `repo`. Unknown actors and API
    /// errors map to [`PermissionLevel::None`]; transport failures propagate.
    pub async fn collaborator_permission(
        &self,
        repo: &RepoRef,
        actor: &str,
    ) -> Result<PermissionLevel> {
        let url = self.repo_url(repo, &format!("/collaborators/{actor}/permission"));
        let response = self
            .send_with_retry("get collaborator permission", || self.http.get(&url))
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status == reqwest::StatusCode::NOT_FOUND {
                tracing::debug!(actor, "actor is not a collaborator");
            } else {
                tracing::warn!(
                    status = status.as_u16(),
                    body = %truncate_for_error(&body, 300),
                    "Collaborator permission lookup for '{actor}' failed; treating the permission level as 'none'."
                );
            }
            return Ok(PermissionLevel::None);
        }
        let parsed = match response.json::<CollaboratorPermissionResponse>().await {
            Ok(parsed) => parsed,
            Err(error) => {
                tracing::debug!(%error, "failed to decode collaborator permission");
                return Ok(PermissionLevel::None);
            }
        };
        let level = parsed
            .user
            .and_then(|user| user.permissions)
            .map(|permissions| permissions.highest_level())
            .unwrap_or(PermissionLevel::None);
        tracing::debug!(actor, %level, "collaborator permission");
        Ok(level)
    }

    pub async fn add_comment_reaction(
        &self,
        repo: &RepoRef,
        comment_id: u64,
        reaction: CommentReaction,
    ) -> Result<()> {
        let url = self.repo_url(repo, &format!("/issues/comments/{comment_id}/reactions"));
        let payload = json!({ "content": reaction.as_str() });
        let _: Value = self
            .request_json("create comment reaction", || {
                self.http.post(&url).json(&payload)
            })
            .await?;
        Ok(())
    }

    pub async fn pull_request(&self, repo: &RepoRef, number: u64) -> Result<Value> {
        let url = self.repo_url(repo, &format!("/pulls/{number}"));
        self.request_json("get pull request", || self.http.get(&url))
            .await
    }

    pub async fn default_branch(&self, repo: &RepoRef) -> Result<String> {
        #[derive(Deserialize)]
        struct Repository {
            default_branch: String,
        }

        let url = self.repo_url(repo, "");
        let repository: Repository = self
            .request_json("get repository", || self.http.get(&url))
            .await?;
        Ok(repository.default_branch)
    }

    pub async fn create_repository_dispatch(
        &self,
        repo: &RepoRef,
        event_type: &str,
        client_payload: &Value,
    ) -> Result<()> {
        let url = self.repo_url(repo, "/dispatches");
        let payload = json!({
            "event_type": event_type,
            "client_payload": client_payload,
        });
        let response = self
            .send_with_retry("create repository dispatch", || {
                self.http.post(&url).json(&payload)
            })
            .await?;
        ensure_success("create repository dispatch", response).await?;
        Ok(())
    }

    /// Triggers a workflow run. A 422 validation error is returned as
    /// [`DispatchOutcome::Rejected`] instead of an error.
    pub async fn create_workflow_dispatch(
        &self,
        repo: &RepoRef,
        workflow_id: &str,
        git_ref: &str,
        inputs: &[(String, String)],
    ) -> Result<DispatchOutcome> {
        let url = self.repo_url(repo, &format!("/actions/workflows/{workflow_id}/dispatches"));
        let inputs = inputs
            .iter()
            .map(|(key, value)| (key.clone(), Value::String(value.clone())))
            .collect::<serde_json::Map<_, _>>();
        let payload = json!({ "ref": git_ref, "inputs": inputs });
        let response = self
            .send_with_retry("create workflow dispatch", || {
                self.http.post(&url).json(&payload)
            })
            .await?;
        if response.status() == reqwest::StatusCode::UNPROCESSABLE_ENTITY {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|value| value.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| truncate_for_error(&body, 800));
            return Ok(DispatchOutcome::Rejected { message });
        }
        ensure_success("create workflow dispatch", response).await?;
        Ok(DispatchOutcome::Dispatched)
    }

    async fn request_json<T, F>(&self, operation: &str, request_builder: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: FnMut() -> reqwest::RequestBuilder,
    {
        let response = self.send_with_retry(operation, request_builder).await?;
        let response = ensure_success(operation, response).await?;
        response
            .json::<T>()
            .await
            .with_context(|| format!("failed to decode github {operation}"))
    }

    /// Sends a request, retrying throttled, server-side and transient transport
    /// failures. Any other response is returned to the caller as-is.
    async fn send_with_retry<F>(
        &self,
        operation: &str,
        mut request_builder: F,
    ) -> Result<reqwest::Response>
    where
        F: FnMut() -> reqwest::RequestBuilder,
    {
        let mut attempt = 0_usize;
        loop {
            attempt = attempt.saturating_add(1);
            match request_builder().send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if is_retryable_github_status(status) && self.retry.allows_retry_after(attempt) {
                        let delay = self.retry.delay_for(attempt, parse_retry_after(response.headers()));
                        tracing::debug!(operation, status, attempt, ?delay, "retrying github request");
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Ok(response);
                }
                Err(error) => {
                    if is_retryable_transport_error(&error) && self.retry.allows_retry_after(attempt) {
                        tokio::time::sleep(self.retry.delay_for(attempt, None)).await;
                        continue;
                    }
                    return Err(error)
                        .with_context(|| format!("github api {operation} request failed"));
                }
            }
        }
    }
}

async fn ensure_success(operation: &str, response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    bail!(
        "github api {operation} failed with status {}: {}",
        status.as_u16(),
        truncate_for_error(&body, 800)
    );
}
