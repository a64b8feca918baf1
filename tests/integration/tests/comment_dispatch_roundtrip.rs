use std::path::{Path, PathBuf};

use clap::Parser;
use httpmock::prelude::*;
use serde_json::json;
use slash_dispatch_cli::{build_runtime_config, Cli};
use slash_dispatch_core::command_matching::MatchStage;
use slash_dispatch_core::dispatch_pipeline::{DispatchOutcome, DispatchReport};
use slash_dispatch_core::permission_level::PermissionLevel;
use slash_dispatch_github::comment_event::GithubRunMetadata;
use slash_dispatch_github::dispatch_runtime::{run_comment_dispatch, DispatchRunOutcome};
use tempfile::tempdir;

fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("write fixture");
    path
}

fn pull_request_comment_event(action: &str, body: &str) -> String {
    json!({
        "action": action,
        "issue": {
            "number": 9,
            "body": "PR ticket",
            "pull_request": {"url": "https://api.github.com/repos/o/source/pulls/9"}
        },
        "comment": {"id": 4242, "body": body}
    })
    .to_string()
}

fn cli_for(server: &MockServer, event_path: &Path, output_path: &Path, extra: &[&str]) -> Cli {
    let base_url = server.base_url();
    let mut args = vec![
        "slash-dispatch",
        "--api-base",
        base_url.as_str(),
        "--event-path",
        event_path.to_str().expect("utf-8 path"),
        "--output-path",
        output_path.to_str().expect("utf-8 path"),
        "--github-repository",
        "o/source",
        "--actor",
        "alice",
        "--token",
        "dispatch-token",
        "--reaction-token",
        "reaction-token",
        "--retry-max-attempts",
        "1",
    ];
    args.extend_from_slice(extra);
    Cli::parse_from(args)
}

#[tokio::test]
async fn integration_edited_pull_request_comment_fans_out_to_repository_and_workflow_targets() {
    let server = MockServer::start();
    let eyes = server.mock(|when, then| {
        when.method(POST)
            .path("/repos/o/source/issues/comments/4242/reactions")
            .header("authorization", "Bearer reaction-token")
            .json_body(json!({"content": "eyes"}));
        then.status(201).json_body(json!({"id": 1}));
    });
    let rocket = server.mock(|when, then| {
        when.method(POST)
            .path("/repos/o/source/issues/comments/4242/reactions")
            .json_body(json!({"content": "rocket"}));
        then.status(201).json_body(json!({"id": 2}));
    });
    let permission = server.mock(|when, then| {
        when.method(GET)
            .path("/repos/o/source/collaborators/alice/permission")
            .header("authorization", "Bearer dispatch-token");
        then.status(200).json_body(json!({
            "user": {"permissions": {"admin": false, "maintain": true, "push": true, "triage": true, "pull": true}}
        }));
    });
    let pull = server.mock(|when, then| {
        when.method(GET).path("/repos/o/source/pulls/9");
        then.status(200).json_body(json!({
            "number": 9,
            "body": "p".repeat(1_500),
            "head": {"ref": "feature/login"}
        }));
    });
    let staging = server.mock(|when, then| {
        when.method(POST)
            .path("/repos/o/staging/dispatches")
            .body_includes("\"event_type\":\"deploy-command\"")
            .body_includes("\"env\":\"staging\"")
            .body_includes("\"note\":\"ship it\"")
            .body_includes("\"head\":{\"ref\":\"feature/login\"}");
        then.status(204);
    });
    let production = server.mock(|when, then| {
        when.method(POST).path("/repos/o/prod/dispatches");
        then.status(204);
    });
    let workflow = server.mock(|when, then| {
        when.method(POST)
            .path("/repos/o/wf/actions/workflows/deploy-command.yml/dispatches")
            .json_body(json!({"ref": "release", "inputs": {"note": "ship it"}}));
        then.status(204);
    });

    let temp = tempdir().expect("tempdir");
    let event_path = write_file(
        temp.path(),
        "event.json",
        &pull_request_comment_event("edited", "/deploy ref=release note=\"ship it\"\nthanks!"),
    );
    let config_path = write_file(
        temp.path(),
        "commands.json",
        &json!([
            {"command": "deploy", "repository": "o/staging", "allow_edits": true, "static_args": ["env=staging"]},
            {"command": "deploy", "repository": "o/prod", "permission": "admin", "allow_edits": "true"},
            {"command": "deploy", "repository": "o/wf", "dispatch_type": "workflow", "issue_type": "pull-request", "allow_edits": true},
            {"command": "rollback", "repository": "o/prod"}
        ])
        .to_string(),
    );
    let output_path = temp.path().join("output");
    let cli = cli_for(
        &server,
        &event_path,
        &output_path,
        &["--config-from-file", config_path.to_str().expect("utf-8 path")],
    );

    let outcome = run_comment_dispatch(&build_runtime_config(&cli, GithubRunMetadata::default()))
        .await
        .expect("dispatch run");

    match outcome {
        DispatchRunOutcome::Completed(DispatchReport::Dispatched {
            actor_permission,
            records,
        }) => {
            assert_eq!(actor_permission, PermissionLevel::Maintain);
            assert_eq!(
                records
                    .iter()
                    .map(|record| record.repository.as_str())
                    .collect::<Vec<_>>(),
                vec!["o/staging", "o/wf"]
            );
            assert!(records
                .iter()
                .all(|record| record.outcome == DispatchOutcome::Dispatched));
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    eyes.assert_calls(1);
    permission.assert_calls(1);
    pull.assert_calls(1);
    staging.assert_calls(1);
    workflow.assert_calls(1);
    production.assert_calls(0);
    rocket.assert_calls(1);
    assert!(!output_path.exists());
}

#[tokio::test]
async fn integration_edited_comment_without_edit_permission_makes_no_requests() {
    let server = MockServer::start();
    let any_request = server.mock(|when, then| {
        when.path_includes("/repos/");
        then.status(500);
    });

    let temp = tempdir().expect("tempdir");
    let event_path = write_file(
        temp.path(),
        "event.json",
        &pull_request_comment_event("edited", "/deploy now"),
    );
    let output_path = temp.path().join("output");
    let cli = cli_for(&server, &event_path, &output_path, &["--commands", "deploy,rollback"]);

    let outcome = run_comment_dispatch(&build_runtime_config(&cli, GithubRunMetadata::default()))
        .await
        .expect("dispatch run");
    match outcome {
        DispatchRunOutcome::Completed(DispatchReport::NoMatch(no_match)) => {
            assert_eq!(no_match.stage, MatchStage::EditPolicy);
            assert_eq!(
                no_match.to_string(),
                "Command 'deploy' is not configured to allow edits."
            );
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    any_request.assert_calls(0);
}

#[tokio::test]
async fn integration_workflow_validation_error_sets_error_message_output() {
    let server = MockServer::start();
    let _permission = server.mock(|when, then| {
        when.method(GET)
            .path("/repos/o/source/collaborators/alice/permission");
        then.status(200)
            .json_body(json!({"user": {"permissions": {"push": true}}}));
    });
    let _pull = server.mock(|when, then| {
        when.method(GET).path("/repos/o/source/pulls/9");
        then.status(200).json_body(json!({"number": 9, "body": null}));
    });
    let default_branch = server.mock(|when, then| {
        when.method(GET).path("/repos/o/source");
        then.status(200).json_body(json!({"default_branch": "main"}));
    });
    let _workflow = server.mock(|when, then| {
        when.method(POST)
            .path("/repos/o/source/actions/workflows/lint-command.yml/dispatches");
        then.status(422).json_body(json!({
            "message": "Workflow does not have 'workflow_dispatch' trigger"
        }));
    });

    let temp = tempdir().expect("tempdir");
    let event_path = write_file(
        temp.path(),
        "event.json",
        &pull_request_comment_event("created", "/lint fix=true"),
    );
    let output_path = temp.path().join("output");
    let cli = cli_for(
        &server,
        &event_path,
        &output_path,
        &["--commands", "lint", "--dispatch-type", "workflow", "--reactions=false"],
    );

    let outcome = run_comment_dispatch(&build_runtime_config(&cli, GithubRunMetadata::default()))
        .await
        .expect("dispatch run");
    let DispatchRunOutcome::Completed(report) = outcome else {
        panic!("comment should be handled");
    };
    assert_eq!(report.dispatched_count(), 0);
    default_branch.assert_calls(1);
    assert_eq!(
        std::fs::read_to_string(&output_path).expect("output"),
        "error-message=Workflow does not have 'workflow_dispatch' trigger\n"
    );
}
