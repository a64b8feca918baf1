//! GitHub collaborators for slash-command dispatch.
//!
//! Provides the REST client, event-context loading, client-payload assembly and
//! the per-event runtime that drives the core matching pipeline.

pub mod comment_event;
pub mod dispatch_runtime;
pub mod github_api_client;
pub mod github_dispatch_collaborator;
pub mod github_transport_helpers;
pub mod step_output;
