//! Command parsing and dispatch matching for slash-command dispatch.
//!
//! Hosts the comment tokenizer, argument classifier, permission hierarchy,
//! command configuration resolver and the staged matching pipeline consumed by
//! transport crates.

pub mod command_config;
pub mod command_line;
pub mod command_matching;
pub mod command_tokenizer;
pub mod dispatch_pipeline;
pub mod dispatch_target;
pub mod permission_level;
pub mod repo_ref;
pub mod slash_command_payload;
