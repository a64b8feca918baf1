//! Command-line surface for slash-command dispatch.

pub mod bootstrap_helpers;
pub mod cli_args;
pub mod startup_config;

pub use cli_args::{split_list_input, Cli};
pub use startup_config::build_runtime_config;
