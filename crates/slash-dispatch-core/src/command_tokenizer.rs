use std::sync::OnceLock;

use regex::Regex;

// Named argument with a quoted value, a bare quoted span, or a plain word.
// Quoted spans may contain escaped quotes (`\"`).
const COMMAND_TOKEN_PATTERN: &str =
    r#"\S+="[^"\\]*(?:\\.[^"\\]*)*"|"[^"\\]*(?:\\.[^"\\]*)*"|\S+"#;

fn command_token_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(COMMAND_TOKEN_PATTERN).expect("valid command token pattern"))
}

/// Splits a command line into tokens while keeping double-quoted spans together.
///
/// Quotes are preserved in the returned tokens. An unterminated quote falls back
/// to plain whitespace splitting for the rest of the line.
pub fn tokenize_command(line: &str) -> Vec<String> {
    command_token_regex()
        .find_iter(line)
        .map(|token| token.as_str().to_string())
        .collect()
}
