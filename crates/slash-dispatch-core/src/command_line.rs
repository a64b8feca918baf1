use crate::command_tokenizer::tokenize_command;

/// Leading character marking a comment's first line as a command invocation.
pub const COMMAND_TRIGGER: char = '/';

#[derive(Debug, Clone, PartialEq, Eq)]
/// First comment line recognised as a slash command, split into tokens.
pub struct ParsedCommandLine {
    pub line: String,
    pub tokens: Vec<String>,
}

impl ParsedCommandLine {
    pub fn command(&self) -> &str {
        self.tokens.first().map(String::as_str).unwrap_or_default()
    }
}

const BYTE_ORDER_MARK: char = '\u{feff}';

/// Returns the first line of a comment body with surrounding whitespace and
/// byte order marks removed.
pub fn first_comment_line(body: &str) -> &str {
    body.split('\n')
        .next()
        .unwrap_or_default()
        .trim_end_matches('\r')
        .trim_matches(|c: char| c.is_whitespace() || c == BYTE_ORDER_MARK)
}

/// Parses a comment body into a slash command, or `None` when the first line is
/// not a command invocation.
pub fn parse_command_line(body: &str) -> Option<ParsedCommandLine> {
    let line = first_comment_line(body);
    if line.chars().count() < 2 || !line.starts_with(COMMAND_TRIGGER) {
        return None;
    }
    let tokens = tokenize_command(&line[COMMAND_TRIGGER.len_utf8()..]);
    if tokens.is_empty() {
        return None;
    }
    Some(ParsedCommandLine {
        line: line.to_string(),
        tokens,
    })
}
