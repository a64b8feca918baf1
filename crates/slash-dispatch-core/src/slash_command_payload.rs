use std::sync::OnceLock;

use regex::Regex;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Maximum number of user-supplied argument tokens carried into a payload.
pub const MAX_COMMAND_ARGS: usize = 50;

const NAMED_ARG_PATTERN: &str = r"^(?P<name>[a-zA-Z0-9_-]+)=(?P<value>.+)$";

fn named_arg_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(NAMED_ARG_PATTERN).expect("valid named argument pattern"))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Positional arguments, exposed externally as `all` plus `arg1`, `arg2`, ...
pub struct UnnamedArgs {
    pub all: String,
    pub values: Vec<String>,
}

impl UnnamedArgs {
    /// Looks up a value by its external key (`arg1` is the first value).
    pub fn get(&self, key: &str) -> Option<&str> {
        let position = key.strip_prefix("arg")?.parse::<usize>().ok()?;
        position
            .checked_sub(1)
            .and_then(|index| self.values.get(index))
            .map(String::as_str)
    }
}

impl Serialize for UnnamedArgs {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len() + 1))?;
        map.serialize_entry("all", &self.all)?;
        for (index, value) in self.values.iter().enumerate() {
            map.serialize_entry(&format!("arg{}", index + 1), value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// `key=value` arguments in first-seen key order. A repeated key replaces the
/// earlier value in place.
pub struct NamedArgs {
    entries: Vec<(String, String)>,
}

impl NamedArgs {
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for NamedArgs {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
/// Argument views of one slash command invocation.
pub struct SlashCommandArgs {
    pub all: String,
    pub unnamed: UnnamedArgs,
    pub named: NamedArgs,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
/// Payload forwarded to a dispatch target for one matched configuration.
pub struct SlashCommandPayload {
    pub command: String,
    pub args: SlashCommandArgs,
}

fn strip_wrapping_quotes(raw: &str) -> &str {
    if raw.starts_with('"') && raw.ends_with('"') {
        raw.get(1..raw.len().saturating_sub(1)).unwrap_or_default()
    } else {
        raw
    }
}

/// Classifies command tokens into named and unnamed arguments.
///
/// `command_tokens[0]` is the command name. Static arguments are placed ahead
/// of the user arguments and are not counted against [`MAX_COMMAND_ARGS`].
pub fn build_slash_command_payload(
    command_tokens: &[String],
    static_args: &[String],
) -> SlashCommandPayload {
    let mut payload = SlashCommandPayload {
        command: command_tokens.first().cloned().unwrap_or_default(),
        args: SlashCommandArgs::default(),
    };

    let arg_words = static_args
        .iter()
        .chain(command_tokens.iter().skip(1).take(MAX_COMMAND_ARGS))
        .map(String::as_str)
        .collect::<Vec<_>>();
    if arg_words.is_empty() {
        return payload;
    }
    payload.args.all = arg_words.join(" ");

    let mut unnamed_words = Vec::new();
    for word in arg_words {
        match named_arg_regex().captures(word) {
            Some(captures) => {
                let name = &captures["name"];
                let value = strip_wrapping_quotes(&captures["value"]);
                payload.args.named.insert(name, value);
            }
            None => {
                unnamed_words.push(word);
                payload
                    .args
                    .unnamed
                    .values
                    .push(strip_wrapping_quotes(word).to_string());
            }
        }
    }
    if !unnamed_words.is_empty() {
        payload.args.unnamed.all = unnamed_words.join(" ");
    }
    payload
}
