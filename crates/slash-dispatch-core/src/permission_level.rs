use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
/// Repository access levels, ordered from least to most privileged.
pub enum PermissionLevel {
    None = 1,
    Read = 2,
    Triage = 3,
    Write = 4,
    Maintain = 5,
    Admin = 6,
}

impl PermissionLevel {
    pub const ALL: [PermissionLevel; 6] = [
        Self::None,
        Self::Read,
        Self::Triage,
        Self::Write,
        Self::Maintain,
        Self::Admin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Read => "read",
            Self::Triage => "triage",
            Self::Write => "write",
            Self::Maintain => "maintain",
            Self::Admin => "admin",
        }
    }

    pub fn rank(self) -> u8 {
        self as u8
    }

    /// Returns the level named by `raw`, or `None` when it is not a known level.
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.as_str() == raw)
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionLevel {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::parse(raw).ok_or_else(|| format!("'{raw}' is not a valid permission level"))
    }
}

/// Returns true when the actor's level meets or exceeds the required level.
pub fn actor_has_permission(actor: PermissionLevel, required: PermissionLevel) -> bool {
    tracing::debug!(
        actor_level = actor.rank(),
        required_level = required.rank(),
        "comparing permission levels"
    );
    actor.rank() >= required.rank()
}
