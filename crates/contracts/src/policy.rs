//! NotificationPolicy - how the user is involved before a report goes out

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// User interaction applied to every capture before dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPolicy {
    /// Report without telling the user
    Silent,
    /// Tell the user an error occurred, then report
    Inform,
    /// Ask the user; a decline suppresses the report
    #[default]
    Ask,
}

impl NotificationPolicy {
    /// Stable lowercase name (used in logs, metrics labels and config files)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Silent => "silent",
            Self::Inform => "inform",
            Self::Ask => "ask",
        }
    }
}

impl fmt::Display for NotificationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "silent" => Ok(Self::Silent),
            "inform" => Ok(Self::Inform),
            "ask" => Ok(Self::Ask),
            other => Err(format!("unknown notification policy '{other}'")),
        }
    }
}
