use std::fmt;

use serde::{Deserialize, Serialize};

/// Connection state of a document channel, as shown to the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Connecting,
    Connected,
    Error,
    Disconnected,
}

impl ConnectionStatus {
    /// Map a raw transport status string.
    ///
    /// Anything unrecognised (including `TIMED_OUT`) counts as still connecting.
    pub fn from_transport(raw: &str) -> Self {
        match raw {
            "SUBSCRIBED" => Self::Connected,
            "CHANNEL_ERROR" => Self::Error,
            "CLOSED" => Self::Disconnected,
            _ => Self::Connecting,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
            Self::Disconnected => "disconnected",
        }
    }

    pub fn is_connected(self) -> bool {
        self == Self::Connected
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
