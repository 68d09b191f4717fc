//! Transport state reported to the presentation layer

use serde::{Deserialize, Serialize};

/// Which transport currently delivers updates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    /// Server-initiated delivery over a persistent connection
    Push,
    /// Client-initiated periodic polling
    Poll,
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TransportMode::Push => "push",
            TransportMode::Poll => "poll",
        };
        write!(f, "{}", s)
    }
}

/// Mode plus push connectivity, as shown by UI status indicators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportState {
    pub mode: TransportMode,
    pub connected: bool,
}

impl TransportState {
    /// Push transport with a live connection
    pub const fn push_connected() -> Self {
        Self {
            mode: TransportMode::Push,
            connected: true,
        }
    }

    /// Push transport while the first connection attempt is outstanding
    pub const fn push_connecting() -> Self {
        Self {
            mode: TransportMode::Push,
            connected: false,
        }
    }

    /// Poll fallback
    pub const fn polling() -> Self {
        Self {
            mode: TransportMode::Poll,
            connected: false,
        }
    }
}

impl Default for TransportState {
    fn default() -> Self {
        Self::push_connecting()
    }
}
