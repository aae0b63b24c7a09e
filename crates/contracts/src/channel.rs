//! Channel identifiers

use serde::{Deserialize, Serialize};

/// The four device-motion channels of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Acceleration,
    Orientation,
    Location,
    Heading,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 4] = [
        ChannelKind::Acceleration,
        ChannelKind::Orientation,
        ChannelKind::Location,
        ChannelKind::Heading,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Acceleration => "acceleration",
            ChannelKind::Orientation => "orientation",
            ChannelKind::Location => "location",
            ChannelKind::Heading => "heading",
        }
    }
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
