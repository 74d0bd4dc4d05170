//! Socket channels: the three data topics plus the keepalive echo.

use std::fmt;
use std::str::FromStr;

use trickle_corpus::Topic;

use crate::error::ApiError;

/// A `WebSocket` endpoint a client can connect to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Streams records of one topic.
    Data(Topic),
    /// Liveness only: answers `ping` with `pong`.
    Keepalive,
}

impl Channel {
    /// Every channel, keepalive first.
    pub const ALL: [Self; 4] = [
        Self::Keepalive,
        Self::Data(Topic::Travel),
        Self::Data(Topic::Reviews),
        Self::Data(Topic::Gifs),
    ];

    /// Wire name, as used in the socket path.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Data(topic) => topic.as_str(),
            Self::Keepalive => "keepalive",
        }
    }

    /// Human-readable name used in status messages.
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Data(topic) => topic.display_name(),
            Self::Keepalive => "Keepalive",
        }
    }

    /// Path a client connects to.
    pub fn path(self) -> String {
        format!("/ws/{}", self.as_str())
    }

    /// The topic streamed on this channel, if any.
    pub const fn topic(self) -> Option<Topic> {
        match self {
            Self::Data(topic) => Some(topic),
            Self::Keepalive => None,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "keepalive" {
            return Ok(Self::Keepalive);
        }
        s.parse::<Topic>()
            .map(Self::Data)
            .map_err(|e| ApiError::UnknownChannel(e.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_channel() {
        for channel in Channel::ALL {
            assert_eq!(channel.as_str().parse::<Channel>().ok(), Some(channel));
        }
    }

    #[test]
    fn unknown_channel_is_a_client_error() {
        let err = "weather".parse::<Channel>();
        assert!(matches!(err, Err(ApiError::UnknownChannel(ref name)) if name == "weather"));
    }

    #[test]
    fn paths_live_under_ws() {
        assert_eq!(Channel::Keepalive.path(), "/ws/keepalive");
        assert_eq!(Channel::Data(Topic::Reviews).path(), "/ws/reviews");
    }
}
