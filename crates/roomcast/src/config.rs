//! Process-level configuration.

use std::time::Duration;

use roomcast_presence::PresenceConfig;
use roomcast_transport::ChannelId;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::RoomcastError;

/// Configuration shared by every room session in the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomcastConfig {
    /// The pub/sub channel all rooms share.
    pub channel: String,

    /// Reaction TTL and replay timeout.
    pub presence: PresenceConfig,

    /// Capacity of each session's command queue.
    pub command_buffer: usize,
}

impl RoomcastConfig {
    pub const DEFAULT_CHANNEL: &'static str = "roomcast/events";
    pub const MAX_COMMAND_BUFFER: usize = 4096;

    /// Loads overrides from `ROOMCAST_*` environment variables on top of
    /// the defaults.
    ///
    /// | Variable                      | Field                            |
    /// |-------------------------------|----------------------------------|
    /// | `ROOMCAST_CHANNEL`            | `channel`                        |
    /// | `ROOMCAST_RESEND_TIMEOUT_MS`  | `presence.resend_timeout`        |
    /// | `ROOMCAST_REACTION_TTL_MS`    | `presence.reaction_ttl`          |
    /// | `ROOMCAST_COMMAND_BUFFER`     | `command_buffer`                 |
    ///
    /// # Errors
    /// [`RoomcastError::Config`] if a numeric variable does not parse.
    pub fn from_env() -> Result<Self, RoomcastError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, RoomcastError> {
        let mut config = Self::default();

        if let Some(channel) = lookup("ROOMCAST_CHANNEL") {
            config.channel = channel;
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "ROOMCAST_RESEND_TIMEOUT_MS")? {
            config.presence.resend_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "ROOMCAST_REACTION_TTL_MS")? {
            config.presence.reaction_ttl = Duration::from_millis(ms);
        }
        if let Some(n) = parse_var::<usize>(&lookup, "ROOMCAST_COMMAND_BUFFER")? {
            config.command_buffer = n;
        }

        Ok(config.validated())
    }

    /// Clamps values into their supported ranges.
    pub fn validated(mut self) -> Self {
        if self.channel.trim().is_empty() {
            warn!(default = Self::DEFAULT_CHANNEL, "empty channel, using default");
            self.channel = Self::DEFAULT_CHANNEL.to_owned();
        }
        let buffer = self.command_buffer.clamp(1, Self::MAX_COMMAND_BUFFER);
        if buffer != self.command_buffer {
            warn!(
                requested = self.command_buffer,
                clamped = buffer,
                "command_buffer out of range, clamping"
            );
            self.command_buffer = buffer;
        }
        self.presence = self.presence.validated();
        self
    }

    pub fn channel_id(&self) -> ChannelId {
        ChannelId::new(self.channel.clone())
    }
}

impl Default for RoomcastConfig {
    fn default() -> Self {
        Self {
            channel: Self::DEFAULT_CHANNEL.to_owned(),
            presence: PresenceConfig::default(),
            command_buffer: 64,
        }
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, RoomcastError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|e| RoomcastError::Config(format!("invalid {key}: {e}")))
        })
        .transpose()
}
