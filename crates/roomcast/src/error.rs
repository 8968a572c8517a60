//! Unified error type for Roomcast.

use roomcast_presence::PresenceError;
use roomcast_protocol::{ProtocolError, RoomId};
use roomcast_transport::TransportError;

/// Why a room entry did not complete.
///
/// Every variant is retryable: the session is back in `NotEntered` (or,
/// for `Cancelled`, has left on request).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EntryFailure {
    /// No transport connection could be established.
    #[error("connect failed: {0}")]
    Connect(TransportError),

    /// The live subscription was not acknowledged.
    #[error("subscribe failed: {0}")]
    Subscribe(TransportError),

    /// Connecting or subscribing did not complete in time.
    #[error("subscribe timed out")]
    SubscribeTimedOut,

    /// Historical replay failed.
    #[error("resend failed: {0}")]
    Resend(TransportError),

    /// Historical replay did not complete in time.
    #[error("resend timed out")]
    ResendTimedOut,

    /// The session was told to leave before entry completed.
    #[error("entry cancelled")]
    Cancelled,
}

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each wrapped variant lets `?` convert
/// sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum RoomcastError {
    /// A transport-level error (connect, subscribe, publish).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// An operation was attempted in the wrong session phase.
    #[error(transparent)]
    Presence(#[from] PresenceError),

    /// Entering a room failed.
    #[error("entry into room {room_id} failed: {reason}")]
    EntryFailed {
        room_id: RoomId,
        reason: EntryFailure,
    },

    /// The room session task is gone (left, or its runtime shut down).
    #[error("session for room {0} is closed")]
    SessionClosed(RoomId),

    /// A configuration value could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl RoomcastError {
    /// Returns the entry failure reason, if this is an entry failure.
    pub fn entry_failure(&self) -> Option<&EntryFailure> {
        match self {
            Self::EntryFailed { reason, .. } => Some(reason),
            _ => None,
        }
    }
}
