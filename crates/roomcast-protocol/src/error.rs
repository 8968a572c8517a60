//! Error types for the protocol layer.
//!
//! A `ProtocolError` always means the bytes or their shape were wrong, never
//! that the network or the room misbehaved. Sessions treat every variant as
//! "ignore this message".

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// The bytes were not valid JSON, or did not match the event schema
    /// (unknown `type`, wrong field types).
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message parsed but violates a protocol rule, e.g. a REACTION
    /// without a recognizable glyph or an empty participant id.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
