//! Codec trait and implementations for serializing/deserializing messages.
//!
//! The session never calls `serde_json` directly. It holds something that
//! implements [`Codec`], so a binary format could replace JSON without
//! touching presence or reaction logic.

use serde::{Serialize, de::DeserializeOwned};

use crate::{Event, ProtocolError, WireEvent};

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because a codec lives inside a spawned room
/// session task.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or don't
    /// match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;

    /// Encodes a room event in wire shape.
    fn encode_event(&self, event: &Event) -> Result<Vec<u8>, ProtocolError> {
        self.encode(&event.to_wire())
    }

    /// Decodes and validates a room event.
    ///
    /// # Errors
    /// `Decode` when the payload isn't an event object at all,
    /// `InvalidMessage` when it is one but breaks a protocol rule.
    fn decode_event(&self, data: &[u8]) -> Result<Event, ProtocolError> {
        let wire: WireEvent = self.decode(data)?;
        Event::try_from(wire)
    }
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// JSON is what every existing client publishes, so it is the only codec
/// that can talk to a live channel today.
///
/// ## Example
///
/// ```rust
/// use roomcast_protocol::{Codec, Event, Glyph, JsonCodec, ParticipantId, RoomId};
///
/// let codec = JsonCodec;
/// let event = Event::reaction(RoomId::new("space-1"), ParticipantId::new("alice"), Glyph::Party);
///
/// let bytes = codec.encode_event(&event).unwrap();
/// let decoded = codec.decode_event(&bytes).unwrap();
/// assert_eq!(event, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{Glyph, ParticipantId, RoomId};

    #[test]
    fn test_decode_event_not_json_is_decode_error() {
        let result = JsonCodec.decode_event(b"not json");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_decode_event_missing_field_is_decode_error() {
        let result = JsonCodec.decode_event(br#"{"type":"JOIN","roomId":"r"}"#);
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_decode_event_unknown_glyph_is_invalid_message() {
        let json = r#"{"type":"REACTION","roomId":"r","participantId":"p","reactionGlyph":"🦀"}"#;
        let result = JsonCodec.decode_event(json.as_bytes());
        assert!(matches!(result, Err(ProtocolError::InvalidMessage(_))));
    }

    #[test]
    fn test_decode_event_ignores_unknown_fields() {
        let bytes = br#"{"type":"LEAVE","roomId":"r","participantId":"p","extra":1}"#;
        let event = JsonCodec.decode_event(bytes).unwrap();
        assert_eq!(event, Event::leave(RoomId::new("r"), ParticipantId::new("p")));
    }

    #[test]
    fn test_encode_event_omits_glyph_for_membership() {
        let bytes = JsonCodec
            .encode_event(&Event::join(RoomId::new("r"), ParticipantId::new("p")))
            .unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(!text.contains("reactionGlyph"));
    }

    #[test]
    fn test_encode_event_reaction_decodes_back() {
        let event = Event::reaction(RoomId::new("r"), ParticipantId::new("p"), Glyph::Money);
        let bytes = JsonCodec.encode_event(&event).unwrap();
        assert_eq!(JsonCodec.decode_event(&bytes).unwrap(), event);
    }
}
