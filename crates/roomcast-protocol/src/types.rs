//! Core protocol types for Roomcast's wire format.
//!
//! Every room shares one pub/sub channel, so each event names the room it
//! belongs to. An event is one of three kinds:
//!
//! ```text
//! JOIN      participant entered the room
//! LEAVE     participant left the room
//! REACTION  participant broadcast a glyph (carries `reactionGlyph`)
//! ```
//!
//! On the wire an event is a flat JSON object:
//!
//! ```json
//! {"type": "REACTION", "roomId": "r-1", "participantId": "alice", "reactionGlyph": "🔥"}
//! ```
//!
//! Older clients used `clubSpaceId`, `lensHandle` and `reactionUnicode` for
//! the same three fields; those names are still accepted when decoding.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A stable handle for a room.
///
/// `#[serde(transparent)]` keeps it a plain JSON string on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Creates a new `RoomId`.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A stable handle for a participant. Equality is exact string match:
/// `"Alice"` and `"alice"` are different participants.
///
/// Ordered so rosters can be kept in a `BTreeSet` and listed
/// deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Creates a new `ParticipantId`.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

// ---------------------------------------------------------------------------
// Glyph
// ---------------------------------------------------------------------------

/// One of the eight reactions a participant can broadcast.
///
/// Glyphs travel as their unicode string. Decoding also accepts the
/// snake-case name (`"thumbs_up"`), which is easier to type in tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum Glyph {
    Clap,
    Heart,
    Fire,
    Rocket,
    Star,
    Party,
    Money,
    ThumbsUp,
}

impl Glyph {
    /// Every glyph, in picker order.
    pub const ALL: [Glyph; 8] = [
        Glyph::Clap,
        Glyph::Heart,
        Glyph::Fire,
        Glyph::Rocket,
        Glyph::Star,
        Glyph::Party,
        Glyph::Money,
        Glyph::ThumbsUp,
    ];

    /// The unicode string sent on the wire.
    pub fn as_unicode(self) -> &'static str {
        match self {
            Glyph::Clap => "👏",
            Glyph::Heart => "❤️",
            Glyph::Fire => "🔥",
            Glyph::Rocket => "🚀",
            Glyph::Star => "⭐",
            Glyph::Party => "🎉",
            Glyph::Money => "💰",
            Glyph::ThumbsUp => "👍",
        }
    }

    /// The snake-case name, used in logs.
    pub fn name(self) -> &'static str {
        match self {
            Glyph::Clap => "clap",
            Glyph::Heart => "heart",
            Glyph::Fire => "fire",
            Glyph::Rocket => "rocket",
            Glyph::Star => "star",
            Glyph::Party => "party",
            Glyph::Money => "money",
            Glyph::ThumbsUp => "thumbs_up",
        }
    }

    /// Parses a unicode glyph or a snake-case name. Returns `None` for
    /// anything outside the fixed set.
    pub fn parse(s: &str) -> Option<Glyph> {
        // Heart is sometimes sent without the U+FE0F variation selector.
        let glyph = match s {
            "👏" | "clap" => Glyph::Clap,
            "❤️" | "❤" | "heart" => Glyph::Heart,
            "🔥" | "fire" => Glyph::Fire,
            "🚀" | "rocket" => Glyph::Rocket,
            "⭐" | "star" => Glyph::Star,
            "🎉" | "party" => Glyph::Party,
            "💰" | "money" => Glyph::Money,
            "👍" | "thumbs_up" | "thumbsup" => Glyph::ThumbsUp,
            _ => return None,
        };
        Some(glyph)
    }
}

impl fmt::Display for Glyph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_unicode())
    }
}

impl FromStr for Glyph {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Glyph::parse(s).ok_or_else(|| ProtocolError::InvalidMessage(format!("unknown glyph {s:?}")))
    }
}

impl TryFrom<String> for Glyph {
    type Error = ProtocolError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Glyph> for &'static str {
    fn from(glyph: Glyph) -> Self {
        glyph.as_unicode()
    }
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// What an event says happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Join,
    Leave,
    Reaction,
}

impl EventKind {
    /// The `type` string used on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Join => "JOIN",
            EventKind::Leave => "LEAVE",
            EventKind::Reaction => "REACTION",
        }
    }

    fn from_wire(s: &str) -> Option<EventKind> {
        match s {
            "JOIN" => Some(EventKind::Join),
            "LEAVE" => Some(EventKind::Leave),
            "REACTION" => Some(EventKind::Reaction),
            _ => None,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable room event.
///
/// `glyph` is `Some` exactly when `kind` is [`EventKind::Reaction`]; the
/// constructors and the wire conversion both keep it that way.
///
/// Serializes through [`WireEvent`], so `serde_json::to_vec(&event)`
/// produces the wire object directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WireEvent", into = "WireEvent")]
pub struct Event {
    pub kind: EventKind,
    pub room_id: RoomId,
    pub participant_id: ParticipantId,
    pub glyph: Option<Glyph>,
}

impl Event {
    /// A JOIN event.
    pub fn join(room_id: RoomId, participant_id: ParticipantId) -> Self {
        Self {
            kind: EventKind::Join,
            room_id,
            participant_id,
            glyph: None,
        }
    }

    /// A LEAVE event.
    pub fn leave(room_id: RoomId, participant_id: ParticipantId) -> Self {
        Self {
            kind: EventKind::Leave,
            room_id,
            participant_id,
            glyph: None,
        }
    }

    /// A REACTION event.
    pub fn reaction(room_id: RoomId, participant_id: ParticipantId, glyph: Glyph) -> Self {
        Self {
            kind: EventKind::Reaction,
            room_id,
            participant_id,
            glyph: Some(glyph),
        }
    }

    /// Returns `true` for JOIN and LEAVE, the kinds that affect presence.
    pub fn is_membership(&self) -> bool {
        matches!(self.kind, EventKind::Join | EventKind::Leave)
    }

    /// Converts to the wire shape.
    pub fn to_wire(&self) -> WireEvent {
        WireEvent {
            kind: self.kind.as_str().to_owned(),
            room_id: self.room_id.as_str().to_owned(),
            participant_id: self.participant_id.as_str().to_owned(),
            reaction_glyph: self.glyph.map(|g| g.as_unicode().to_owned()),
        }
    }
}

/// The JSON object exactly as it appears on the channel.
///
/// Fields are loose strings so that anything structurally valid parses;
/// [`Event::try_from`] then applies the protocol rules. That split lets
/// callers tell "not our format at all" ([`ProtocolError::Decode`]) apart
/// from "our format, but wrong" ([`ProtocolError::InvalidMessage`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(alias = "clubSpaceId")]
    pub room_id: String,
    #[serde(alias = "lensHandle")]
    pub participant_id: String,
    #[serde(
        default,
        alias = "reactionUnicode",
        skip_serializing_if = "Option::is_none"
    )]
    pub reaction_glyph: Option<String>,
}

impl TryFrom<WireEvent> for Event {
    type Error = ProtocolError;

    fn try_from(wire: WireEvent) -> Result<Self, Self::Error> {
        let kind = EventKind::from_wire(&wire.kind).ok_or_else(|| {
            ProtocolError::InvalidMessage(format!("unknown event type {:?}", wire.kind))
        })?;
        if wire.room_id.is_empty() {
            return Err(ProtocolError::InvalidMessage("empty roomId".into()));
        }
        if wire.participant_id.is_empty() {
            return Err(ProtocolError::InvalidMessage("empty participantId".into()));
        }

        let glyph = match kind {
            EventKind::Reaction => {
                let raw = wire.reaction_glyph.as_deref().ok_or_else(|| {
                    ProtocolError::InvalidMessage("REACTION without reactionGlyph".into())
                })?;
                Some(raw.parse::<Glyph>()?)
            }
            // A stray glyph on a membership event carries no meaning.
            EventKind::Join | EventKind::Leave => None,
        };

        Ok(Event {
            kind,
            room_id: RoomId(wire.room_id),
            participant_id: ParticipantId(wire.participant_id),
            glyph,
        })
    }
}

impl From<Event> for WireEvent {
    fn from(event: Event) -> Self {
        event.to_wire()
    }
}

/// An event together with the delivery metadata the transport assigned.
///
/// `seq` is the authoritative order. `timestamp` (milliseconds) is only used
/// to bound historical replay and is never used to order events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub seq: u64,
    pub timestamp: u64,
    pub event: Event,
}

impl EventRecord {
    /// Creates a record.
    pub fn new(seq: u64, timestamp: u64, event: Event) -> Self {
        Self {
            seq,
            timestamp,
            event,
        }
    }
}

/// A room-entry impression, handed to analytics on every successful entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Impression {
    pub room_id: RoomId,
    pub participant_id: ParticipantId,
    pub kind: EventKind,
    /// Membership group of the room, when the room is group-gated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
}

impl Impression {
    /// An impression recording that `participant_id` entered `room_id`.
    pub fn join(room_id: RoomId, participant_id: ParticipantId) -> Self {
        Self {
            room_id,
            participant_id,
            kind: EventKind::Join,
            group_id: None,
        }
    }

    pub fn with_group_id(mut self, group_id: Option<String>) -> Self {
        self.group_id = group_id;
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn room() -> RoomId {
        RoomId::new("space-1")
    }

    fn alice() -> ParticipantId {
        ParticipantId::new("alice.lens")
    }

    // =====================================================================
    // Identity types
    // =====================================================================

    #[test]
    fn test_room_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&room()).unwrap();
        assert_eq!(json, "\"space-1\"");
    }

    #[test]
    fn test_participant_id_equality_is_exact() {
        assert_ne!(ParticipantId::new("Alice"), ParticipantId::new("alice"));
        assert_eq!(ParticipantId::from("bob"), ParticipantId::new("bob"));
    }

    #[test]
    fn test_participant_id_display_is_raw_handle() {
        assert_eq!(alice().to_string(), "alice.lens");
    }

    // =====================================================================
    // Glyph
    // =====================================================================

    #[test]
    fn test_glyph_all_has_eight_distinct_entries() {
        let unicode: std::collections::HashSet<_> =
            Glyph::ALL.iter().map(|g| g.as_unicode()).collect();
        assert_eq!(unicode.len(), 8);
    }

    #[test]
    fn test_glyph_parse_accepts_unicode_and_name() {
        for glyph in Glyph::ALL {
            assert_eq!(Glyph::parse(glyph.as_unicode()), Some(glyph));
            assert_eq!(Glyph::parse(glyph.name()), Some(glyph));
        }
    }

    #[test]
    fn test_glyph_parse_heart_without_variation_selector() {
        assert_eq!(Glyph::parse("\u{2764}"), Some(Glyph::Heart));
    }

    #[test]
    fn test_glyph_parse_unknown_returns_none() {
        assert_eq!(Glyph::parse("🦀"), None);
        assert_eq!(Glyph::parse(""), None);
        assert!("🦀".parse::<Glyph>().is_err());
    }

    #[test]
    fn test_glyph_serializes_as_unicode() {
        let json = serde_json::to_string(&Glyph::Rocket).unwrap();
        assert_eq!(json, "\"🚀\"");
    }

    #[test]
    fn test_glyph_deserialize_unknown_fails() {
        assert!(serde_json::from_str::<Glyph>("\"🦀\"").is_err());
    }

    // =====================================================================
    // Event wire format
    // =====================================================================

    #[test]
    fn test_join_event_json_format() {
        let json = serde_json::to_value(Event::join(room(), alice())).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "JOIN",
                "roomId": "space-1",
                "participantId": "alice.lens",
            })
        );
    }

    #[test]
    fn test_reaction_event_json_includes_glyph() {
        let json = serde_json::to_value(Event::reaction(room(), alice(), Glyph::Fire)).unwrap();
        assert_eq!(json["type"], "REACTION");
        assert_eq!(json["reactionGlyph"], "🔥");
    }

    #[test]
    fn test_event_deserializes_legacy_field_names() {
        let json = r#"{
            "type": "REACTION",
            "clubSpaceId": "space-1",
            "lensHandle": "alice.lens",
            "reactionUnicode": "👏"
        }"#;
        let event: Event = serde_json::from_str(json).unwrap();
        assert_eq!(event, Event::reaction(room(), alice(), Glyph::Clap));
    }

    #[test]
    fn test_try_from_wire_unknown_type_is_invalid() {
        let wire = WireEvent {
            kind: "WAVE".into(),
            room_id: "space-1".into(),
            participant_id: "alice.lens".into(),
            reaction_glyph: None,
        };
        assert!(matches!(
            Event::try_from(wire),
            Err(ProtocolError::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_try_from_wire_reaction_without_glyph_is_invalid() {
        let wire = WireEvent {
            kind: "REACTION".into(),
            room_id: "space-1".into(),
            participant_id: "alice.lens".into(),
            reaction_glyph: None,
        };
        assert!(matches!(
            Event::try_from(wire),
            Err(ProtocolError::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_try_from_wire_empty_participant_is_invalid() {
        let wire = WireEvent {
            kind: "JOIN".into(),
            room_id: "space-1".into(),
            participant_id: String::new(),
            reaction_glyph: None,
        };
        assert!(Event::try_from(wire).is_err());
    }

    #[test]
    fn test_try_from_wire_join_drops_stray_glyph() {
        let wire = WireEvent {
            kind: "JOIN".into(),
            room_id: "space-1".into(),
            participant_id: "alice.lens".into(),
            reaction_glyph: Some("🔥".into()),
        };
        let event = Event::try_from(wire).unwrap();
        assert_eq!(event.glyph, None);
        assert!(event.is_membership());
    }

    #[test]
    fn test_impression_json_format() {
        let json = serde_json::to_value(Impression::join(room(), alice())).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "roomId": "space-1",
                "participantId": "alice.lens",
                "kind": "JOIN",
            })
        );
    }

    #[test]
    fn test_impression_json_includes_group_id_when_set() {
        let impression = Impression::join(room(), alice()).with_group_id(Some("0x2a".into()));
        let json = serde_json::to_value(&impression).unwrap();
        assert_eq!(json["groupId"], "0x2a");
        let back: Impression = serde_json::from_value(json).unwrap();
        assert_eq!(back, impression);
    }
}
