//! Wire protocol for Roomcast.
//!
//! This crate defines what travels on the shared room channel:
//!
//! - **Types** ([`Event`], [`EventRecord`], [`Glyph`], [`RoomId`],
//!   [`ParticipantId`]): the event schema and its delivery metadata.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how events are converted
//!   to and from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong while decoding.
//!
//! The protocol layer knows nothing about connections, rosters or timers.
//!
//! ```text
//! Transport (bytes) → Protocol (Event) → Presence (roster, reactions)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    Event, EventKind, EventRecord, Glyph, Impression, ParticipantId, RoomId, WireEvent,
};
