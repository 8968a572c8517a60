//! # Roomcast
//!
//! Presence reconstruction and ephemeral reactions for live rooms.
//!
//! Every room shares one ordered pub/sub channel. A participant entering a
//! room replays the channel's history to work out who is already there,
//! announces itself (once), and then follows JOIN, LEAVE and REACTION
//! events live until it leaves.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use roomcast::prelude::*;
//!
//! # async fn run() -> Result<(), RoomcastError> {
//! let hub = Arc::new(TransportHub::new(MemoryConnector::new(MemoryBus::new())));
//! let room = Room::new(RoomId::new("space-1"), 0, u64::MAX);
//!
//! let session = SessionBuilder::new(room, ParticipantId::new("alice.lens"))
//!     .config(RoomcastConfig::from_env()?)
//!     .enter(&hub)
//!     .await?;
//!
//! session.react(Glyph::Clap).await?;
//! println!("present: {:?}", session.view().present);
//! session.leave().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Crates
//!
//! - [`transport`]: the `Transport` trait, the shared `TransportHub`, and
//!   the in-memory bus
//! - [`protocol`]: event schema, glyphs, codecs
//! - [`presence`]: reconstruction, roster, reactions, state machine
//! - this crate: the per-room session actor, config, logging

mod collaborators;
mod config;
mod error;
pub mod logging;
mod session;

pub use roomcast_presence as presence;
pub use roomcast_protocol as protocol;
pub use roomcast_transport as transport;

pub use collaborators::{
    GroupRegistry, ImpressionSink, LocalIdentity, MembershipError, NoopImpressions, NoopRegistry,
    TracingImpressions,
};
pub use config::RoomcastConfig;
pub use error::{EntryFailure, RoomcastError};
pub use session::{SessionBuilder, SessionHandle, SessionView};

/// Everything needed to run a room session.
pub mod prelude {
    pub use crate::{
        EntryFailure, GroupRegistry, ImpressionSink, LocalIdentity, MembershipError,
        RoomcastConfig, RoomcastError, SessionBuilder, SessionHandle, SessionView,
    };
    pub use roomcast_presence::{Phase, PresenceConfig, Room};
    pub use roomcast_protocol::{Glyph, ParticipantId, RoomId};
    pub use roomcast_transport::{Connector, Transport, TransportHub};

    #[cfg(feature = "memory")]
    pub use roomcast_transport::{MemoryBus, MemoryConnector};
}
