//! Presence and reactions for a single live room.
//!
//! Everything here is synchronous and runtime-free apart from
//! `tokio::time::Instant`, so it can be driven step by step in tests.
//!
//! # Key types
//!
//! - [`reconstruct`]: reduces replayed history to who is present
//! - [`Roster`]: live membership, fed one record at a time
//! - [`ReactionBoard`]: per-participant reactions with independent expiry
//! - [`Coordinator`]: the join/leave state machine, returning [`Effect`]s
//! - [`Phase`]: lifecycle states of a room session
//! - [`PresenceConfig`]: reaction TTL and replay timeout

mod config;
mod coordinator;
mod error;
mod reactions;
mod reconstruct;
mod roster;

pub use config::{Phase, PresenceConfig};
pub use coordinator::{Coordinator, Effect, LiveUpdate, Room};
pub use error::PresenceError;
pub use reactions::{Reaction, ReactionBoard};
pub use reconstruct::{Reconstruction, ReplayBuffer, reconstruct};
pub use roster::{Roster, RosterChange};
