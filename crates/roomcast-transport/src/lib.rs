//! Transport abstraction layer for Roomcast.
//!
//! Provides the [`Transport`] and [`Connector`] traits that abstract over
//! an order-preserving publish/subscribe service with historical replay
//! ("resend"), plus [`TransportHub`], the reference-counted owner of the
//! process-wide connection shared by every active room session.
//!
//! # Feature Flags
//!
//! - `memory` (default): in-process [`MemoryBus`] used by tests and demos

mod error;
mod hub;
#[cfg(feature = "memory")]
mod memory;

pub use error::TransportError;
pub use hub::{TransportHub, TransportLease};
#[cfg(feature = "memory")]
pub use memory::{MemoryBus, MemoryClient, MemoryConnector};

use std::fmt;
use std::future::Future;

use tokio::sync::mpsc;

/// Address of a pub/sub channel. All rooms share one channel; room scoping
/// happens inside the payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelId(String);

impl ChannelId {
    /// Creates a new `ChannelId`.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the channel address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque identifier for one live subscription.
///
/// Subscriptions are per-handle: two rooms subscribed to the same channel
/// hold different ids and can be torn down independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Creates a new `SubscriptionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// A payload as delivered by the transport, with its log position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Position in the channel log. Strictly increasing in publish order;
    /// this, not `timestamp`, is the authoritative ordering.
    pub seq: u64,
    /// Milliseconds since the Unix epoch, assigned at publish time.
    pub timestamp: u64,
    /// Raw message bytes.
    pub payload: Vec<u8>,
}

/// A live subscription: the id used to cancel it, and the stream of
/// messages published after it was established.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    receiver: mpsc::UnboundedReceiver<Message>,
}

impl Subscription {
    /// Creates a subscription from its parts. Used by transport
    /// implementations.
    pub fn new(id: SubscriptionId, receiver: mpsc::UnboundedReceiver<Message>) -> Self {
        Self { id, receiver }
    }

    /// Returns the subscription's id.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Receives the next live message.
    ///
    /// Returns `None` once the subscription has been cancelled or the
    /// transport closed.
    pub async fn recv(&mut self) -> Option<Message> {
        self.receiver.recv().await
    }
}

/// An order-preserving pub/sub connection with historical replay.
///
/// Methods return `Send` futures so a room session can drive the
/// transport from a spawned task.
pub trait Transport: Send + Sync + 'static {
    /// Subscribes to live messages on `channel`. Resolves once the
    /// subscription is acknowledged.
    fn subscribe(
        &self,
        channel: &ChannelId,
    ) -> impl Future<Output = Result<Subscription, TransportError>> + Send;

    /// Cancels a single subscription. Other subscriptions on the same
    /// channel are unaffected.
    fn unsubscribe(
        &self,
        id: SubscriptionId,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Replays every message on `channel` with `timestamp >= from_timestamp`,
    /// in log order. Resolving the future is the completion signal.
    fn resend(
        &self,
        channel: &ChannelId,
        from_timestamp: u64,
    ) -> impl Future<Output = Result<Vec<Message>, TransportError>> + Send;

    /// Publishes a payload on `channel`.
    fn publish(
        &self,
        channel: &ChannelId,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Closes the connection. Outstanding subscriptions end.
    fn close(&self) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// Produces connected transports. Credentials live in the connector.
pub trait Connector: Send + Sync + 'static {
    /// The transport type produced by this connector.
    type Transport: Transport;

    /// Establishes a new connection.
    fn connect(&self) -> impl Future<Output = Result<Self::Transport, TransportError>> + Send;
}
