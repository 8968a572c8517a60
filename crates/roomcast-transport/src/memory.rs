//! In-process pub/sub bus.
//!
//! [`MemoryBus`] is the broker: one append-only log per channel plus the
//! set of live subscribers. Each [`MemoryClient`] is one "connection" to
//! it and implements [`Transport`]. Delivery is in publish order and every
//! subscriber on the channel receives every message, including the
//! publisher's own (echo).
//!
//! Fault injection (`fail_*`, `stall_resend`) lets tests exercise the
//! entry failure paths without a network.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::mpsc;

use crate::{
    ChannelId, Connector, Message, Subscription, SubscriptionId, Transport, TransportError,
};

/// Counter for generating unique subscription IDs.
static NEXT_SUBSCRIPTION_ID: AtomicU64 = AtomicU64::new(1);

struct Subscriber {
    channel: ChannelId,
    sender: mpsc::UnboundedSender<Message>,
}

#[derive(Default)]
struct Faults {
    subscribe: Option<String>,
    resend: Option<String>,
    publish: Option<String>,
    stall_subscribe: bool,
    stall_resend: bool,
}

#[derive(Default)]
struct BusInner {
    logs: HashMap<ChannelId, Vec<Message>>,
    next_seq: u64,
    last_timestamp: u64,
    subscribers: HashMap<SubscriptionId, Subscriber>,
    faults: Faults,
}

/// Shared in-memory broker. Cheap to clone; clones share the same log.
#[derive(Clone, Default)]
pub struct MemoryBus {
    inner: Arc<Mutex<BusInner>>,
    open_clients: Arc<AtomicUsize>,
}

impl MemoryBus {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BusInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Opens a new client connection to this bus.
    pub fn client(&self) -> MemoryClient {
        self.open_clients.fetch_add(1, Ordering::Relaxed);
        MemoryClient {
            bus: self.clone(),
            subscriptions: Mutex::new(HashSet::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Number of clients that are open (not yet closed).
    pub fn open_clients(&self) -> usize {
        self.open_clients.load(Ordering::Relaxed)
    }

    /// Number of live subscriptions across all clients and channels.
    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    /// Returns a copy of the full log for `channel`.
    pub fn history(&self, channel: &ChannelId) -> Vec<Message> {
        self.lock().logs.get(channel).cloned().unwrap_or_default()
    }

    /// Appends a payload with an explicit timestamp, bypassing clients.
    /// Used to seed history.
    pub fn publish_at(&self, channel: &ChannelId, payload: Vec<u8>, timestamp: u64) -> Message {
        let mut inner = self.lock();
        inner.last_timestamp = inner.last_timestamp.max(timestamp);
        append(&mut inner, channel, payload, timestamp)
    }

    /// Makes every subsequent `subscribe` fail with `reason`
    /// (`None` clears the fault).
    pub fn fail_subscribe(&self, reason: Option<&str>) {
        self.lock().faults.subscribe = reason.map(str::to_owned);
    }

    /// Makes every subsequent `resend` fail with `reason`.
    pub fn fail_resend(&self, reason: Option<&str>) {
        self.lock().faults.resend = reason.map(str::to_owned);
    }

    /// Makes every subsequent `publish` fail with `reason`.
    pub fn fail_publish(&self, reason: Option<&str>) {
        self.lock().faults.publish = reason.map(str::to_owned);
    }

    /// When set, `subscribe` is never acknowledged.
    pub fn stall_subscribe(&self, stall: bool) {
        self.lock().faults.stall_subscribe = stall;
    }

    /// When set, `resend` never completes.
    pub fn stall_resend(&self, stall: bool) {
        self.lock().faults.stall_resend = stall;
    }

    fn publish_now(&self, channel: &ChannelId, payload: Vec<u8>) -> Result<Message, TransportError> {
        let mut inner = self.lock();
        if let Some(reason) = &inner.faults.publish {
            return Err(TransportError::PublishFailed(reason.clone()));
        }
        // Wall clock may step backwards; keep timestamps non-decreasing.
        let timestamp = now_millis().max(inner.last_timestamp);
        inner.last_timestamp = timestamp;
        Ok(append(&mut inner, channel, payload, timestamp))
    }
}

fn append(inner: &mut BusInner, channel: &ChannelId, payload: Vec<u8>, timestamp: u64) -> Message {
    inner.next_seq += 1;
    let message = Message {
        seq: inner.next_seq,
        timestamp,
        payload,
    };
    inner
        .logs
        .entry(channel.clone())
        .or_default()
        .push(message.clone());

    // Fan out; subscribers whose receiver is gone are pruned.
    inner.subscribers.retain(|id, sub| {
        if sub.channel != *channel {
            return true;
        }
        let delivered = sub.sender.send(message.clone()).is_ok();
        if !delivered {
            tracing::debug!(subscription = %id, "dropping subscriber with closed receiver");
        }
        delivered
    });

    tracing::trace!(%channel, seq = message.seq, "message appended");
    message
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// One connection to a [`MemoryBus`].
pub struct MemoryClient {
    bus: MemoryBus,
    subscriptions: Mutex<HashSet<SubscriptionId>>,
    closed: AtomicBool,
}

impl MemoryClient {
    /// Returns `true` once [`Transport::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<(), TransportError> {
        if self.is_closed() {
            Err(TransportError::Closed)
        } else {
            Ok(())
        }
    }

    fn own_subscriptions(&self) -> MutexGuard<'_, HashSet<SubscriptionId>> {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for MemoryClient {
    async fn subscribe(&self, channel: &ChannelId) -> Result<Subscription, TransportError> {
        self.ensure_open()?;
        let stall = self.bus.lock().faults.stall_subscribe;
        if stall {
            std::future::pending::<()>().await;
        }
        let id = SubscriptionId::new(NEXT_SUBSCRIPTION_ID.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded_channel();
        {
            let mut inner = self.bus.lock();
            if let Some(reason) = &inner.faults.subscribe {
                return Err(TransportError::SubscribeFailed(reason.clone()));
            }
            inner.subscribers.insert(
                id,
                Subscriber {
                    channel: channel.clone(),
                    sender: tx,
                },
            );
        }
        self.own_subscriptions().insert(id);
        tracing::debug!(%channel, subscription = %id, "subscribed");
        Ok(Subscription::new(id, rx))
    }

    async fn unsubscribe(&self, id: SubscriptionId) -> Result<(), TransportError> {
        self.own_subscriptions().remove(&id);
        // Dropping the sender ends the subscriber's stream.
        if self.bus.lock().subscribers.remove(&id).is_some() {
            tracing::debug!(subscription = %id, "unsubscribed");
        }
        Ok(())
    }

    async fn resend(
        &self,
        channel: &ChannelId,
        from_timestamp: u64,
    ) -> Result<Vec<Message>, TransportError> {
        self.ensure_open()?;
        let (stall, replay) = {
            let inner = self.bus.lock();
            if let Some(reason) = &inner.faults.resend {
                return Err(TransportError::ResendFailed(reason.clone()));
            }
            let replay: Vec<Message> = inner
                .logs
                .get(channel)
                .map(|log| {
                    log.iter()
                        .filter(|m| m.timestamp >= from_timestamp)
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            (inner.faults.stall_resend, replay)
        };
        if stall {
            std::future::pending::<()>().await;
        }
        tracing::debug!(%channel, from_timestamp, count = replay.len(), "resend complete");
        Ok(replay)
    }

    async fn publish(&self, channel: &ChannelId, payload: Vec<u8>) -> Result<(), TransportError> {
        self.ensure_open()?;
        self.bus.publish_now(channel, payload).map(|_| ())
    }

    async fn close(&self) -> Result<(), TransportError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let ids: Vec<SubscriptionId> = self.own_subscriptions().drain().collect();
        {
            let mut inner = self.bus.lock();
            for id in &ids {
                inner.subscribers.remove(id);
            }
        }
        self.bus.open_clients.fetch_sub(1, Ordering::Relaxed);
        tracing::debug!(subscriptions = ids.len(), "memory client closed");
        Ok(())
    }
}

/// [`Connector`] that opens clients on a shared [`MemoryBus`].
#[derive(Clone)]
pub struct MemoryConnector {
    bus: MemoryBus,
    fail: Arc<Mutex<Option<String>>>,
    connects: Arc<AtomicUsize>,
}

impl MemoryConnector {
    /// Creates a connector for `bus`.
    pub fn new(bus: MemoryBus) -> Self {
        Self {
            bus,
            fail: Arc::new(Mutex::new(None)),
            connects: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Makes subsequent `connect` calls fail with `reason`.
    pub fn fail_connect(&self, reason: Option<&str>) {
        *self.fail.lock().unwrap_or_else(PoisonError::into_inner) = reason.map(str::to_owned);
    }

    /// Number of successful connects so far.
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::Relaxed)
    }
}

impl Connector for MemoryConnector {
    type Transport = MemoryClient;

    async fn connect(&self) -> Result<MemoryClient, TransportError> {
        let failure = self
            .fail
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(reason) = failure {
            return Err(TransportError::ConnectFailed(reason));
        }
        self.connects.fetch_add(1, Ordering::Relaxed);
        Ok(self.bus.client())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> ChannelId {
        ChannelId::new("test/events")
    }

    #[test]
    fn test_publish_at_assigns_increasing_seq() {
        let bus = MemoryBus::new();
        let a = bus.publish_at(&channel(), b"a".to_vec(), 100);
        let b = bus.publish_at(&channel(), b"b".to_vec(), 50);

        assert_eq!(a.seq, 1);
        assert_eq!(b.seq, 2);
        // Timestamps are taken as given; seq carries the order.
        assert_eq!(b.timestamp, 50);
    }

    #[test]
    fn test_history_is_per_channel() {
        let bus = MemoryBus::new();
        let other = ChannelId::new("other");
        bus.publish_at(&channel(), b"a".to_vec(), 1);
        bus.publish_at(&other, b"b".to_vec(), 1);

        assert_eq!(bus.history(&channel()).len(), 1);
        assert_eq!(bus.history(&other).len(), 1);
        assert!(bus.history(&ChannelId::new("none")).is_empty());
    }

    #[tokio::test]
    async fn test_resend_filters_by_timestamp() {
        let bus = MemoryBus::new();
        bus.publish_at(&channel(), b"old".to_vec(), 10);
        bus.publish_at(&channel(), b"new".to_vec(), 20);
        let client = bus.client();

        let replay = client.resend(&channel(), 20).await.unwrap();

        assert_eq!(replay.len(), 1);
        assert_eq!(replay[0].payload, b"new".to_vec());
    }

    #[tokio::test]
    async fn test_closed_client_rejects_operations() {
        let bus = MemoryBus::new();
        let client = bus.client();
        assert_eq!(bus.open_clients(), 1);

        client.close().await.unwrap();

        assert!(client.is_closed());
        assert_eq!(bus.open_clients(), 0);
        assert_eq!(
            client.publish(&channel(), vec![1]).await,
            Err(TransportError::Closed)
        );
        // Closing twice is harmless and does not double-count.
        client.close().await.unwrap();
        assert_eq!(bus.open_clients(), 0);
    }

    #[tokio::test]
    async fn test_connector_failure_and_recovery() {
        let connector = MemoryConnector::new(MemoryBus::new());
        connector.fail_connect(Some("offline"));
        assert!(matches!(
            connector.connect().await,
            Err(TransportError::ConnectFailed(_))
        ));

        connector.fail_connect(None);
        assert!(connector.connect().await.is_ok());
        assert_eq!(connector.connects(), 1);
    }
}
