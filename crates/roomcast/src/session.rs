//! Room session actor: one Tokio task per (participant, room).
//!
//! The task owns the [`Coordinator`], the live subscription and the
//! transport lease, and is the only place any of them is touched. Callers
//! talk to it through a [`SessionHandle`] (mpsc commands with oneshot
//! replies) and observe it through a `watch` channel of [`SessionView`].
//!
//! ```text
//! SessionHandle ──commands──▶ SessionActor ──effects──▶ Transport / collaborators
//!       ▲                          │
//!       └──────── watch<SessionView>┘
//! ```
//!
//! Dropping every handle makes the actor leave the room (best effort) and
//! stop, the same as calling [`SessionHandle::leave`].

use std::sync::Arc;

use rand::Rng;
use roomcast_presence::{Coordinator, Effect, Phase, PresenceConfig, Room};
use roomcast_protocol::{Codec, Event, EventRecord, Glyph, Impression, JsonCodec, ParticipantId, RoomId};
use roomcast_transport::{
    ChannelId, Connector, Message, Subscription, Transport, TransportError, TransportHub,
    TransportLease,
};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::{
    EntryFailure, GroupRegistry, ImpressionSink, LocalIdentity, NoopImpressions, NoopRegistry,
    RoomcastConfig, RoomcastError,
};

// ---------------------------------------------------------------------------
// SessionView
// ---------------------------------------------------------------------------

/// What a room looks like from inside one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub phase: Phase,
    /// Present participants, sorted.
    pub present: Vec<ParticipantId>,
    /// Visible reactions, sorted by participant.
    pub reactions: Vec<(ParticipantId, Glyph)>,
}

impl SessionView {
    fn initial() -> Self {
        Self {
            phase: Phase::NotEntered,
            present: Vec::new(),
            reactions: Vec::new(),
        }
    }

    pub fn is_present(&self, participant: &ParticipantId) -> bool {
        self.present.binary_search(participant).is_ok()
    }

    pub fn reaction_of(&self, participant: &ParticipantId) -> Option<Glyph> {
        self.reactions
            .iter()
            .find(|(p, _)| p == participant)
            .map(|(_, g)| *g)
    }
}

// ---------------------------------------------------------------------------
// Commands and handle
// ---------------------------------------------------------------------------

type Reply<T> = oneshot::Sender<Result<T, RoomcastError>>;

enum SessionCommand {
    /// Start entry. Replied once entry completes or fails.
    Enter { reply: Reply<()> },

    /// Publish a reaction. Replied before the publish goes out.
    React { glyph: Glyph, reply: Reply<()> },

    /// Read the current view straight from the actor.
    Snapshot { reply: oneshot::Sender<SessionView> },

    /// Leave the room and stop.
    Leave { reply: Reply<()> },
}

/// Handle to a running room session. Cheap to clone.
#[derive(Clone)]
pub struct SessionHandle {
    room_id: RoomId,
    participant_id: ParticipantId,
    session_id: Arc<str>,
    commands: mpsc::Sender<SessionCommand>,
    view: watch::Receiver<SessionView>,
}

impl SessionHandle {
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub fn participant_id(&self) -> &ParticipantId {
        &self.participant_id
    }

    /// Random id distinguishing this session in logs.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Enters the room: subscribe, replay, reconcile, and join if needed.
    ///
    /// # Errors
    /// [`RoomcastError::EntryFailed`] if connecting, subscribing or the
    /// replay fails, times out or is cancelled by [`leave`](Self::leave).
    /// The session is then back in `NotEntered` and `enter` may be called
    /// again. [`RoomcastError::Presence`] if entry already started.
    pub async fn enter(&self) -> Result<(), RoomcastError> {
        self.request(|reply| SessionCommand::Enter { reply }).await?
    }

    /// Broadcasts a reaction. Only allowed once entered.
    pub async fn react(&self, glyph: Glyph) -> Result<(), RoomcastError> {
        self.request(|reply| SessionCommand::React { glyph, reply })
            .await?
    }

    /// Leaves the room and stops the session.
    pub async fn leave(&self) -> Result<(), RoomcastError> {
        self.request(|reply| SessionCommand::Leave { reply }).await?
    }

    /// The current view, read from the actor itself (expired reactions are
    /// never included).
    pub async fn snapshot(&self) -> Result<SessionView, RoomcastError> {
        self.request(|reply| SessionCommand::Snapshot { reply })
            .await
    }

    /// The most recently published view, without a round trip.
    pub fn view(&self) -> SessionView {
        self.view.borrow().clone()
    }

    pub fn phase(&self) -> Phase {
        self.view.borrow().phase
    }

    /// A receiver that is notified on every view change.
    pub fn watch(&self) -> watch::Receiver<SessionView> {
        self.view.clone()
    }

    /// Waits until the view satisfies `predicate` and returns that view.
    ///
    /// # Errors
    /// [`RoomcastError::SessionClosed`] if the session stops first.
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&SessionView) -> bool,
    ) -> Result<SessionView, RoomcastError> {
        let mut view = self.view.clone();
        let result = view.wait_for(predicate).await.map(|v| v.clone());
        result.map_err(|_| self.closed())
    }

    /// Returns `true` once the session task has stopped.
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T, RoomcastError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(command(reply_tx))
            .await
            .map_err(|_| self.closed())?;
        reply_rx.await.map_err(|_| self.closed())
    }

    fn closed(&self) -> RoomcastError {
        RoomcastError::SessionClosed(self.room_id.clone())
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Configures and spawns a room session.
///
/// ```rust,no_run
/// # async fn demo() -> Result<(), roomcast::RoomcastError> {
/// use std::sync::Arc;
/// use roomcast::prelude::*;
///
/// let bus = MemoryBus::new();
/// let hub = Arc::new(TransportHub::new(MemoryConnector::new(bus)));
/// let room = Room::new(RoomId::new("space-1"), 0, u64::MAX);
///
/// let session = SessionBuilder::new(room, ParticipantId::new("alice")).spawn(&hub);
/// session.enter().await?;
/// session.react(Glyph::Fire).await?;
/// session.leave().await?;
/// # Ok(())
/// # }
/// ```
pub struct SessionBuilder {
    room: Room,
    participant_id: ParticipantId,
    config: RoomcastConfig,
    identity: Option<LocalIdentity>,
    registry: Arc<dyn GroupRegistry>,
    impressions: Arc<dyn ImpressionSink>,
}

impl SessionBuilder {
    pub fn new(room: Room, participant_id: ParticipantId) -> Self {
        Self {
            room,
            participant_id,
            config: RoomcastConfig::default(),
            identity: None,
            registry: Arc::new(NoopRegistry),
            impressions: Arc::new(NoopImpressions),
        }
    }

    pub fn config(mut self, config: RoomcastConfig) -> Self {
        self.config = config;
        self
    }

    /// The identity handed to the [`GroupRegistry`]. A random one is
    /// generated if unset.
    pub fn identity(mut self, identity: LocalIdentity) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn registry(mut self, registry: Arc<dyn GroupRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn impressions(mut self, impressions: Arc<dyn ImpressionSink>) -> Self {
        self.impressions = impressions;
        self
    }

    /// Spawns the session task. Nothing is connected until
    /// [`SessionHandle::enter`].
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn<C: Connector>(self, hub: &Arc<TransportHub<C>>) -> SessionHandle {
        let config = self.config.validated();
        let session_id: Arc<str> = generate_session_id().into();
        let room_id = self.room.id.clone();
        let (tx, rx) = mpsc::channel(config.command_buffer);
        let (view_tx, view_rx) = watch::channel(SessionView::initial());

        let actor = SessionActor {
            session_id: Arc::clone(&session_id),
            coordinator: Coordinator::new(self.room, self.participant_id.clone(), &config.presence),
            hub: Arc::clone(hub),
            channel: config.channel_id(),
            codec: JsonCodec,
            presence: config.presence,
            identity: self.identity.unwrap_or_else(LocalIdentity::generate),
            registry: self.registry,
            impressions: self.impressions,
            lease: None,
            subscription: None,
            subscribing: None,
            resend: None,
            pending_entry: None,
            commands: rx,
            view: view_tx,
        };
        tokio::spawn(actor.run());

        SessionHandle {
            room_id,
            participant_id: self.participant_id,
            session_id,
            commands: tx,
            view: view_rx,
        }
    }

    /// Spawns the session and enters the room.
    ///
    /// # Errors
    /// Whatever [`SessionHandle::enter`] returns. The handle is dropped on
    /// error, which stops the task; use [`spawn`](Self::spawn) and
    /// [`SessionHandle::enter`] directly to retry on the same session.
    pub async fn enter<C: Connector>(
        self,
        hub: &Arc<TransportHub<C>>,
    ) -> Result<SessionHandle, RoomcastError> {
        let handle = self.spawn(hub);
        handle.enter().await?;
        Ok(handle)
    }
}

/// 8 random bytes as lowercase hex.
fn generate_session_id() -> String {
    let bytes: [u8; 8] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

type Connected<T> = (TransportLease<T>, Subscription);
type SubscribeResult<T> = Result<Connected<T>, EntryFailure>;

/// Connect and subscribe, running off the actor so `Leave` stays responsive.
/// `then` holds the entry effects that need the subscription.
struct PendingSubscribe<T: Transport> {
    task: JoinHandle<SubscribeResult<T>>,
    deadline: Instant,
    then: Vec<Effect>,
}

type ResendResult = Result<Vec<Message>, TransportError>;

struct PendingResend {
    task: JoinHandle<ResendResult>,
    deadline: Instant,
}

struct SessionActor<C: Connector> {
    session_id: Arc<str>,
    coordinator: Coordinator,
    hub: Arc<TransportHub<C>>,
    channel: ChannelId,
    codec: JsonCodec,
    presence: PresenceConfig,
    identity: LocalIdentity,
    registry: Arc<dyn GroupRegistry>,
    impressions: Arc<dyn ImpressionSink>,
    lease: Option<TransportLease<C::Transport>>,
    subscription: Option<Subscription>,
    subscribing: Option<PendingSubscribe<C::Transport>>,
    resend: Option<PendingResend>,
    pending_entry: Option<Reply<()>>,
    commands: mpsc::Receiver<SessionCommand>,
    view: watch::Sender<SessionView>,
}

impl<C: Connector> SessionActor<C> {
    async fn run(mut self) {
        info!(
            room_id = %self.room_id(),
            participant_id = %self.coordinator.self_id(),
            session = %self.session_id,
            "room session started"
        );

        while self.coordinator.phase() != Phase::Left {
            let subscribe_deadline = self.subscribing.as_ref().map(|s| s.deadline);
            let resend_deadline = self.resend.as_ref().map(|r| r.deadline);
            let reaction_deadline = self.coordinator.next_reaction_deadline();

            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd).await,
                    None => self.on_handles_dropped().await,
                },
                msg = next_live(&mut self.subscription) => self.on_live(msg),
                outcome = subscribe_outcome(&mut self.subscribing) => self.on_subscribed(outcome).await,
                () = sleep_until(subscribe_deadline) => self.on_subscribe_timeout().await,
                outcome = resend_outcome(&mut self.resend) => self.on_resend_outcome(outcome).await,
                () = sleep_until(resend_deadline) => self.on_resend_timeout().await,
                () = sleep_until(reaction_deadline) => self.on_reaction_deadline(),
            }
        }

        info!(
            room_id = %self.room_id(),
            session = %self.session_id,
            "room session stopped"
        );
    }

    fn room_id(&self) -> &RoomId {
        &self.coordinator.room().id
    }

    // -- commands --

    async fn handle_command(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::Enter { reply } => self.begin_entry(reply).await,
            SessionCommand::React { glyph, reply } => {
                match self.coordinator.publish_reaction(glyph, Instant::now()) {
                    Ok(effects) => {
                        let _ = reply.send(Ok(()));
                        self.publish_view();
                        let _ = self.execute(effects).await;
                    }
                    Err(e) => {
                        let _ = reply.send(Err(e.into()));
                    }
                }
            }
            SessionCommand::Snapshot { reply } => {
                let _ = reply.send(self.build_view());
            }
            SessionCommand::Leave { reply } => {
                let result = self.leave().await;
                let _ = reply.send(result);
            }
        }
    }

    async fn begin_entry(&mut self, reply: Reply<()>) {
        let effects = match self.coordinator.enter() {
            Ok(effects) => effects,
            Err(e) => {
                let _ = reply.send(Err(e.into()));
                return;
            }
        };
        info!(
            room_id = %self.room_id(),
            participant_id = %self.coordinator.self_id(),
            from = self.coordinator.room().created_at,
            "entering room"
        );
        self.pending_entry = Some(reply);
        self.publish_view();

        if let Err(reason) = self.execute(effects).await {
            self.fail_entry(reason).await;
        }
    }

    async fn leave(&mut self) -> Result<(), RoomcastError> {
        let from = self.coordinator.phase();
        let effects = self.coordinator.leave()?;
        info!(room_id = %self.room_id(), phase = %from, "leaving room");

        let _ = self.execute(effects).await;
        if let Some(reply) = self.pending_entry.take() {
            let _ = reply.send(Err(self.entry_failed(EntryFailure::Cancelled)));
        }
        self.publish_view();
        Ok(())
    }

    async fn on_handles_dropped(&mut self) {
        debug!(room_id = %self.room_id(), "all handles dropped");
        if let Err(e) = self.leave().await {
            debug!(room_id = %self.room_id(), error = %e, "leave on drop skipped");
        }
    }

    // -- entry --

    async fn on_subscribed(&mut self, outcome: Result<SubscribeResult<C::Transport>, JoinError>) {
        let Some(pending) = self.subscribing.take() else {
            return;
        };
        let (lease, subscription) = match outcome {
            Ok(Ok(connected)) => connected,
            Ok(Err(reason)) => return self.fail_entry(reason).await,
            Err(e) => {
                let e = TransportError::SubscribeFailed(e.to_string());
                return self.fail_entry(EntryFailure::Subscribe(e)).await;
            }
        };
        debug!(
            room_id = %self.room_id(),
            channel = %self.channel,
            subscription = %subscription.id(),
            "subscribed"
        );
        self.lease = Some(lease);
        self.subscription = Some(subscription);
        if let Err(reason) = self.execute(pending.then).await {
            self.fail_entry(reason).await;
        }
    }

    async fn on_subscribe_timeout(&mut self) {
        warn!(
            room_id = %self.room_id(),
            timeout_ms = self.presence.resend_timeout.as_millis() as u64,
            "subscribe timed out"
        );
        self.cancel_subscribe().await;
        self.fail_entry(EntryFailure::SubscribeTimedOut).await;
    }

    async fn on_resend_outcome(&mut self, outcome: Result<ResendResult, JoinError>) {
        self.resend = None;
        let messages = match outcome {
            Ok(Ok(messages)) => messages,
            Ok(Err(e)) => return self.fail_entry(EntryFailure::Resend(e)).await,
            Err(e) => {
                let e = TransportError::ResendFailed(e.to_string());
                return self.fail_entry(EntryFailure::Resend(e)).await;
            }
        };

        let records: Vec<EventRecord> = messages
            .into_iter()
            .filter_map(|m| self.decode(m))
            .collect();
        let effects = match self.coordinator.on_resend_complete(records, Instant::now()) {
            Ok(effects) => effects,
            Err(e) => {
                debug!(room_id = %self.room_id(), error = %e, "unexpected replay result");
                return;
            }
        };

        // Nothing after reconciliation can fail entry; publish and
        // registration failures are logged and swallowed.
        let _ = self.execute(effects).await;
        info!(
            room_id = %self.room_id(),
            participant_id = %self.coordinator.self_id(),
            present = self.coordinator.roster().len(),
            "entered room"
        );
        self.publish_view();
        if let Some(reply) = self.pending_entry.take() {
            let _ = reply.send(Ok(()));
        }
    }

    async fn on_resend_timeout(&mut self) {
        warn!(
            room_id = %self.room_id(),
            timeout_ms = self.presence.resend_timeout.as_millis() as u64,
            "resend timed out"
        );
        self.cancel_resend();
        self.fail_entry(EntryFailure::ResendTimedOut).await;
    }

    async fn fail_entry(&mut self, reason: EntryFailure) {
        warn!(room_id = %self.room_id(), %reason, "room entry failed");
        self.cancel_subscribe().await;
        self.cancel_resend();
        match self.coordinator.on_entry_failed() {
            Ok(effects) => {
                let _ = self.execute(effects).await;
            }
            Err(e) => debug!(room_id = %self.room_id(), error = %e, "entry already resolved"),
        }
        // Not subscribed any more; release the connection too.
        self.lease = None;
        self.publish_view();
        if let Some(reply) = self.pending_entry.take() {
            let _ = reply.send(Err(self.entry_failed(reason)));
        }
    }

    fn entry_failed(&self, reason: EntryFailure) -> RoomcastError {
        RoomcastError::EntryFailed {
            room_id: self.room_id().clone(),
            reason,
        }
    }

    // -- live traffic --

    fn on_live(&mut self, msg: Option<Message>) {
        let Some(msg) = msg else {
            warn!(room_id = %self.room_id(), "live subscription ended");
            self.subscription = None;
            return;
        };
        let Some(record) = self.decode(msg) else {
            return;
        };
        match self.coordinator.on_live(record, Instant::now()) {
            Ok(update) => {
                trace!(room_id = %self.room_id(), ?update, "live event");
                self.publish_view();
            }
            Err(e) => debug!(room_id = %self.room_id(), error = %e, "live event dropped"),
        }
    }

    fn on_reaction_deadline(&mut self) {
        let expired = self.coordinator.expire_reactions(Instant::now());
        trace!(room_id = %self.room_id(), expired = expired.len(), "reactions expired");
        self.publish_view();
    }

    fn decode(&self, msg: Message) -> Option<EventRecord> {
        match self.codec.decode_event(&msg.payload) {
            Ok(event) => Some(EventRecord::new(msg.seq, msg.timestamp, event)),
            Err(e) => {
                debug!(seq = msg.seq, error = %e, "ignoring malformed message");
                None
            }
        }
    }

    // -- effects --

    async fn execute(&mut self, effects: Vec<Effect>) -> Result<(), EntryFailure> {
        let mut effects = effects.into_iter();
        while let Some(effect) = effects.next() {
            match effect {
                Effect::Subscribe => {
                    // The rest waits until the subscription is acknowledged.
                    self.subscribe(effects.collect());
                    return Ok(());
                }
                Effect::RequestResend { from } => self.request_resend(from)?,
                Effect::Publish(event) => self.publish(&event).await,
                Effect::RegisterMembership => self.register_membership(),
                Effect::LogImpression(impression) => self.log_impression(impression),
                Effect::CancelResend => {
                    self.cancel_subscribe().await;
                    self.cancel_resend();
                }
                Effect::Unsubscribe => self.unsubscribe().await,
            }
        }
        Ok(())
    }

    fn subscribe(&mut self, then: Vec<Effect>) {
        let hub = Arc::clone(&self.hub);
        let held = self.lease.take();
        let channel = self.channel.clone();
        let task = tokio::spawn(async move {
            let lease = match held {
                Some(lease) => lease,
                None => hub.acquire().await.map_err(EntryFailure::Connect)?,
            };
            let subscription = lease
                .subscribe(&channel)
                .await
                .map_err(EntryFailure::Subscribe)?;
            Ok::<_, EntryFailure>((lease, subscription))
        });
        self.subscribing = Some(PendingSubscribe {
            task,
            deadline: Instant::now() + self.presence.resend_timeout,
            then,
        });
        debug!(room_id = %self.room_id(), channel = %self.channel, "subscribing");
    }

    /// Aborts an unacknowledged subscribe. A subscription that completed
    /// before the abort took effect is torn down.
    async fn cancel_subscribe(&mut self) {
        let Some(pending) = self.subscribing.take() else {
            return;
        };
        pending.task.abort();
        if let Ok(Ok((lease, subscription))) = pending.task.await {
            if let Err(e) = lease.unsubscribe(subscription.id()).await {
                warn!(room_id = %self.room_id(), error = %e, "unsubscribe failed");
            }
        }
        debug!(room_id = %self.room_id(), "subscribe cancelled");
    }

    fn request_resend(&mut self, from: u64) -> Result<(), EntryFailure> {
        let lease = self
            .lease
            .clone()
            .ok_or(EntryFailure::Resend(TransportError::Closed))?;
        let channel = self.channel.clone();
        let task = tokio::spawn(async move { lease.resend(&channel, from).await });
        self.resend = Some(PendingResend {
            task,
            deadline: Instant::now() + self.presence.resend_timeout,
        });
        debug!(room_id = %self.room_id(), from, "resend requested");
        Ok(())
    }

    fn cancel_resend(&mut self) {
        if let Some(pending) = self.resend.take() {
            pending.task.abort();
            debug!(room_id = %self.room_id(), "resend cancelled");
        }
    }

    async fn publish(&self, event: &Event) {
        let payload = match self.codec.encode_event(event) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(room_id = %self.room_id(), error = %e, "encode failed");
                return;
            }
        };
        let Some(lease) = &self.lease else {
            warn!(room_id = %self.room_id(), kind = %event.kind, "no transport, event dropped");
            return;
        };
        match lease.publish(&self.channel, payload).await {
            Ok(()) => debug!(room_id = %self.room_id(), kind = %event.kind, "published"),
            Err(e) => warn!(
                room_id = %self.room_id(),
                kind = %event.kind,
                error = %e,
                "publish failed"
            ),
        }
    }

    fn register_membership(&self) {
        let registry = Arc::clone(&self.registry);
        let participant_id = self.coordinator.self_id().clone();
        let identity = self.identity.clone();
        let room_id = self.room_id().clone();
        tokio::spawn(async move {
            match registry.join(participant_id.clone(), identity, room_id.clone()).await {
                Ok(()) => info!(%room_id, %participant_id, "membership registered"),
                Err(e) => warn!(%room_id, %participant_id, error = %e, "membership registration failed"),
            }
        });
    }

    fn log_impression(&self, impression: Impression) {
        let sink = Arc::clone(&self.impressions);
        tokio::spawn(async move { sink.record(impression).await });
    }

    async fn unsubscribe(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            if let Some(lease) = &self.lease {
                if let Err(e) = lease.unsubscribe(subscription.id()).await {
                    warn!(room_id = %self.room_id(), error = %e, "unsubscribe failed");
                }
            }
        }
        // Releasing the lease lets the hub close the connection once no
        // other session holds one.
        self.lease = None;
    }

    // -- view --

    fn build_view(&self) -> SessionView {
        SessionView {
            phase: self.coordinator.phase(),
            present: self.coordinator.roster().snapshot(),
            reactions: self.coordinator.reactions().visible(Instant::now()),
        }
    }

    fn publish_view(&self) {
        let view = self.build_view();
        self.view.send_if_modified(|current| {
            if *current == view {
                false
            } else {
                *current = view;
                true
            }
        });
    }
}

async fn next_live(subscription: &mut Option<Subscription>) -> Option<Message> {
    match subscription {
        Some(subscription) => subscription.recv().await,
        None => std::future::pending().await,
    }
}

async fn subscribe_outcome<T: Transport>(
    subscribing: &mut Option<PendingSubscribe<T>>,
) -> Result<SubscribeResult<T>, JoinError> {
    match subscribing {
        Some(pending) => (&mut pending.task).await,
        None => std::future::pending().await,
    }
}

async fn resend_outcome(resend: &mut Option<PendingResend>) -> Result<ResendResult, JoinError> {
    match resend {
        Some(pending) => (&mut pending.task).await,
        None => std::future::pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_session_id_is_16_hex_chars() {
        let id = generate_session_id();
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, generate_session_id());
    }

    #[test]
    fn test_session_view_lookups() {
        let alice = ParticipantId::new("alice");
        let view = SessionView {
            phase: Phase::Active,
            present: vec![alice.clone(), ParticipantId::new("bob")],
            reactions: vec![(alice.clone(), Glyph::Star)],
        };
        assert!(view.is_present(&alice));
        assert!(!view.is_present(&ParticipantId::new("carol")));
        assert_eq!(view.reaction_of(&alice), Some(Glyph::Star));
        assert_eq!(view.reaction_of(&ParticipantId::new("bob")), None);
    }
}
