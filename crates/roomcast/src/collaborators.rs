//! Services a room session calls out to but does not own.
//!
//! Both traits return boxed futures so sessions can hold them as
//! `Arc<dyn ...>` and run calls on detached tasks. Credentials live inside
//! the implementation; the session supplies its [`LocalIdentity`].

use std::fmt;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use rand::Rng;
use roomcast_protocol::{Impression, ParticipantId, RoomId};

/// The device-local identity a participant proves group membership with.
///
/// Opaque to Roomcast. `Debug` does not print it.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct LocalIdentity(Arc<str>);

impl LocalIdentity {
    pub fn new(secret: impl Into<Arc<str>>) -> Self {
        Self(secret.into())
    }

    /// A fresh random identity: 32 bytes as lowercase hex.
    pub fn generate() -> Self {
        let bytes: [u8; 32] = rand::rng().random();
        let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for LocalIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LocalIdentity(..)")
    }
}

/// Registration with a room's membership group failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("membership registration failed: {0}")]
pub struct MembershipError(pub String);

/// Registers a participant's local identity with the group that gates a
/// room.
///
/// Called at most once per session, and only when history does not already
/// show the participant as joined.
pub trait GroupRegistry: Send + Sync + 'static {
    fn join(
        &self,
        participant_id: ParticipantId,
        identity: LocalIdentity,
        room_id: RoomId,
    ) -> BoxFuture<'_, Result<(), MembershipError>>;
}

/// Receives an impression for every successful room entry. Failures are
/// the sink's own business; the session never waits on it.
pub trait ImpressionSink: Send + Sync + 'static {
    fn record(&self, impression: Impression) -> BoxFuture<'_, ()>;
}

/// A [`GroupRegistry`] that accepts everyone.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRegistry;

impl GroupRegistry for NoopRegistry {
    fn join(
        &self,
        _participant_id: ParticipantId,
        _identity: LocalIdentity,
        _room_id: RoomId,
    ) -> BoxFuture<'_, Result<(), MembershipError>> {
        futures_util::future::ready(Ok(())).boxed()
    }
}

/// An [`ImpressionSink`] that discards impressions.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopImpressions;

impl ImpressionSink for NoopImpressions {
    fn record(&self, _impression: Impression) -> BoxFuture<'_, ()> {
        futures_util::future::ready(()).boxed()
    }
}

/// An [`ImpressionSink`] that logs each impression at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingImpressions;

impl ImpressionSink for TracingImpressions {
    fn record(&self, impression: Impression) -> BoxFuture<'_, ()> {
        async move {
            tracing::info!(
                room_id = %impression.room_id,
                participant_id = %impression.participant_id,
                kind = %impression.kind,
                group_id = impression.group_id.as_deref(),
                "impression"
            );
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_registry_accepts() {
        let result = NoopRegistry
            .join(
                ParticipantId::new("alice"),
                LocalIdentity::generate(),
                RoomId::new("space-1"),
            )
            .await;
        assert_eq!(result, Ok(()));
    }

    #[tokio::test]
    async fn test_sinks_usable_as_trait_objects() {
        let sinks: Vec<Box<dyn ImpressionSink>> =
            vec![Box::new(NoopImpressions), Box::new(TracingImpressions)];
        for sink in &sinks {
            sink.record(Impression::join(RoomId::new("r"), ParticipantId::new("p")))
                .await;
        }
    }

    #[test]
    fn test_local_identity_generate_is_random_hex() {
        let a = LocalIdentity::generate();
        assert_eq!(a.as_str().len(), 64);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, LocalIdentity::generate());
    }

    #[test]
    fn test_local_identity_debug_hides_secret() {
        let identity = LocalIdentity::new("s3cret");
        assert_eq!(format!("{identity:?}"), "LocalIdentity(..)");
    }

    #[test]
    fn test_membership_error_display() {
        let err = MembershipError("proof rejected".into());
        assert_eq!(err.to_string(), "membership registration failed: proof rejected");
    }
}
