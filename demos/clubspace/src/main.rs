//! A simulated live audio room: a handful of listeners wander in, send
//! reactions, and leave, all over the in-memory bus.
//!
//! ```text
//! RUST_LOG=roomcast=debug cargo run -p clubspace
//! ```

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::Rng;
use roomcast::prelude::*;
use roomcast::TracingImpressions;

const ROOM_LENGTH: Duration = Duration::from_secs(6);
const LISTENERS: &[&str] = &["alice.lens", "bob.lens", "carol.lens", "dave.lens"];

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

fn random_glyph() -> Glyph {
    Glyph::ALL[rand::rng().random_range(0..Glyph::ALL.len())]
}

fn random_pause(max_ms: u64) -> Duration {
    Duration::from_millis(rand::rng().random_range(100..=max_ms))
}

// ---------------------------------------------------------------------------
// Listener
// ---------------------------------------------------------------------------

async fn listener(
    hub: Arc<TransportHub<MemoryConnector>>,
    config: RoomcastConfig,
    room: Room,
    name: &'static str,
) -> Result<(), RoomcastError> {
    tokio::time::sleep(random_pause(1_500)).await;

    let session = SessionBuilder::new(room.clone(), ParticipantId::new(name))
        .config(config)
        .impressions(Arc::new(TracingImpressions))
        .enter(&hub)
        .await?;
    println!("{name} entered, sees {} present", session.view().present.len());

    while !room.has_ended(now_ms()) {
        tokio::time::sleep(random_pause(1_200)).await;
        if rand::rng().random_bool(0.15) {
            break;
        }
        session.react(random_glyph()).await?;
    }

    session.leave().await?;
    println!("{name} left");
    Ok(())
}

// ---------------------------------------------------------------------------
// Host
// ---------------------------------------------------------------------------

fn render(view: &SessionView) -> String {
    let people: Vec<String> = view
        .present
        .iter()
        .map(|p| match view.reaction_of(p) {
            Some(glyph) => format!("{p} {}", glyph.as_unicode()),
            None => p.to_string(),
        })
        .collect();
    format!("[{}] {}", view.phase, people.join(", "))
}

#[tokio::main]
async fn main() -> Result<(), RoomcastError> {
    roomcast::logging::init();
    let config = RoomcastConfig::from_env()?;

    let bus = MemoryBus::new();
    let hub = Arc::new(TransportHub::new(MemoryConnector::new(bus)));
    let start = now_ms();
    let room = Room::new(
        RoomId::new("clubspace-demo"),
        start,
        start + ROOM_LENGTH.as_millis() as u64,
    );

    let host = SessionBuilder::new(room.clone(), ParticipantId::new("host.lens"))
        .config(config.clone())
        .enter(&hub)
        .await?;
    tracing::info!(session_id = host.session_id(), "host is live");

    let mut listeners = Vec::new();
    for name in LISTENERS {
        let task = listener(Arc::clone(&hub), config.clone(), room.clone(), *name);
        listeners.push(tokio::spawn(task));
    }

    let mut views = host.watch();
    let deadline = tokio::time::sleep(ROOM_LENGTH);
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            _ = &mut deadline => break,
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                println!("{}", render(&views.borrow_and_update()));
            }
        }
    }

    for task in listeners {
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "listener failed"),
            Err(e) => tracing::warn!(error = %e, "listener task panicked"),
        }
    }
    host.leave().await?;
    println!("room ended, connection open: {}", hub.is_connected());
    Ok(())
}
