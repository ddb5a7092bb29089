//! Fan-out of [`TurnEvent`]s to streaming consumers.
//!
//! The loop emits from synchronous code paths, so delivery must never
//! await. A lossy broadcast channel gives that: a consumer that stops
//! draining gets a lag error on its receiver while the turn keeps
//! running. Transports that stream a single conversation subscribe
//! through [`EventEmitter::subscribe_session`], which filters the shared
//! channel down to one session's events.

use std::sync::atomic::{AtomicU64, Ordering};

use metrics::counter;
use tandem_core::events::TurnEvent;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

/// Events buffered per subscriber before a slow consumer lags out. A
/// busy turn produces a handful of events per tool call, so this covers
/// many turns of backlog.
const CHANNEL_CAPACITY: usize = 1024;

/// Lossy, non-blocking fan-out of turn events.
pub struct EventEmitter {
    sender: broadcast::Sender<TurnEvent>,
    emitted: AtomicU64,
}

impl EventEmitter {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(CHANNEL_CAPACITY)
    }

    /// Emitter with a custom per-subscriber buffer.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            emitted: AtomicU64::new(0),
        }
    }

    /// Deliver an event to every live subscriber without blocking.
    ///
    /// Returns how many subscribers received it; an emitter with no
    /// subscribers swallows the event and returns 0.
    pub fn emit(&self, event: TurnEvent) -> usize {
        let _ = self.emitted.fetch_add(1, Ordering::Relaxed);
        counter!("turn_events_emitted_total", "type" => event.event_type()).increment(1);
        self.sender.send(event).unwrap_or(0)
    }

    /// Raw receiver over every session's events, starting now.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TurnEvent> {
        self.sender.subscribe()
    }

    /// Receiver filtered to one session's events, starting now.
    #[must_use]
    pub fn subscribe_session(&self, session_id: &str) -> SessionEvents {
        SessionEvents {
            inner: self.sender.subscribe(),
            session_id: session_id.to_string(),
        }
    }

    /// Live subscriber count, session-filtered ones included.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Events emitted over the emitter's lifetime, delivered or not.
    #[must_use]
    pub fn emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new()
    }
}

/// A subscription narrowed to a single session.
///
/// Events for other sessions are consumed and discarded, so a paused
/// session's subscriber still advances past busy neighbours instead of
/// lagging out on traffic it would never surface.
pub struct SessionEvents {
    inner: broadcast::Receiver<TurnEvent>,
    session_id: String,
}

impl SessionEvents {
    /// Next event for this subscription's session.
    pub async fn recv(&mut self) -> Result<TurnEvent, RecvError> {
        loop {
            let event = self.inner.recv().await?;
            if event.session_id() == self.session_id {
                return Ok(event);
            }
        }
    }
}
