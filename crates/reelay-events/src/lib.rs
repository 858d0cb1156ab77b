#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Job lifecycle event bus for Reelay.
//!
//! The bus provides a typed event enum, sequential identifiers, and support for
//! replaying recent events when subscribers reconnect (e.g. SSE clients that
//! supply `Last-Event-ID`). Internally it uses `tokio::broadcast` with a bounded
//! buffer; when the channel overflows, the oldest events are dropped.

pub mod payloads;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tokio::sync::broadcast::{self, Receiver, Sender};

pub use payloads::{DEFAULT_REPLAY_CAPACITY, Event, EventEnvelope, EventId};

/// Shared event bus built on top of `tokio::broadcast`.
#[derive(Clone)]
pub struct EventBus {
    sender: Sender<EventEnvelope>,
    buffer: Arc<Mutex<VecDeque<EventEnvelope>>>,
    next_id: Arc<AtomicU64>,
    replay_capacity: usize,
}

impl EventBus {
    /// Construct a new bus with the provided broadcast capacity.
    ///
    /// The broadcast channel uses the same capacity as the in-memory replay
    /// buffer, so dropped events impact both structures consistently.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "event bus capacity must be positive");
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            buffer: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            next_id: Arc::new(AtomicU64::new(1)),
            replay_capacity: capacity,
        }
    }

    /// Construct a bus with the default in-memory buffer size.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_REPLAY_CAPACITY)
    }

    /// Publish a new event to the bus, assigning it a sequential identifier.
    ///
    /// Publishing never blocks and succeeds even when nobody is subscribed.
    pub fn publish(&self, event: Event) -> EventId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let envelope = EventEnvelope {
            id,
            timestamp: Utc::now(),
            event,
        };

        {
            let mut buffer = self.lock_buffer();
            if buffer.len() == self.replay_capacity {
                buffer.pop_front();
            }
            buffer.push_back(envelope.clone());
        }

        let _ = self.sender.send(envelope);
        id
    }

    /// Subscribe to the bus, replaying any buffered events newer than `since_id`.
    #[must_use]
    pub fn subscribe(&self, since_id: Option<EventId>) -> EventStream {
        let mut backlog = VecDeque::new();
        if let Some(since) = since_id {
            let buffer = self.lock_buffer();
            backlog.extend(buffer.iter().filter(|item| item.id > since).cloned());
        }

        let receiver = self.sender.subscribe();
        EventStream { backlog, receiver }
    }

    /// Returns the last assigned identifier, if any events have been published.
    #[must_use]
    pub fn last_event_id(&self) -> Option<EventId> {
        self.lock_buffer().back().map(|event| event.id)
    }

    fn lock_buffer(&self) -> MutexGuard<'_, VecDeque<EventEnvelope>> {
        self.buffer.lock().unwrap_or_else(|err| {
            panic!("failed to lock event buffer: {err}");
        })
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Stream wrapper that yields events either from the replay backlog or from the
/// live broadcast channel.
pub struct EventStream {
    backlog: VecDeque<EventEnvelope>,
    receiver: Receiver<EventEnvelope>,
}

impl EventStream {
    /// Receive the next event, respecting the replay backlog first.
    pub async fn next(&mut self) -> Option<EventEnvelope> {
        if let Some(event) = self.backlog.pop_front() {
            return Some(event);
        }

        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::time::Duration;
    use tokio::task;
    use tokio::time::timeout;
    use uuid::Uuid;

    fn sample_started_event(id: usize) -> Event {
        Event::JobStarted {
            job_id: Uuid::from_u128(id as u128 + 1),
        }
    }

    #[tokio::test]
    async fn sequential_ids_and_replay() {
        let bus = EventBus::with_capacity(16);

        let mut last_id = 0;
        for i in 0..5 {
            last_id = bus.publish(sample_started_event(i));
        }
        assert_eq!(last_id, 5);
        assert_eq!(bus.last_event_id(), Some(5));

        let mut stream = bus.subscribe(Some(2));
        let mut received = Vec::new();
        for _ in 0..3 {
            if let Some(event) = stream.next().await {
                received.push(event.id);
            }
        }

        assert_eq!(received, vec![3, 4, 5]);
    }

    #[tokio::test]
    async fn replay_buffer_drops_oldest_events() {
        let bus = EventBus::with_capacity(2);
        for i in 0..4 {
            let _ = bus.publish(sample_started_event(i));
        }
        let mut stream = bus.subscribe(Some(0));
        let first = stream.next().await.expect("replayed event");
        assert_eq!(first.id, 3);
    }

    #[tokio::test]
    async fn live_subscribers_receive_published_events() {
        let bus = Arc::new(EventBus::with_capacity(512));
        let mut stream = bus.subscribe(None);

        let publisher = {
            let bus = Arc::clone(&bus);
            task::spawn(async move {
                for i in 0..200 {
                    let _ = bus.publish(sample_started_event(i));
                }
            })
        };

        let consumer = task::spawn(async move {
            let mut ids = HashSet::new();
            while ids.len() < 200 {
                match timeout(Duration::from_secs(1), stream.next()).await {
                    Ok(Some(event)) => {
                        ids.insert(event.id);
                    }
                    _ => break,
                }
            }
            ids
        });

        publisher.await.expect("publisher task panicked");
        let ids = consumer.await.expect("consumer task panicked");
        assert_eq!(ids.len(), 200);
    }
}
