//! Core event bus for the Downhaul agent.
//!
//! The bus provides a typed event enum, sequential identifiers, and support for
//! replaying recent events when subscribers attach late (e.g. diagnostics
//! tooling inspecting what happened to a download). Internally it uses
//! `tokio::broadcast` with a bounded buffer; when the channel overflows, the
//! oldest events are dropped, matching the desired backpressure behaviour.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio::sync::broadcast::{Receiver, Sender};
use uuid::Uuid;

/// Identifier assigned to each event emitted by the agent.
pub type EventId = u64;

/// Default buffer size for the in-memory replay ring.
const DEFAULT_REPLAY_CAPACITY: usize = 1_024;

/// Typed lifecycle events surfaced while candidates flow through the agent.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// The observer reported a new candidate file.
    FileDetected {
        /// Identifier assigned to the candidate for this processing attempt.
        candidate_id: Uuid,
        /// Absolute path of the candidate in the watched directory.
        path: String,
    },
    /// The settle loop judged the candidate fully written.
    FileSettled {
        /// Identifier assigned to the candidate for this processing attempt.
        candidate_id: Uuid,
        /// Absolute path of the candidate in the watched directory.
        path: String,
        /// Number of poll rounds the candidate spent settling.
        polls: u32,
    },
    /// The candidate was relocated to its destination.
    FileMoved {
        /// Identifier assigned to the candidate for this processing attempt.
        candidate_id: Uuid,
        /// Original path in the watched directory.
        source: String,
        /// Collision-free destination path the file now lives at.
        destination: String,
    },
    /// Relocation was not configured; the candidate stays in place.
    RelocateSkipped {
        /// Identifier assigned to the candidate for this processing attempt.
        candidate_id: Uuid,
        /// Path the candidate remains at.
        path: String,
    },
    /// The move attempt failed and the candidate was abandoned.
    MoveFailed {
        /// Identifier assigned to the candidate for this processing attempt.
        candidate_id: Uuid,
        /// Path the candidate was left at.
        path: String,
        /// Human-readable failure detail.
        message: String,
    },
    /// The settle loop abandoned a candidate whose source vanished.
    FileAbandoned {
        /// Identifier assigned to the candidate for this processing attempt.
        candidate_id: Uuid,
        /// Path that no longer exists.
        path: String,
    },
    /// The default handler was asked to open the finished file.
    FileOpened {
        /// Identifier assigned to the candidate for this processing attempt.
        candidate_id: Uuid,
        /// Path handed to the platform opener.
        path: String,
    },
    /// The open request failed; the move outcome is unaffected.
    OpenFailed {
        /// Identifier assigned to the candidate for this processing attempt.
        candidate_id: Uuid,
        /// Path handed to the platform opener.
        path: String,
        /// Human-readable failure detail.
        message: String,
    },
    /// The settings file changed on disk.
    SettingsChanged {
        /// Human-readable description of the change.
        description: String,
    },
}

impl Event {
    /// Machine-friendly discriminator for log and diagnostics consumers.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Event::FileDetected { .. } => "file_detected",
            Event::FileSettled { .. } => "file_settled",
            Event::FileMoved { .. } => "file_moved",
            Event::RelocateSkipped { .. } => "relocate_skipped",
            Event::MoveFailed { .. } => "move_failed",
            Event::FileAbandoned { .. } => "file_abandoned",
            Event::FileOpened { .. } => "file_opened",
            Event::OpenFailed { .. } => "open_failed",
            Event::SettingsChanged { .. } => "settings_changed",
        }
    }
}

/// Metadata wrapper around events. Each envelope tracks the event id and
/// emission timestamp.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct EventEnvelope {
    pub id: EventId,
    pub timestamp: DateTime<Utc>,
    pub event: Event,
}

/// Shared event bus built on top of `tokio::broadcast`.
#[derive(Clone)]
pub struct EventBus {
    sender: Sender<EventEnvelope>,
    buffer: Arc<Mutex<VecDeque<EventEnvelope>>>,
    next_id: Arc<std::sync::atomic::AtomicU64>,
    replay_capacity: usize,
}

impl EventBus {
    /// Construct a new bus with the provided broadcast capacity.
    ///
    /// The broadcast channel uses the same capacity as the in-memory replay
    /// buffer, ensuring dropped events impact both structures consistently.
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
            next_id: Arc::new(std::sync::atomic::AtomicU64::new(1)),
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
    /// # Panics
    ///
    /// Panics if the replay buffer mutex has been poisoned.
    #[must_use]
    pub fn publish(&self, event: Event) -> EventId {
        let id = self
            .next_id
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let envelope = EventEnvelope {
            id,
            timestamp: Utc::now(),
            event,
        };

        {
            let mut buffer = self.buffer.lock().expect("event buffer mutex poisoned");
            if buffer.len() == self.replay_capacity {
                buffer.pop_front();
            }
            buffer.push_back(envelope.clone());
        }

        let _ = self.sender.send(envelope);
        id
    }

    /// Subscribe to the bus, replaying any buffered events newer than `since_id`.
    ///
    /// # Panics
    ///
    /// Panics if the replay buffer mutex has been poisoned.
    #[must_use]
    pub fn subscribe(&self, since_id: Option<EventId>) -> EventStream {
        let mut backlog = VecDeque::new();
        if let Some(since) = since_id {
            let buffer = self.buffer.lock().expect("event buffer mutex poisoned");
            for item in buffer.iter() {
                if item.id > since {
                    backlog.push_back(item.clone());
                }
            }
        }

        let receiver = self.sender.subscribe();
        EventStream { backlog, receiver }
    }

    /// Returns the last assigned identifier, if any events have been published.
    ///
    /// # Panics
    ///
    /// Panics if the replay buffer mutex has been poisoned.
    #[must_use]
    pub fn last_event_id(&self) -> Option<EventId> {
        let buffer = self.buffer.lock().expect("event buffer mutex poisoned");
        buffer.back().map(|event| event.id)
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

        match self.receiver.recv().await {
            Ok(event) => Some(event),
            Err(broadcast::error::RecvError::Lagged(_)) => self.receiver.recv().await.ok(),
            Err(broadcast::error::RecvError::Closed) => None,
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

    const PUBLISH_TIMEOUT: Duration = Duration::from_secs(1);

    fn sample_detected_event(id: usize) -> Event {
        Event::FileDetected {
            candidate_id: Uuid::from_u128(id as u128 + 1),
            path: format!("/downloads/file-{id}.bin"),
        }
    }

    #[test]
    fn event_kind_matches_payload() {
        let id = Uuid::nil();
        assert_eq!(
            Event::FileDetected {
                candidate_id: id,
                path: "/downloads/a".into()
            }
            .kind(),
            "file_detected"
        );
        assert_eq!(
            Event::SettingsChanged {
                description: "download_location updated".into()
            }
            .kind(),
            "settings_changed"
        );
    }

    #[tokio::test]
    async fn sequential_ids_and_replay() {
        let bus = EventBus::with_capacity(16);

        let mut last_id = 0;
        for i in 0..5 {
            last_id = bus.publish(sample_detected_event(i));
        }
        assert_eq!(last_id, 5);

        let mut stream = bus.subscribe(Some(2));
        let mut received = Vec::new();
        for _ in 0..3 {
            if let Some(event) = stream.next().await {
                received.push(event);
            }
        }

        assert_eq!(received.len(), 3);
        assert_eq!(received.first().unwrap().id, 3);
        assert_eq!(received.last().unwrap().id, 5);
    }

    #[tokio::test]
    async fn load_test_does_not_stall_publishers() {
        let bus = Arc::new(EventBus::with_capacity(512));
        let mut stream = bus.subscribe(None);

        let publisher = {
            let bus = bus.clone();
            task::spawn(async move {
                for i in 0..500 {
                    let publish_bus = bus.clone();
                    timeout(PUBLISH_TIMEOUT, async move {
                        let _ = publish_bus.publish(sample_detected_event(i));
                    })
                    .await
                    .expect("publish timed out");
                }
            })
        };

        let consumer = task::spawn(async move {
            let mut ids = HashSet::new();
            while ids.len() < 500 {
                if let Some(event) = stream.next().await {
                    ids.insert(event.id);
                }
            }
            ids
        });

        publisher.await.expect("publisher task panicked");
        let ids = consumer.await.expect("consumer task panicked");
        assert_eq!(ids.len(), 500);
    }
}
