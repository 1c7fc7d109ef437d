//! Relay hub: the set of live sessions and the fan-out between them.
//!
//! DESIGN
//! ======
//! The hub never decodes a payload. Whatever a session sends, text or
//! binary, is handed to every other session byte for byte. The hub keeps no
//! canvas state, so a session that joins late sees only what is sent after
//! it connected.
//!
//! Each session owns a bounded outbound queue. Fan-out uses `try_send` under
//! a read lock: a peer whose queue is full or closed loses that one message
//! and the sender is never slowed down. The loss is logged and counted in
//! the returned [`FanOut`].

#[cfg(test)]
#[path = "hub_test.rs"]
mod hub_test;

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::ws::{Message, Utf8Bytes};
use serde::Deserialize;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{RwLock, mpsc};
use tracing::warn;
use uuid::Uuid;

/// Opaque id of one connected session.
pub type SessionId = Uuid;

// =============================================================================
// MESSAGES
// =============================================================================

/// One message as received from a session, forwarded unchanged.
#[derive(Debug, Clone)]
pub enum Relayed {
    Text(Utf8Bytes),
    Binary(Bytes),
}

#[derive(Deserialize)]
struct TypeOnly {
    #[serde(rename = "type")]
    event_type: String,
}

impl Relayed {
    /// Event type name for logging, read without validating the payload.
    #[must_use]
    pub fn event_type(&self) -> Option<String> {
        match self {
            Self::Binary(bytes) => frames::peek_event_type(bytes),
            Self::Text(text) => match serde_json::from_str::<TypeOnly>(text.as_str()) {
                Ok(peek) => Some(peek.event_type),
                Err(_) => None,
            },
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.as_str().len(),
            Self::Binary(bytes) => bytes.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Relayed> for Message {
    fn from(relayed: Relayed) -> Self {
        match relayed {
            Relayed::Text(text) => Message::Text(text),
            Relayed::Binary(bytes) => Message::Binary(bytes),
        }
    }
}

/// Outcome of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOut {
    pub delivered: usize,
    pub dropped: usize,
}

// =============================================================================
// HUB
// =============================================================================

/// Live sessions keyed by id. Cheap to clone; clones share the same set.
#[derive(Clone)]
pub struct Hub {
    sessions: Arc<RwLock<HashMap<SessionId, mpsc::Sender<Relayed>>>>,
    queue_capacity: usize,
}

impl Hub {
    /// Create a hub whose sessions buffer up to `queue_capacity` messages.
    /// A capacity of zero is raised to one.
    #[must_use]
    pub fn new(queue_capacity: usize) -> Self {
        Self { sessions: Arc::new(RwLock::new(HashMap::new())), queue_capacity: queue_capacity.max(1) }
    }

    /// Register a new session. The receiver yields what peers send.
    pub async fn connect(&self) -> (SessionId, mpsc::Receiver<Relayed>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        self.sessions.write().await.insert(id, tx);
        (id, rx)
    }

    /// Remove a session. Returns `false` if it was not registered.
    pub async fn disconnect(&self, id: SessionId) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Send `msg` to every session except `origin`.
    pub async fn broadcast(&self, origin: SessionId, msg: &Relayed) -> FanOut {
        let sessions = self.sessions.read().await;
        let mut fan_out = FanOut::default();
        for (peer, tx) in sessions.iter() {
            if *peer == origin {
                continue;
            }
            match tx.try_send(msg.clone()) {
                Ok(()) => fan_out.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    fan_out.dropped += 1;
                    warn!(%origin, %peer, "hub: peer queue full, message dropped");
                }
                Err(TrySendError::Closed(_)) => {
                    fan_out.dropped += 1;
                    warn!(%origin, %peer, "hub: peer queue closed, message dropped");
                }
            }
        }
        fan_out
    }
}
