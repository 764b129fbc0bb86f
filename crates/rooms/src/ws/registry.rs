//! WebSocket connection registry
//!
//! Maps each user to the mailbox of their live session actor. One connection
//! per user: a new connect replaces the previous mapping.

use actix::Recipient;
use dashmap::DashMap;
use uuid::Uuid;

use crate::protocol::ServerMessage;

/// Unique identifier for a WebSocket connection
pub type ConnectionId = Uuid;

/// Outbound text frame for a WebSocket session actor
#[derive(Debug, Clone, actix::Message)]
#[rtype(result = "()")]
pub struct OutboundFrame(pub String);

struct ConnectionEntry {
    conn_id: ConnectionId,
    recipient: Recipient<OutboundFrame>,
}

/// Registry for live user connections
pub struct ConnectionRegistry {
    connections: DashMap<String, ConnectionEntry>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    /// Register a connection for a user, replacing any prior mapping.
    ///
    /// The prior session actor, if any, is not closed here; it tears itself
    /// down through its own lifecycle.
    pub fn connect(&self, user_id: &str, recipient: Recipient<OutboundFrame>) -> ConnectionId {
        let conn_id = Uuid::new_v4();
        let replaced = self
            .connections
            .insert(
                user_id.to_string(),
                ConnectionEntry { conn_id, recipient },
            )
            .is_some();

        if replaced {
            tracing::info!("Replaced existing connection for user {}", user_id);
        } else {
            tracing::info!("Registered connection {} for user {}", conn_id, user_id);
        }

        conn_id
    }

    /// Remove the mapping for a user. Returns false when none existed.
    pub fn disconnect(&self, user_id: &str) -> bool {
        self.connections.remove(user_id).is_some()
    }

    /// Remove the mapping only if it still belongs to the given connection.
    ///
    /// Session actors use this on shutdown so a stale actor cannot evict the
    /// replacement connection of the same user.
    pub fn disconnect_if_current(&self, user_id: &str, conn_id: ConnectionId) -> bool {
        self.connections
            .remove_if(user_id, |_, entry| entry.conn_id == conn_id)
            .is_some()
    }

    pub fn is_connected(&self, user_id: &str) -> bool {
        self.connections.contains_key(user_id)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Serialize and deliver a message to a user's session mailbox.
    ///
    /// `Err(SendError::Closed)` means the mailbox is gone or refuses the frame;
    /// callers must treat that as a dead connection and run disconnect cleanup.
    pub fn send_to(&self, user_id: &str, message: &ServerMessage) -> Result<(), SendError> {
        let json = message
            .to_json()
            .map_err(|e| SendError::Serialization(e.to_string()))?;

        match self.connections.get(user_id) {
            Some(entry) => entry
                .recipient
                .try_send(OutboundFrame(json))
                .map_err(|e| SendError::Closed(e.to_string())),
            None => Err(SendError::NotConnected),
        }
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Delivery errors
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("user has no live connection")]
    NotConnected,

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("connection closed or unresponsive: {0}")]
    Closed(String),
}
