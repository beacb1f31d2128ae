use serde::{Deserialize, Serialize};

use scenecast_protocol::ProtocolError;

/// Errors raised when a session operation can't even be issued.
///
/// Failures the *server* reports (room full, no random match) arrive later
/// as an [`OperationError`] inside a [`ClientEvent`](crate::ClientEvent).
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// The operation needs an active connection.
    #[error("not connected")]
    NotConnected,

    /// `connect` was called on an active client.
    #[error("already connected")]
    AlreadyConnected,

    /// The operation needs the client to be inside a room.
    #[error("not in a room")]
    NotInRoom,

    /// Joining or creating a room while already inside one.
    #[error("already in room {0:?}")]
    AlreadyInRoom(String),

    /// The transport behind this client is gone.
    #[error("transport closed")]
    Closed,

    /// A frame could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// A room operation the server refused. Never retried automatically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("operation failed with code {code}: {message}")]
pub struct OperationError {
    pub code: i32,
    pub message: String,
}

impl OperationError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}
