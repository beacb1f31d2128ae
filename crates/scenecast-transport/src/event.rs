//! Callback results delivered by [`SessionClient::service`](crate::SessionClient::service).

use serde::{Deserialize, Serialize};

use scenecast_protocol::{EventCode, PlayerNumber, WireValue};

use crate::OperationError;

/// Something the session layer reports back during `service()`.
///
/// Every asynchronous operation (connect, join, create, leave) answers
/// with exactly one `*Return` event. Room membership changes and custom
/// events from other peers arrive unprompted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClientEvent {
    /// Answer to `connect`.
    ConnectReturn(Result<(), OperationError>),
    /// The connection failed or dropped with a transport-level code.
    ConnectionError { code: i32 },
    /// Answer to `disconnect`.
    Disconnected,
    /// Answer to `leave_room`.
    LeaveRoomReturn(Result<(), OperationError>),
    /// Answer to `join_random_room`, carrying our player number on success.
    JoinRandomRoomReturn(Result<PlayerNumber, OperationError>),
    /// Answer to `join_room`.
    JoinRoomReturn(Result<PlayerNumber, OperationError>),
    /// Answer to `create_room`.
    CreateRoomReturn(Result<PlayerNumber, OperationError>),
    /// Someone (possibly us) entered the room.
    PlayerJoined {
        player: PlayerNumber,
        players: Vec<PlayerNumber>,
        is_self: bool,
    },
    /// Someone left the room.
    PlayerLeft {
        player: PlayerNumber,
        is_inactive: bool,
    },
    /// A `raise_event` from another peer in the room.
    CustomEvent {
        sender: PlayerNumber,
        code: EventCode,
        payload: WireValue,
    },
}

impl ClientEvent {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ConnectReturn(_) => "ConnectReturn",
            Self::ConnectionError { .. } => "ConnectionError",
            Self::Disconnected => "Disconnected",
            Self::LeaveRoomReturn(_) => "LeaveRoomReturn",
            Self::JoinRandomRoomReturn(_) => "JoinRandomRoomReturn",
            Self::JoinRoomReturn(_) => "JoinRoomReturn",
            Self::CreateRoomReturn(_) => "CreateRoomReturn",
            Self::PlayerJoined { .. } => "PlayerJoined",
            Self::PlayerLeft { .. } => "PlayerLeft",
            Self::CustomEvent { .. } => "CustomEvent",
        }
    }
}

/// Receives [`ClientEvent`]s during `service()`.
///
/// Any `FnMut(ClientEvent)` closure is a listener.
pub trait ClientListener {
    fn on_client_event(&mut self, event: ClientEvent);
}

impl<F: FnMut(ClientEvent)> ClientListener for F {
    fn on_client_event(&mut self, event: ClientEvent) {
        self(event)
    }
}
