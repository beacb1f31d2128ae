//! Session client abstraction for Scenecast.
//!
//! Provides the [`SessionClient`] trait the scene layer drives once per
//! frame, the [`ClientEvent`]s it reports back, and an in-memory
//! [`LoopbackHub`] implementation for demos and tests.
//!
//! The trait is deliberately synchronous and polled: operations only
//! *issue* requests, and every result comes back as a [`ClientEvent`] the
//! next time [`SessionClient::service`] runs.
//!
//! # Feature Flags
//!
//! - `loopback` (default): in-process hub connecting several clients

mod error;
mod event;
#[cfg(feature = "loopback")]
mod loopback;

pub use error::{ConnectionError, OperationError};
pub use event::{ClientEvent, ClientListener};
#[cfg(feature = "loopback")]
pub use loopback::{LoopbackClient, LoopbackHub};

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use scenecast_protocol::{EventCode, PlayerNumber, WireValue};

/// Result codes reported in [`OperationError::code`].
pub mod codes {
    /// A room with that name already exists.
    pub const GAME_ID_ALREADY_EXISTS: i32 = 0x7FFF - 1;
    /// The room has no free slot.
    pub const GAME_FULL: i32 = 0x7FFF - 2;
    /// The room is closed to new players.
    pub const GAME_CLOSED: i32 = 0x7FFF - 3;
    /// `join_random_room` found nothing to join.
    pub const NO_RANDOM_MATCH_FOUND: i32 = 0x7FFF - 7;
    /// No room with that name.
    pub const GAME_DOES_NOT_EXIST: i32 = 0x7FFF - 9;
}

pub use codes::NO_RANDOM_MATCH_FOUND;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Who a client says it is when connecting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub user_name: String,
    pub user_id: String,
}

impl Identity {
    /// Builds an identity whose id is the user name plus a random suffix,
    /// so two players picking the same name stay distinct.
    pub fn new(user_name: impl Into<String>) -> Self {
        let user_name = user_name.into();
        let suffix: [u8; 4] = rand::rng().random();
        let suffix: String = suffix.iter().map(|b| format!("{b:02x}")).collect();
        let user_id = format!("{user_name}-{suffix}");
        Self { user_name, user_id }
    }

    /// Builds an identity with an explicit id.
    pub fn with_id(user_name: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            user_name: user_name.into(),
            user_id: user_id.into(),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.user_name, self.user_id)
    }
}

// ---------------------------------------------------------------------------
// Room configuration and status
// ---------------------------------------------------------------------------

/// Clamps a requested player count into the `1..=255` range rooms allow.
pub fn clamp_max_players(requested: i64) -> u8 {
    requested.clamp(1, 255) as u8
}

/// Options for a room we create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomOptions {
    pub max_players: u8,
    pub is_open: bool,
    pub is_visible: bool,
}

impl RoomOptions {
    /// Open, visible room with `max_players` clamped to `1..=255`.
    pub fn new(max_players: i64) -> Self {
        Self {
            max_players: clamp_max_players(max_players),
            ..Self::default()
        }
    }
}

impl Default for RoomOptions {
    fn default() -> Self {
        Self {
            max_players: 2,
            is_open: true,
            is_visible: true,
        }
    }
}

/// Snapshot of the room we are in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomInfo {
    pub name: String,
    pub player_count: u32,
    pub max_players: u8,
    pub is_open: bool,
    pub is_visible: bool,
}

/// Server-wide counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyStats {
    pub peers_online: u32,
    pub peers_in_rooms: u32,
    pub room_count: u32,
}

/// Everything a scene may want to know about the session, in one value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub connected: bool,
    pub identity: Option<Identity>,
    pub room: Option<RoomInfo>,
    /// Names of visible rooms.
    pub room_names: Vec<String>,
    pub lobby: LobbyStats,
    pub local_player: Option<PlayerNumber>,
    pub is_master_client: bool,
}

impl SessionStatus {
    pub fn is_in_room(&self) -> bool {
        self.room.is_some()
    }

    pub fn user_name(&self) -> Option<&str> {
        self.identity.as_ref().map(|i| i.user_name.as_str())
    }

    pub fn user_id(&self) -> Option<&str> {
        self.identity.as_ref().map(|i| i.user_id.as_str())
    }
}

// ---------------------------------------------------------------------------
// SessionClient
// ---------------------------------------------------------------------------

/// A polled connection to a game-session service.
///
/// Methods returning `Result` only fail when the request can't be issued
/// at all (not connected, not in a room). The server's answer arrives as
/// a [`ClientEvent`] during a later [`service`](Self::service).
pub trait SessionClient {
    /// Starts connecting as `identity`. Answered by `ConnectReturn` or
    /// `ConnectionError`.
    fn connect(&mut self, identity: Identity) -> Result<(), ConnectionError>;

    /// Leaves any room and drops the connection. Answered by `Disconnected`.
    fn disconnect(&mut self);

    /// Delivers every pending [`ClientEvent`] to `listener`, in order.
    fn service(&mut self, listener: &mut dyn ClientListener);

    /// Joins any open, visible room with `max_players` slots.
    /// Fails with [`NO_RANDOM_MATCH_FOUND`] when there is none.
    fn join_random_room(&mut self, max_players: u8) -> Result<(), ConnectionError>;

    fn join_room(&mut self, name: &str, rejoin: bool) -> Result<(), ConnectionError>;

    /// Creates and joins a room. An empty name asks for a generated one.
    fn create_room(&mut self, name: &str, options: RoomOptions) -> Result<(), ConnectionError>;

    fn leave_room(&mut self) -> Result<(), ConnectionError>;

    fn set_room_open(&mut self, open: bool) -> Result<(), ConnectionError>;

    fn set_room_visible(&mut self, visible: bool) -> Result<(), ConnectionError>;

    /// Sends `payload` to every other peer in the room.
    fn raise_event(
        &mut self,
        code: EventCode,
        payload: &WireValue,
        reliable: bool,
    ) -> Result<(), ConnectionError>;

    fn status(&self) -> SessionStatus;

    /// `true` between a successful `connect` and `disconnect`.
    fn is_active(&self) -> bool;
}
