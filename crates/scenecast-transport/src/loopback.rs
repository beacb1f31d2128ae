//! In-process session service.
//!
//! A [`LoopbackHub`] plays the part of the game server: it tracks which
//! clients are connected, which rooms exist, and who is in them. Each
//! [`LoopbackClient`] has an inbox of encoded frames on the hub; nothing
//! is delivered until that client calls [`service`](SessionClient::service),
//! which mirrors how a real polled client behaves.
//!
//! ```text
//! client A ──raise_event──▶ hub ──push frame──▶ inbox(B)
//!                                                  │
//! client B ──service()────────────────────────────┘──▶ listener
//! ```
//!
//! Single-threaded by construction (`Rc<RefCell<_>>`).

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::rc::{Rc, Weak};

use rand::Rng;
use scenecast_protocol::{Codec, EventCode, JsonCodec, PlayerNumber, WireValue};

use crate::{
    ClientEvent, ClientListener, ConnectionError, Identity, LobbyStats, OperationError,
    RoomInfo, RoomOptions, SessionClient, SessionStatus, codes,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct PeerId(u64);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer-{}", self.0)
    }
}

#[derive(Default)]
struct Peer {
    identity: Option<Identity>,
    room: Option<String>,
    number: Option<PlayerNumber>,
    inbox: VecDeque<Vec<u8>>,
}

struct Room {
    options: RoomOptions,
    /// In join order; the first entry is the master client.
    members: Vec<(PeerId, PlayerNumber)>,
    next_number: i32,
}

impl Room {
    fn numbers(&self) -> Vec<PlayerNumber> {
        self.members.iter().map(|(_, n)| *n).collect()
    }

    fn is_full(&self) -> bool {
        self.members.len() >= usize::from(self.options.max_players)
    }
}

type Answer = fn(Result<PlayerNumber, OperationError>) -> ClientEvent;

#[derive(Default)]
struct HubState {
    peers: BTreeMap<PeerId, Peer>,
    rooms: BTreeMap<String, Room>,
    next_peer: u64,
    refuse_code: Option<i32>,
    codec: JsonCodec,
}

impl HubState {
    fn peer(&self, id: PeerId) -> Result<&Peer, ConnectionError> {
        self.peers.get(&id).ok_or(ConnectionError::Closed)
    }

    fn peer_mut(&mut self, id: PeerId) -> Result<&mut Peer, ConnectionError> {
        self.peers.get_mut(&id).ok_or(ConnectionError::Closed)
    }

    fn push(&mut self, to: PeerId, event: &ClientEvent) -> Result<(), ConnectionError> {
        let frame = self.codec.encode(event)?;
        self.peer_mut(to)?.inbox.push_back(frame);
        Ok(())
    }

    fn require_connected(&self, id: PeerId) -> Result<&Peer, ConnectionError> {
        let peer = self.peer(id)?;
        if peer.identity.is_none() {
            return Err(ConnectionError::NotConnected);
        }
        Ok(peer)
    }

    /// Connected and not yet in a room.
    fn require_lobby(&self, id: PeerId) -> Result<(), ConnectionError> {
        match &self.require_connected(id)?.room {
            Some(room) => Err(ConnectionError::AlreadyInRoom(room.clone())),
            None => Ok(()),
        }
    }

    fn require_room(&self, id: PeerId) -> Result<String, ConnectionError> {
        self.require_connected(id)?
            .room
            .clone()
            .ok_or(ConnectionError::NotInRoom)
    }

    /// Adds `id` to an existing room and tells everyone.
    fn enter_room(
        &mut self,
        id: PeerId,
        name: &str,
        answer: Answer,
    ) -> Result<(), ConnectionError> {
        let Some(room) = self.rooms.get_mut(name) else {
            return Err(ConnectionError::Closed);
        };
        room.next_number += 1;
        let number = PlayerNumber(room.next_number);
        room.members.push((id, number));
        let members: Vec<PeerId> = room.members.iter().map(|(p, _)| *p).collect();
        let players = room.numbers();

        let peer = self.peer_mut(id)?;
        peer.room = Some(name.to_owned());
        peer.number = Some(number);
        tracing::debug!(peer = %id, room = name, player = %number, "peer entered room");

        self.push(id, &answer(Ok(number)))?;
        for member in members {
            let joined = ClientEvent::PlayerJoined {
                player: number,
                players: players.clone(),
                is_self: member == id,
            };
            self.push(member, &joined)?;
        }
        Ok(())
    }

    /// Removes `id` from its room, tells the others, and drops the room
    /// once it's empty.
    fn exit_room(&mut self, id: PeerId) -> Result<Option<String>, ConnectionError> {
        let peer = self.peer_mut(id)?;
        let (Some(name), Some(number)) = (peer.room.take(), peer.number.take()) else {
            return Ok(None);
        };

        let mut others = Vec::new();
        if let Some(room) = self.rooms.get_mut(&name) {
            room.members.retain(|(p, _)| *p != id);
            others = room.members.iter().map(|(p, _)| *p).collect();
            if room.members.is_empty() {
                self.rooms.remove(&name);
                tracing::debug!(room = %name, "room closed");
            }
        }

        let left = ClientEvent::PlayerLeft {
            player: number,
            is_inactive: false,
        };
        for other in others {
            self.push(other, &left)?;
        }
        tracing::debug!(peer = %id, room = %name, player = %number, "peer left room");
        Ok(Some(name))
    }

    fn status(&self, id: PeerId) -> SessionStatus {
        let Some(peer) = self.peers.get(&id) else {
            return SessionStatus::default();
        };

        let room = peer.room.as_ref().and_then(|name| {
            self.rooms.get(name).map(|room| {
                (
                    RoomInfo {
                        name: name.clone(),
                        player_count: room.members.len() as u32,
                        max_players: room.options.max_players,
                        is_open: room.options.is_open,
                        is_visible: room.options.is_visible,
                    },
                    room.members.first().map(|(p, _)| *p) == Some(id),
                )
            })
        });
        let is_master_client = room.as_ref().is_some_and(|(_, master)| *master);

        SessionStatus {
            connected: peer.identity.is_some(),
            identity: peer.identity.clone(),
            room: room.map(|(info, _)| info),
            room_names: self
                .rooms
                .iter()
                .filter(|(_, r)| r.options.is_visible)
                .map(|(name, _)| name.clone())
                .collect(),
            lobby: LobbyStats {
                peers_online: self.peers.values().filter(|p| p.identity.is_some()).count() as u32,
                peers_in_rooms: self.peers.values().filter(|p| p.room.is_some()).count() as u32,
                room_count: self.rooms.len() as u32,
            },
            local_player: peer.number,
            is_master_client,
        }
    }
}

// ---------------------------------------------------------------------------
// LoopbackHub
// ---------------------------------------------------------------------------

/// The shared in-memory "server". Cheap to clone.
#[derive(Clone, Default)]
pub struct LoopbackHub {
    state: Rc<RefCell<HubState>>,
}

impl LoopbackHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new, not-yet-connected client attached to this hub.
    pub fn client(&self) -> LoopbackClient {
        let mut state = self.state.borrow_mut();
        state.next_peer += 1;
        let id = PeerId(state.next_peer);
        state.peers.insert(id, Peer::default());
        tracing::trace!(peer = %id, "loopback client attached");
        LoopbackClient {
            state: Rc::downgrade(&self.state),
            id,
        }
    }

    /// Makes every later `connect` fail with `ConnectionError { code }`.
    /// `None` accepts connections again.
    pub fn refuse_connections(&self, code: Option<i32>) {
        self.state.borrow_mut().refuse_code = code;
    }

    pub fn room_count(&self) -> usize {
        self.state.borrow().rooms.len()
    }

    /// Number of attached clients, connected or not.
    pub fn client_count(&self) -> usize {
        self.state.borrow().peers.len()
    }
}

impl fmt::Debug for LoopbackHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("LoopbackHub")
            .field("peers", &state.peers.len())
            .field("rooms", &state.rooms.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// LoopbackClient
// ---------------------------------------------------------------------------

/// One peer on a [`LoopbackHub`].
///
/// Once every hub handle is dropped, operations fail with
/// [`ConnectionError::Closed`].
pub struct LoopbackClient {
    state: Weak<RefCell<HubState>>,
    id: PeerId,
}

impl LoopbackClient {
    fn hub(&self) -> Result<Rc<RefCell<HubState>>, ConnectionError> {
        self.state.upgrade().ok_or(ConnectionError::Closed)
    }

    fn with_state<R>(
        &self,
        f: impl FnOnce(&mut HubState) -> Result<R, ConnectionError>,
    ) -> Result<R, ConnectionError> {
        let hub = self.hub()?;
        let mut state = hub.borrow_mut();
        f(&mut state)
    }
}

impl fmt::Debug for LoopbackClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopbackClient").field("id", &self.id).finish()
    }
}

impl SessionClient for LoopbackClient {
    fn connect(&mut self, identity: Identity) -> Result<(), ConnectionError> {
        let id = self.id;
        self.with_state(|state| {
            if state.peer(id)?.identity.is_some() {
                return Err(ConnectionError::AlreadyConnected);
            }
            if let Some(code) = state.refuse_code {
                tracing::warn!(peer = %id, code, "connection refused");
                return state.push(id, &ClientEvent::ConnectionError { code });
            }
            tracing::info!(peer = %id, user = %identity, "connected");
            state.peer_mut(id)?.identity = Some(identity);
            state.push(id, &ClientEvent::ConnectReturn(Ok(())))
        })
    }

    fn disconnect(&mut self) {
        let id = self.id;
        let result = self.with_state(|state| {
            if state.peer(id)?.identity.is_none() {
                return Ok(());
            }
            state.exit_room(id)?;
            state.peer_mut(id)?.identity = None;
            tracing::info!(peer = %id, "disconnected");
            state.push(id, &ClientEvent::Disconnected)
        });
        if let Err(e) = result {
            tracing::warn!(peer = %id, error = %e, "disconnect failed");
        }
    }

    fn service(&mut self, listener: &mut dyn ClientListener) {
        let Ok(hub) = self.hub() else {
            return;
        };
        // Take the frames out before calling back: the listener is free to
        // issue new operations against the hub.
        let (frames, codec) = {
            let mut state = hub.borrow_mut();
            let codec = state.codec;
            match state.peers.get_mut(&self.id) {
                Some(peer) => (std::mem::take(&mut peer.inbox), codec),
                None => return,
            }
        };
        drop(hub);

        for frame in frames {
            match codec.decode::<ClientEvent>(&frame) {
                Ok(event) => {
                    tracing::trace!(peer = %self.id, event = event.name(), "delivering event");
                    listener.on_client_event(event);
                }
                Err(e) => {
                    tracing::warn!(peer = %self.id, error = %e, "dropping undecodable frame");
                }
            }
        }
    }

    fn join_random_room(&mut self, max_players: u8) -> Result<(), ConnectionError> {
        let id = self.id;
        self.with_state(|state| {
            state.require_lobby(id)?;
            let found = state
                .rooms
                .iter()
                .find(|(_, room)| {
                    room.options.is_open
                        && room.options.is_visible
                        && room.options.max_players == max_players
                        && !room.is_full()
                })
                .map(|(name, _)| name.clone());

            match found {
                Some(name) => state.enter_room(id, &name, ClientEvent::JoinRandomRoomReturn),
                None => {
                    tracing::debug!(peer = %id, max_players, "no random match");
                    state.push(
                        id,
                        &ClientEvent::JoinRandomRoomReturn(Err(OperationError::new(
                            codes::NO_RANDOM_MATCH_FOUND,
                            "no match found",
                        ))),
                    )
                }
            }
        })
    }

    fn join_room(&mut self, name: &str, rejoin: bool) -> Result<(), ConnectionError> {
        let id = self.id;
        self.with_state(|state| {
            state.require_lobby(id)?;
            let refusal = match state.rooms.get(name) {
                None => Some(OperationError::new(
                    codes::GAME_DOES_NOT_EXIST,
                    "room does not exist",
                )),
                Some(room) if !room.options.is_open => {
                    Some(OperationError::new(codes::GAME_CLOSED, "room is closed"))
                }
                Some(room) if room.is_full() => {
                    Some(OperationError::new(codes::GAME_FULL, "room is full"))
                }
                Some(_) => None,
            };
            match refusal {
                Some(err) => {
                    tracing::debug!(peer = %id, room = name, rejoin, error = %err, "join refused");
                    state.push(id, &ClientEvent::JoinRoomReturn(Err(err)))
                }
                None => state.enter_room(id, name, ClientEvent::JoinRoomReturn),
            }
        })
    }

    fn create_room(&mut self, name: &str, options: RoomOptions) -> Result<(), ConnectionError> {
        let id = self.id;
        self.with_state(|state| {
            state.require_lobby(id)?;
            let name = if name.is_empty() {
                let n: u32 = rand::rng().random();
                format!("room-{n:08x}")
            } else {
                name.to_owned()
            };
            if state.rooms.contains_key(&name) {
                return state.push(
                    id,
                    &ClientEvent::CreateRoomReturn(Err(OperationError::new(
                        codes::GAME_ID_ALREADY_EXISTS,
                        "room already exists",
                    ))),
                );
            }
            let options = RoomOptions {
                max_players: options.max_players.max(1),
                ..options
            };
            state.rooms.insert(
                name.clone(),
                Room {
                    options,
                    members: Vec::new(),
                    next_number: 0,
                },
            );
            tracing::info!(
                peer = %id,
                room = %name,
                max_players = options.max_players,
                "room created"
            );
            state.enter_room(id, &name, ClientEvent::CreateRoomReturn)
        })
    }

    fn leave_room(&mut self) -> Result<(), ConnectionError> {
        let id = self.id;
        self.with_state(|state| {
            state.require_room(id)?;
            state.exit_room(id)?;
            state.push(id, &ClientEvent::LeaveRoomReturn(Ok(())))
        })
    }

    fn set_room_open(&mut self, open: bool) -> Result<(), ConnectionError> {
        let id = self.id;
        self.with_state(|state| {
            let name = state.require_room(id)?;
            if let Some(room) = state.rooms.get_mut(&name) {
                room.options.is_open = open;
            }
            Ok(())
        })
    }

    fn set_room_visible(&mut self, visible: bool) -> Result<(), ConnectionError> {
        let id = self.id;
        self.with_state(|state| {
            let name = state.require_room(id)?;
            if let Some(room) = state.rooms.get_mut(&name) {
                room.options.is_visible = visible;
            }
            Ok(())
        })
    }

    fn raise_event(
        &mut self,
        code: EventCode,
        payload: &WireValue,
        reliable: bool,
    ) -> Result<(), ConnectionError> {
        let id = self.id;
        self.with_state(|state| {
            let name = state.require_room(id)?;
            let sender = state.peer(id)?.number.ok_or(ConnectionError::NotInRoom)?;
            let others: Vec<PeerId> = state
                .rooms
                .get(&name)
                .map(|room| {
                    room.members
                        .iter()
                        .map(|(p, _)| *p)
                        .filter(|p| *p != id)
                        .collect()
                })
                .unwrap_or_default();

            let event = ClientEvent::CustomEvent {
                sender,
                code,
                payload: payload.clone(),
            };
            tracing::trace!(peer = %id, %code, reliable, recipients = others.len(), "event raised");
            for other in others {
                state.push(other, &event)?;
            }
            Ok(())
        })
    }

    fn status(&self) -> SessionStatus {
        match self.hub() {
            Ok(hub) => hub.borrow().status(self.id),
            Err(_) => SessionStatus::default(),
        }
    }

    fn is_active(&self) -> bool {
        self.hub()
            .map(|hub| {
                hub.borrow()
                    .peers
                    .get(&self.id)
                    .is_some_and(|p| p.identity.is_some())
            })
            .unwrap_or(false)
    }
}

impl Drop for LoopbackClient {
    fn drop(&mut self) {
        let Some(hub) = self.state.upgrade() else {
            return;
        };
        let Ok(mut state) = hub.try_borrow_mut() else {
            return;
        };
        if let Err(e) = state.exit_room(self.id) {
            tracing::warn!(peer = %self.id, error = %e, "failed to leave room on drop");
        }
        state.peers.remove(&self.id);
        tracing::trace!(peer = %self.id, "loopback client detached");
    }
}
