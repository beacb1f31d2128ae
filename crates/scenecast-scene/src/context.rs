//! What a scene can see and do during one call.
//!
//! Scenes never touch the manager directly. Each update, draw-independent
//! callback, and factory call receives a [`SceneContext`] that exposes
//! read access to the session snapshot, the registry, and shared data,
//! and *queues* requests (scene changes, session operations). The manager
//! applies the queue in order at the end of the update step, once every
//! scene call of that step has returned.

use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;
use std::time::Duration;

use scenecast_protocol::{
    CodecError, CustomType, EventCode, EventCodec, Scalar, Sequence, TypeRegistry, WireValue,
};
use scenecast_transport::{Identity, RoomOptions, SessionStatus, clamp_max_players};

use crate::config::duration_ms;
use crate::{Rgba, Scene, SceneError};

/// Builds a scene. Receives a context whose [`state`](SceneContext::state)
/// is the key being built.
pub(crate) type SceneFactory<S, D> =
    Box<dyn Fn(&mut SceneContext<'_, S, D>) -> Result<Box<dyn Scene<S, D>>, SceneError>>;

/// Registered factories plus the implicit default state.
pub(crate) struct SceneTable<S, D> {
    pub(crate) factories: HashMap<S, SceneFactory<S, D>>,
    pub(crate) first: Option<S>,
}

impl<S: Eq + Hash, D> SceneTable<S, D> {
    pub(crate) fn new() -> Self {
        Self {
            factories: HashMap::new(),
            first: None,
        }
    }

    pub(crate) fn contains(&self, state: &S) -> bool {
        self.factories.contains_key(state)
    }
}

/// Session requests queued by scenes.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SessionCommand {
    Connect(Identity),
    Disconnect,
    JoinRandomRoom(u8),
    JoinRoom { name: String, rejoin: bool },
    CreateRoom { name: String, options: RoomOptions },
    LeaveRoom,
    SetRoomOpen(bool),
    SetRoomVisible(bool),
    RaiseEvent { code: EventCode, payload: WireValue, reliable: bool },
}

impl SessionCommand {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::Connect(_) => "connect",
            Self::Disconnect => "disconnect",
            Self::JoinRandomRoom(_) => "join_random_room",
            Self::JoinRoom { .. } => "join_room",
            Self::CreateRoom { .. } => "create_room",
            Self::LeaveRoom => "leave_room",
            Self::SetRoomOpen(_) => "set_room_open",
            Self::SetRoomVisible(_) => "set_room_visible",
            Self::RaiseEvent { .. } => "raise_event",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SceneCommand<S> {
    ChangeScene {
        state: S,
        duration_ms: i64,
        cross_fade: bool,
    },
    Session(SessionCommand),
}

/// Manager-owned state that scenes may read or queue against.
pub(crate) struct SceneEnv<S, D> {
    pub(crate) data: Rc<RefCell<D>>,
    pub(crate) registry: TypeRegistry,
    pub(crate) status: SessionStatus,
    pub(crate) commands: Vec<SceneCommand<S>>,
    pub(crate) halted: bool,
    pub(crate) fade_color: Rgba,
    pub(crate) default_transition: Duration,
}

// ---------------------------------------------------------------------------
// SceneContext
// ---------------------------------------------------------------------------

/// Handed to every scene call.
pub struct SceneContext<'a, S, D = ()> {
    state: &'a S,
    scenes: &'a SceneTable<S, D>,
    env: &'a mut SceneEnv<S, D>,
}

impl<'a, S, D> SceneContext<'a, S, D>
where
    S: Clone + Eq + Hash + fmt::Debug,
{
    pub(crate) fn new(
        state: &'a S,
        scenes: &'a SceneTable<S, D>,
        env: &'a mut SceneEnv<S, D>,
    ) -> Self {
        Self { state, scenes, env }
    }

    /// The state key of the scene being called.
    pub fn state(&self) -> &S {
        self.state
    }

    /// Returns `true` if a factory is registered for `state`.
    pub fn has_scene(&self, state: &S) -> bool {
        self.scenes.contains(state)
    }

    // -----------------------------------------------------------------------
    // Scene control
    // -----------------------------------------------------------------------

    /// Requests a transition to `state`, applied at the end of the current
    /// update step.
    ///
    /// # Errors
    /// [`SceneError::UnknownState`] if nothing is registered for `state`.
    /// Nothing is queued in that case.
    pub fn change_scene(
        &mut self,
        state: S,
        duration_ms: i64,
        cross_fade: bool,
    ) -> Result<(), SceneError> {
        if !self.scenes.contains(&state) {
            return Err(SceneError::UnknownState(format!("{state:?}")));
        }
        self.env.commands.push(SceneCommand::ChangeScene {
            state,
            duration_ms,
            cross_fade,
        });
        Ok(())
    }

    /// [`change_scene`](Self::change_scene) taking a `Duration`.
    pub fn change_scene_after(
        &mut self,
        state: S,
        duration: Duration,
        cross_fade: bool,
    ) -> Result<(), SceneError> {
        self.change_scene(state, duration_ms(duration), cross_fade)
    }

    /// Plain fade using the configured default duration.
    pub fn change_scene_default(&mut self, state: S) -> Result<(), SceneError> {
        let duration = self.env.default_transition;
        self.change_scene_after(state, duration, false)
    }

    /// Sets the sticky error flag. The manager halts after this call.
    pub fn notify_error(&mut self) {
        if !self.env.halted {
            tracing::warn!(state = ?self.state, "scene reported an error");
        }
        self.env.halted = true;
    }

    pub fn is_halted(&self) -> bool {
        self.env.halted
    }

    pub fn fade_color(&self) -> Rgba {
        self.env.fade_color
    }

    // -----------------------------------------------------------------------
    // Shared state
    // -----------------------------------------------------------------------

    pub fn registry(&self) -> &TypeRegistry {
        &self.env.registry
    }

    pub fn registry_mut(&mut self) -> &mut TypeRegistry {
        &mut self.env.registry
    }

    /// Borrows the shared session data.
    ///
    /// # Panics
    /// If the data is already mutably borrowed (e.g. a `data_mut` guard is
    /// still alive).
    pub fn data(&self) -> Ref<'_, D> {
        self.env.data.borrow()
    }

    /// Mutably borrows the shared session data.
    ///
    /// # Panics
    /// If the data is already borrowed.
    pub fn data_mut(&self) -> RefMut<'_, D> {
        self.env.data.borrow_mut()
    }

    pub fn shared_data(&self) -> Rc<RefCell<D>> {
        Rc::clone(&self.env.data)
    }

    /// Snapshot of the session, refreshed before every tick.
    pub fn status(&self) -> &SessionStatus {
        &self.env.status
    }

    // -----------------------------------------------------------------------
    // Session operations (deferred)
    // -----------------------------------------------------------------------

    fn queue(&mut self, command: SessionCommand) {
        tracing::trace!(state = ?self.state, command = command.name(), "session command queued");
        self.env.commands.push(SceneCommand::Session(command));
    }

    /// Starts networking as `identity`.
    pub fn connect(&mut self, identity: Identity) {
        self.queue(SessionCommand::Connect(identity));
    }

    pub fn disconnect(&mut self) {
        self.queue(SessionCommand::Disconnect);
    }

    /// `max_players` is clamped to `1..=255`.
    pub fn join_random_room(&mut self, max_players: i64) {
        self.queue(SessionCommand::JoinRandomRoom(clamp_max_players(max_players)));
    }

    pub fn join_room(&mut self, name: impl Into<String>, rejoin: bool) {
        self.queue(SessionCommand::JoinRoom {
            name: name.into(),
            rejoin,
        });
    }

    /// Creates an open, visible room; `max_players` is clamped to `1..=255`.
    /// An empty name asks the service to generate one.
    pub fn create_room(&mut self, name: impl Into<String>, max_players: i64) {
        self.create_room_with(name, RoomOptions::new(max_players));
    }

    pub fn create_room_with(&mut self, name: impl Into<String>, options: RoomOptions) {
        self.queue(SessionCommand::CreateRoom {
            name: name.into(),
            options,
        });
    }

    pub fn leave_room(&mut self) {
        self.queue(SessionCommand::LeaveRoom);
    }

    pub fn set_room_open(&mut self, open: bool) {
        self.queue(SessionCommand::SetRoomOpen(open));
    }

    pub fn set_room_visible(&mut self, visible: bool) {
        self.queue(SessionCommand::SetRoomVisible(visible));
    }

    /// Sends an already-encoded payload to the other peers in the room.
    pub fn raise_event(&mut self, code: EventCode, payload: WireValue) {
        self.queue(SessionCommand::RaiseEvent {
            code,
            payload,
            reliable: true,
        });
    }

    pub fn raise_scalar(&mut self, code: EventCode, value: impl Into<Scalar>) {
        let payload = EventCodec::new(&self.env.registry).encode_scalar(&value.into());
        self.raise_event(code, payload);
    }

    /// Encodes `value` with its registered tag and sends it.
    ///
    /// # Errors
    /// [`CodecError::UnboundType`] if `T` is not registered. Nothing is sent.
    pub fn raise_custom<T: CustomType>(
        &mut self,
        code: EventCode,
        value: &T,
    ) -> Result<(), CodecError> {
        let payload = EventCodec::new(&self.env.registry).encode_value(value)?;
        self.raise_event(code, payload);
        Ok(())
    }

    pub fn raise_array(&mut self, code: EventCode, values: &Sequence) -> Result<(), CodecError> {
        let payload = EventCodec::new(&self.env.registry)
            .encode_array(values)?
            .to_wire()?;
        self.raise_event(code, payload);
        Ok(())
    }

    /// # Errors
    /// [`CodecError::DimensionMismatch`] if `values.len() != width * height`.
    pub fn raise_grid(
        &mut self,
        code: EventCode,
        width: u32,
        height: u32,
        values: &Sequence,
    ) -> Result<(), CodecError> {
        let payload = EventCodec::new(&self.env.registry)
            .encode_grid(width, height, values)?
            .to_wire()?;
        self.raise_event(code, payload);
        Ok(())
    }
}
