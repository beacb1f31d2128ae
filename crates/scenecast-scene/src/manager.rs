//! The scene transition manager: a tick-driven state machine over scene
//! factories.
//!
//! One call to [`tick`](SceneTransitionManager::tick) per frame does
//! everything:
//!
//! ```text
//! tick(canvas)
//!  ├─ update_scene()
//!  │   ├─ halted? → Err(Halted), forever
//!  │   ├─ no scene yet → init(default)
//!  │   ├─ at most one phase change (leg expired)
//!  │   ├─ scene.update_fade_in / update / update_fade_out
//!  │   ├─ apply queued commands
//!  │   └─ Active only: session.service() → SessionHandler callbacks
//!  └─ render(canvas)
//! ```
//!
//! A plain change fades the current scene out over half the requested
//! time, builds the next one, and fades it in over the other half. A
//! crossfade builds the next scene up front and runs both legs at once
//! over the full time.

use std::cell::RefCell;
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;
use std::time::Duration;

use scenecast_protocol::{EventDispatcher, TypeRegistry};
use scenecast_transport::{ClientEvent, ClientListener, SessionClient, SessionStatus};

use crate::config::duration_ms;
use crate::context::{SceneCommand, SceneEnv, SceneFactory, SceneTable, SessionCommand};
use crate::{
    Canvas, Rgba, Scene, SceneContext, SceneError, Stopwatch, TransitionConfig, TransitionPhase,
};

/// Which scene slot a call goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Current,
    Next,
}

/// Drives scenes through fade / crossfade transitions and services the
/// session underneath.
///
/// `S` is the state key (usually a small `enum`), `D` the data shared by
/// all scenes.
pub struct SceneTransitionManager<S, D = ()> {
    scenes: SceneTable<S, D>,
    env: SceneEnv<S, D>,

    session: Option<Box<dyn SessionClient>>,
    /// Set once a connect request goes out; cleared on disconnect or
    /// connection error. `service()` only runs while this is set.
    networking: bool,

    current: Option<Box<dyn Scene<S, D>>>,
    /// Only populated during a crossfade.
    next: Option<Box<dyn Scene<S, D>>>,
    current_state: Option<S>,
    next_state: Option<S>,
    /// State of the outgoing scene while a crossfade runs.
    outgoing_state: Option<S>,

    phase: TransitionPhase,
    stopwatch: Stopwatch,
    transition_ms: i64,
    cross_fade: bool,
}

impl<S, D> SceneTransitionManager<S, D>
where
    S: Clone + Eq + Hash + fmt::Debug + 'static,
    D: 'static,
{
    /// Creates a manager owning `data`, with default timing.
    pub fn new(data: D) -> Self {
        Self::with_config(data, TransitionConfig::default())
    }

    pub fn with_config(data: D, config: TransitionConfig) -> Self {
        Self::with_shared(Rc::new(RefCell::new(data)), config)
    }

    /// Creates a manager around data the caller keeps a handle to.
    pub fn with_shared(data: Rc<RefCell<D>>, config: TransitionConfig) -> Self {
        Self {
            scenes: SceneTable::new(),
            env: SceneEnv {
                data,
                registry: TypeRegistry::with_geometry(),
                status: SessionStatus::default(),
                commands: Vec::new(),
                halted: false,
                fade_color: config.fade_color,
                default_transition: config.default_transition,
            },
            session: None,
            networking: false,
            current: None,
            next: None,
            current_state: None,
            next_state: None,
            outgoing_state: None,
            phase: TransitionPhase::Uninitialized,
            stopwatch: Stopwatch::new(),
            transition_ms: duration_ms(config.initial_transition),
            cross_fade: false,
        }
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Registers an infallible factory for `state`.
    ///
    /// Re-adding a state replaces its factory. The first state ever added
    /// is the default used when ticking without an explicit `init`.
    pub fn add<T, F>(&mut self, state: S, factory: F) -> &mut Self
    where
        T: Scene<S, D> + 'static,
        F: Fn(&mut SceneContext<'_, S, D>) -> T + 'static,
    {
        self.insert_factory(
            state,
            Box::new(move |ctx: &mut SceneContext<'_, S, D>| {
                Ok(Box::new(factory(ctx)) as Box<dyn Scene<S, D>>)
            }),
        )
    }

    /// Registers a factory that may fail. A failure halts the manager.
    pub fn try_add<T, E, F>(&mut self, state: S, factory: F) -> &mut Self
    where
        T: Scene<S, D> + 'static,
        E: fmt::Display,
        F: Fn(&mut SceneContext<'_, S, D>) -> Result<T, E> + 'static,
    {
        self.insert_factory(
            state,
            Box::new(move |ctx: &mut SceneContext<'_, S, D>| match factory(ctx) {
                Ok(scene) => Ok(Box::new(scene) as Box<dyn Scene<S, D>>),
                Err(e) => Err(SceneError::Factory {
                    state: format!("{:?}", ctx.state()),
                    reason: e.to_string(),
                }),
            }),
        )
    }

    fn insert_factory(&mut self, state: S, factory: SceneFactory<S, D>) -> &mut Self {
        if self.scenes.first.is_none() {
            self.scenes.first = Some(state.clone());
        }
        if self.scenes.factories.insert(state.clone(), factory).is_some() {
            tracing::debug!(?state, "scene factory replaced");
        } else {
            tracing::debug!(?state, "scene factory added");
        }
        self
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Builds the first scene and starts its fade-in.
    ///
    /// # Errors
    /// - [`SceneError::AlreadyInitialized`] if a scene exists (nothing changes).
    /// - [`SceneError::UnknownState`] if `state` has no factory.
    /// - [`SceneError::Factory`] if the factory fails (the manager halts).
    pub fn init(&mut self, state: S) -> Result<(), SceneError> {
        self.init_scene(state)?;
        self.flush();
        Ok(())
    }

    fn init_scene(&mut self, state: S) -> Result<(), SceneError> {
        if self.current.is_some() {
            return Err(SceneError::AlreadyInitialized);
        }
        if !self.scenes.contains(&state) {
            return Err(SceneError::UnknownState(format!("{state:?}")));
        }
        let scene = self.build(&state)?;
        tracing::info!(?state, "scene manager initialized");
        self.current = Some(scene);
        self.current_state = Some(state);
        self.phase = TransitionPhase::FadeIn;
        self.stopwatch.restart();
        Ok(())
    }

    /// Advances one tick: at most one phase change, one scene update, and
    /// (while active) one session service.
    ///
    /// # Errors
    /// [`SceneError::Halted`] once the sticky error flag is set, and on
    /// every call after that.
    pub fn update_scene(&mut self) -> Result<(), SceneError> {
        if self.env.halted {
            return Err(SceneError::Halted);
        }
        self.refresh_status();

        if self.current.is_none() {
            // A change requested before the first scene names the one to build.
            let Some(first) = self.next_state.take().or_else(|| self.scenes.first.clone()) else {
                return Ok(());
            };
            self.init(first)?;
        }

        if self.cross_fade {
            self.update_cross()?;
        } else {
            self.update_single()?;
        }

        if self.env.halted {
            return Err(SceneError::Halted);
        }
        Ok(())
    }

    fn update_single(&mut self) -> Result<(), SceneError> {
        let mut elapsed = self.stopwatch.elapsed_ms();

        if self.phase == TransitionPhase::FadeOut && elapsed >= self.transition_ms as f64 {
            let next_state = self
                .next_state
                .clone()
                .ok_or(SceneError::InconsistentPhase(self.phase))?;
            // The outgoing scene is gone before the incoming one is built.
            self.current = None;
            let scene = self.build(&next_state)?;
            tracing::debug!(state = ?next_state, "fade-out finished, scene swapped");
            self.current = Some(scene);
            self.current_state = Some(next_state);
            self.phase = TransitionPhase::FadeIn;
            self.stopwatch.restart();
            elapsed = 0.0;
        }

        if self.phase == TransitionPhase::FadeIn && elapsed >= self.transition_ms as f64 {
            self.stopwatch.reset();
            self.phase = TransitionPhase::Active;
            tracing::debug!(state = ?self.current_state, "scene active");
        }

        let t = self.progress(elapsed);
        match self.phase {
            TransitionPhase::FadeIn => {
                self.call(Slot::Current, |scene, ctx| scene.update_fade_in(ctx, t))?
            }
            TransitionPhase::Active => self.call(Slot::Current, |scene, ctx| scene.update(ctx))?,
            TransitionPhase::FadeOut => {
                self.call(Slot::Current, |scene, ctx| scene.update_fade_out(ctx, t))?
            }
            phase @ (TransitionPhase::Uninitialized | TransitionPhase::FadeInOut) => {
                tracing::error!(%phase, "inconsistent phase for a plain transition");
                self.env.halted = true;
                return Err(SceneError::InconsistentPhase(phase));
            }
        }
        self.flush();
        self.service_session();
        Ok(())
    }

    fn update_cross(&mut self) -> Result<(), SceneError> {
        let elapsed = self.stopwatch.elapsed_ms();

        if self.phase == TransitionPhase::FadeInOut && elapsed >= self.transition_ms as f64 {
            let next = self
                .next
                .take()
                .ok_or(SceneError::InconsistentPhase(self.phase))?;
            self.current = Some(next);
            self.outgoing_state = None;
            self.stopwatch.reset();
            self.phase = TransitionPhase::Active;
            tracing::debug!(state = ?self.current_state, "crossfade finished");
        }

        match self.phase {
            TransitionPhase::Active => self.call(Slot::Current, |scene, ctx| scene.update(ctx))?,
            TransitionPhase::FadeInOut => {
                let t = self.progress(elapsed);
                self.call(Slot::Current, |scene, ctx| scene.update_fade_out(ctx, t))?;
                if !self.env.halted {
                    self.call(Slot::Next, |scene, ctx| scene.update_fade_in(ctx, t))?;
                }
            }
            phase => {
                tracing::error!(%phase, "inconsistent phase for a crossfade");
                self.env.halted = true;
                return Err(SceneError::InconsistentPhase(phase));
            }
        }
        // Both legs see the same phase; whatever they queued lands after.
        self.flush();
        self.service_session();
        Ok(())
    }

    /// Draws the current scene (and, while crossfading, the next one).
    pub fn render(&self, canvas: &mut dyn Canvas) {
        let Some(current) = self.current.as_deref() else {
            return;
        };
        let fade = self.env.fade_color;

        if self.phase == TransitionPhase::Active || self.transition_ms <= 0 {
            current.draw(canvas);
            return;
        }

        let t = self.progress(self.stopwatch.elapsed_ms());
        match self.phase {
            TransitionPhase::FadeIn => current.draw_fade_in(canvas, fade, t),
            TransitionPhase::FadeOut => current.draw_fade_out(canvas, fade, t),
            TransitionPhase::FadeInOut => {
                current.draw_fade_out(canvas, fade, t);
                if let Some(next) = self.next.as_deref() {
                    next.draw_fade_in(canvas, fade, t);
                }
            }
            TransitionPhase::Uninitialized | TransitionPhase::Active => current.draw(canvas),
        }
    }

    /// [`update_scene`](Self::update_scene) then [`render`](Self::render).
    /// Nothing is drawn if the update fails.
    pub fn tick(&mut self, canvas: &mut dyn Canvas) -> Result<(), SceneError> {
        self.update_scene()?;
        self.render(canvas);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Scene changes
    // -----------------------------------------------------------------------

    /// Starts a transition to `state`.
    ///
    /// Changing to the scene that is already current is always a plain
    /// fade. A plain fade spends `duration_ms / 2` on each leg; a crossfade
    /// builds the next scene now and runs for the full `duration_ms`.
    ///
    /// Before any scene exists there is nothing to fade out: the request
    /// becomes a plain fade, and the next tick builds `state` instead of
    /// the default scene.
    ///
    /// # Errors
    /// [`SceneError::UnknownState`] if `state` has no factory; nothing
    /// changes. [`SceneError::Factory`] if a crossfade's factory fails.
    pub fn change_scene(
        &mut self,
        state: S,
        duration_ms: i64,
        cross_fade: bool,
    ) -> Result<(), SceneError> {
        self.start_transition(state, duration_ms, cross_fade)?;
        self.flush();
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
        self.change_scene_after(state, self.env.default_transition, false)
    }

    fn start_transition(
        &mut self,
        state: S,
        duration_ms: i64,
        cross_fade: bool,
    ) -> Result<(), SceneError> {
        if !self.scenes.contains(&state) {
            return Err(SceneError::UnknownState(format!("{state:?}")));
        }
        let cross_fade = cross_fade
            && self.current.is_some()
            && self.current_state.as_ref() != Some(&state);

        if cross_fade {
            let next = self.build(&state)?;
            self.next = Some(next);
            self.transition_ms = duration_ms;
            self.phase = TransitionPhase::FadeInOut;
            let outgoing = self.current_state.replace(state.clone());
            if self.outgoing_state.is_none() {
                self.outgoing_state = outgoing;
            }
        } else {
            // An abandoned crossfade hands the key back to the scene still
            // on screen.
            self.next = None;
            if let Some(outgoing) = self.outgoing_state.take() {
                self.current_state = Some(outgoing);
            }
            self.transition_ms = duration_ms / 2;
            self.phase = TransitionPhase::FadeOut;
        }
        self.stopwatch.restart();
        self.cross_fade = cross_fade;
        tracing::debug!(?state, duration_ms, cross_fade, "scene change started");
        self.next_state = Some(state);
        Ok(())
    }

    /// Sets the sticky error flag. Every later tick fails.
    pub fn notify_error(&mut self) {
        if !self.env.halted {
            tracing::warn!(state = ?self.current_state, "scene manager halted");
        }
        self.env.halted = true;
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn phase(&self) -> TransitionPhase {
        self.phase
    }

    pub fn current_state(&self) -> Option<&S> {
        self.current_state.as_ref()
    }

    pub fn is_halted(&self) -> bool {
        self.env.halted
    }

    /// Whether a crossfade is (or was last) in effect.
    pub fn is_cross_fade(&self) -> bool {
        self.cross_fade
    }

    /// Length of the current fade leg in milliseconds.
    pub fn transition_ms(&self) -> i64 {
        self.transition_ms
    }

    pub fn fade_color(&self) -> Rgba {
        self.env.fade_color
    }

    pub fn set_fade_color(&mut self, color: Rgba) {
        self.env.fade_color = color;
    }

    pub fn shared_data(&self) -> Rc<RefCell<D>> {
        Rc::clone(&self.env.data)
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.env.registry
    }

    pub fn registry_mut(&mut self) -> &mut TypeRegistry {
        &mut self.env.registry
    }

    // -----------------------------------------------------------------------
    // Session
    // -----------------------------------------------------------------------

    /// Attaches the session client the scenes will drive. Replaces (and
    /// disconnects) any previous one.
    pub fn attach_session(&mut self, client: impl SessionClient + 'static) {
        self.disconnect_session();
        self.session = Some(Box::new(client));
        self.refresh_status();
    }

    pub fn session(&self) -> Option<&dyn SessionClient> {
        self.session.as_deref()
    }

    pub fn session_mut(&mut self) -> Option<&mut (dyn SessionClient + 'static)> {
        self.session.as_deref_mut()
    }

    /// `true` once a scene has asked to connect, until disconnect or a
    /// connection error.
    pub fn is_networking(&self) -> bool {
        self.networking
    }

    fn disconnect_session(&mut self) {
        if let Some(session) = self.session.as_mut() {
            if session.is_active() {
                session.disconnect();
                tracing::info!("session disconnected");
            }
        }
        self.networking = false;
    }

    fn refresh_status(&mut self) {
        self.env.status = self
            .session
            .as_ref()
            .map(|s| s.status())
            .unwrap_or_default();
    }

    fn service_session(&mut self) {
        if !self.networking || self.env.halted || self.phase != TransitionPhase::Active {
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(state) = self.current_state.as_ref() else {
            return;
        };
        let mut router = EventRouter {
            scene: self.current.as_mut(),
            state,
            scenes: &self.scenes,
            env: &mut self.env,
            networking: &mut self.networking,
        };
        session.service(&mut router);
        self.refresh_status();
        self.flush();
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn progress(&self, elapsed_ms: f64) -> f64 {
        if self.transition_ms <= 0 {
            1.0
        } else {
            (elapsed_ms / self.transition_ms as f64).min(1.0)
        }
    }

    /// Runs the factory for `state`. A failure sets the sticky flag.
    fn build(&mut self, state: &S) -> Result<Box<dyn Scene<S, D>>, SceneError> {
        let factory = self
            .scenes
            .factories
            .get(state)
            .ok_or_else(|| SceneError::UnknownState(format!("{state:?}")))?;
        let mut ctx = SceneContext::new(state, &self.scenes, &mut self.env);
        match factory(&mut ctx) {
            Ok(scene) => Ok(scene),
            Err(e) => {
                tracing::error!(?state, error = %e, "scene factory failed");
                self.env.halted = true;
                Err(e)
            }
        }
    }

    /// Calls into one scene slot with a fresh context. Whatever it queues
    /// stays queued until the caller flushes.
    fn call(
        &mut self,
        slot: Slot,
        f: impl FnOnce(&mut dyn Scene<S, D>, &mut SceneContext<'_, S, D>),
    ) -> Result<(), SceneError> {
        let (scene, state) = match slot {
            Slot::Current => (
                self.current.as_deref_mut(),
                self.outgoing_state.as_ref().or(self.current_state.as_ref()),
            ),
            Slot::Next => (self.next.as_deref_mut(), self.current_state.as_ref()),
        };
        let (Some(scene), Some(state)) = (scene, state) else {
            return Err(SceneError::InconsistentPhase(self.phase));
        };
        let mut ctx = SceneContext::new(state, &self.scenes, &mut self.env);
        f(scene, &mut ctx);
        Ok(())
    }

    /// Applies queued commands in order, including any queued while
    /// applying.
    fn flush(&mut self) {
        while !self.env.commands.is_empty() {
            let commands = std::mem::take(&mut self.env.commands);
            for command in commands {
                match command {
                    SceneCommand::ChangeScene {
                        state,
                        duration_ms,
                        cross_fade,
                    } => {
                        if let Err(e) = self.start_transition(state, duration_ms, cross_fade) {
                            tracing::warn!(error = %e, "queued scene change failed");
                        }
                    }
                    SceneCommand::Session(command) => self.apply_session(command),
                }
            }
        }
    }

    fn apply_session(&mut self, command: SessionCommand) {
        let name = command.name();
        let Some(session) = self.session.as_mut() else {
            tracing::warn!(command = name, "no session attached, command dropped");
            return;
        };

        let result = match command {
            SessionCommand::Connect(identity) => {
                let result = session.connect(identity);
                if result.is_ok() {
                    self.networking = true;
                }
                result
            }
            SessionCommand::Disconnect => {
                session.disconnect();
                self.networking = false;
                Ok(())
            }
            SessionCommand::JoinRandomRoom(max) => session.join_random_room(max),
            SessionCommand::JoinRoom { name, rejoin } => session.join_room(&name, rejoin),
            SessionCommand::CreateRoom { name, options } => session.create_room(&name, options),
            SessionCommand::LeaveRoom => session.leave_room(),
            SessionCommand::SetRoomOpen(open) => session.set_room_open(open),
            SessionCommand::SetRoomVisible(visible) => session.set_room_visible(visible),
            SessionCommand::RaiseEvent {
                code,
                payload,
                reliable,
            } => session.raise_event(code, &payload, reliable),
        };

        if let Err(e) = result {
            tracing::warn!(command = name, error = %e, "session command failed");
        }
        self.refresh_status();
    }
}

impl<S, D> Default for SceneTransitionManager<S, D>
where
    S: Clone + Eq + Hash + fmt::Debug + 'static,
    D: Default + 'static,
{
    fn default() -> Self {
        Self::new(D::default())
    }
}

impl<S, D> Drop for SceneTransitionManager<S, D> {
    fn drop(&mut self) {
        if let Some(session) = self.session.as_mut() {
            if session.is_active() {
                session.disconnect();
                tracing::info!("session disconnected on shutdown");
            }
        }
        self.env.registry.clear();
    }
}

// ---------------------------------------------------------------------------
// EventRouter
// ---------------------------------------------------------------------------

/// Routes [`ClientEvent`]s from `service()` to the current scene's
/// [`SessionHandler`](crate::SessionHandler).
struct EventRouter<'a, S, D> {
    scene: Option<&'a mut Box<dyn Scene<S, D>>>,
    state: &'a S,
    scenes: &'a SceneTable<S, D>,
    env: &'a mut SceneEnv<S, D>,
    networking: &'a mut bool,
}

impl<S, D> ClientListener for EventRouter<'_, S, D>
where
    S: Clone + Eq + Hash + fmt::Debug,
{
    fn on_client_event(&mut self, event: ClientEvent) {
        if matches!(
            event,
            ClientEvent::ConnectionError { .. } | ClientEvent::Disconnected
        ) {
            *self.networking = false;
        }

        // Resolve custom payloads before the context takes the registry.
        let resolved = match &event {
            ClientEvent::CustomEvent { payload, .. } => {
                Some(EventDispatcher::new(&self.env.registry).resolve(payload))
            }
            _ => None,
        };

        let Some(scene) = self.scene.as_deref_mut() else {
            tracing::debug!(event = event.name(), "no scene to receive event");
            return;
        };
        let Some(handler) = scene.session_handler() else {
            tracing::trace!(event = event.name(), "scene has no session handler");
            return;
        };
        let mut ctx = SceneContext::new(self.state, self.scenes, self.env);

        match event {
            ClientEvent::ConnectReturn(result) => handler.on_connect(&mut ctx, result),
            ClientEvent::ConnectionError { code } => handler.on_connection_error(&mut ctx, code),
            ClientEvent::Disconnected => handler.on_disconnect(&mut ctx),
            ClientEvent::LeaveRoomReturn(result) => handler.on_leave_room(&mut ctx, result),
            ClientEvent::JoinRandomRoomReturn(result) => {
                handler.on_join_random_room(&mut ctx, result)
            }
            ClientEvent::JoinRoomReturn(result) => handler.on_join_room(&mut ctx, result),
            ClientEvent::CreateRoomReturn(result) => handler.on_create_room(&mut ctx, result),
            ClientEvent::PlayerJoined {
                player,
                players,
                is_self,
            } => handler.on_player_joined(&mut ctx, player, &players, is_self),
            ClientEvent::PlayerLeft {
                player,
                is_inactive,
            } => handler.on_player_left(&mut ctx, player, is_inactive),
            ClientEvent::CustomEvent { sender, code, .. } => match resolved {
                Some(Ok(message)) => handler.on_event(&mut ctx, sender, code, message),
                Some(Err(error)) => handler.on_event_error(&mut ctx, sender, code, error),
                None => {}
            },
        }
    }
}
