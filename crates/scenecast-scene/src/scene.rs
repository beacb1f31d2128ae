//! The `Scene` trait and its optional session callbacks.
//!
//! A scene is one screen of the application (title, lobby, match, …).
//! The manager builds it from a registered factory, calls its update
//! methods once per tick according to the transition phase, and drops it
//! when it is superseded. Every method has a default, so a scene only
//! implements what it cares about.

use scenecast_protocol::{Circle, CodecError, EventCode, PlayerNumber, Rect, WireMessage};
use scenecast_transport::OperationError;

use crate::{Rgba, SceneContext};

// ---------------------------------------------------------------------------
// Canvas
// ---------------------------------------------------------------------------

/// Drawing surface handed to scenes during `render`.
///
/// The manager itself only ever calls [`fill`](Self::fill) (for fade
/// overlays); the shape methods are for scenes.
pub trait Canvas {
    /// Covers the whole surface with `color`, blending by its alpha.
    fn fill(&mut self, color: Rgba);

    fn draw_rect(&mut self, rect: Rect, color: Rgba);

    fn draw_circle(&mut self, circle: Circle, color: Rgba);
}

// ---------------------------------------------------------------------------
// Scene
// ---------------------------------------------------------------------------

/// One screen of the application, keyed by a state of type `S`, sharing
/// data of type `D` with every other scene.
///
/// `t` runs from `0.0` to `1.0` across each fade leg.
pub trait Scene<S, D = ()> {
    /// Called every tick while the scene fades in.
    fn update_fade_in(&mut self, ctx: &mut SceneContext<'_, S, D>, t: f64) {
        let _ = (ctx, t);
    }

    /// Called every tick while the scene is active.
    fn update(&mut self, ctx: &mut SceneContext<'_, S, D>) {
        let _ = ctx;
    }

    /// Called every tick while the scene fades out.
    fn update_fade_out(&mut self, ctx: &mut SceneContext<'_, S, D>, t: f64) {
        let _ = (ctx, t);
    }

    fn draw(&self, canvas: &mut dyn Canvas) {
        let _ = canvas;
    }

    /// Draws the scene, then an overlay of `fade` going from opaque to clear.
    fn draw_fade_in(&self, canvas: &mut dyn Canvas, fade: Rgba, t: f64) {
        self.draw(canvas);
        canvas.fill(fade.with_alpha(1.0 - t));
    }

    /// Draws the scene, then an overlay of `fade` going from clear to opaque.
    fn draw_fade_out(&self, canvas: &mut dyn Canvas, fade: Rgba, t: f64) {
        self.draw(canvas);
        canvas.fill(fade.with_alpha(t));
    }

    /// Scenes that want session callbacks return `Some(self)`.
    fn session_handler(&mut self) -> Option<&mut dyn SessionHandler<S, D>> {
        None
    }
}

// ---------------------------------------------------------------------------
// SessionHandler
// ---------------------------------------------------------------------------

/// Session callbacks, delivered to the current scene while it is active.
///
/// Defaults just log at `debug`.
pub trait SessionHandler<S, D = ()> {
    fn on_connect(&mut self, ctx: &mut SceneContext<'_, S, D>, result: Result<(), OperationError>) {
        let _ = ctx;
        tracing::debug!(ok = result.is_ok(), "connect returned");
    }

    fn on_connection_error(&mut self, ctx: &mut SceneContext<'_, S, D>, code: i32) {
        let _ = ctx;
        tracing::debug!(code, "connection error");
    }

    fn on_disconnect(&mut self, ctx: &mut SceneContext<'_, S, D>) {
        let _ = ctx;
        tracing::debug!("disconnected");
    }

    fn on_leave_room(
        &mut self,
        ctx: &mut SceneContext<'_, S, D>,
        result: Result<(), OperationError>,
    ) {
        let _ = ctx;
        tracing::debug!(ok = result.is_ok(), "leave room returned");
    }

    fn on_join_random_room(
        &mut self,
        ctx: &mut SceneContext<'_, S, D>,
        result: Result<PlayerNumber, OperationError>,
    ) {
        let _ = ctx;
        tracing::debug!(ok = result.is_ok(), "join random room returned");
    }

    fn on_join_room(
        &mut self,
        ctx: &mut SceneContext<'_, S, D>,
        result: Result<PlayerNumber, OperationError>,
    ) {
        let _ = ctx;
        tracing::debug!(ok = result.is_ok(), "join room returned");
    }

    fn on_create_room(
        &mut self,
        ctx: &mut SceneContext<'_, S, D>,
        result: Result<PlayerNumber, OperationError>,
    ) {
        let _ = ctx;
        tracing::debug!(ok = result.is_ok(), "create room returned");
    }

    fn on_player_joined(
        &mut self,
        ctx: &mut SceneContext<'_, S, D>,
        player: PlayerNumber,
        players: &[PlayerNumber],
        is_self: bool,
    ) {
        let _ = ctx;
        tracing::debug!(%player, count = players.len(), is_self, "player joined");
    }

    fn on_player_left(
        &mut self,
        ctx: &mut SceneContext<'_, S, D>,
        player: PlayerNumber,
        is_inactive: bool,
    ) {
        let _ = ctx;
        tracing::debug!(%player, is_inactive, "player left");
    }

    /// A custom event from another peer, already resolved.
    fn on_event(
        &mut self,
        ctx: &mut SceneContext<'_, S, D>,
        sender: PlayerNumber,
        code: EventCode,
        message: WireMessage,
    ) {
        let _ = ctx;
        tracing::debug!(%sender, %code, message = %message.describe(), "event received");
    }

    /// A custom event that could not be resolved (unknown tag, bad envelope).
    fn on_event_error(
        &mut self,
        ctx: &mut SceneContext<'_, S, D>,
        sender: PlayerNumber,
        code: EventCode,
        error: CodecError,
    ) {
        let _ = ctx;
        tracing::warn!(%sender, %code, %error, "event dropped");
    }
}
