//! Integration tests for the scene transition manager.
//!
//! Time is paused: every test drives the stopwatch with
//! `tokio::time::advance`, so phase boundaries are exact.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use scenecast_protocol::{
    Circle, CodecError, EventCode, EventCodec, PlayerNumber, Point, Rect, TypeRegistry, TypeTag,
    WireMessage, WireValue,
};
use scenecast_scene::{
    Canvas, Rgba, Scene, SceneContext, SceneError, SceneTransitionManager, SessionHandler,
    TransitionConfig, TransitionPhase,
};
use scenecast_transport::{ClientEvent, Identity, LoopbackHub, OperationError, SessionClient};

// =========================================================================
// Helpers
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Key {
    Title,
    Lobby,
    Match,
    Credits,
}

type Log = Vec<String>;
type Manager = SceneTransitionManager<Key, Log>;

async fn advance(ms: u64) {
    tokio::time::advance(Duration::from_millis(ms)).await;
}

fn log(manager: &Manager) -> Log {
    manager.shared_data().borrow().clone()
}

fn clear_log(manager: &Manager) {
    manager.shared_data().borrow_mut().clear();
}

/// Logs every update call into the shared data and draws a rect whose `x`
/// identifies it.
struct Probe {
    name: &'static str,
    id: i32,
    dropped: Option<Rc<Cell<bool>>>,
}

impl Probe {
    fn new(name: &'static str, id: i32) -> Self {
        Self {
            name,
            id,
            dropped: None,
        }
    }

    fn watched(name: &'static str, id: i32, flag: &Rc<Cell<bool>>) -> Self {
        Self {
            name,
            id,
            dropped: Some(Rc::clone(flag)),
        }
    }
}

impl Drop for Probe {
    fn drop(&mut self) {
        if let Some(flag) = &self.dropped {
            flag.set(true);
        }
    }
}

impl Scene<Key, Log> for Probe {
    fn update_fade_in(&mut self, ctx: &mut SceneContext<'_, Key, Log>, t: f64) {
        ctx.data_mut().push(format!("{}:in:{t:.2}", self.name));
    }

    fn update(&mut self, ctx: &mut SceneContext<'_, Key, Log>) {
        ctx.data_mut().push(format!("{}:update", self.name));
    }

    fn update_fade_out(&mut self, ctx: &mut SceneContext<'_, Key, Log>, t: f64) {
        ctx.data_mut().push(format!("{}:out:{t:.2}", self.name));
    }

    fn draw(&self, canvas: &mut dyn Canvas) {
        canvas.draw_rect(Rect::new(self.id, 0, 10, 10), Rgba::WHITE);
    }
}

/// Requests a change to `to` on its first active update.
struct Hop {
    to: Key,
    duration_ms: i64,
}

impl Scene<Key, Log> for Hop {
    fn update(&mut self, ctx: &mut SceneContext<'_, Key, Log>) {
        ctx.data_mut().push("hop:update".into());
        ctx.change_scene(self.to, self.duration_ms, false).unwrap();
    }
}

/// Backs out to `to` from its first fade-out call, logging the key its
/// context reports.
struct Retreat {
    to: Key,
    requested: bool,
}

impl Scene<Key, Log> for Retreat {
    fn update_fade_out(&mut self, ctx: &mut SceneContext<'_, Key, Log>, t: f64) {
        let state = *ctx.state();
        ctx.data_mut().push(format!("{state:?}:out:{t:.2}"));
        if !self.requested {
            self.requested = true;
            ctx.change_scene(self.to, 200, false).unwrap();
        }
    }
}

/// Reports an error from its first fade-in call.
struct Broken;

impl Scene<Key, Log> for Broken {
    fn update_fade_in(&mut self, ctx: &mut SceneContext<'_, Key, Log>, _t: f64) {
        ctx.notify_error();
    }
}

#[derive(Default)]
struct RecordingCanvas {
    ops: Vec<String>,
}

impl Canvas for RecordingCanvas {
    fn fill(&mut self, color: Rgba) {
        self.ops.push(format!("fill:{:.2}", color.a));
    }

    fn draw_rect(&mut self, rect: Rect, _color: Rgba) {
        self.ops.push(format!("rect:{}", rect.x));
    }

    fn draw_circle(&mut self, circle: Circle, _color: Rgba) {
        self.ops.push(format!("circle:{}", circle.r));
    }
}

fn render(manager: &Manager) -> Vec<String> {
    let mut canvas = RecordingCanvas::default();
    manager.render(&mut canvas);
    canvas.ops
}

fn instant_config() -> TransitionConfig {
    TransitionConfig {
        initial_transition: Duration::ZERO,
        ..TransitionConfig::default()
    }
}

/// Title and Match probes; Title is the default.
fn two_scenes() -> Manager {
    let mut manager = Manager::new(Log::new());
    manager
        .add(Key::Title, |_| Probe::new("title", 1))
        .add(Key::Match, |_| Probe::new("match", 2));
    manager
}

/// Brings a fresh manager to Title/Active and clears the log.
async fn active_title() -> Manager {
    let mut manager = two_scenes();
    manager.init(Key::Title).unwrap();
    advance(1000).await;
    manager.update_scene().unwrap();
    assert_eq!(manager.phase(), TransitionPhase::Active);
    clear_log(&manager);
    manager
}

// =========================================================================
// Initialization
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_update_without_scenes_does_nothing() {
    let mut manager = Manager::new(Log::new());
    manager.update_scene().unwrap();
    assert_eq!(manager.phase(), TransitionPhase::Uninitialized);
    assert_eq!(manager.current_state(), None);
    assert!(render(&manager).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_first_update_builds_default_scene() {
    let mut manager = two_scenes();
    manager.update_scene().unwrap();

    assert_eq!(manager.current_state(), Some(&Key::Title));
    assert_eq!(manager.phase(), TransitionPhase::FadeIn);
    assert_eq!(manager.transition_ms(), 1000);
    assert_eq!(log(&manager), vec!["title:in:0.00"]);
}

#[tokio::test(start_paused = true)]
async fn test_init_twice_fails_and_keeps_scene() {
    let mut manager = two_scenes();
    manager.init(Key::Match).unwrap();
    advance(250).await;
    assert_eq!(manager.init(Key::Title), Err(SceneError::AlreadyInitialized));
    assert_eq!(manager.current_state(), Some(&Key::Match));
    assert_eq!(manager.phase(), TransitionPhase::FadeIn);
    assert_eq!(manager.transition_ms(), 1000);
    // the fade-in clock kept running: a quarter of the way in
    assert_eq!(render(&manager), vec!["rect:2", "fill:0.75"]);
}

#[tokio::test(start_paused = true)]
async fn test_init_unknown_state() {
    let mut manager = two_scenes();
    assert_eq!(
        manager.init(Key::Credits),
        Err(SceneError::UnknownState("Credits".into()))
    );
    assert_eq!(manager.phase(), TransitionPhase::Uninitialized);
}

#[tokio::test(start_paused = true)]
async fn test_factory_receives_key_being_built() {
    let mut manager = Manager::new(Log::new());
    manager.add(Key::Lobby, |ctx: &mut SceneContext<'_, Key, Log>| {
        let key = *ctx.state();
        ctx.data_mut().push(format!("build:{key:?}"));
        Probe::new("lobby", 3)
    });
    manager.init(Key::Lobby).unwrap();
    assert_eq!(log(&manager), vec!["build:Lobby"]);
}

// =========================================================================
// Plain fades
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_full_fade_cycle() {
    let title_dropped = Rc::new(Cell::new(false));
    let flag = Rc::clone(&title_dropped);

    let mut manager = Manager::new(Log::new());
    manager
        .add(Key::Title, move |_| Probe::watched("title", 1, &flag))
        .add(Key::Match, |_| Probe::new("match", 2));

    manager.init(Key::Title).unwrap();
    manager.update_scene().unwrap();
    advance(500).await;
    manager.update_scene().unwrap();
    assert_eq!(manager.phase(), TransitionPhase::FadeIn);

    advance(501).await;
    manager.update_scene().unwrap();
    assert_eq!(manager.phase(), TransitionPhase::Active);
    assert_eq!(
        log(&manager),
        vec!["title:in:0.00", "title:in:0.50", "title:update"]
    );
    clear_log(&manager);

    manager.change_scene(Key::Match, 1000, false).unwrap();
    assert_eq!(manager.phase(), TransitionPhase::FadeOut);
    assert_eq!(manager.transition_ms(), 500);
    assert!(!manager.is_cross_fade());

    advance(250).await;
    manager.update_scene().unwrap();
    assert_eq!(manager.current_state(), Some(&Key::Title));
    assert!(!title_dropped.get());

    advance(251).await;
    manager.update_scene().unwrap();
    assert!(title_dropped.get());
    assert_eq!(manager.current_state(), Some(&Key::Match));
    assert_eq!(manager.phase(), TransitionPhase::FadeIn);

    advance(501).await;
    manager.update_scene().unwrap();
    assert_eq!(manager.phase(), TransitionPhase::Active);
    assert_eq!(
        log(&manager),
        vec!["title:out:0.25", "match:in:0.00", "match:update"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_change_to_unknown_leaves_everything() {
    let mut manager = active_title().await;
    assert_eq!(
        manager.change_scene(Key::Credits, 400, true),
        Err(SceneError::UnknownState("Credits".into()))
    );
    assert_eq!(manager.phase(), TransitionPhase::Active);
    assert_eq!(manager.current_state(), Some(&Key::Title));
    assert_eq!(manager.transition_ms(), 1000);
    assert!(!manager.is_halted());
}

#[tokio::test(start_paused = true)]
async fn test_same_scene_forces_plain_fade() {
    let mut manager = active_title().await;
    manager.change_scene(Key::Title, 800, true).unwrap();
    assert!(!manager.is_cross_fade());
    assert_eq!(manager.phase(), TransitionPhase::FadeOut);
    assert_eq!(manager.transition_ms(), 400);

    advance(400).await;
    manager.update_scene().unwrap();
    assert_eq!(manager.current_state(), Some(&Key::Title));
    assert_eq!(manager.phase(), TransitionPhase::FadeIn);
}

#[tokio::test(start_paused = true)]
async fn test_default_change_uses_config_duration() {
    let mut manager = active_title().await;
    manager.change_scene_default(Key::Match).unwrap();
    assert_eq!(manager.transition_ms(), 1000);

    manager
        .change_scene_after(Key::Match, Duration::from_secs(3), false)
        .unwrap();
    assert_eq!(manager.transition_ms(), 1500);
}

#[tokio::test(start_paused = true)]
async fn test_scene_queues_its_own_change() {
    let mut manager = SceneTransitionManager::with_config(Log::new(), instant_config());
    manager
        .add(Key::Lobby, |_| Hop {
            to: Key::Match,
            duration_ms: 200,
        })
        .add(Key::Match, |_| Probe::new("match", 2));

    manager.update_scene().unwrap();
    assert_eq!(log(&manager), vec!["hop:update"]);
    assert_eq!(manager.phase(), TransitionPhase::FadeOut);
    assert_eq!(manager.transition_ms(), 100);
    assert_eq!(manager.current_state(), Some(&Key::Lobby));
}

#[tokio::test(start_paused = true)]
async fn test_zero_duration_change_completes_in_one_tick() {
    let mut manager = active_title().await;
    manager.change_scene(Key::Match, 0, false).unwrap();
    manager.update_scene().unwrap();
    assert_eq!(manager.current_state(), Some(&Key::Match));
    assert_eq!(manager.phase(), TransitionPhase::Active);
    assert_eq!(log(&manager), vec!["match:update"]);
}

// =========================================================================
// Crossfade
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_crossfade_runs_both_scenes() {
    let title_dropped = Rc::new(Cell::new(false));
    let flag = Rc::clone(&title_dropped);

    let mut manager = Manager::new(Log::new());
    manager
        .add(Key::Title, move |_| Probe::watched("title", 1, &flag))
        .add(Key::Match, |ctx: &mut SceneContext<'_, Key, Log>| {
            ctx.data_mut().push("build:match".into());
            Probe::new("match", 2)
        });
    manager.init(Key::Title).unwrap();
    advance(1000).await;
    manager.update_scene().unwrap();
    clear_log(&manager);

    manager.change_scene(Key::Match, 1000, true).unwrap();
    assert!(manager.is_cross_fade());
    assert_eq!(manager.phase(), TransitionPhase::FadeInOut);
    assert_eq!(manager.transition_ms(), 1000);
    assert_eq!(manager.current_state(), Some(&Key::Match));
    assert_eq!(log(&manager), vec!["build:match"]);

    advance(500).await;
    manager.update_scene().unwrap();
    assert_eq!(
        log(&manager),
        vec!["build:match", "title:out:0.50", "match:in:0.50"]
    );
    assert!(!title_dropped.get());

    advance(501).await;
    manager.update_scene().unwrap();
    assert!(title_dropped.get());
    assert_eq!(manager.phase(), TransitionPhase::Active);
    assert_eq!(log(&manager).last().map(String::as_str), Some("match:update"));
}

#[tokio::test(start_paused = true)]
async fn test_outgoing_scene_changes_scene_mid_crossfade() {
    let mut manager = Manager::new(Log::new());
    manager
        .add(Key::Title, |_| Retreat {
            to: Key::Title,
            requested: false,
        })
        .add(Key::Match, |_| Probe::new("match", 2));
    manager.init(Key::Title).unwrap();
    advance(1000).await;
    manager.update_scene().unwrap();

    manager.change_scene(Key::Match, 1000, true).unwrap();
    advance(100).await;
    assert_eq!(manager.update_scene(), Ok(()));
    // both legs ran before the queued change was applied
    assert_eq!(log(&manager), vec!["Title:out:0.10", "match:in:0.10"]);
    assert_eq!(manager.phase(), TransitionPhase::FadeOut);
    assert!(!manager.is_cross_fade());
    assert_eq!(manager.transition_ms(), 100);
    assert_eq!(manager.current_state(), Some(&Key::Title));
    assert!(!manager.is_halted());

    advance(100).await;
    assert_eq!(manager.update_scene(), Ok(()));
    assert_eq!(manager.phase(), TransitionPhase::FadeIn);
    assert_eq!(manager.current_state(), Some(&Key::Title));
}

#[tokio::test(start_paused = true)]
async fn test_crossfade_before_first_scene_becomes_plain_init() {
    let mut manager = two_scenes();
    manager.change_scene(Key::Match, 400, true).unwrap();
    assert!(!manager.is_cross_fade());

    manager.update_scene().unwrap();
    assert!(!manager.is_halted());
    assert_eq!(manager.current_state(), Some(&Key::Match));
    assert_eq!(manager.phase(), TransitionPhase::FadeIn);
    assert_eq!(manager.transition_ms(), 200);
    assert_eq!(log(&manager), vec!["match:in:0.00"]);
}

// =========================================================================
// Rendering
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_render_overlays_follow_phase() {
    let mut manager = two_scenes();
    manager.init(Key::Title).unwrap();
    advance(250).await;
    assert_eq!(render(&manager), vec!["rect:1", "fill:0.75"]);

    advance(750).await;
    manager.update_scene().unwrap();
    assert_eq!(render(&manager), vec!["rect:1"]);

    manager.change_scene(Key::Match, 1000, false).unwrap();
    advance(125).await;
    assert_eq!(render(&manager), vec!["rect:1", "fill:0.25"]);
}

#[tokio::test(start_paused = true)]
async fn test_render_crossfade_draws_current_then_next() {
    let mut manager = active_title().await;
    manager.change_scene(Key::Match, 1000, true).unwrap();
    advance(250).await;
    assert_eq!(
        render(&manager),
        vec!["rect:1", "fill:0.25", "rect:2", "fill:0.75"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_zero_duration_draws_without_overlay() {
    let mut manager = SceneTransitionManager::with_config(Log::new(), instant_config());
    manager.add(Key::Title, |_| Probe::new("title", 1));
    manager.init(Key::Title).unwrap();
    assert_eq!(manager.phase(), TransitionPhase::FadeIn);
    assert_eq!(render(&manager), vec!["rect:1"]);
}

#[tokio::test(start_paused = true)]
async fn test_tick_updates_then_draws() {
    let mut manager = two_scenes();
    manager.set_fade_color(Rgba::WHITE.with_alpha(0.0));
    let mut canvas = RecordingCanvas::default();
    manager.tick(&mut canvas).unwrap();
    assert_eq!(canvas.ops, vec!["rect:1", "fill:1.00"]);
    assert_eq!(manager.fade_color(), Rgba::new(1.0, 1.0, 1.0, 0.0));
}

// =========================================================================
// Errors
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_scene_error_is_sticky() {
    let mut manager = Manager::new(Log::new());
    manager.add(Key::Title, |_| Broken);

    assert_eq!(manager.update_scene(), Err(SceneError::Halted));
    assert!(manager.is_halted());
    advance(5000).await;
    assert_eq!(manager.update_scene(), Err(SceneError::Halted));

    let mut canvas = RecordingCanvas::default();
    assert_eq!(manager.tick(&mut canvas), Err(SceneError::Halted));
    assert!(canvas.ops.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_notify_error_from_outside() {
    let mut manager = active_title().await;
    manager.notify_error();
    assert_eq!(manager.update_scene(), Err(SceneError::Halted));
    assert!(log(&manager).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_halt_survives_later_scene_changes() {
    let mut manager = active_title().await;
    manager.notify_error();

    manager.change_scene(Key::Match, 200, false).unwrap();
    advance(200).await;
    assert_eq!(manager.update_scene(), Err(SceneError::Halted));

    manager.change_scene(Key::Lobby, 200, true).unwrap_err();
    manager.change_scene(Key::Match, 200, true).unwrap();
    advance(300).await;
    let mut canvas = RecordingCanvas::default();
    assert_eq!(manager.tick(&mut canvas), Err(SceneError::Halted));
    assert!(canvas.ops.is_empty());
    assert!(manager.is_halted());
    assert!(log(&manager).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_factory_failure_halts() {
    let mut manager = Manager::new(Log::new());
    manager.try_add(Key::Title, |_| Err::<Probe, _>("missing asset"));

    assert_eq!(
        manager.init(Key::Title),
        Err(SceneError::Factory {
            state: "Title".into(),
            reason: "missing asset".into(),
        })
    );
    assert!(manager.is_halted());
    assert_eq!(manager.update_scene(), Err(SceneError::Halted));
}

#[tokio::test(start_paused = true)]
async fn test_failed_build_after_fade_out_halts() {
    let mut manager = SceneTransitionManager::with_config(Log::new(), instant_config());
    manager
        .add(Key::Title, |_| Probe::new("title", 1))
        .try_add(Key::Match, |_| Err::<Probe, _>("no arena"));
    manager.update_scene().unwrap();

    manager.change_scene(Key::Match, 200, false).unwrap();
    advance(100).await;
    assert!(matches!(
        manager.update_scene(),
        Err(SceneError::Factory { .. })
    ));
    assert_eq!(manager.update_scene(), Err(SceneError::Halted));
}

// =========================================================================
// Session servicing
// =========================================================================

/// Connects on its first active update when `connect` is set, hosts a
/// room once connected, and logs every session callback.
struct Peer {
    connect: bool,
}

impl Scene<Key, Log> for Peer {
    fn update(&mut self, ctx: &mut SceneContext<'_, Key, Log>) {
        if std::mem::take(&mut self.connect) {
            ctx.connect(Identity::new("host"));
        }
    }

    fn session_handler(&mut self) -> Option<&mut dyn SessionHandler<Key, Log>> {
        Some(self)
    }
}

impl SessionHandler<Key, Log> for Peer {
    fn on_connect(
        &mut self,
        ctx: &mut SceneContext<'_, Key, Log>,
        result: Result<(), OperationError>,
    ) {
        ctx.data_mut().push(format!("connect:{}", result.is_ok()));
        ctx.create_room("duel", 2);
    }

    fn on_create_room(
        &mut self,
        ctx: &mut SceneContext<'_, Key, Log>,
        result: Result<PlayerNumber, OperationError>,
    ) {
        let player = result.map(|p| p.0).unwrap_or(-1);
        ctx.data_mut().push(format!("create:{player}"));
    }

    fn on_player_joined(
        &mut self,
        ctx: &mut SceneContext<'_, Key, Log>,
        player: PlayerNumber,
        _players: &[PlayerNumber],
        is_self: bool,
    ) {
        ctx.data_mut().push(format!("joined:{}:{is_self}", player.0));
    }

    fn on_event(
        &mut self,
        ctx: &mut SceneContext<'_, Key, Log>,
        sender: PlayerNumber,
        code: EventCode,
        message: WireMessage,
    ) {
        let text = match &message {
            WireMessage::Custom(value) => value
                .downcast_ref::<Point>()
                .map(|p| format!("point({},{})", p.x, p.y))
                .unwrap_or_else(|| message.describe()),
            other => other.describe(),
        };
        ctx.data_mut()
            .push(format!("event:{}:{}:{text}", sender.0, code.0));
    }

    fn on_event_error(
        &mut self,
        ctx: &mut SceneContext<'_, Key, Log>,
        sender: PlayerNumber,
        _code: EventCode,
        error: CodecError,
    ) {
        let unknown = matches!(error, CodecError::UnknownType(_));
        ctx.data_mut()
            .push(format!("error:{}:unknown={unknown}", sender.0));
    }
}

fn drain(client: &mut impl SessionClient) -> Vec<ClientEvent> {
    let mut events = Vec::new();
    client.service(&mut |event: ClientEvent| events.push(event));
    events
}

#[tokio::test(start_paused = true)]
async fn test_session_callbacks_reach_active_scene() {
    let hub = LoopbackHub::new();
    let mut manager = SceneTransitionManager::with_config(Log::new(), instant_config());
    manager
        .add(Key::Lobby, |_| Peer { connect: true })
        .add(Key::Match, |_| Peer { connect: false });
    manager.attach_session(hub.client());
    assert!(!manager.is_networking());

    // connect issued by update, answered by the service call in the same tick
    manager.update_scene().unwrap();
    assert!(manager.is_networking());
    assert_eq!(log(&manager), vec!["connect:true"]);

    manager.update_scene().unwrap();
    assert_eq!(
        log(&manager),
        vec!["connect:true", "create:1", "joined:1:true"]
    );
    clear_log(&manager);

    let mut guest = hub.client();
    guest.connect(Identity::new("guest")).unwrap();
    drain(&mut guest);
    guest.join_room("duel", false).unwrap();
    drain(&mut guest);

    let payload = EventCodec::new(&TypeRegistry::with_geometry())
        .encode_value(&Point::new(3, 4))
        .unwrap();
    guest.raise_event(EventCode(7), &payload, true).unwrap();
    guest
        .raise_event(
            EventCode(8),
            &WireValue::Custom {
                tag: TypeTag(42),
                data: vec![0; 4],
            },
            true,
        )
        .unwrap();

    manager.update_scene().unwrap();
    assert_eq!(
        log(&manager),
        vec!["joined:2:false", "event:2:7:point(3,4)", "error:2:unknown=true"]
    );
    assert_eq!(
        manager.session().map(|s| s.status().lobby.peers_in_rooms),
        Some(2)
    );
}

#[tokio::test(start_paused = true)]
async fn test_session_is_only_serviced_while_active() {
    let hub = LoopbackHub::new();
    let mut manager = SceneTransitionManager::with_config(Log::new(), instant_config());
    manager
        .add(Key::Lobby, |_| Peer { connect: true })
        .add(Key::Match, |_| Peer { connect: false });
    manager.attach_session(hub.client());
    manager.update_scene().unwrap();
    manager.update_scene().unwrap();
    clear_log(&manager);

    let mut guest = hub.client();
    guest.connect(Identity::new("guest")).unwrap();
    guest.join_room("duel", false).unwrap();
    drain(&mut guest);

    manager.change_scene(Key::Match, 200, false).unwrap();
    manager.update_scene().unwrap();
    assert!(log(&manager).is_empty());

    advance(100).await;
    manager.update_scene().unwrap();
    assert_eq!(manager.phase(), TransitionPhase::FadeIn);
    assert!(log(&manager).is_empty());

    advance(100).await;
    manager.update_scene().unwrap();
    assert_eq!(manager.phase(), TransitionPhase::Active);
    assert_eq!(log(&manager), vec!["joined:2:false"]);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_manager_disconnects_session() {
    let hub = LoopbackHub::new();
    let mut manager = SceneTransitionManager::with_config(Log::new(), instant_config());
    manager.add(Key::Lobby, |_| Peer { connect: true });
    manager.attach_session(hub.client());
    manager.update_scene().unwrap();
    manager.update_scene().unwrap();

    let mut guest = hub.client();
    guest.connect(Identity::new("guest")).unwrap();
    guest.join_room("duel", false).unwrap();
    drain(&mut guest);

    drop(manager);
    let events = drain(&mut guest);
    assert!(events.iter().any(|e| matches!(
        e,
        ClientEvent::PlayerLeft {
            player: PlayerNumber(1),
            ..
        }
    )));
    assert!(guest.status().is_master_client);
}

#[tokio::test(start_paused = true)]
async fn test_commands_without_session_are_dropped() {
    let mut manager = SceneTransitionManager::with_config(Log::new(), instant_config());
    manager.add(Key::Lobby, |_| Peer { connect: true });
    manager.update_scene().unwrap();
    assert!(!manager.is_networking());
    assert!(log(&manager).is_empty());
    assert!(!manager.is_halted());
}
