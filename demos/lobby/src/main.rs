use std::time::Duration;

use scenecast::prelude::*;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Screen {
    Title,
    Match,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Host,
    Guest,
}

const ROOM: &str = "arena";
const ROUNDS: u32 = 3;
const SHOT: EventCode = EventCode(1);
const BLOCK: EventCode = EventCode(2);
const MAX_FRAMES: u32 = 600;

struct Lobby {
    role: Role,
    rounds: u32,
    done: bool,
}

impl Lobby {
    fn new(role: Role) -> Self {
        Self {
            role,
            rounds: 0,
            done: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Title: connect, then host or join the arena
// ---------------------------------------------------------------------------

struct Title {
    requested: bool,
}

impl Title {
    fn enter_match(
        &mut self,
        ctx: &mut SceneContext<'_, Screen, Lobby>,
        result: Result<PlayerNumber, OperationError>,
    ) {
        match result {
            Ok(player) => {
                tracing::info!(%player, room = ROOM, "seated");
                if let Err(e) = ctx.change_scene(Screen::Match, 600, true) {
                    tracing::error!(error = %e, "cannot enter match");
                    ctx.notify_error();
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "could not get a seat");
                ctx.notify_error();
            }
        }
    }
}

impl Scene<Screen, Lobby> for Title {
    fn update(&mut self, ctx: &mut SceneContext<'_, Screen, Lobby>) {
        if self.requested {
            return;
        }
        self.requested = true;
        let name = match ctx.data().role {
            Role::Host => "host",
            Role::Guest => "guest",
        };
        ctx.connect(Identity::new(name));
    }

    fn draw(&self, canvas: &mut dyn Canvas) {
        canvas.draw_rect(Rect::new(0, 0, 320, 40), Rgba::WHITE);
    }

    fn session_handler(&mut self) -> Option<&mut dyn SessionHandler<Screen, Lobby>> {
        Some(self)
    }
}

impl SessionHandler<Screen, Lobby> for Title {
    fn on_connect(
        &mut self,
        ctx: &mut SceneContext<'_, Screen, Lobby>,
        result: Result<(), OperationError>,
    ) {
        if let Err(e) = result {
            tracing::error!(error = %e, "connect failed");
            ctx.notify_error();
            return;
        }
        let role = ctx.data().role;
        match role {
            Role::Host => ctx.create_room(ROOM, 2),
            Role::Guest => ctx.join_room(ROOM, false),
        }
    }

    fn on_create_room(
        &mut self,
        ctx: &mut SceneContext<'_, Screen, Lobby>,
        result: Result<PlayerNumber, OperationError>,
    ) {
        self.enter_match(ctx, result);
    }

    fn on_join_room(
        &mut self,
        ctx: &mut SceneContext<'_, Screen, Lobby>,
        result: Result<PlayerNumber, OperationError>,
    ) {
        self.enter_match(ctx, result);
    }
}

// ---------------------------------------------------------------------------
// Match: the host shoots circles, the guest blocks with rects
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Match {
    opened: bool,
    last_shot: Option<Circle>,
    last_block: Option<Rect>,
}

impl Match {
    fn shoot(&mut self, ctx: &mut SceneContext<'_, Screen, Lobby>) {
        let round = ctx.data().rounds;
        let shot = Circle::new(40.0 * f64::from(round + 1), 60.0, 8.0);
        if let Err(e) = ctx.raise_custom(SHOT, &shot) {
            tracing::error!(error = %e, "cannot send shot");
            ctx.notify_error();
            return;
        }
        self.last_shot = Some(shot);
    }
}

impl Scene<Screen, Lobby> for Match {
    fn update(&mut self, ctx: &mut SceneContext<'_, Screen, Lobby>) {
        if self.opened || ctx.data().role != Role::Host {
            return;
        }
        let full = ctx
            .status()
            .room
            .as_ref()
            .is_some_and(|room| room.player_count == 2);
        if full {
            self.opened = true;
            self.shoot(ctx);
        }
    }

    fn draw(&self, canvas: &mut dyn Canvas) {
        if let Some(shot) = self.last_shot {
            canvas.draw_circle(shot, Rgba::new(1.0, 0.3, 0.2, 1.0));
        }
        if let Some(block) = self.last_block {
            canvas.draw_rect(block, Rgba::new(0.2, 0.6, 1.0, 1.0));
        }
    }

    fn session_handler(&mut self) -> Option<&mut dyn SessionHandler<Screen, Lobby>> {
        Some(self)
    }
}

impl SessionHandler<Screen, Lobby> for Match {
    fn on_event(
        &mut self,
        ctx: &mut SceneContext<'_, Screen, Lobby>,
        sender: PlayerNumber,
        code: EventCode,
        message: WireMessage,
    ) {
        let WireMessage::Custom(value) = message else {
            tracing::warn!(%sender, %code, "unexpected payload");
            return;
        };

        match code {
            SHOT => {
                let Some(shot) = value.downcast_ref::<Circle>().copied() else {
                    return;
                };
                self.last_shot = Some(shot);
                let block = Rect::new(shot.x as i32 - 10, shot.y as i32 - 10, 20, 20);
                if let Err(e) = ctx.raise_custom(BLOCK, &block) {
                    tracing::error!(error = %e, "cannot send block");
                    ctx.notify_error();
                    return;
                }
                self.last_block = Some(block);

                let mut lobby = ctx.data_mut();
                lobby.rounds += 1;
                lobby.done = lobby.rounds >= ROUNDS;
                tracing::info!(round = lobby.rounds, %sender, "blocked");
            }
            BLOCK => {
                let Some(block) = value.downcast_ref::<Rect>().copied() else {
                    return;
                };
                self.last_block = Some(block);
                let rounds = {
                    let mut lobby = ctx.data_mut();
                    lobby.rounds += 1;
                    lobby.rounds
                };
                tracing::info!(round = rounds, %sender, "shot blocked");
                if rounds < ROUNDS {
                    self.shoot(ctx);
                } else {
                    ctx.data_mut().done = true;
                }
            }
            other => tracing::debug!(code = %other, "ignoring event"),
        }
    }
}

// ---------------------------------------------------------------------------
// Text canvas
// ---------------------------------------------------------------------------

#[derive(Default)]
struct TextCanvas {
    ops: Vec<String>,
}

impl Canvas for TextCanvas {
    fn fill(&mut self, color: Rgba) {
        self.ops.push(format!("fill a={:.2}", color.a));
    }

    fn draw_rect(&mut self, rect: Rect, _color: Rgba) {
        self.ops
            .push(format!("rect {}x{} @ ({}, {})", rect.w, rect.h, rect.x, rect.y));
    }

    fn draw_circle(&mut self, circle: Circle, _color: Rgba) {
        self.ops
            .push(format!("circle r={} @ ({}, {})", circle.r, circle.x, circle.y));
    }
}

// ---------------------------------------------------------------------------
// Bootstrap
// ---------------------------------------------------------------------------

fn peer(hub: &LoopbackHub, role: Role) -> SceneTransitionManager<Screen, Lobby> {
    let config = TransitionConfig {
        initial_transition: Duration::from_millis(300),
        ..TransitionConfig::default()
    };
    let mut manager = SceneTransitionManager::with_config(Lobby::new(role), config);
    manager
        .add(Screen::Title, |_| Title { requested: false })
        .add(Screen::Match, |_| Match::default());
    manager.attach_session(hub.client());
    manager
}

fn is_done(manager: &SceneTransitionManager<Screen, Lobby>) -> bool {
    manager.shared_data().borrow().done
}

#[tokio::main]
async fn main() -> Result<(), ScenecastError> {
    scenecast::init_tracing();

    let hub = LoopbackHub::new();
    let mut host = peer(&hub, Role::Host);
    let mut guest = peer(&hub, Role::Guest);
    let mut frames = tokio::time::interval(Duration::from_millis(16));

    for frame in 0..MAX_FRAMES {
        frames.tick().await;

        let mut canvas = TextCanvas::default();
        host.tick(&mut canvas)?;
        if frame % 30 == 0 {
            tracing::info!(frame, phase = %host.phase(), ops = ?canvas.ops, "host");
        }

        let mut canvas = TextCanvas::default();
        guest.tick(&mut canvas)?;
        if frame % 30 == 0 {
            tracing::info!(frame, phase = %guest.phase(), ops = ?canvas.ops, "guest");
        }

        if is_done(&host) && is_done(&guest) {
            tracing::info!(frame, rounds = ROUNDS, "match finished");
            return Ok(());
        }
    }

    tracing::warn!(frames = MAX_FRAMES, "match did not finish");
    Ok(())
}
