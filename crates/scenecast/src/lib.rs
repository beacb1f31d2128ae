//! # Scenecast
//!
//! Typed event marshaling and fade-driven scene management for networked
//! games.
//!
//! Scenecast pairs a [`SceneTransitionManager`] (a tick-driven state
//! machine that fades or crossfades between scenes) with a session client
//! abstraction and a codec that moves strongly typed values, arrays, and
//! grids through a generic key/value payload.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scenecast::prelude::*;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
//! enum Screen { Title }
//!
//! struct Title;
//! impl Scene<Screen> for Title {}
//!
//! scenecast::init_tracing();
//! let mut manager = SceneTransitionManager::new(());
//! manager.add(Screen::Title, |_| Title);
//! manager.attach_session(LoopbackHub::new().client());
//! manager.update_scene()?;
//! # Ok::<(), ScenecastError>(())
//! ```

mod error;

pub use error::ScenecastError;

pub use scenecast_protocol as protocol;
pub use scenecast_scene as scene;
pub use scenecast_transport as transport;

pub use scenecast_scene::SceneTransitionManager;

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Installs a `tracing-subscriber` fmt subscriber filtered by `RUST_LOG`
/// (falling back to [`DEFAULT_LOG_FILTER`]).
///
/// Returns `false` if a global subscriber was already set.
pub fn init_tracing() -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

pub mod prelude {
    pub use crate::ScenecastError;

    pub use scenecast_protocol::{
        Circle, CodecError, CustomType, CustomValue, Dims, EventCode, EventCodec, EventDispatcher,
        Grid, PlayerNumber, Point, Rect, Scalar, Sequence, TypeRegistry, TypeTag, Vec2,
        WireMessage, WireValue,
    };
    pub use scenecast_scene::{
        Canvas, Rgba, Scene, SceneContext, SceneError, SceneTransitionManager, SessionHandler,
        TransitionConfig, TransitionPhase,
    };
    pub use scenecast_transport::{
        ClientEvent, ConnectionError, Identity, LoopbackClient, LoopbackHub, OperationError,
        RoomOptions, SessionClient, SessionStatus,
    };
}
