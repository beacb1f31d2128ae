//! # scenecast-scene
//!
//! Scene transition management for Scenecast.
//!
//! A [`SceneTransitionManager`] owns a table of scene factories keyed by a
//! state type, builds scenes on demand, sequences fade and crossfade
//! transitions on a [`Stopwatch`], and services an attached
//! [`SessionClient`](scenecast_transport::SessionClient) while the current
//! scene is active, routing its callbacks to the scene's
//! [`SessionHandler`].

mod config;
mod context;
mod error;
mod manager;
mod scene;
mod timer;

pub use config::{Rgba, TransitionConfig, TransitionPhase};
pub use context::SceneContext;
pub use error::SceneError;
pub use manager::SceneTransitionManager;
pub use scene::{Canvas, Scene, SessionHandler};
pub use timer::Stopwatch;
