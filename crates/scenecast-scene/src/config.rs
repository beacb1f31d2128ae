//! Transition configuration and phase state machine.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// TransitionPhase
// ---------------------------------------------------------------------------

/// Where the manager is in a scene transition.
///
/// ```text
/// Uninitialized → FadeIn → Active → FadeOut → FadeIn → Active → …
///                            │
///                            └──→ FadeInOut → Active        (crossfade)
/// ```
///
/// - **Uninitialized**: no scene has been built yet.
/// - **FadeIn**: the current scene is appearing.
/// - **Active**: steady state; the only phase where the session is serviced.
/// - **FadeOut**: the current scene is disappearing; the next one is built
///   when this leg expires.
/// - **FadeInOut**: crossfade; the old scene fades out while the already
///   built next scene fades in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TransitionPhase {
    #[default]
    Uninitialized,
    FadeIn,
    Active,
    FadeOut,
    FadeInOut,
}

impl TransitionPhase {
    /// Returns `true` while some fade is running.
    pub fn is_transitioning(self) -> bool {
        matches!(self, Self::FadeIn | Self::FadeOut | Self::FadeInOut)
    }
}

impl fmt::Display for TransitionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "Uninitialized"),
            Self::FadeIn => write!(f, "FadeIn"),
            Self::Active => write!(f, "Active"),
            Self::FadeOut => write!(f, "FadeOut"),
            Self::FadeInOut => write!(f, "FadeInOut"),
        }
    }
}

// ---------------------------------------------------------------------------
// Rgba
// ---------------------------------------------------------------------------

/// A straight-alpha color with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Rgba {
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);

    pub const fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    /// Same color, alpha replaced (and clamped to `0.0..=1.0`).
    pub fn with_alpha(self, a: f64) -> Self {
        Self {
            a: a.clamp(0.0, 1.0),
            ..self
        }
    }
}

impl Default for Rgba {
    fn default() -> Self {
        Self::BLACK
    }
}

// ---------------------------------------------------------------------------
// TransitionConfig
// ---------------------------------------------------------------------------

/// Timing and color settings for a [`SceneTransitionManager`](crate::SceneTransitionManager).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionConfig {
    /// Duration used by `change_scene_default`.
    pub default_transition: Duration,

    /// Overlay color for the default fade drawing.
    pub fade_color: Rgba,

    /// Length of the very first fade-in after `init`.
    pub initial_transition: Duration,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            default_transition: Duration::from_millis(2000),
            fade_color: Rgba::BLACK,
            initial_transition: Duration::from_millis(1000),
        }
    }
}

/// Whole milliseconds in `d`, saturating at `i64::MAX`.
pub(crate) fn duration_ms(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}
