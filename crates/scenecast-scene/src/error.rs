//! Error types for the scene layer.

use crate::TransitionPhase;

/// Errors raised by the scene transition manager.
///
/// Once a scene reports an error (or a factory fails) the manager is
/// halted for good and every later tick returns [`SceneError::Halted`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SceneError {
    /// No factory is registered for this state key.
    #[error("no scene registered for state {0}")]
    UnknownState(String),

    /// `init` was called while a scene already exists.
    #[error("scene manager is already initialized")]
    AlreadyInitialized,

    /// A scene factory refused to build its scene.
    #[error("failed to build scene {state}: {reason}")]
    Factory { state: String, reason: String },

    /// The sticky error flag is set.
    #[error("scene manager halted after an error")]
    Halted,

    /// The manager found itself in a phase that can't occur on this path.
    #[error("inconsistent transition phase {0}")]
    InconsistentPhase(TransitionPhase),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_error_message() {
        let err = SceneError::Factory {
            state: "Title".into(),
            reason: "missing asset".into(),
        };
        assert_eq!(err.to_string(), "failed to build scene Title: missing asset");
    }

    #[test]
    fn test_inconsistent_phase_names_phase() {
        let err = SceneError::InconsistentPhase(TransitionPhase::Uninitialized);
        assert_eq!(err.to_string(), "inconsistent transition phase Uninitialized");
    }
}
