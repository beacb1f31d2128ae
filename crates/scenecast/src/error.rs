//! Unified error type for Scenecast.

use scenecast_protocol::{CodecError, ProtocolError};
use scenecast_scene::SceneError;
use scenecast_transport::{ConnectionError, OperationError};

/// Top-level error wrapping every crate-specific error.
///
/// Each variant has a `#[from]`, so `?` converts sub-crate errors.
#[derive(Debug, thiserror::Error)]
pub enum ScenecastError {
    /// Marshaling failed (unknown tag, size or dimension mismatch, bad envelope).
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// A frame could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session operation was rejected locally.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// The service answered an operation with a failure code.
    #[error(transparent)]
    Operation(#[from] OperationError),

    /// The scene manager failed or halted.
    #[error(transparent)]
    Scene(#[from] SceneError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenecast_protocol::TypeTag;

    #[test]
    fn test_from_codec_error() {
        let err: ScenecastError = CodecError::UnknownType(TypeTag(9)).into();
        assert!(matches!(err, ScenecastError::Codec(_)));
        assert!(err.to_string().contains("#9"));
    }

    #[test]
    fn test_from_connection_error() {
        let err: ScenecastError = ConnectionError::NotInRoom.into();
        assert!(matches!(err, ScenecastError::Connection(_)));
    }

    #[test]
    fn test_from_operation_error() {
        let err: ScenecastError = OperationError::new(32766, "room is full").into();
        assert_eq!(
            err.to_string(),
            "operation failed with code 32766: room is full"
        );
    }

    #[test]
    fn test_from_scene_error() {
        let err: ScenecastError = SceneError::Halted.into();
        assert!(matches!(err, ScenecastError::Scene(SceneError::Halted)));
    }
}
