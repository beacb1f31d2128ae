//! Inbound routing: [`WireValue`] → [`WireMessage`] → one visitor call.
//!
//! Resolution is a two-level match. The outer kind of the wire value picks
//! the branch; for tables the `ArrayType` discriminator picks the shape:
//!
//! ```text
//! Custom{tag, data}  → registry.decode           → WireMessage::Custom
//! Table              → ArrayType = "Array"       → WireMessage::Array
//!                      ArrayType = "Grid"  + xy  → WireMessage::Grid
//! Int32 | Double | … → native                    → WireMessage::Scalar
//! Array (bare)       → error: collections must be enveloped
//! ```
//!
//! Any failure is returned *before* the visitor runs, so a handler never
//! sees a half-resolved event.

use crate::envelope::CollectionEnvelope;
use crate::error::CodecError;
use crate::event_codec::EventCodec;
use crate::registry::TypeRegistry;
use crate::types::{EventCode, PlayerNumber, Scalar, WireMessage};
use crate::wire::WireValue;

/// A fully resolved inbound event.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedEvent {
    pub sender: PlayerNumber,
    pub code: EventCode,
    pub message: WireMessage,
}

/// Receives resolved events.
///
/// Implemented for any `FnMut(PlayerNumber, EventCode, WireMessage) -> R`,
/// so a closure works wherever a visitor is expected.
pub trait EventVisitor {
    type Output;

    fn visit(&mut self, sender: PlayerNumber, code: EventCode, message: WireMessage)
    -> Self::Output;
}

impl<F, R> EventVisitor for F
where
    F: FnMut(PlayerNumber, EventCode, WireMessage) -> R,
{
    type Output = R;

    fn visit(&mut self, sender: PlayerNumber, code: EventCode, message: WireMessage) -> R {
        self(sender, code, message)
    }
}

/// Resolves inbound wire values against a registry and routes them.
#[derive(Debug, Clone, Copy)]
pub struct EventDispatcher<'r> {
    codec: EventCodec<'r>,
}

impl<'r> EventDispatcher<'r> {
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self {
            codec: EventCodec::new(registry),
        }
    }

    /// Resolves a wire value without dispatching it.
    pub fn resolve(&self, payload: &WireValue) -> Result<WireMessage, CodecError> {
        match payload {
            WireValue::Custom { tag, data } => {
                Ok(WireMessage::Custom(self.codec.decode_custom(*tag, data)?))
            }
            WireValue::Table(_) => {
                let envelope = CollectionEnvelope::from_wire(payload)?;
                Ok(self.codec.decode(&envelope)?.into())
            }
            WireValue::Int32(v) => Ok(WireMessage::Scalar(Scalar::Int32(*v))),
            WireValue::Double(v) => Ok(WireMessage::Scalar(Scalar::Double(*v))),
            WireValue::Float32(v) => Ok(WireMessage::Scalar(Scalar::Float32(*v))),
            WireValue::Bool(v) => Ok(WireMessage::Scalar(Scalar::Bool(*v))),
            WireValue::String(v) => Ok(WireMessage::Scalar(Scalar::String(v.clone()))),
            WireValue::Array(_) => Err(CodecError::UnexpectedKind {
                expected: "Table",
                found: "Array",
            }),
        }
    }

    /// Resolves `payload` and invokes `visitor` exactly once on success.
    ///
    /// # Errors
    /// Any [`CodecError`] from resolution; the visitor is not called.
    pub fn dispatch<V: EventVisitor>(
        &self,
        sender: PlayerNumber,
        code: EventCode,
        payload: &WireValue,
        visitor: &mut V,
    ) -> Result<V::Output, CodecError> {
        let message = self.resolve(payload)?;
        tracing::trace!(%sender, %code, message = %message.describe(), "event dispatched");
        Ok(visitor.visit(sender, code, message))
    }

    /// Resolves `payload` into a [`ReceivedEvent`].
    pub fn receive(
        &self,
        sender: PlayerNumber,
        code: EventCode,
        payload: &WireValue,
    ) -> Result<ReceivedEvent, CodecError> {
        Ok(ReceivedEvent {
            sender,
            code,
            message: self.resolve(payload)?,
        })
    }
}
