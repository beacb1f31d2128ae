//! Typed event marshaling for Scenecast.
//!
//! This crate defines how game-session peers turn strongly typed values
//! into the transport's one generic payload and back:
//!
//! - **Registry** ([`TypeRegistry`], [`CustomType`]): binds small
//!   fixed-width Rust types to [`TypeTag`]s. Tags 0–3 are the built-in
//!   geometry types ([`Point`], [`Vec2`], [`Rect`], [`Circle`]).
//! - **Wire** ([`WireValue`], [`WireArray`]): the self-describing key/value
//!   tree the transport carries.
//! - **Codec** ([`EventCodec`], [`CollectionEnvelope`]): scalars, custom
//!   values, arrays, and grids → wire values.
//! - **Dispatch** ([`EventDispatcher`], [`EventVisitor`]): wire values →
//!   [`WireMessage`] → one visitor call.
//! - **Frames** ([`Codec`], [`JsonCodec`]): whole frames ⇄ bytes.
//!
//! ```text
//! outbound:  value ─▶ EventCodec ─▶ WireValue ─▶ transport.raise_event
//! inbound:   transport ─▶ WireValue ─▶ EventDispatcher ─▶ WireMessage ─▶ handler
//! ```

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

mod codec;
mod dispatch;
mod envelope;
mod error;
mod event_codec;
pub mod geometry;
mod registry;
mod types;
mod wire;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use dispatch::{EventDispatcher, EventVisitor, ReceivedEvent};
pub use envelope::{
    ARRAY_TYPE_KEY, Collection, CollectionEnvelope, DIMS_KEY, Shape, VALUES_KEY,
};
pub use error::{CodecError, ProtocolError};
pub use event_codec::EventCodec;
pub use geometry::{CIRCLE_TAG, Circle, POINT_TAG, Point, RECT_TAG, Rect, VEC2_TAG, Vec2};
pub use registry::{CustomType, CustomValue, TypeDescriptor, TypeRegistry};
pub use types::{
    Dims, ElementKind, EventCode, Grid, PlayerNumber, Primitive, PrimitiveKind, Scalar,
    Sequence, TypeTag, WireMessage,
};
pub use wire::{WireArray, WireValue};
