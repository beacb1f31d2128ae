//! Typed values ⇄ [`WireValue`].
//!
//! [`EventCodec`] is the outbound half of the typed layer. It turns a
//! scalar, a custom value, a homogeneous [`Sequence`], or a 2-D grid into
//! something the transport can carry, and turns a parsed
//! [`CollectionEnvelope`] back into typed values. It borrows a
//! [`TypeRegistry`] for everything that isn't a primitive.

use crate::envelope::{Collection, CollectionEnvelope, Shape};
use crate::error::CodecError;
use crate::registry::{CustomType, CustomValue, TypeRegistry};
use crate::types::{Dims, Grid, Primitive, Scalar, Sequence, TypeTag};
use crate::wire::{WireArray, WireValue};

/// Encoder/decoder for typed event payloads.
///
/// Cheap to build: it's just a borrow of the registry.
#[derive(Debug, Clone, Copy)]
pub struct EventCodec<'r> {
    registry: &'r TypeRegistry,
}

impl<'r> EventCodec<'r> {
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'r TypeRegistry {
        self.registry
    }

    // -----------------------------------------------------------------------
    // Single values
    // -----------------------------------------------------------------------

    /// Primitives travel natively; no envelope, no registry.
    pub fn encode_scalar(&self, value: &Scalar) -> WireValue {
        match value {
            Scalar::Int32(v) => WireValue::Int32(*v),
            Scalar::Double(v) => WireValue::Double(*v),
            Scalar::Float32(v) => WireValue::Float32(*v),
            Scalar::Bool(v) => WireValue::Bool(*v),
            Scalar::String(v) => WireValue::String(v.clone()),
        }
    }

    /// Encodes one registered custom value as `{tag, bytes}`.
    pub fn encode_custom(&self, value: &CustomValue) -> Result<WireValue, CodecError> {
        let data = self.registry.encode(value)?;
        Ok(WireValue::Custom {
            tag: value.tag(),
            data,
        })
    }

    /// Wraps and encodes a concrete custom value.
    pub fn encode_value<T: CustomType>(&self, value: &T) -> Result<WireValue, CodecError> {
        let wrapped = self.registry.wrap(value.clone())?;
        self.encode_custom(&wrapped)
    }

    /// Decodes one `{tag, bytes}` custom value.
    pub fn decode_custom(&self, tag: TypeTag, data: &[u8]) -> Result<CustomValue, CodecError> {
        self.registry.decode(tag, data)
    }

    // -----------------------------------------------------------------------
    // Collections
    // -----------------------------------------------------------------------

    /// Builds an array envelope. Empty arrays are fine.
    pub fn encode_array(&self, values: &Sequence) -> Result<CollectionEnvelope, CodecError> {
        Ok(CollectionEnvelope::array(self.sequence_to_wire(values)?))
    }

    /// Builds a grid envelope from row-major `values`.
    ///
    /// # Errors
    /// [`CodecError::DimensionMismatch`] if `values.len() != width * height`.
    /// The size is checked before anything is encoded, so a bad grid never
    /// yields a partial envelope.
    pub fn encode_grid(
        &self,
        width: u32,
        height: u32,
        values: &Sequence,
    ) -> Result<CollectionEnvelope, CodecError> {
        let dims = Dims::new(width, height);
        dims.check(values.len())?;
        Ok(CollectionEnvelope::grid(dims, self.sequence_to_wire(values)?))
    }

    /// Grid envelope from a typed [`Grid`] of primitives.
    pub fn encode_primitive_grid<T: Primitive>(
        &self,
        grid: &Grid<T>,
    ) -> Result<CollectionEnvelope, CodecError> {
        let values = T::into_sequence(grid.cells().to_vec());
        self.encode_grid(grid.width(), grid.height(), &values)
    }

    /// Grid envelope from a typed [`Grid`] of registered custom values.
    pub fn encode_custom_grid<T: CustomType>(
        &self,
        grid: &Grid<T>,
    ) -> Result<CollectionEnvelope, CodecError> {
        let tag = self
            .registry
            .tag_of::<T>()
            .ok_or(CodecError::UnboundType(T::NAME))?;
        let values = grid
            .cells()
            .iter()
            .map(|cell| CustomValue::new(tag, cell.clone()))
            .collect();
        self.encode_grid(grid.width(), grid.height(), &Sequence::custom(tag, values))
    }

    /// Turns an envelope back into typed values.
    ///
    /// # Errors
    /// [`CodecError::DimensionMismatch`] if a grid's size was tampered with
    /// upstream, plus any registry error for custom elements.
    pub fn decode(&self, envelope: &CollectionEnvelope) -> Result<Collection, CodecError> {
        envelope.validate()?;
        let values = self.sequence_from_wire(envelope.payload())?;
        match (envelope.shape(), envelope.dims()) {
            (Shape::Grid, Some(dims)) => Ok(Collection::Grid { dims, values }),
            _ => Ok(Collection::Array(values)),
        }
    }

    fn sequence_to_wire(&self, values: &Sequence) -> Result<WireArray, CodecError> {
        Ok(match values {
            Sequence::Int32(v) => WireArray::Int32(v.clone()),
            Sequence::Double(v) => WireArray::Double(v.clone()),
            Sequence::Float32(v) => WireArray::Float32(v.clone()),
            Sequence::Bool(v) => WireArray::Bool(v.clone()),
            Sequence::String(v) => WireArray::String(v.clone()),
            Sequence::Custom { tag, values } => {
                let items = values
                    .iter()
                    .map(|value| {
                        if value.tag() != *tag {
                            return Err(CodecError::MixedElements {
                                expected: *tag,
                                found: value.tag(),
                            });
                        }
                        self.registry.encode(value)
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                WireArray::Custom { tag: *tag, items }
            }
        })
    }

    pub(crate) fn sequence_from_wire(&self, array: &WireArray) -> Result<Sequence, CodecError> {
        Ok(match array {
            WireArray::Int32(v) => Sequence::Int32(v.clone()),
            WireArray::Double(v) => Sequence::Double(v.clone()),
            WireArray::Float32(v) => Sequence::Float32(v.clone()),
            WireArray::Bool(v) => Sequence::Bool(v.clone()),
            WireArray::String(v) => Sequence::String(v.clone()),
            WireArray::Custom { tag, items } => {
                // An empty custom array still names a tag, and that tag
                // has to be one we know.
                if !self.registry.contains(*tag) {
                    return Err(CodecError::UnknownType(*tag));
                }
                let values = items
                    .iter()
                    .map(|bytes| self.registry.decode(*tag, bytes))
                    .collect::<Result<Vec<_>, _>>()?;
                Sequence::Custom { tag: *tag, values }
            }
        })
    }
}
