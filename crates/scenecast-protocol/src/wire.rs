//! The generic key/value wire primitive.
//!
//! [`WireValue`] is what actually crosses the transport's
//! `raise_event(code, payload, reliable)` call. It knows nothing about
//! geometry, grids, or registries: it is a small self-describing tree of
//! primitives, opaque tagged byte blobs, homogeneous arrays, and string
//! keyed tables. The typed layer ([`EventCodec`](crate::EventCodec),
//! [`EventDispatcher`](crate::EventDispatcher)) builds on top of it.
//!
//! ```text
//! WireValue
//! ├── Int32 / Double / Float32 / Bool / String   (scalars)
//! ├── Custom { tag, data }                        (registered type, fixed width)
//! ├── Array(WireArray)                            (homogeneous)
//! └── Table { "key": WireValue, ... }             (collection envelopes)
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{ElementKind, PrimitiveKind, TypeTag};

/// One value on the wire.
///
/// Serialized adjacently tagged (`{"kind": "Int32", "value": 5}`) so the
/// outer kind is always visible without peeking into the payload. Floats
/// are written as their IEEE-754 bit patterns, so NaN and the infinities
/// survive text codecs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum WireValue {
    Int32(i32),
    Double(#[serde(with = "f64_bits")] f64),
    Float32(#[serde(with = "f32_bits")] f32),
    Bool(bool),
    String(String),
    /// A registered custom type: its tag plus exactly `width` bytes.
    Custom { tag: TypeTag, data: Vec<u8> },
    Array(WireArray),
    Table(BTreeMap<String, WireValue>),
}

impl WireValue {
    /// Name of the outer kind, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Int32(_) => "Int32",
            Self::Double(_) => "Double",
            Self::Float32(_) => "Float32",
            Self::Bool(_) => "Bool",
            Self::String(_) => "String",
            Self::Custom { .. } => "Custom",
            Self::Array(_) => "Array",
            Self::Table(_) => "Table",
        }
    }

    /// Borrows the table entries if this is a `Table`.
    pub fn as_table(&self) -> Option<&BTreeMap<String, WireValue>> {
        match self {
            Self::Table(map) => Some(map),
            _ => None,
        }
    }
}

/// A homogeneous array on the wire.
///
/// Custom elements are stored as one byte blob per element under a single
/// tag, so a mixed array can't be represented at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "of", content = "items")]
pub enum WireArray {
    Int32(Vec<i32>),
    Double(#[serde(with = "f64_bits::seq")] Vec<f64>),
    Float32(#[serde(with = "f32_bits::seq")] Vec<f32>),
    Bool(Vec<bool>),
    String(Vec<String>),
    Custom { tag: TypeTag, items: Vec<Vec<u8>> },
}

impl WireArray {
    /// The element kind carried by this array.
    pub fn element_kind(&self) -> ElementKind {
        match self {
            Self::Int32(_) => ElementKind::Primitive(PrimitiveKind::Int32),
            Self::Double(_) => ElementKind::Primitive(PrimitiveKind::Double),
            Self::Float32(_) => ElementKind::Primitive(PrimitiveKind::Float32),
            Self::Bool(_) => ElementKind::Primitive(PrimitiveKind::Bool),
            Self::String(_) => ElementKind::Primitive(PrimitiveKind::String),
            Self::Custom { tag, .. } => ElementKind::Custom(*tag),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Int32(v) => v.len(),
            Self::Double(v) => v.len(),
            Self::Float32(v) => v.len(),
            Self::Bool(v) => v.len(),
            Self::String(v) => v.len(),
            Self::Custom { items, .. } => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

macro_rules! float_bits {
    ($module:ident, $float:ty, $bits:ty) => {
        mod $module {
            use serde::{Deserialize, Deserializer, Serialize, Serializer};

            pub fn serialize<S: Serializer>(value: &$float, s: S) -> Result<S::Ok, S::Error> {
                value.to_bits().serialize(s)
            }

            pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<$float, D::Error> {
                <$bits>::deserialize(d).map(<$float>::from_bits)
            }

            pub mod seq {
                use serde::{Deserialize, Deserializer, Serializer};

                pub fn serialize<S: Serializer>(
                    values: &[$float],
                    s: S,
                ) -> Result<S::Ok, S::Error> {
                    s.collect_seq(values.iter().map(|v| v.to_bits()))
                }

                pub fn deserialize<'de, D: Deserializer<'de>>(
                    d: D,
                ) -> Result<Vec<$float>, D::Error> {
                    let bits = Vec::<$bits>::deserialize(d)?;
                    Ok(bits.into_iter().map(<$float>::from_bits).collect())
                }
            }
        }
    };
}

float_bits!(f64_bits, f64, u64);
float_bits!(f32_bits, f32, u32);
