//! Collection envelopes: how arrays and grids ride on a [`WireValue`].
//!
//! A collection is never sent as a bare array. It is wrapped in a table
//! whose `ArrayType` key says what shape follows:
//!
//! ```text
//! Array:  { "ArrayType": "Array", "values": [ ... ] }
//! Grid:   { "ArrayType": "Grid",  "xy": Point(w, h), "values": [ ... row-major ... ] }
//! ```
//!
//! [`CollectionEnvelope`] is the parsed, structurally valid form of that
//! table. Turning its payload back into typed values (which may need the
//! registry) is the job of [`EventCodec::decode`](crate::EventCodec::decode).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CodecError;
use crate::geometry::{POINT_TAG, Point};
use crate::registry::CustomType;
use crate::types::{Dims, ElementKind, Sequence, WireMessage};
use crate::wire::{WireArray, WireValue};

/// Discriminator key naming the collection shape.
pub const ARRAY_TYPE_KEY: &str = "ArrayType";
/// Grid dimensions, carried as a custom [`Point`] `(width, height)`.
pub const DIMS_KEY: &str = "xy";
/// The element array.
pub const VALUES_KEY: &str = "values";

/// Shape of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shape {
    Array,
    Grid,
}

impl Shape {
    /// The `ArrayType` discriminator value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Array => "Array",
            Self::Grid => "Grid",
        }
    }

    fn parse(value: &str) -> Result<Self, CodecError> {
        match value {
            "Array" => Ok(Self::Array),
            "Grid" => Ok(Self::Grid),
            other => Err(CodecError::UnknownDiscriminator {
                key: ARRAY_TYPE_KEY,
                value: other.to_owned(),
            }),
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded collection: what [`EventCodec::decode`](crate::EventCodec::decode)
/// hands back.
#[derive(Debug, Clone, PartialEq)]
pub enum Collection {
    Array(Sequence),
    Grid { dims: Dims, values: Sequence },
}

impl From<Collection> for WireMessage {
    fn from(collection: Collection) -> Self {
        match collection {
            Collection::Array(values) => WireMessage::Array(values),
            Collection::Grid { dims, values } => WireMessage::Grid { dims, values },
        }
    }
}

/// An array or grid in wire form.
///
/// `dims` is `Some` exactly when `shape` is [`Shape::Grid`].
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionEnvelope {
    shape: Shape,
    dims: Option<Dims>,
    payload: WireArray,
}

impl CollectionEnvelope {
    pub(crate) fn array(payload: WireArray) -> Self {
        Self {
            shape: Shape::Array,
            dims: None,
            payload,
        }
    }

    pub(crate) fn grid(dims: Dims, payload: WireArray) -> Self {
        Self {
            shape: Shape::Grid,
            dims: Some(dims),
            payload,
        }
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn element_kind(&self) -> ElementKind {
        self.payload.element_kind()
    }

    pub fn dims(&self) -> Option<Dims> {
        self.dims
    }

    pub fn payload(&self) -> &WireArray {
        &self.payload
    }

    /// Checks the grid invariant `width * height == payload.len()`.
    pub fn validate(&self) -> Result<(), CodecError> {
        match (self.shape, self.dims) {
            (Shape::Array, _) => Ok(()),
            (Shape::Grid, Some(dims)) => dims.check(self.payload.len()),
            (Shape::Grid, None) => Err(CodecError::MissingKey(DIMS_KEY)),
        }
    }

    /// Builds the keyed table that goes on the wire.
    ///
    /// # Errors
    /// [`CodecError::InvalidDimensions`] if a grid dimension does not fit
    /// in the `i32` fields of the `xy` point.
    pub fn to_wire(&self) -> Result<WireValue, CodecError> {
        let mut table = BTreeMap::new();
        table.insert(
            ARRAY_TYPE_KEY.to_owned(),
            WireValue::String(self.shape.as_str().to_owned()),
        );
        if let Some(dims) = self.dims {
            table.insert(DIMS_KEY.to_owned(), dims_to_wire(dims)?);
        }
        table.insert(VALUES_KEY.to_owned(), WireValue::Array(self.payload.clone()));
        Ok(WireValue::Table(table))
    }

    /// Parses a keyed table back into an envelope.
    ///
    /// Only the structure is checked here: discriminator, required keys,
    /// and the `xy` point. The grid size invariant is checked by
    /// [`validate`](Self::validate).
    pub fn from_wire(value: &WireValue) -> Result<Self, CodecError> {
        let table = value.as_table().ok_or(CodecError::UnexpectedKind {
            expected: "Table",
            found: value.kind_name(),
        })?;

        let shape = match table.get(ARRAY_TYPE_KEY) {
            Some(WireValue::String(s)) => Shape::parse(s)?,
            Some(other) => {
                return Err(CodecError::UnexpectedKind {
                    expected: "String",
                    found: other.kind_name(),
                });
            }
            None => return Err(CodecError::MissingKey(ARRAY_TYPE_KEY)),
        };

        let payload = match table.get(VALUES_KEY) {
            Some(WireValue::Array(array)) => array.clone(),
            Some(other) => {
                return Err(CodecError::UnexpectedKind {
                    expected: "Array",
                    found: other.kind_name(),
                });
            }
            None => return Err(CodecError::MissingKey(VALUES_KEY)),
        };

        match shape {
            Shape::Array => Ok(Self::array(payload)),
            Shape::Grid => {
                let xy = table.get(DIMS_KEY).ok_or(CodecError::MissingKey(DIMS_KEY))?;
                Ok(Self::grid(dims_from_wire(xy)?, payload))
            }
        }
    }
}

fn dims_to_wire(dims: Dims) -> Result<WireValue, CodecError> {
    let out_of_range = || CodecError::InvalidDimensions {
        width: i64::from(dims.width),
        height: i64::from(dims.height),
    };
    let x = i32::try_from(dims.width).map_err(|_| out_of_range())?;
    let y = i32::try_from(dims.height).map_err(|_| out_of_range())?;

    let mut data = Vec::with_capacity(Point::WIDTH);
    Point::new(x, y).write_bytes(&mut data);
    Ok(WireValue::Custom {
        tag: POINT_TAG,
        data,
    })
}

fn dims_from_wire(value: &WireValue) -> Result<Dims, CodecError> {
    let WireValue::Custom { tag, data } = value else {
        return Err(CodecError::UnexpectedKind {
            expected: "Point",
            found: value.kind_name(),
        });
    };
    if *tag != POINT_TAG {
        return Err(CodecError::UnexpectedKind {
            expected: "Point",
            found: "Custom",
        });
    }
    if data.len() != Point::WIDTH {
        return Err(CodecError::SizeMismatch {
            tag: POINT_TAG,
            expected: Point::WIDTH,
            actual: data.len(),
        });
    }

    let point = Point::read_bytes(data);
    match (u32::try_from(point.x), u32::try_from(point.y)) {
        (Ok(width), Ok(height)) => Ok(Dims::new(width, height)),
        _ => Err(CodecError::InvalidDimensions {
            width: i64::from(point.x),
            height: i64::from(point.y),
        }),
    }
}
