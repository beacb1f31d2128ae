//! Core value types for Scenecast's typed event layer.
//!
//! These are the *decoded* shapes an application works with: scalars,
//! homogeneous sequences, row-major grids, and the [`WireMessage`] that
//! the dispatcher hands to a visitor. Their *encoded* counterparts live in
//! [`crate::wire`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CodecError;
use crate::registry::{CustomType, CustomValue};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Small integer identifying a registered custom value type on the wire.
///
/// Peers must agree on tag → type bindings for the whole session; tags
/// 0–3 are reserved for the built-in geometry types.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TypeTag(pub u8);

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Application-chosen identifier carried next to every raised event.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EventCode(pub u8);

impl fmt::Display for EventCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E-{}", self.0)
    }
}

/// A peer's number inside its current room, assigned on join.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerNumber(pub i32);

impl fmt::Display for PlayerNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Kinds
// ---------------------------------------------------------------------------

/// The scalar types the wire encodes natively (no registry involved).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveKind {
    Int32,
    Double,
    Float32,
    Bool,
    String,
}

impl PrimitiveKind {
    /// Stable name used in logs and error messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::Int32 => "Int32",
            Self::Double => "Double",
            Self::Float32 => "Float32",
            Self::Bool => "Bool",
            Self::String => "String",
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What the elements of a collection are: a primitive, or a registered
/// custom type identified by its tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    Primitive(PrimitiveKind),
    Custom(TypeTag),
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(kind) => write!(f, "{kind}"),
            Self::Custom(tag) => write!(f, "Custom({tag})"),
        }
    }
}

// ---------------------------------------------------------------------------
// Scalar
// ---------------------------------------------------------------------------

/// A single primitive value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Int32(i32),
    Double(f64),
    Float32(f32),
    Bool(bool),
    String(String),
}

impl Scalar {
    /// The primitive kind of this value.
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Self::Int32(_) => PrimitiveKind::Int32,
            Self::Double(_) => PrimitiveKind::Double,
            Self::Float32(_) => PrimitiveKind::Float32,
            Self::Bool(_) => PrimitiveKind::Bool,
            Self::String(_) => PrimitiveKind::String,
        }
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Self::Int32(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<f32> for Scalar {
    fn from(v: f32) -> Self {
        Self::Float32(v)
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Sequence
// ---------------------------------------------------------------------------

/// A homogeneous, ordered run of values: the payload of an array or grid.
///
/// One variant per primitive kind, plus `Custom` for registered types.
/// The custom variant carries its tag so an empty sequence still knows
/// what it is a sequence *of*.
#[derive(Debug, Clone, PartialEq)]
pub enum Sequence {
    Int32(Vec<i32>),
    Double(Vec<f64>),
    Float32(Vec<f32>),
    Bool(Vec<bool>),
    String(Vec<String>),
    Custom {
        tag: TypeTag,
        values: Vec<CustomValue>,
    },
}

impl Sequence {
    /// What the elements are.
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

    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            Self::Int32(v) => v.len(),
            Self::Double(v) => v.len(),
            Self::Float32(v) => v.len(),
            Self::Bool(v) => v.len(),
            Self::String(v) => v.len(),
            Self::Custom { values, .. } => values.len(),
        }
    }

    /// Returns `true` if there are no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Builds a custom sequence from already-wrapped values.
    pub fn custom(tag: TypeTag, values: Vec<CustomValue>) -> Self {
        Self::Custom { tag, values }
    }

    /// Extracts the elements as a primitive `Vec<T>`.
    ///
    /// Returns `None` if the sequence holds a different element kind.
    pub fn into_primitive<T: Primitive>(self) -> Option<Vec<T>> {
        T::from_sequence(self)
    }

    /// Extracts the elements as concrete custom values.
    ///
    /// Returns `None` for primitive sequences or if any element is not
    /// a `T`.
    pub fn into_custom<T: CustomType>(self) -> Option<Vec<T>> {
        match self {
            Self::Custom { values, .. } => values
                .iter()
                .map(|v| v.downcast_ref::<T>().cloned())
                .collect(),
            _ => None,
        }
    }
}

/// Rust types that map 1:1 onto a [`PrimitiveKind`].
///
/// Lets generic code move between `Vec<i32>` (etc.) and [`Sequence`]
/// without matching on every variant.
pub trait Primitive: Sized + Clone {
    /// The wire kind for this type.
    const KIND: PrimitiveKind;

    /// Wraps a vector into the matching [`Sequence`] variant.
    fn into_sequence(values: Vec<Self>) -> Sequence;

    /// Unwraps the matching [`Sequence`] variant.
    fn from_sequence(sequence: Sequence) -> Option<Vec<Self>>;
}

macro_rules! impl_primitive {
    ($ty:ty, $variant:ident) => {
        impl Primitive for $ty {
            const KIND: PrimitiveKind = PrimitiveKind::$variant;

            fn into_sequence(values: Vec<Self>) -> Sequence {
                Sequence::$variant(values)
            }

            fn from_sequence(sequence: Sequence) -> Option<Vec<Self>> {
                match sequence {
                    Sequence::$variant(values) => Some(values),
                    _ => None,
                }
            }
        }

        impl From<Vec<$ty>> for Sequence {
            fn from(values: Vec<$ty>) -> Self {
                Sequence::$variant(values)
            }
        }
    };
}

impl_primitive!(i32, Int32);
impl_primitive!(f64, Double);
impl_primitive!(f32, Float32);
impl_primitive!(bool, Bool);
impl_primitive!(String, String);

// ---------------------------------------------------------------------------
// Dims & Grid
// ---------------------------------------------------------------------------

/// Width and height of a 2-D grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Dims {
    pub width: u32,
    pub height: u32,
}

impl Dims {
    /// Creates a new `Dims`.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of cells, `width * height`.
    pub fn area(self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Fails with [`CodecError::DimensionMismatch`] unless `len` equals
    /// the area.
    pub fn check(self, len: usize) -> Result<(), CodecError> {
        if self.area() == len {
            Ok(())
        } else {
            Err(CodecError::DimensionMismatch {
                width: self.width,
                height: self.height,
                expected: self.area(),
                actual: len,
            })
        }
    }
}

impl fmt::Display for Dims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A row-major 2-D container.
///
/// The invariant `cells.len() == width * height` is checked on
/// construction and can't be broken afterwards (fields are private).
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    dims: Dims,
    cells: Vec<T>,
}

impl<T> Grid<T> {
    /// Builds a grid from row-major cells.
    ///
    /// # Errors
    /// [`CodecError::DimensionMismatch`] if `cells.len() != width * height`.
    pub fn new(width: u32, height: u32, cells: Vec<T>) -> Result<Self, CodecError> {
        let dims = Dims::new(width, height);
        dims.check(cells.len())?;
        Ok(Self { dims, cells })
    }

    /// Builds a grid by calling `f(x, y)` for every cell, row by row.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> T) -> Self {
        let mut cells = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                cells.push(f(x, y));
            }
        }
        Self {
            dims: Dims::new(width, height),
            cells,
        }
    }

    pub fn dims(&self) -> Dims {
        self.dims
    }

    pub fn width(&self) -> u32 {
        self.dims.width
    }

    pub fn height(&self) -> u32 {
        self.dims.height
    }

    /// The cell at column `x`, row `y`.
    pub fn get(&self, x: u32, y: u32) -> Option<&T> {
        if x >= self.dims.width || y >= self.dims.height {
            return None;
        }
        self.cells
            .get(y as usize * self.dims.width as usize + x as usize)
    }

    /// Iterates rows top to bottom. A zero-width grid has no rows.
    pub fn rows(&self) -> impl Iterator<Item = &[T]> {
        self.cells.chunks(self.dims.width.max(1) as usize)
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> &[T] {
        &self.cells
    }

    pub fn into_cells(self) -> Vec<T> {
        self.cells
    }
}

// ---------------------------------------------------------------------------
// WireMessage
// ---------------------------------------------------------------------------

/// The resolved form of an inbound event, handed to exactly one visitor
/// call by the [`EventDispatcher`](crate::EventDispatcher).
#[derive(Debug, Clone, PartialEq)]
pub enum WireMessage {
    /// A native primitive value.
    Scalar(Scalar),
    /// One value of a registered custom type.
    Custom(CustomValue),
    /// A homogeneous array.
    Array(Sequence),
    /// A row-major grid.
    Grid { dims: Dims, values: Sequence },
}

impl WireMessage {
    /// Short description for logs, e.g. `"Array<Int32>[3]"`.
    pub fn describe(&self) -> String {
        match self {
            Self::Scalar(s) => format!("{}", s.kind()),
            Self::Custom(v) => v.type_name().to_owned(),
            Self::Array(seq) => format!("Array<{}>[{}]", seq.element_kind(), seq.len()),
            Self::Grid { dims, values } => {
                format!("Grid<{}>[{dims}]", values.element_kind())
            }
        }
    }

    /// Converts a grid message of primitives into a typed [`Grid`].
    pub fn into_primitive_grid<T: Primitive>(self) -> Option<Grid<T>> {
        match self {
            Self::Grid { dims, values } => {
                let cells = values.into_primitive::<T>()?;
                Grid::new(dims.width, dims.height, cells).ok()
            }
            _ => None,
        }
    }

    /// Converts a grid message of custom values into a typed [`Grid`].
    pub fn into_custom_grid<T: CustomType>(self) -> Option<Grid<T>> {
        match self {
            Self::Grid { dims, values } => {
                let cells = values.into_custom::<T>()?;
                Grid::new(dims.width, dims.height, cells).ok()
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_serializes_as_plain_number() {
        let json = serde_json::to_string(&TypeTag(3)).unwrap();
        assert_eq!(json, "3");
    }

    #[test]
    fn test_identity_display() {
        assert_eq!(TypeTag(2).to_string(), "#2");
        assert_eq!(EventCode(7).to_string(), "E-7");
        assert_eq!(PlayerNumber(1).to_string(), "N-1");
    }

    #[test]
    fn test_scalar_kind_matches_variant() {
        assert_eq!(Scalar::from(1).kind(), PrimitiveKind::Int32);
        assert_eq!(Scalar::from(1.5f64).kind(), PrimitiveKind::Double);
        assert_eq!(Scalar::from(1.5f32).kind(), PrimitiveKind::Float32);
        assert_eq!(Scalar::from(true).kind(), PrimitiveKind::Bool);
        assert_eq!(Scalar::from("hi").kind(), PrimitiveKind::String);
    }

    #[test]
    fn test_sequence_element_kind_and_len() {
        let seq = Sequence::from(vec![1.0f32, 2.0, 3.0]);
        assert_eq!(seq.element_kind(), ElementKind::Primitive(PrimitiveKind::Float32));
        assert_eq!(seq.len(), 3);
        assert!(!seq.is_empty());

        let empty = Sequence::custom(TypeTag(1), vec![]);
        assert_eq!(empty.element_kind(), ElementKind::Custom(TypeTag(1)));
        assert!(empty.is_empty());
    }

    #[test]
    fn test_into_primitive_rejects_other_kinds() {
        let seq = Sequence::from(vec![true, false]);
        assert_eq!(seq.clone().into_primitive::<bool>(), Some(vec![true, false]));
        assert_eq!(seq.into_primitive::<i32>(), None);
    }

    #[test]
    fn test_grid_new_checks_area() {
        assert!(Grid::new(2, 3, vec![0; 6]).is_ok());
        let err = Grid::new(2, 3, vec![0; 5]).unwrap_err();
        assert_eq!(
            err,
            CodecError::DimensionMismatch {
                width: 2,
                height: 3,
                expected: 6,
                actual: 5
            }
        );
    }

    #[test]
    fn test_grid_is_row_major() {
        let grid = Grid::from_fn(3, 2, |x, y| (y * 10 + x) as i32);
        assert_eq!(grid.cells(), &[0, 1, 2, 10, 11, 12]);
        assert_eq!(grid.get(2, 1), Some(&12));
        assert_eq!(grid.get(3, 0), None);

        let rows: Vec<&[i32]> = grid.rows().collect();
        assert_eq!(rows, vec![&[0, 1, 2][..], &[10, 11, 12][..]]);
    }

    #[test]
    fn test_empty_grid_has_no_rows() {
        let grid: Grid<i32> = Grid::new(0, 4, vec![]).unwrap();
        assert_eq!(grid.rows().count(), 0);
        assert_eq!(grid.dims().area(), 0);
    }

    #[test]
    fn test_describe_message() {
        let msg = WireMessage::Array(Sequence::from(vec![1, 2, 3]));
        assert_eq!(msg.describe(), "Array<Int32>[3]");

        let msg = WireMessage::Grid {
            dims: Dims::new(2, 1),
            values: Sequence::from(vec![String::new(), String::new()]),
        };
        assert_eq!(msg.describe(), "Grid<String>[2x1]");
    }

    #[test]
    fn test_into_primitive_grid() {
        let msg = WireMessage::Grid {
            dims: Dims::new(2, 2),
            values: Sequence::from(vec![1, 2, 3, 4]),
        };
        let grid = msg.into_primitive_grid::<i32>().unwrap();
        assert_eq!(grid.get(1, 1), Some(&4));
    }
}
