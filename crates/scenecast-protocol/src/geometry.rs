//! Built-in geometry types with reserved tags.
//!
//! | tag | type     | layout      | width |
//! |-----|----------|-------------|-------|
//! | 0   | [`Point`]  | 2 × i32     | 8     |
//! | 1   | [`Vec2`]   | 2 × f64     | 16    |
//! | 2   | [`Rect`]   | 4 × i32     | 16    |
//! | 3   | [`Circle`] | 3 × f64     | 24    |
//!
//! Fields are written in declaration order, little-endian.

use serde::{Deserialize, Serialize};

use crate::registry::CustomType;
use crate::types::TypeTag;

pub const POINT_TAG: TypeTag = TypeTag(0);
pub const VEC2_TAG: TypeTag = TypeTag(1);
pub const RECT_TAG: TypeTag = TypeTag(2);
pub const CIRCLE_TAG: TypeTag = TypeTag(3);

/// Integer 2-D point. Also used as the `xy` dimensions of a grid envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Floating-point 2-D vector.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned integer rectangle (top-left corner plus size).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }
}

/// Circle given by center and radius.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Circle {
    pub x: f64,
    pub y: f64,
    pub r: f64,
}

impl Circle {
    pub const fn new(x: f64, y: f64, r: f64) -> Self {
        Self { x, y, r }
    }
}

// ---------------------------------------------------------------------------
// Fixed-width helpers
// ---------------------------------------------------------------------------

/// Reads the `index`-th little-endian `i32` from `bytes`.
///
/// Callers guarantee `bytes.len()` covers the index (the registry checks
/// width before calling `read_bytes`).
pub(crate) fn read_i32(bytes: &[u8], index: usize) -> i32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[index * 4..index * 4 + 4]);
    i32::from_le_bytes(buf)
}

/// Reads the `index`-th little-endian `f64` from `bytes`.
pub(crate) fn read_f64(bytes: &[u8], index: usize) -> f64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[index * 8..index * 8 + 8]);
    f64::from_le_bytes(buf)
}

impl CustomType for Point {
    const NAME: &'static str = "Point";
    const WIDTH: usize = 8;

    fn write_bytes(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.x.to_le_bytes());
        out.extend_from_slice(&self.y.to_le_bytes());
    }

    fn read_bytes(bytes: &[u8]) -> Self {
        Self::new(read_i32(bytes, 0), read_i32(bytes, 1))
    }
}

impl CustomType for Vec2 {
    const NAME: &'static str = "Vec2";
    const WIDTH: usize = 16;

    fn write_bytes(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.x.to_le_bytes());
        out.extend_from_slice(&self.y.to_le_bytes());
    }

    fn read_bytes(bytes: &[u8]) -> Self {
        Self::new(read_f64(bytes, 0), read_f64(bytes, 1))
    }
}

impl CustomType for Rect {
    const NAME: &'static str = "Rect";
    const WIDTH: usize = 16;

    fn write_bytes(&self, out: &mut Vec<u8>) {
        for v in [self.x, self.y, self.w, self.h] {
            out.extend_from_slice(&v.to_le_bytes());
        }
    }

    fn read_bytes(bytes: &[u8]) -> Self {
        Self::new(
            read_i32(bytes, 0),
            read_i32(bytes, 1),
            read_i32(bytes, 2),
            read_i32(bytes, 3),
        )
    }
}

impl CustomType for Circle {
    const NAME: &'static str = "Circle";
    const WIDTH: usize = 24;

    fn write_bytes(&self, out: &mut Vec<u8>) {
        for v in [self.x, self.y, self.r] {
            out.extend_from_slice(&v.to_le_bytes());
        }
    }

    fn read_bytes(bytes: &[u8]) -> Self {
        Self::new(read_f64(bytes, 0), read_f64(bytes, 1), read_f64(bytes, 2))
    }
}
