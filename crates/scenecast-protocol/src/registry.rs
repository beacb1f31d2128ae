//! Tag → descriptor registry for fixed-width custom value types.
//!
//! Every non-primitive value that crosses the wire is a registered
//! *custom type*: a Rust type implementing [`CustomType`] bound to a
//! [`TypeTag`]. The registry owns one [`TypeDescriptor`] per tag and is the
//! only place tags are resolved, so an unknown tag is always a
//! [`CodecError`] rather than a guess.
//!
//! ```text
//! Point { x: 3, y: 4 }  ──wrap──▶  CustomValue(#0)  ──encode──▶  [03 00 00 00 04 00 00 00]
//!                                                   ◀──decode──
//! ```
//!
//! The registry is an ordinary value, not a process global: each
//! [`SceneTransitionManager`] owns one, and tests build their own.

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::error::CodecError;
use crate::geometry::{CIRCLE_TAG, Circle, POINT_TAG, Point, RECT_TAG, Rect, VEC2_TAG, Vec2};
use crate::types::TypeTag;

// ---------------------------------------------------------------------------
// CustomType
// ---------------------------------------------------------------------------

/// A plain-data type with a fixed-width byte layout.
///
/// `write_bytes` must append exactly `WIDTH` bytes, and `read_bytes` is
/// only ever handed a slice of exactly `WIDTH` bytes (the registry checks
/// this before calling it).
///
/// ```rust
/// use scenecast_protocol::CustomType;
///
/// #[derive(Debug, Clone, PartialEq)]
/// struct Score(u32);
///
/// impl CustomType for Score {
///     const NAME: &'static str = "Score";
///     const WIDTH: usize = 4;
///
///     fn write_bytes(&self, out: &mut Vec<u8>) {
///         out.extend_from_slice(&self.0.to_le_bytes());
///     }
///
///     fn read_bytes(bytes: &[u8]) -> Self {
///         let mut buf = [0u8; 4];
///         buf.copy_from_slice(bytes);
///         Score(u32::from_le_bytes(buf))
///     }
/// }
/// ```
pub trait CustomType: Any + Clone + fmt::Debug + Send + Sync {
    /// Human-readable type name, used in logs and errors.
    const NAME: &'static str;
    /// Exact encoded size in bytes.
    const WIDTH: usize;

    /// Appends this value's bytes to `out`.
    fn write_bytes(&self, out: &mut Vec<u8>);

    /// Rebuilds a value from exactly `WIDTH` bytes.
    fn read_bytes(bytes: &[u8]) -> Self;
}

/// Object-safe view of a `CustomType`, so [`CustomValue`] can hold any of
/// them behind one box.
trait ErasedValue: Any + fmt::Debug + Send + Sync {
    fn clone_boxed(&self) -> Box<dyn ErasedValue>;
    fn as_any(&self) -> &dyn Any;
    fn type_name(&self) -> &'static str;
    fn write_erased(&self, out: &mut Vec<u8>);
}

impl<T: CustomType> ErasedValue for T {
    fn clone_boxed(&self) -> Box<dyn ErasedValue> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        T::NAME
    }

    fn write_erased(&self, out: &mut Vec<u8>) {
        self.write_bytes(out);
    }
}

// ---------------------------------------------------------------------------
// CustomValue
// ---------------------------------------------------------------------------

/// One value of some registered custom type, tagged.
///
/// Equality is raw: two values are equal when their tags match and their
/// encoded bytes are identical (so `NaN == NaN` if the bits agree, and
/// `0.0 != -0.0`).
pub struct CustomValue {
    tag: TypeTag,
    inner: Box<dyn ErasedValue>,
}

impl CustomValue {
    /// Tags `value` with `tag`.
    ///
    /// Nothing is checked here; [`TypeRegistry::encode`] rejects a value
    /// whose Rust type differs from the one registered under `tag`. Prefer
    /// [`TypeRegistry::wrap`], which looks the tag up for you.
    pub fn new<T: CustomType>(tag: TypeTag, value: T) -> Self {
        Self {
            tag,
            inner: Box::new(value),
        }
    }

    pub fn tag(&self) -> TypeTag {
        self.tag
    }

    /// The `CustomType::NAME` of the wrapped value.
    pub fn type_name(&self) -> &'static str {
        self.inner.type_name()
    }

    /// Borrows the wrapped value as a `T`, if that is what it is.
    pub fn downcast_ref<T: CustomType>(&self) -> Option<&T> {
        self.inner.as_any().downcast_ref::<T>()
    }

    fn raw_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.inner.write_erased(&mut out);
        out
    }

    fn is<T: CustomType>(&self) -> bool {
        self.inner.as_any().type_id() == TypeId::of::<T>()
    }
}

impl Clone for CustomValue {
    fn clone(&self) -> Self {
        Self {
            tag: self.tag,
            inner: self.inner.clone_boxed(),
        }
    }
}

impl fmt::Debug for CustomValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomValue")
            .field("tag", &self.tag)
            .field("value", &self.inner)
            .finish()
    }
}

impl PartialEq for CustomValue {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag
            && self.type_name() == other.type_name()
            && self.raw_bytes() == other.raw_bytes()
    }
}

// ---------------------------------------------------------------------------
// TypeDescriptor
// ---------------------------------------------------------------------------

type EncodeFn = fn(&CustomValue, &mut Vec<u8>) -> Result<(), CodecError>;
type DecodeFn = fn(TypeTag, &[u8]) -> CustomValue;
type EqualsFn = fn(&CustomValue, &CustomValue) -> bool;

/// How to encode, decode, and compare values of one registered type.
#[derive(Clone)]
pub struct TypeDescriptor {
    tag: TypeTag,
    name: &'static str,
    width: usize,
    type_id: TypeId,
    encode: EncodeFn,
    decode: DecodeFn,
    equals: EqualsFn,
}

impl TypeDescriptor {
    /// Builds the descriptor for `T` under `tag`.
    pub fn of<T: CustomType>(tag: TypeTag) -> Self {
        Self {
            tag,
            name: T::NAME,
            width: T::WIDTH,
            type_id: TypeId::of::<T>(),
            encode: encode_as::<T>,
            decode: decode_as::<T>,
            equals: equals_as::<T>,
        }
    }

    pub fn tag(&self) -> TypeTag {
        self.tag
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn width(&self) -> usize {
        self.width
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("tag", &self.tag)
            .field("name", &self.name)
            .field("width", &self.width)
            .finish_non_exhaustive()
    }
}

fn encode_as<T: CustomType>(value: &CustomValue, out: &mut Vec<u8>) -> Result<(), CodecError> {
    let typed = value
        .downcast_ref::<T>()
        .ok_or(CodecError::ValueMismatch {
            tag: value.tag(),
            expected: T::NAME,
            found: value.type_name(),
        })?;
    typed.write_bytes(out);
    Ok(())
}

fn decode_as<T: CustomType>(tag: TypeTag, bytes: &[u8]) -> CustomValue {
    CustomValue::new(tag, T::read_bytes(bytes))
}

fn equals_as<T: CustomType>(a: &CustomValue, b: &CustomValue) -> bool {
    a.is::<T>() && b.is::<T>() && a.raw_bytes() == b.raw_bytes()
}

// ---------------------------------------------------------------------------
// TypeRegistry
// ---------------------------------------------------------------------------

/// Owns every tag → [`TypeDescriptor`] binding for one session.
#[derive(Debug, Default, Clone)]
pub struct TypeRegistry {
    descriptors: BTreeMap<TypeTag, TypeDescriptor>,
    tags: HashMap<TypeId, TypeTag>,
}

impl TypeRegistry {
    /// An empty registry. Even the geometry tags are free.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the four geometry types bound to tags 0–3.
    pub fn with_geometry() -> Self {
        let mut registry = Self::new();
        registry.insert(TypeDescriptor::of::<Point>(POINT_TAG));
        registry.insert(TypeDescriptor::of::<Vec2>(VEC2_TAG));
        registry.insert(TypeDescriptor::of::<Rect>(RECT_TAG));
        registry.insert(TypeDescriptor::of::<Circle>(CIRCLE_TAG));
        registry
    }

    /// Adds a descriptor.
    ///
    /// # Errors
    /// [`CodecError::DuplicateType`] if the tag is taken. The existing
    /// binding is left untouched.
    pub fn register(&mut self, descriptor: TypeDescriptor) -> Result<(), CodecError> {
        if self.descriptors.contains_key(&descriptor.tag) {
            tracing::warn!(
                tag = %descriptor.tag,
                name = descriptor.name,
                "duplicate type registration rejected"
            );
            return Err(CodecError::DuplicateType(descriptor.tag));
        }
        self.insert(descriptor);
        Ok(())
    }

    /// Registers `T` under `tag`.
    pub fn register_type<T: CustomType>(&mut self, tag: TypeTag) -> Result<(), CodecError> {
        self.register(TypeDescriptor::of::<T>(tag))
    }

    fn insert(&mut self, descriptor: TypeDescriptor) {
        tracing::debug!(
            tag = %descriptor.tag,
            name = descriptor.name,
            width = descriptor.width,
            "type registered"
        );
        self.tags.entry(descriptor.type_id).or_insert(descriptor.tag);
        self.descriptors.insert(descriptor.tag, descriptor);
    }

    /// Removes the binding for `tag` and returns its descriptor.
    ///
    /// If the same Rust type is still bound under other tags, [`wrap`]
    /// moves to the lowest of them.
    ///
    /// [`wrap`]: Self::wrap
    ///
    /// # Errors
    /// [`CodecError::UnknownType`] if nothing is registered under `tag`.
    pub fn unregister(&mut self, tag: TypeTag) -> Result<TypeDescriptor, CodecError> {
        let descriptor = self
            .descriptors
            .remove(&tag)
            .ok_or(CodecError::UnknownType(tag))?;

        if self.tags.get(&descriptor.type_id) == Some(&tag) {
            let remaining = self
                .descriptors
                .values()
                .find(|d| d.type_id == descriptor.type_id)
                .map(|d| d.tag);
            match remaining {
                Some(other) => {
                    tracing::debug!(
                        from = %tag,
                        to = %other,
                        name = descriptor.name,
                        "type rebound"
                    );
                    self.tags.insert(descriptor.type_id, other);
                }
                None => {
                    self.tags.remove(&descriptor.type_id);
                }
            }
        }
        tracing::debug!(%tag, name = descriptor.name, "type unregistered");
        Ok(descriptor)
    }

    /// Drops every binding.
    pub fn clear(&mut self) {
        tracing::debug!(count = self.descriptors.len(), "type registry cleared");
        self.descriptors.clear();
        self.tags.clear();
    }

    pub fn contains(&self, tag: TypeTag) -> bool {
        self.descriptors.contains_key(&tag)
    }

    pub fn get(&self, tag: TypeTag) -> Option<&TypeDescriptor> {
        self.descriptors.get(&tag)
    }

    /// Registered name for `tag`.
    pub fn name_of(&self, tag: TypeTag) -> Option<&'static str> {
        self.descriptors.get(&tag).map(|d| d.name)
    }

    /// The tag `T` was first registered under.
    pub fn tag_of<T: CustomType>(&self) -> Option<TypeTag> {
        self.tags.get(&TypeId::of::<T>()).copied()
    }

    /// Wraps `value` with the tag its type is registered under.
    ///
    /// # Errors
    /// [`CodecError::UnboundType`] if `T` was never registered.
    pub fn wrap<T: CustomType>(&self, value: T) -> Result<CustomValue, CodecError> {
        let tag = self.tag_of::<T>().ok_or(CodecError::UnboundType(T::NAME))?;
        Ok(CustomValue::new(tag, value))
    }

    /// Encodes `value` into exactly `width` bytes.
    ///
    /// # Errors
    /// - [`CodecError::UnknownType`]: the value's tag is unregistered.
    /// - [`CodecError::ValueMismatch`]: the tag belongs to another type.
    /// - [`CodecError::SizeMismatch`]: the type wrote the wrong byte count.
    pub fn encode(&self, value: &CustomValue) -> Result<Vec<u8>, CodecError> {
        let descriptor = self.lookup(value.tag())?;
        let mut out = Vec::with_capacity(descriptor.width);
        (descriptor.encode)(value, &mut out)?;
        if out.len() != descriptor.width {
            return Err(CodecError::SizeMismatch {
                tag: descriptor.tag,
                expected: descriptor.width,
                actual: out.len(),
            });
        }
        Ok(out)
    }

    /// Rebuilds a value from its tag and bytes.
    ///
    /// # Errors
    /// [`CodecError::UnknownType`] or [`CodecError::SizeMismatch`].
    pub fn decode(&self, tag: TypeTag, bytes: &[u8]) -> Result<CustomValue, CodecError> {
        let descriptor = self.lookup(tag)?;
        if bytes.len() != descriptor.width {
            return Err(CodecError::SizeMismatch {
                tag,
                expected: descriptor.width,
                actual: bytes.len(),
            });
        }
        Ok((descriptor.decode)(tag, bytes))
    }

    /// Raw comparison of two values of the same registered type.
    ///
    /// Values with different tags are never equal.
    ///
    /// # Errors
    /// [`CodecError::UnknownType`] if `a`'s tag is unregistered.
    pub fn equals(&self, a: &CustomValue, b: &CustomValue) -> Result<bool, CodecError> {
        let descriptor = self.lookup(a.tag())?;
        Ok(a.tag() == b.tag() && (descriptor.equals)(a, b))
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Registered tags in ascending order.
    pub fn tags(&self) -> impl Iterator<Item = TypeTag> + '_ {
        self.descriptors.keys().copied()
    }

    fn lookup(&self, tag: TypeTag) -> Result<&TypeDescriptor, CodecError> {
        self.descriptors.get(&tag).ok_or(CodecError::UnknownType(tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Score(u32);

    impl CustomType for Score {
        const NAME: &'static str = "Score";
        const WIDTH: usize = 4;

        fn write_bytes(&self, out: &mut Vec<u8>) {
            out.extend_from_slice(&self.0.to_le_bytes());
        }

        fn read_bytes(bytes: &[u8]) -> Self {
            let mut buf = [0u8; 4];
            buf.copy_from_slice(bytes);
            Score(u32::from_le_bytes(buf))
        }
    }

    /// Lies about its width.
    #[derive(Debug, Clone)]
    struct Short;

    impl CustomType for Short {
        const NAME: &'static str = "Short";
        const WIDTH: usize = 4;

        fn write_bytes(&self, out: &mut Vec<u8>) {
            out.push(1);
        }

        fn read_bytes(_bytes: &[u8]) -> Self {
            Short
        }
    }

    #[test]
    fn test_geometry_registry_has_reserved_tags() {
        let registry = TypeRegistry::with_geometry();
        assert_eq!(registry.len(), 4);
        assert_eq!(registry.name_of(POINT_TAG), Some("Point"));
        assert_eq!(registry.name_of(CIRCLE_TAG), Some("Circle"));
        assert_eq!(registry.tag_of::<Rect>(), Some(RECT_TAG));
        assert_eq!(registry.get(VEC2_TAG).map(|d| d.width()), Some(16));
    }

    #[test]
    fn test_duplicate_register_keeps_first() {
        let mut registry = TypeRegistry::with_geometry();
        let err = registry.register_type::<Score>(POINT_TAG).unwrap_err();
        assert_eq!(err, CodecError::DuplicateType(POINT_TAG));
        assert_eq!(registry.name_of(POINT_TAG), Some("Point"));
        assert_eq!(registry.tag_of::<Score>(), None);
    }

    #[test]
    fn test_custom_round_trip() {
        let mut registry = TypeRegistry::new();
        registry.register_type::<Score>(TypeTag(10)).unwrap();

        let value = registry.wrap(Score(77)).unwrap();
        let bytes = registry.encode(&value).unwrap();
        assert_eq!(bytes, 77u32.to_le_bytes());

        let back = registry.decode(TypeTag(10), &bytes).unwrap();
        assert_eq!(back.downcast_ref::<Score>(), Some(&Score(77)));
        assert!(registry.equals(&value, &back).unwrap());
    }

    #[test]
    fn test_decode_wrong_width() {
        let registry = TypeRegistry::with_geometry();
        let err = registry.decode(POINT_TAG, &[0; 7]).unwrap_err();
        assert_eq!(
            err,
            CodecError::SizeMismatch {
                tag: POINT_TAG,
                expected: 8,
                actual: 7
            }
        );
    }

    #[test]
    fn test_encode_short_write_is_size_mismatch() {
        let mut registry = TypeRegistry::new();
        registry.register_type::<Short>(TypeTag(5)).unwrap();
        let value = registry.wrap(Short).unwrap();
        assert!(matches!(
            registry.encode(&value),
            Err(CodecError::SizeMismatch { actual: 1, .. })
        ));
    }

    #[test]
    fn test_encode_value_under_foreign_tag() {
        let registry = TypeRegistry::with_geometry();
        let value = CustomValue::new(POINT_TAG, Vec2::new(1.0, 2.0));
        let err = registry.encode(&value).unwrap_err();
        assert_eq!(
            err,
            CodecError::ValueMismatch {
                tag: POINT_TAG,
                expected: "Point",
                found: "Vec2"
            }
        );
    }

    #[test]
    fn test_wrap_unbound_type() {
        let registry = TypeRegistry::with_geometry();
        assert_eq!(
            registry.wrap(Score(1)).unwrap_err(),
            CodecError::UnboundType("Score")
        );
    }

    #[test]
    fn test_unregister_then_decode_fails() {
        let mut registry = TypeRegistry::with_geometry();
        registry.unregister(CIRCLE_TAG).unwrap();
        assert!(!registry.contains(CIRCLE_TAG));
        assert_eq!(registry.tag_of::<Circle>(), None);
        assert_eq!(
            registry.decode(CIRCLE_TAG, &[0; 24]).unwrap_err(),
            CodecError::UnknownType(CIRCLE_TAG)
        );
        assert_eq!(
            registry.unregister(CIRCLE_TAG).unwrap_err(),
            CodecError::UnknownType(CIRCLE_TAG)
        );
    }

    #[test]
    fn test_unregister_rebinds_type_under_remaining_tag() {
        let mut registry = TypeRegistry::new();
        registry.register_type::<Score>(TypeTag(12)).unwrap();
        registry.register_type::<Score>(TypeTag(10)).unwrap();
        registry.register_type::<Score>(TypeTag(11)).unwrap();
        assert_eq!(registry.tag_of::<Score>(), Some(TypeTag(12)));

        registry.unregister(TypeTag(12)).unwrap();
        assert_eq!(registry.tag_of::<Score>(), Some(TypeTag(10)));
        let value = registry.wrap(Score(7)).unwrap();
        assert_eq!(value.tag(), TypeTag(10));
        assert_eq!(registry.encode(&value).unwrap(), 7u32.to_le_bytes().to_vec());

        // Dropping a tag the type is not wrapped under changes nothing.
        registry.unregister(TypeTag(11)).unwrap();
        assert_eq!(registry.tag_of::<Score>(), Some(TypeTag(10)));

        registry.unregister(TypeTag(10)).unwrap();
        assert_eq!(registry.tag_of::<Score>(), None);
    }

    #[test]
    fn test_clear_empties_everything() {
        let mut registry = TypeRegistry::with_geometry();
        registry.clear();
        assert!(registry.is_empty());
        assert_eq!(registry.tag_of::<Point>(), None);
    }

    #[test]
    fn test_equals_is_raw() {
        let registry = TypeRegistry::with_geometry();
        let nan = f64::NAN;
        let a = registry.wrap(Vec2::new(nan, 0.0)).unwrap();
        let b = registry.wrap(Vec2::new(nan, 0.0)).unwrap();
        assert!(registry.equals(&a, &b).unwrap());

        let c = registry.wrap(Vec2::new(0.0, 0.0)).unwrap();
        let d = registry.wrap(Vec2::new(-0.0, 0.0)).unwrap();
        assert!(!registry.equals(&c, &d).unwrap());
    }

    #[test]
    fn test_equals_different_tags() {
        let registry = TypeRegistry::with_geometry();
        let a = registry.wrap(Point::new(0, 0)).unwrap();
        let b = registry.wrap(Rect::new(0, 0, 0, 0)).unwrap();
        assert!(!registry.equals(&a, &b).unwrap());
    }
}
