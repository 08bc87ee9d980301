//! Core of the conversion API
//!
//! This module contains the capability traits through which typed values are
//! converted to and from the dynamic [`Map`] value:
//!
//!   * [`Decode`]: reconstruction of a typed value out of a `Map`
//!   * [`Encode`]: the non-failing projection of a statically-typed value into a `Map`
//!   * [`TryEncode`]: the failing projection, used for aggregates and for
//!     values whose concrete type is only known at run time
//!   * [`DecodeKey`], [`EncodeKey`] and [`TryEncodeKey`]: conversion of
//!     mapping keys to and from the `String` keys of [`Map::Dictionary`]
//!
//! A type that statically implements one of these traits is said to *support*
//! the corresponding capability. Where a value's type has been erased (see
//! [`crate::erased`]), support is instead checked at run time against a registry,
//! and a missing capability surfaces as one of the error cases in [`error`].
//!
//! Implementations for primitive types live in [`crate::prim`], those for
//! optionals, sequences and mappings in [`crate::composite`], and aggregates
//! obtain theirs through the derive macros `TryEncode` and `Decode`, which generate
//! implementations of the bridge traits in [`crate::aggregate`].

use crate::map::Map;

pub mod error;

pub use error::{DecodeError, DecodeResult, EncodeError, EncodeResult};

/// Trait for types that can be reconstructed from a [`Map`]
///
/// Implementations are defined by one required method, [`decode`], which either
/// produces a fully-formed value or fails with a [`DecodeError`]. Primitive types
/// require the active case of the `Map` to match exactly, with no coercion between
/// numeric and string cases.
///
/// The two provided methods describe how the type behaves in specific positions:
///   * [`decode_nil`] is consulted when an aggregate field is absent or `null`,
///     and returns the canonical empty value of the type, if it has one.
///   * [`decode_element`] is used for the elements of sequences and the values
///     of mappings; returning `Ok(None)` opts the element out, and it is then
///     silently skipped by the enclosing container.
///
/// # Example
///
/// ```
/// use cartograph::{dictionary, Decode, TryEncode};
///
/// #[derive(Debug, PartialEq, Decode, TryEncode)]
/// pub struct Person {
///     name: String,
///     age: i64,
/// }
///
/// let map = dictionary! { "name" => "Ada", "age" => 36i64 };
/// assert_eq!(
///     Person::decode(&map),
///     Ok(Person { name: "Ada".to_owned(), age: 36 })
/// );
/// ```
///
/// [`decode`]: Decode::decode
/// [`decode_nil`]: Decode::decode_nil
/// [`decode_element`]: Decode::decode_element
pub trait Decode: Sized {
    /// Attempt to interpret a value of type `Self` from a borrowed `Map`.
    ///
    /// # Errors
    ///
    /// Returns the first [`DecodeError`] encountered in a depth-first,
    /// left-to-right traversal of `map`.
    fn decode(map: &Map) -> DecodeResult<Self>;

    /// Returns the value that an absent or `null` aggregate field decodes to,
    /// or `None` if such a field is required.
    #[inline]
    fn decode_nil() -> Option<Self> {
        None
    }

    /// Decodes `map` as an element of an enclosing sequence or mapping.
    ///
    /// # Errors
    ///
    /// Errors are propagated from [`Decode::decode`] in the default implementation.
    #[inline]
    fn decode_element(map: &Map) -> DecodeResult<Option<Self>> {
        Self::decode(map).map(Some)
    }
}

/// Trait for types that can be constructed from the `String` key of a [`Map::Dictionary`]
///
/// Returning `None` opts the key, and with it the entire key-value pair, out of
/// the decoded mapping.
pub trait DecodeKey: Sized {
    fn decode_key(key: &str) -> Option<Self>;
}

/// Trait for statically-typed values with a total conversion into a [`Map`]
///
/// This is the non-failing path of the encode engine. It is implemented for
/// primitives, for `Map` itself, and for optionals, sequences and mappings
/// whose element types implement `Encode` in turn, so that the conversion
/// can be checked entirely at compile time.
pub trait Encode {
    #[must_use]
    fn encode(&self) -> Map;
}

/// Trait for key types with a total conversion into the `String` key of a [`Map::Dictionary`]
pub trait EncodeKey {
    #[must_use]
    fn encode_key(&self) -> String;
}

/// Trait for values whose conversion into a [`Map`] may fail at run time
///
/// This is the failing path of the encode engine. It is implemented by every
/// type that implements [`Encode`], by aggregates (through the derive macro
/// `TryEncode`), and by type-erased values such as [`Opaque`](crate::erased::Opaque),
/// whose capability is only known once their run-time type is inspected.
///
/// `TryEncode` is object-safe, and aggregates expose their fields as
/// `&dyn TryEncode` through [`Fields`](crate::aggregate::Fields).
pub trait TryEncode {
    /// # Errors
    ///
    /// Returns [`EncodeError::NotRepresentable`] naming the first run-time type
    /// encountered that lacks the capability, or [`EncodeError::NotKeyRepresentable`]
    /// for the first mapping key that cannot be converted.
    fn try_encode(&self) -> EncodeResult<Map>;
}

/// Fallible analogue of [`EncodeKey`]
pub trait TryEncodeKey {
    /// # Errors
    ///
    /// Returns [`EncodeError::NotKeyRepresentable`] when the run-time type of
    /// the key cannot be converted.
    fn try_encode_key(&self) -> EncodeResult<String>;
}

impl<T: TryEncode + ?Sized> TryEncode for &T {
    fn try_encode(&self) -> EncodeResult<Map> {
        (**self).try_encode()
    }
}

impl<T: TryEncode + ?Sized> TryEncode for Box<T> {
    fn try_encode(&self) -> EncodeResult<Map> {
        (**self).try_encode()
    }
}

impl<T: Encode + ?Sized> Encode for &T {
    fn encode(&self) -> Map {
        (**self).encode()
    }
}

impl<T: Encode + ?Sized> Encode for Box<T> {
    fn encode(&self) -> Map {
        (**self).encode()
    }
}

impl<T: Decode> Decode for Box<T> {
    fn decode(map: &Map) -> DecodeResult<Self> {
        T::decode(map).map(Box::new)
    }

    fn decode_nil() -> Option<Self> {
        T::decode_nil().map(Box::new)
    }

    fn decode_element(map: &Map) -> DecodeResult<Option<Self>> {
        Ok(T::decode_element(map)?.map(Box::new))
    }
}
