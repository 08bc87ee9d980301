//! The dynamic interchange value
//!
//! This module defines [`Map`], the tagged value that serves as the sole boundary
//! between application types and concrete wire formats. A format reader produces
//! a `Map`, a format writer consumes one, and the [`Decode`](crate::Decode) and
//! [`Encode`](crate::Encode) traits convert between a `Map` and typed Rust values.
//!
//! A `Map` has exactly eight shapes, enumerated by [`MapKind`]. Containers own their
//! children exclusively, so cloning a `Map` clones the entire subtree; none of the
//! conversion routines in this crate mutate a `Map` they are handed.
//!
//! # `Dictionary`
//!
//! The dictionary case is keyed by `String`. Its backing container is selected at
//! compile time: a [`HashMap`](std::collections::HashMap) by default, or a
//! [`BTreeMap`](std::collections::BTreeMap) when the `ordered_dictionary` feature is
//! enabled. In both cases equality ignores insertion order.

use std::fmt::{Display, Formatter, Result};
use std::ops::{Deref, DerefMut};

cfg_if::cfg_if! {
    if #[cfg(feature = "ordered_dictionary")] {
        /// Backing container of the [`Map::Dictionary`] case
        ///
        /// When the `ordered_dictionary` feature is set, this alias points
        /// to `BTreeMap<String, Map>`, which iterates in key order.
        pub type Dictionary = std::collections::BTreeMap<String, Map>;
    } else {
        /// Backing container of the [`Map::Dictionary`] case
        ///
        /// When the `ordered_dictionary` feature is set, this alias points
        /// to `BTreeMap<String, Map>`.
        ///
        /// Otherwise, it will default to `HashMap<String, Map>`
        pub type Dictionary = std::collections::HashMap<String, Map>;
    }
}

/// Variable-length binary payload
///
/// `Bytes` is a newtype around `Vec<u8>` that is converted to and from
/// [`Map::Binary`]. It exists so that an opaque byte-string is never
/// confused with a sequence of small integers.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Bytes(Vec<u8>);

impl Bytes {
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Destructs a `Bytes` value and returns the underlying vector
    #[inline]
    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }

    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        self.0.as_slice()
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Bytes {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl From<Bytes> for Vec<u8> {
    fn from(bytes: Bytes) -> Self {
        bytes.0
    }
}

impl Deref for Bytes {
    type Target = Vec<u8>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Bytes {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl Display for Bytes {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.write_str("0x")?;
        for byte in self.0.iter() {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Format-agnostic interchange value
///
/// Exactly one case is active at a time; see [`Map::kind`].
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Map {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    Binary(Bytes),
    /// Ordered sequence; element order is significant
    Array(Vec<Map>),
    /// String-keyed mapping; key order is not significant
    Dictionary(Dictionary),
}

/// Discriminant of a [`Map`] value, without its payload
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MapKind {
    Null,
    Bool,
    Int,
    Double,
    String,
    Binary,
    Array,
    Dictionary,
}

impl Display for MapKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.write_str(match self {
            MapKind::Null => "null",
            MapKind::Bool => "bool",
            MapKind::Int => "int",
            MapKind::Double => "double",
            MapKind::String => "string",
            MapKind::Binary => "binary",
            MapKind::Array => "array",
            MapKind::Dictionary => "dictionary",
        })
    }
}

/// Borrowed view of the payload underneath a [`Map`]
///
/// This is returned by [`Map::get`] and is intended for diagnostics only,
/// most notably the `source` of [`DecodeError::CannotInitialize`](crate::conv::error::DecodeError::CannotInitialize).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Raw<'a> {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(&'a str),
    Binary(&'a [u8]),
    Array(&'a [Map]),
    Dictionary(&'a Dictionary),
}

impl Display for Raw<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match *self {
            Raw::Null => f.write_str("null"),
            Raw::Bool(b) => write!(f, "{}", b),
            Raw::Int(i) => write!(f, "{}", i),
            Raw::Double(d) => write!(f, "{:?}", d),
            Raw::String(s) => write!(f, "{:?}", s),
            Raw::Binary(bytes) => {
                f.write_str("0x")?;
                for byte in bytes {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
            Raw::Array(elems) => {
                f.write_str("[")?;
                for (ix, elem) in elems.iter().enumerate() {
                    if ix > 0 {
                        f.write_str(", ")?;
                    }
                    Display::fmt(elem, f)?;
                }
                f.write_str("]")
            }
            Raw::Dictionary(dict) => {
                f.write_str("{")?;
                for (ix, (key, value)) in dict.iter().enumerate() {
                    if ix > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{:?}: {}", key, value)?;
                }
                f.write_str("}")
            }
        }
    }
}

impl Map {
    /// Returns the discriminant of the active case
    #[must_use]
    pub const fn kind(&self) -> MapKind {
        match self {
            Map::Null => MapKind::Null,
            Map::Bool(_) => MapKind::Bool,
            Map::Int(_) => MapKind::Int,
            Map::Double(_) => MapKind::Double,
            Map::String(_) => MapKind::String,
            Map::Binary(_) => MapKind::Binary,
            Map::Array(_) => MapKind::Array,
            Map::Dictionary(_) => MapKind::Dictionary,
        }
    }

    /// Returns a borrowed view of the innermost payload
    #[must_use]
    pub fn get(&self) -> Raw<'_> {
        match self {
            Map::Null => Raw::Null,
            Map::Bool(b) => Raw::Bool(*b),
            Map::Int(i) => Raw::Int(*i),
            Map::Double(d) => Raw::Double(*d),
            Map::String(s) => Raw::String(s.as_str()),
            Map::Binary(bytes) => Raw::Binary(bytes.as_slice()),
            Map::Array(elems) => Raw::Array(elems.as_slice()),
            Map::Dictionary(dict) => Raw::Dictionary(dict),
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Map::Null)
    }

    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Map::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Map::Int(i) => Some(*i),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_double(&self) -> Option<f64> {
        match self {
            Map::Double(d) => Some(*d),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Map::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Map::Binary(bytes) => Some(bytes.as_slice()),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&[Map]> {
        match self {
            Map::Array(elems) => Some(elems.as_slice()),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_dictionary(&self) -> Option<&Dictionary> {
        match self {
            Map::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }

    /// Looks up `key` in a dictionary value, treating an absent key as [`Map::Null`].
    ///
    /// Returns `None` only when `self` is not a dictionary.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Map> {
        static NULL: Map = Map::Null;
        self.as_dictionary().map(|dict| dict.get(key).unwrap_or(&NULL))
    }
}

impl Display for Map {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        Display::fmt(&self.get(), f)
    }
}

macro_rules! impl_from_payload {
    ($($t:ty => $case:ident),* $(,)?) => {
        $(
            impl From<$t> for Map {
                fn from(val: $t) -> Self {
                    Map::$case(val.into())
                }
            }
        )*
    };
}

impl_from_payload! {
    bool => Bool,
    i64 => Int,
    f64 => Double,
    String => String,
    &str => String,
    Bytes => Binary,
    Vec<Map> => Array,
    Dictionary => Dictionary,
}

impl<T: Into<Map>> From<Option<T>> for Map {
    fn from(val: Option<T>) -> Self {
        val.map_or(Map::Null, Into::into)
    }
}

impl FromIterator<Map> for Map {
    fn from_iter<I: IntoIterator<Item = Map>>(iter: I) -> Self {
        Map::Array(iter.into_iter().collect())
    }
}

impl FromIterator<(String, Map)> for Map {
    fn from_iter<I: IntoIterator<Item = (String, Map)>>(iter: I) -> Self {
        Map::Dictionary(iter.into_iter().collect())
    }
}

/// Constructs a [`Map::Array`] from a comma-separated list of expressions
/// convertible into [`Map`]
///
/// ```
/// # use cartograph::{array, Map};
/// assert_eq!(array![1i64, "two", Map::Null].as_array().map(|a| a.len()), Some(3));
/// ```
#[macro_export]
macro_rules! array {
    () => { $crate::Map::Array(::std::vec::Vec::new()) };
    ($($x:expr),+ $(,)?) => {
        $crate::Map::Array(::std::vec![$($crate::Map::from($x)),+])
    };
}

/// Constructs a [`Map::Dictionary`] from `key => value` pairs
///
/// ```
/// # use cartograph::{dictionary, Map};
/// let ada = dictionary! { "name" => "Ada", "age" => 36i64 };
/// assert_eq!(ada.field("age"), Some(&Map::Int(36)));
/// assert_eq!(ada.field("email"), Some(&Map::Null));
/// ```
#[macro_export]
macro_rules! dictionary {
    () => { $crate::Map::Dictionary($crate::map::Dictionary::new()) };
    ($($k:expr => $v:expr),+ $(,)?) => {
        {
            let mut dict = $crate::map::Dictionary::new();
            $( dict.insert(::std::string::String::from($k), $crate::Map::from($v)); )+
            $crate::Map::Dictionary(dict)
        }
    };
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn kind_matches_case() {
        assert_eq!(Map::Null.kind(), MapKind::Null);
        assert_eq!(Map::from(true).kind(), MapKind::Bool);
        assert_eq!(Map::from(3i64).kind(), MapKind::Int);
        assert_eq!(Map::from(0.5).kind(), MapKind::Double);
        assert_eq!(Map::from("x").kind(), MapKind::String);
        assert_eq!(Map::from(Bytes::from(vec![1u8])).kind(), MapKind::Binary);
        assert_eq!(array![].kind(), MapKind::Array);
        assert_eq!(dictionary! {}.kind(), MapKind::Dictionary);
    }

    #[test]
    fn dictionary_equality_ignores_order() {
        let lhs: Map = vec![
            ("a".to_owned(), Map::Int(1)),
            ("b".to_owned(), Map::Int(2)),
        ]
        .into_iter()
        .collect();
        let rhs: Map = vec![
            ("b".to_owned(), Map::Int(2)),
            ("a".to_owned(), Map::Int(1)),
        ]
        .into_iter()
        .collect();
        assert_eq!(lhs, rhs);
    }

    #[test]
    fn array_equality_respects_order() {
        assert_ne!(array![1i64, 2i64], array![2i64, 1i64]);
    }

    #[test]
    fn raw_display() {
        assert_eq!(Map::Bool(true).get().to_string(), "true");
        assert_eq!(Map::Int(-4).get().to_string(), "-4");
        assert_eq!(Map::Double(1.0).get().to_string(), "1.0");
        assert_eq!(Map::from("hi").get().to_string(), "\"hi\"");
        assert_eq!(Map::from(Bytes::from(vec![0xde, 0xad])).to_string(), "0xdead");
        assert_eq!(array![1i64, Map::Null].to_string(), "[1, null]");
    }

    #[test]
    fn field_lookup() {
        let dict = dictionary! { "k" => false };
        assert_eq!(dict.field("k"), Some(&Map::Bool(false)));
        assert_eq!(dict.field("missing"), Some(&Map::Null));
        assert_eq!(Map::Int(0).field("k"), None);
    }

    #[test]
    fn option_into_map() {
        assert_eq!(Map::from(None::<i64>), Map::Null);
        assert_eq!(Map::from(Some("s")), Map::String("s".to_owned()));
    }
}
