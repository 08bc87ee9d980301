//! Error types returned by the conversion engines
//!
//! Decoding a [`Map`](crate::Map) into a typed value can fail with a [`DecodeError`];
//! encoding a type-erased or aggregate value into a `Map` can fail with an
//! [`EncodeError`]. Both are closed enumerations over the failure kinds of the
//! respective engine, and in either case the first failure encountered aborts the
//! whole conversion.

use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::map::Map;

/// Failure kinds of the decode engine
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecodeError {
    /// The active case of the source value does not match the shape the
    /// target type requires.
    ///
    /// `source` holds the rendered raw payload of the offending value.
    CannotInitialize {
        target: &'static str,
        source: String,
    },
    /// The named type has no registered decode capability
    NotDecodable(&'static str),
    /// The named type has no registered from-string-key capability
    NotKeyDecodable(&'static str),
    /// A non-optional aggregate field had no corresponding entry
    RequiredValueMissing(&'static str),
}

impl DecodeError {
    /// Constructs a [`DecodeError::CannotInitialize`] for target type `T`
    /// out of the diagnostic payload of `map`.
    pub fn cannot_initialize<T: ?Sized>(map: &Map) -> Self {
        Self::cannot_initialize_named(std::any::type_name::<T>(), map)
    }

    pub fn cannot_initialize_named(target: &'static str, map: &Map) -> Self {
        Self::CannotInitialize {
            target,
            source: map.get().to_string(),
        }
    }
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::CannotInitialize { target, source } => {
                write!(f, "cannot initialize `{}` from {}", target, source)
            }
            DecodeError::NotDecodable(ty) => {
                write!(f, "type `{}` cannot be decoded from a map", ty)
            }
            DecodeError::NotKeyDecodable(ty) => {
                write!(f, "type `{}` cannot be constructed from a dictionary key", ty)
            }
            DecodeError::RequiredValueMissing(key) => {
                write!(f, "required value missing for key `{}`", key)
            }
        }
    }
}

impl Error for DecodeError {}

/// Failure kinds of the fallible encode engine
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum EncodeError {
    /// The named run-time type has no encode capability
    NotRepresentable(&'static str),
    /// The named run-time type cannot be converted into a dictionary key
    NotKeyRepresentable(&'static str),
}

impl Display for EncodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            EncodeError::NotRepresentable(ty) => {
                write!(f, "type `{}` is not representable as a map", ty)
            }
            EncodeError::NotKeyRepresentable(ty) => {
                write!(f, "type `{}` is not representable as a dictionary key", ty)
            }
        }
    }
}

impl Error for EncodeError {}

pub type DecodeResult<T> = std::result::Result<T, DecodeError>;

pub type EncodeResult<T> = std::result::Result<T, EncodeError>;

#[cfg(test)]
mod test {
    use super::*;

    fn dummy<T: Send + Sync>() {}

    #[test]
    fn errors_threadsafe() {
        dummy::<DecodeError>();
        dummy::<EncodeError>();
    }

    #[test]
    fn cannot_initialize_renders_source() {
        let err = DecodeError::cannot_initialize::<i64>(&Map::Bool(true));
        assert_eq!(
            err,
            DecodeError::CannotInitialize {
                target: "i64",
                source: "true".to_owned()
            }
        );
        assert_eq!(err.to_string(), "cannot initialize `i64` from true");
    }
}
