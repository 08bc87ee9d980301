//! Format-agnostic interchange value and typed conversion
//!
//! # Overview
//!
//! This library provides [`Map`], a tagged dynamic value with eight possible shapes
//! (`null`, booleans, integers, doubles, strings, byte-strings, arrays and
//! string-keyed dictionaries), together with a bidirectional conversion protocol
//! between `Map` and arbitrary application types.
//!
//! `Map` is the only boundary between the two sides of the library. Concrete
//! wire-format readers and writers (JSON, YAML, binary encodings and so forth) only
//! ever produce or consume a `Map`, so they need not know anything about application
//! types; application types only ever convert to and from a `Map`, so they need not
//! know anything about wire formats.
//!
//! # Conversion
//!
//! The capability traits in [`conv`] are the keystones of `cartograph`:
//!
//!   * [`Decode`] reconstructs a typed value from a `Map`, failing with a
//!     [`DecodeError`] on the first mismatch encountered.
//!   * [`Encode`] projects a statically-typed value into a `Map`, and cannot fail.
//!   * [`TryEncode`] projects aggregates and type-erased values into a `Map`, failing
//!     with an [`EncodeError`] on the first value whose run-time type has no
//!     encoding.
//!
//! Implementations are provided for primitives ([`prim`]), for optionals, sequences
//! and mappings over any supporting element type ([`composite`]), and for
//! user-defined aggregates through the derive macros `Decode` and `TryEncode`, which
//! implement the bridge traits of [`aggregate`]. Values whose concrete type is only
//! known at run time are held as an [`Opaque`] and resolved through the registry
//! in [`erased`].
//!
//! Both engines are pure structural recursions over their input. They hold no state
//! of their own and may be called concurrently from any number of threads; the only
//! shared resource is the capability registry, which is read-locked for the
//! duration of a single lookup. Inputs are assumed to be acyclic and of reasonable
//! depth.
//!
//! # Features
//!
//!   * `serde_impls`: implements `Serialize` and `Deserialize` for [`Map`] and [`Bytes`]
//!   * `ordered_dictionary`: backs [`Map::Dictionary`] with a `BTreeMap` instead of a `HashMap`
//!   * `check_finite`: rejects NaN and infinite `f64` values on the failing encode path

extern crate decode_derive;
extern crate encode_derive;
extern crate self as cartograph;

pub mod aggregate;
pub mod composite;
pub mod conv;
pub mod erased;
pub mod map;
pub mod prelude;
pub mod prim;
#[cfg(feature = "serde_impls")]
pub mod serde_impls;

pub use crate::aggregate::{Construct, Field, FieldDescriptor, FieldSource, Fields};
pub use crate::composite::Entries;
pub use crate::conv::{
    error::{DecodeError, DecodeResult, EncodeError, EncodeResult},
    Decode, DecodeKey, Encode, EncodeKey, TryEncode, TryEncodeKey,
};
pub use crate::erased::{Opaque, TypeTag};
pub use crate::map::{Bytes, Dictionary, Map, MapKind, Raw};

pub use ::decode_derive::Decode;
pub use ::encode_derive::TryEncode;
