//! Bridge between aggregates and the conversion engines
//!
//! An *aggregate* is a user-defined type with a fixed set of named fields. The
//! engines never inspect aggregates directly; instead they rely on two traits:
//!
//!   * [`Fields`], which enumerates the fields of an instance in declaration order,
//!     for encoding
//!   * [`Construct`], which builds a new instance by requesting one value per field,
//!     in declaration order, from a [`FieldSource`], for decoding
//!
//! Both are normally generated by the derive macros `TryEncode` and `Decode`, which
//! additionally implement [`TryEncode`] and [`Decode`] in terms of
//! [`encode_aggregate`] and [`decode_aggregate`]. Hand-written implementations are
//! equally valid, provided they honor the declaration-order contract.
//!
//! # Field rules
//!
//! When decoding, a field whose key is absent from the source dictionary is treated
//! exactly as one whose value is `null`. Such a field takes the value of
//! [`Decode::decode_nil`] for its declared type, or fails with
//! [`DecodeError::RequiredValueMissing`] if the type has no empty value.
//!
//! When encoding, the resulting dictionary holds one entry per field, keyed by the
//! field name; `None`-valued optional fields are encoded as explicit `null`.

use tracing::{trace, Level};

use crate::conv::error::{DecodeError, DecodeResult, EncodeResult};
use crate::conv::{Decode, TryEncode};
use crate::erased::{self, Opaque, TypeTag};
use crate::map::{Dictionary, Map};

/// Key and declared type of one field of an aggregate
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub key: &'static str,
    pub declared: TypeTag,
}

impl FieldDescriptor {
    #[must_use]
    pub fn new<T: ?Sized + 'static>(key: &'static str) -> Self {
        Self {
            key,
            declared: TypeTag::of::<T>(),
        }
    }
}

/// One field of an aggregate instance, together with its current value
pub struct Field<'a> {
    pub descriptor: FieldDescriptor,
    pub value: &'a dyn TryEncode,
}

impl<'a> Field<'a> {
    pub fn new<T: TryEncode + 'static>(key: &'static str, value: &'a T) -> Self {
        Self {
            descriptor: FieldDescriptor::new::<T>(key),
            value,
        }
    }
}

/// Field enumeration half of the bridge, consumed by the encode engine
pub trait Fields {
    /// Returns every field of `self`, in declaration order.
    fn fields(&self) -> Vec<Field<'_>>;
}

/// Instance construction half of the bridge, consumed by the decode engine
pub trait Construct: Sized {
    /// Returns the descriptors of every field, in declaration order.
    fn descriptors() -> Vec<FieldDescriptor>;

    /// Builds an instance, requesting each field from `source` in declaration
    /// order.
    ///
    /// # Errors
    ///
    /// Implementations must return the first error produced by `source`
    /// unchanged, without requesting any further field.
    fn construct(source: &FieldSource<'_>) -> DecodeResult<Self>;
}

/// Per-field decoding callback handed to [`Construct::construct`]
pub struct FieldSource<'a> {
    dict: &'a Dictionary,
}

static NULL: Map = Map::Null;

impl<'a> FieldSource<'a> {
    #[must_use]
    pub const fn new(dict: &'a Dictionary) -> Self {
        Self { dict }
    }

    /// Returns the entry for `key`, with an absent key read as `null`.
    #[must_use]
    pub fn lookup(&self, key: &str) -> &'a Map {
        self.dict.get(key).unwrap_or(&NULL)
    }

    /// Decodes the field described by `descriptor` as a `T`.
    ///
    /// # Errors
    ///
    /// Fails with [`DecodeError::RequiredValueMissing`] if the entry is absent or
    /// `null` and `T` has no empty value, and otherwise propagates the error of
    /// [`Decode::decode`].
    pub fn supply<T: Decode>(&self, descriptor: &FieldDescriptor) -> DecodeResult<T> {
        match self.lookup(descriptor.key) {
            Map::Null => T::decode_nil().ok_or(DecodeError::RequiredValueMissing(descriptor.key)),
            other => T::decode(other),
        }
    }

    /// Decodes the field described by `descriptor` as its declared type, through
    /// the registry of [`crate::erased`].
    ///
    /// # Errors
    ///
    /// As for [`supply`](Self::supply). A non-null entry additionally fails
    /// with [`DecodeError::NotDecodable`] if the declared type has not been
    /// registered for decoding; an absent or `null` one reports
    /// [`DecodeError::RequiredValueMissing`] instead.
    pub fn supply_erased(&self, descriptor: &FieldDescriptor) -> DecodeResult<Opaque> {
        match self.lookup(descriptor.key) {
            Map::Null => erased::decode_nil(descriptor.declared)
                .ok()
                .flatten()
                .ok_or(DecodeError::RequiredValueMissing(descriptor.key)),
            other => erased::decode_opaque(descriptor.declared, other),
        }
    }
}

/// Encodes an aggregate as a [`Map::Dictionary`] keyed by field name.
///
/// # Errors
///
/// Returns the error of the first field, in declaration order, whose value
/// cannot be encoded.
pub fn encode_aggregate<A: Fields + ?Sized>(aggregate: &A) -> EncodeResult<Map> {
    let fields = aggregate.fields();
    let mut dict = Dictionary::new();
    for field in fields {
        dict.insert(field.descriptor.key.to_owned(), field.value.try_encode()?);
    }
    Ok(Map::Dictionary(dict))
}

/// Decodes an aggregate out of a [`Map::Dictionary`].
///
/// # Errors
///
/// Fails with [`DecodeError::CannotInitialize`] if `map` is not a dictionary,
/// and otherwise returns the first error raised while supplying a field.
pub fn decode_aggregate<A: Construct>(map: &Map) -> DecodeResult<A> {
    match map {
        Map::Dictionary(dict) => {
            if tracing::enabled!(Level::TRACE) {
                let descriptors = A::descriptors();
                for key in dict.keys() {
                    if !descriptors.iter().any(|desc| desc.key == key.as_str()) {
                        trace!(
                            key = key.as_str(),
                            aggregate = std::any::type_name::<A>(),
                            "ignoring key with no matching field"
                        );
                    }
                }
            }
            A::construct(&FieldSource::new(dict))
        }
        _ => Err(DecodeError::cannot_initialize::<A>(map)),
    }
}
