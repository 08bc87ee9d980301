//! Type-erased values and the run-time capability registry
//!
//! Most conversions in this crate are resolved at compile time through the traits
//! in [`crate::conv`]. Some values, however, only reveal their concrete type at run
//! time: the elements of a heterogeneous sequence, the values of a heterogeneous
//! mapping, or the fields of a record assembled from a schema that is not known
//! when the crate is compiled. Such values are held as an [`Opaque`], and whether
//! they support a given capability is decided by consulting a process-wide registry
//! keyed by [`TypeId`].
//!
//! The registry is only ever consulted on the failing paths: [`TryEncode`] and
//! [`TryEncodeKey`] for `Opaque`, and the `decode_*` functions of this module.
//! A type that has not been registered for a capability surfaces as
//! [`EncodeError::NotRepresentable`], [`EncodeError::NotKeyRepresentable`],
//! [`DecodeError::NotDecodable`] or [`DecodeError::NotKeyDecodable`] respectively.
//!
//! The primitive types [`Map`], `bool`, `i64`, `f64`, `String` and [`Bytes`] are
//! registered for both value directions, and `String`, `i64` and `bool` for both key
//! directions, before the registry is first accessed. Any other type must be added
//! through [`register`], [`register_encode`], [`register_decode`] or [`register_key`].
//!
//! ```
//! use cartograph::erased::Opaque;
//! use cartograph::{array, EncodeError, TryEncode};
//!
//! struct Unregistered;
//!
//! let ok = vec![Opaque::new(1i64), Opaque::new("one".to_owned())];
//! assert_eq!(ok.try_encode(), Ok(array![1i64, "one"]));
//!
//! let bad = vec![Opaque::new(1i64), Opaque::new(Unregistered)];
//! assert!(matches!(bad.try_encode(), Err(EncodeError::NotRepresentable(ty)) if ty.ends_with("Unregistered")));
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::{PoisonError, RwLock};

use lazy_static::lazy_static;
use tracing::{debug, trace};

use crate::composite::Entries;
use crate::conv::error::{DecodeError, DecodeResult, EncodeError, EncodeResult};
use crate::conv::{Decode, DecodeKey, TryEncode, TryEncodeKey};
use crate::map::{Bytes, Map};

/// Run-time identity of a type, paired with its name for diagnostics
///
/// Equality and hashing only consider the [`TypeId`].
#[derive(Clone, Copy)]
pub struct TypeTag {
    id: TypeId,
    name: &'static str,
}

impl TypeTag {
    #[must_use]
    pub fn of<T: ?Sized + Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    #[inline]
    #[must_use]
    pub const fn id(&self) -> TypeId {
        self.id
    }

    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeTag {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeTag {}

impl Hash for TypeTag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state)
    }
}

impl Debug for TypeTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

/// Owned value whose concrete type is only known at run time
pub struct Opaque {
    tag: TypeTag,
    value: Box<dyn Any + Send + Sync>,
}

impl Opaque {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            tag: TypeTag::of::<T>(),
            value: Box::new(value),
        }
    }

    #[inline]
    #[must_use]
    pub const fn tag(&self) -> TypeTag {
        self.tag
    }

    #[inline]
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.tag.name
    }

    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>()
    }

    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Recovers the concrete value, or returns `self` unchanged if it is not a `T`.
    pub fn downcast<T: Any>(self) -> Result<T, Self> {
        if self.value.is::<T>() {
            match self.value.downcast::<T>() {
                Ok(value) => Ok(*value),
                Err(value) => Err(Self { tag: self.tag, value }),
            }
        } else {
            Err(self)
        }
    }

    fn as_any(&self) -> &dyn Any {
        &*self.value
    }
}

impl Debug for Opaque {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Opaque({})", self.tag.name)
    }
}

type EncodeFn = fn(&dyn Any) -> EncodeResult<Map>;
type EncodeKeyFn = fn(&dyn Any) -> EncodeResult<String>;
type DecodeKeyFn = fn(&str) -> Option<Opaque>;

#[derive(Clone, Copy)]
struct DecodeFns {
    decode: fn(&Map) -> DecodeResult<Opaque>,
    decode_element: fn(&Map) -> DecodeResult<Option<Opaque>>,
    decode_nil: fn() -> Option<Opaque>,
}

#[derive(Clone, Copy, Default)]
struct Capabilities {
    encode: Option<EncodeFn>,
    decode: Option<DecodeFns>,
    encode_key: Option<EncodeKeyFn>,
    decode_key: Option<DecodeKeyFn>,
}

fn encode_via<T: TryEncode + Any>(value: &dyn Any) -> EncodeResult<Map> {
    match value.downcast_ref::<T>() {
        Some(value) => value.try_encode(),
        None => Err(EncodeError::NotRepresentable(std::any::type_name::<T>())),
    }
}

fn encode_key_via<T: TryEncodeKey + Any>(value: &dyn Any) -> EncodeResult<String> {
    match value.downcast_ref::<T>() {
        Some(value) => value.try_encode_key(),
        None => Err(EncodeError::NotKeyRepresentable(std::any::type_name::<T>())),
    }
}

fn decode_via<T: Decode + Any + Send + Sync>(map: &Map) -> DecodeResult<Opaque> {
    T::decode(map).map(Opaque::new)
}

fn decode_element_via<T: Decode + Any + Send + Sync>(map: &Map) -> DecodeResult<Option<Opaque>> {
    Ok(T::decode_element(map)?.map(Opaque::new))
}

fn decode_nil_via<T: Decode + Any + Send + Sync>() -> Option<Opaque> {
    T::decode_nil().map(Opaque::new)
}

fn decode_key_via<T: DecodeKey + Any + Send + Sync>(key: &str) -> Option<Opaque> {
    T::decode_key(key).map(Opaque::new)
}

fn decode_fns<T: Decode + Any + Send + Sync>() -> DecodeFns {
    DecodeFns {
        decode: decode_via::<T>,
        decode_element: decode_element_via::<T>,
        decode_nil: decode_nil_via::<T>,
    }
}

fn value_capabilities<T: TryEncode + Decode + Any + Send + Sync>() -> Capabilities {
    Capabilities {
        encode: Some(encode_via::<T>),
        decode: Some(decode_fns::<T>()),
        ..Capabilities::default()
    }
}

fn key_capabilities<T>() -> Capabilities
where
    T: TryEncode + Decode + TryEncodeKey + DecodeKey + Any + Send + Sync,
{
    Capabilities {
        encode_key: Some(encode_key_via::<T>),
        decode_key: Some(decode_key_via::<T>),
        ..value_capabilities::<T>()
    }
}

fn builtins() -> HashMap<TypeId, Capabilities> {
    let mut table = HashMap::new();
    table.insert(TypeId::of::<Map>(), value_capabilities::<Map>());
    table.insert(TypeId::of::<f64>(), value_capabilities::<f64>());
    table.insert(TypeId::of::<Bytes>(), value_capabilities::<Bytes>());
    table.insert(TypeId::of::<String>(), key_capabilities::<String>());
    table.insert(TypeId::of::<i64>(), key_capabilities::<i64>());
    table.insert(TypeId::of::<bool>(), key_capabilities::<bool>());
    table
}

lazy_static! {
    static ref REGISTRY: RwLock<HashMap<TypeId, Capabilities>> = RwLock::new(builtins());
}

/// Copies the capabilities of `id` out of the registry, so that no lock is
/// held while the looked-up functions recurse.
fn lookup(id: TypeId) -> Capabilities {
    REGISTRY
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&id)
        .copied()
        .unwrap_or_default()
}

fn update<T: Any, F: FnOnce(&mut Capabilities)>(capability: &'static str, f: F) {
    let mut table = REGISTRY.write().unwrap_or_else(PoisonError::into_inner);
    f(table.entry(TypeId::of::<T>()).or_default());
    debug!(
        type_name = std::any::type_name::<T>(),
        capability, "registered capability"
    );
}

/// Registers `T` as encodable and decodable when held in an [`Opaque`]
pub fn register<T: TryEncode + Decode + Any + Send + Sync>() {
    register_encode::<T>();
    register_decode::<T>();
}

/// Registers `T` as encodable when held in an [`Opaque`]
pub fn register_encode<T: TryEncode + Any>() {
    update::<T, _>("encode", |caps| caps.encode = Some(encode_via::<T>));
}

/// Registers `T` as a decode target for the `decode_*` functions of this module
pub fn register_decode<T: Decode + Any + Send + Sync>() {
    update::<T, _>("decode", |caps| caps.decode = Some(decode_fns::<T>()));
}

/// Registers `T` as convertible to and from dictionary keys
pub fn register_key<T: TryEncodeKey + DecodeKey + Any + Send + Sync>() {
    update::<T, _>("key", |caps| {
        caps.encode_key = Some(encode_key_via::<T>);
        caps.decode_key = Some(decode_key_via::<T>);
    });
}

#[must_use]
pub fn is_encodable(tag: TypeTag) -> bool {
    lookup(tag.id).encode.is_some()
}

#[must_use]
pub fn is_decodable(tag: TypeTag) -> bool {
    lookup(tag.id).decode.is_some()
}

impl TryEncode for Opaque {
    fn try_encode(&self) -> EncodeResult<Map> {
        match lookup(self.tag.id).encode {
            Some(encode) => encode(self.as_any()),
            None => Err(EncodeError::NotRepresentable(self.tag.name)),
        }
    }
}

impl TryEncodeKey for Opaque {
    fn try_encode_key(&self) -> EncodeResult<String> {
        match lookup(self.tag.id).encode_key {
            Some(encode_key) => encode_key(self.as_any()),
            None => Err(EncodeError::NotKeyRepresentable(self.tag.name)),
        }
    }
}

fn decoder(tag: TypeTag) -> DecodeResult<DecodeFns> {
    lookup(tag.id).decode.ok_or(DecodeError::NotDecodable(tag.name))
}

/// Decodes `map` as the type identified by `tag`.
///
/// # Errors
///
/// Fails with [`DecodeError::NotDecodable`] if `tag` has not been registered for
/// decoding, and otherwise propagates the error of the registered decoder.
pub fn decode_opaque(tag: TypeTag, map: &Map) -> DecodeResult<Opaque> {
    (decoder(tag)?.decode)(map)
}

/// Returns the value an absent or `null` field of type `tag` decodes to.
///
/// # Errors
///
/// Fails with [`DecodeError::NotDecodable`] if `tag` has not been registered for decoding.
pub fn decode_nil(tag: TypeTag) -> DecodeResult<Option<Opaque>> {
    Ok((decoder(tag)?.decode_nil)())
}

/// Decodes `map` as an optional value of the type identified by `tag`.
///
/// The capability of `tag` is checked before `map`, so an unregistered type
/// fails even when `map` is `null`.
pub fn decode_optional(tag: TypeTag, map: &Map) -> DecodeResult<Option<Opaque>> {
    let fns = decoder(tag)?;
    match map {
        Map::Null => Ok(None),
        other => (fns.decode)(other).map(Some),
    }
}

/// Decodes a [`Map::Array`] whose elements are of the type identified by `tag`,
/// skipping elements that opt out.
pub fn decode_sequence(tag: TypeTag, map: &Map) -> DecodeResult<Vec<Opaque>> {
    let elems = match map {
        Map::Array(elems) => elems,
        _ => return Err(DecodeError::cannot_initialize::<Vec<Opaque>>(map)),
    };
    let fns = decoder(tag)?;
    let mut ret = Vec::with_capacity(elems.len());
    for (index, elem) in elems.iter().enumerate() {
        match (fns.decode_element)(elem)? {
            Some(val) => ret.push(val),
            None => trace!(index, element = tag.name, "skipping sequence element"),
        }
    }
    Ok(ret)
}

/// Decodes a [`Map::Dictionary`] into pairs of the key type `key_tag` and
/// value type `value_tag`, skipping pairs that opt out.
pub fn decode_entries(
    key_tag: TypeTag,
    value_tag: TypeTag,
    map: &Map,
) -> DecodeResult<Entries<Opaque, Opaque>> {
    let dict = match map {
        Map::Dictionary(dict) => dict,
        _ => return Err(DecodeError::cannot_initialize::<Entries<Opaque, Opaque>>(map)),
    };
    let decode_key = lookup(key_tag.id)
        .decode_key
        .ok_or(DecodeError::NotKeyDecodable(key_tag.name))?;
    let fns = decoder(value_tag)?;
    let mut ret = Entries::new();
    for (key, value) in dict.iter() {
        let typed_key = match decode_key(key) {
            Some(typed_key) => typed_key,
            None => {
                trace!(key = key.as_str(), key_type = key_tag.name, "skipping dictionary key");
                continue;
            }
        };
        match (fns.decode_element)(value)? {
            Some(typed_value) => ret.push(typed_key, typed_value),
            None => trace!(key = key.as_str(), "skipping dictionary value"),
        }
    }
    Ok(ret)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{array, dictionary};

    #[derive(Debug, PartialEq)]
    struct Celsius(f64);

    impl TryEncode for Celsius {
        fn try_encode(&self) -> EncodeResult<Map> {
            Ok(Map::Double(self.0))
        }
    }

    impl Decode for Celsius {
        fn decode(map: &Map) -> DecodeResult<Self> {
            f64::decode(map).map(Celsius)
        }
    }

    struct Unregistered;

    #[derive(Debug, PartialEq)]
    struct NeverRegistered;

    impl Decode for NeverRegistered {
        fn decode(_: &Map) -> DecodeResult<Self> {
            Ok(NeverRegistered)
        }
    }

    #[test]
    fn opaque_downcast() {
        let op = Opaque::new(7i64);
        assert!(op.is::<i64>());
        assert_eq!(op.downcast_ref::<i64>(), Some(&7));
        let op = op.downcast::<String>().unwrap_err();
        assert_eq!(op.downcast::<i64>().ok(), Some(7));
    }

    #[test]
    fn builtins_encode() {
        assert_eq!(Opaque::new(true).try_encode(), Ok(Map::Bool(true)));
        assert_eq!(Opaque::new(Map::Null).try_encode(), Ok(Map::Null));
        assert_eq!(Opaque::new(3i64).try_encode_key(), Ok("3".to_owned()));
    }

    #[test]
    fn heterogeneous_sequence_names_second_element() {
        let seq = vec![Opaque::new(1i64), Opaque::new(Unregistered), Opaque::new(2.0)];
        assert_eq!(
            seq.try_encode(),
            Err(EncodeError::NotRepresentable(std::any::type_name::<Unregistered>()))
        );
    }

    #[test]
    fn optional_opaque() {
        assert_eq!(None::<Opaque>.try_encode(), Ok(Map::Null));
        assert_eq!(
            Some(Opaque::new(Unregistered)).try_encode(),
            Err(EncodeError::NotRepresentable(std::any::type_name::<Unregistered>()))
        );
    }

    #[test]
    fn unrepresentable_key() {
        let entries: Entries<Opaque, Opaque> = vec![
            (Opaque::new("a".to_owned()), Opaque::new(1i64)),
            (Opaque::new(2.5f64), Opaque::new(2i64)),
        ]
        .into();
        assert_eq!(entries.try_encode(), Err(EncodeError::NotKeyRepresentable("f64")));
    }

    #[test]
    fn unrepresentable_value_in_mapping() {
        let mut map = HashMap::new();
        map.insert("x".to_owned(), Opaque::new(Unregistered));
        assert_eq!(
            map.try_encode(),
            Err(EncodeError::NotRepresentable(std::any::type_name::<Unregistered>()))
        );
    }

    #[test]
    fn registered_type_round_trip() {
        register::<Celsius>();
        let tag = TypeTag::of::<Celsius>();
        assert!(is_encodable(tag) && is_decodable(tag));
        assert_eq!(Opaque::new(Celsius(21.5)).try_encode(), Ok(Map::Double(21.5)));
        let decoded = decode_opaque(tag, &Map::Double(21.5)).unwrap();
        assert_eq!(decoded.downcast::<Celsius>().ok(), Some(Celsius(21.5)));
    }

    #[test]
    fn unregistered_decode_target() {
        let tag = TypeTag::of::<NeverRegistered>();
        let name = std::any::type_name::<NeverRegistered>();
        assert_eq!(decode_opaque(tag, &Map::Null).unwrap_err(), DecodeError::NotDecodable(name));
        assert_eq!(decode_optional(tag, &Map::Null).unwrap_err(), DecodeError::NotDecodable(name));
        assert_eq!(
            decode_sequence(tag, &array![1i64]).unwrap_err(),
            DecodeError::NotDecodable(name)
        );
        assert!(matches!(
            decode_sequence(tag, &Map::Int(1)),
            Err(DecodeError::CannotInitialize { .. })
        ));
    }

    #[test]
    fn erased_optional_and_sequence() {
        let tag = TypeTag::of::<i64>();
        assert!(decode_optional(tag, &Map::Null).unwrap().is_none());
        let seq = decode_sequence(TypeTag::of::<Option<i64>>(), &array![1i64, Map::Null]);
        assert_eq!(
            seq.unwrap_err(),
            DecodeError::NotDecodable(std::any::type_name::<Option<i64>>())
        );
        let seq = decode_sequence(tag, &array![1i64, 2i64]).unwrap();
        let seq: Vec<i64> = seq.into_iter().filter_map(|op| op.downcast().ok()).collect();
        assert_eq!(seq, vec![1, 2]);
    }

    #[test]
    fn erased_entries() {
        let map = dictionary! { "1" => "one", "x" => "skipped" };
        let entries = decode_entries(TypeTag::of::<i64>(), TypeTag::of::<String>(), &map).unwrap();
        assert_eq!(entries.len(), 1);
        let (key, value) = &entries[0];
        assert_eq!(key.downcast_ref::<i64>(), Some(&1));
        assert_eq!(value.downcast_ref::<String>().map(String::as_str), Some("one"));

        assert_eq!(
            decode_entries(TypeTag::of::<f64>(), TypeTag::of::<String>(), &map).unwrap_err(),
            DecodeError::NotKeyDecodable("f64")
        );
    }
}
