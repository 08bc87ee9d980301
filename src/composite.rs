//! Conversions for optionals, sequences and mappings
//!
//! # Decoding
//!
//! Sequences decode from [`Map::Array`] and mappings from [`Map::Dictionary`];
//! any other case fails with [`DecodeError::CannotInitialize`] naming the container
//! type. Elements are decoded through [`Decode::decode_element`], and an element
//! that opts out is skipped rather than failing the container. Likewise, a mapping
//! pair whose key is refused by [`DecodeKey::decode_key`] is skipped without its
//! value ever being decoded.
//!
//! `Option<W>` never opts out: a `null` element of a `Vec<Option<W>>` decodes to
//! `None` in its original position, and a `null` value of a `HashMap<K, Option<W>>`
//! keeps its key.
//!
//! # Encoding
//!
//! The [`Encode`] implementations here are total. The [`TryEncode`] implementations
//! stop at the first element (or key) that fails, in iteration order, and return
//! that error unchanged.
//!
//! # `Entries<K, V>`
//!
//! [`Entries`] is an ordered association list, for mappings whose key type is
//! neither `Hash` nor `Ord`, notably type-erased keys such as
//! [`Opaque`](crate::erased::Opaque).

use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};
use std::ops::{Deref, DerefMut};

use tracing::trace;

use crate::conv::error::{DecodeError, DecodeResult, EncodeResult};
use crate::conv::{Decode, DecodeKey, Encode, EncodeKey, TryEncode, TryEncodeKey};
use crate::map::{Dictionary, Map};

impl<W: Decode> Decode for Option<W> {
    fn decode(map: &Map) -> DecodeResult<Self> {
        match map {
            Map::Null => Ok(None),
            other => W::decode(other).map(Some),
        }
    }

    #[inline]
    fn decode_nil() -> Option<Self> {
        Some(None)
    }
}

impl<W: Encode> Encode for Option<W> {
    fn encode(&self) -> Map {
        match self {
            Some(wrapped) => wrapped.encode(),
            None => Map::Null,
        }
    }
}

impl<W: TryEncode> TryEncode for Option<W> {
    fn try_encode(&self) -> EncodeResult<Map> {
        match self {
            Some(wrapped) => wrapped.try_encode(),
            None => Ok(Map::Null),
        }
    }
}

/// Decodes each element of `elems` in order, skipping those that opt out.
fn decode_elements<E: Decode>(elems: &[Map]) -> DecodeResult<Vec<E>> {
    let mut ret = Vec::with_capacity(elems.len());
    for (index, elem) in elems.iter().enumerate() {
        match E::decode_element(elem)? {
            Some(val) => ret.push(val),
            None => trace!(
                index,
                element = std::any::type_name::<E>(),
                "skipping sequence element"
            ),
        }
    }
    Ok(ret)
}

/// Decodes each pair of `dict`, handing the surviving ones to `insert`.
fn decode_pairs<K, V, F>(dict: &Dictionary, mut insert: F) -> DecodeResult<()>
where
    K: DecodeKey,
    V: Decode,
    F: FnMut(K, V),
{
    for (key, value) in dict.iter() {
        let typed_key = match K::decode_key(key) {
            Some(typed_key) => typed_key,
            None => {
                trace!(key = key.as_str(), key_type = std::any::type_name::<K>(), "skipping dictionary key");
                continue;
            }
        };
        match V::decode_element(value)? {
            Some(typed_value) => insert(typed_key, typed_value),
            None => trace!(key = key.as_str(), "skipping dictionary value"),
        }
    }
    Ok(())
}

impl<E: Decode> Decode for Vec<E> {
    fn decode(map: &Map) -> DecodeResult<Self> {
        match map {
            Map::Array(elems) => decode_elements(elems),
            _ => Err(DecodeError::cannot_initialize::<Self>(map)),
        }
    }
}

impl<E: Encode> Encode for [E] {
    fn encode(&self) -> Map {
        Map::Array(self.iter().map(Encode::encode).collect())
    }
}

impl<E: Encode> Encode for Vec<E> {
    #[inline]
    fn encode(&self) -> Map {
        self.as_slice().encode()
    }
}

impl<E: TryEncode> TryEncode for [E] {
    fn try_encode(&self) -> EncodeResult<Map> {
        self.iter()
            .map(TryEncode::try_encode)
            .collect::<EncodeResult<Vec<Map>>>()
            .map(Map::Array)
    }
}

impl<E: TryEncode> TryEncode for Vec<E> {
    #[inline]
    fn try_encode(&self) -> EncodeResult<Map> {
        self.as_slice().try_encode()
    }
}

impl<K, V, S> Decode for HashMap<K, V, S>
where
    K: DecodeKey + Eq + Hash,
    V: Decode,
    S: BuildHasher + Default,
{
    fn decode(map: &Map) -> DecodeResult<Self> {
        match map {
            Map::Dictionary(dict) => {
                let mut ret = HashMap::with_capacity_and_hasher(dict.len(), S::default());
                decode_pairs(dict, |k, v| {
                    ret.insert(k, v);
                })?;
                Ok(ret)
            }
            _ => Err(DecodeError::cannot_initialize::<Self>(map)),
        }
    }
}

impl<K: EncodeKey, V: Encode, S> Encode for HashMap<K, V, S> {
    fn encode(&self) -> Map {
        Map::Dictionary(
            self.iter()
                .map(|(k, v)| (k.encode_key(), v.encode()))
                .collect(),
        )
    }
}

impl<K: TryEncodeKey, V: TryEncode, S> TryEncode for HashMap<K, V, S> {
    fn try_encode(&self) -> EncodeResult<Map> {
        try_encode_pairs(self.iter())
    }
}

impl<K: DecodeKey + Ord, V: Decode> Decode for BTreeMap<K, V> {
    fn decode(map: &Map) -> DecodeResult<Self> {
        match map {
            Map::Dictionary(dict) => {
                let mut ret = BTreeMap::new();
                decode_pairs(dict, |k, v| {
                    ret.insert(k, v);
                })?;
                Ok(ret)
            }
            _ => Err(DecodeError::cannot_initialize::<Self>(map)),
        }
    }
}

impl<K: EncodeKey, V: Encode> Encode for BTreeMap<K, V> {
    fn encode(&self) -> Map {
        Map::Dictionary(
            self.iter()
                .map(|(k, v)| (k.encode_key(), v.encode()))
                .collect(),
        )
    }
}

impl<K: TryEncodeKey, V: TryEncode> TryEncode for BTreeMap<K, V> {
    fn try_encode(&self) -> EncodeResult<Map> {
        try_encode_pairs(self.iter())
    }
}

/// Converts every key before its value, stopping at the first failure.
fn try_encode_pairs<'a, K, V, I>(pairs: I) -> EncodeResult<Map>
where
    K: TryEncodeKey + 'a,
    V: TryEncode + 'a,
    I: Iterator<Item = (&'a K, &'a V)>,
{
    let mut dict = Dictionary::new();
    for (key, value) in pairs {
        let key = key.try_encode_key()?;
        dict.insert(key, value.try_encode()?);
    }
    Ok(Map::Dictionary(dict))
}

/// Ordered list of key-value pairs converted to and from [`Map::Dictionary`]
///
/// Encoding a value with duplicate keys keeps the last pair for each key.
/// Decoding yields pairs in the iteration order of [`Dictionary`], which is
/// unspecified unless the `ordered_dictionary` feature is enabled.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Entries<K, V>(Vec<(K, V)>);

impl<K, V> Entries<K, V> {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<(K, V)> {
        self.0
    }

    /// Appends a pair to the end of the list
    pub fn push(&mut self, key: K, value: V) {
        self.0.push((key, value))
    }

    /// Returns the value of the first pair whose key satisfies `pred`
    pub fn find<P: FnMut(&K) -> bool>(&self, mut pred: P) -> Option<&V> {
        self.0.iter().find(|(k, _)| pred(k)).map(|(_, v)| v)
    }
}

impl<K, V> From<Vec<(K, V)>> for Entries<K, V> {
    fn from(pairs: Vec<(K, V)>) -> Self {
        Self(pairs)
    }
}

impl<K, V> FromIterator<(K, V)> for Entries<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<K, V> Deref for Entries<K, V> {
    type Target = Vec<(K, V)>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<K, V> DerefMut for Entries<K, V> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<K: DecodeKey, V: Decode> Decode for Entries<K, V> {
    fn decode(map: &Map) -> DecodeResult<Self> {
        match map {
            Map::Dictionary(dict) => {
                let mut ret = Entries(Vec::with_capacity(dict.len()));
                decode_pairs(dict, |k, v| ret.push(k, v))?;
                Ok(ret)
            }
            _ => Err(DecodeError::cannot_initialize::<Self>(map)),
        }
    }
}

impl<K: EncodeKey, V: Encode> Encode for Entries<K, V> {
    fn encode(&self) -> Map {
        Map::Dictionary(
            self.0
                .iter()
                .map(|(k, v)| (k.encode_key(), v.encode()))
                .collect(),
        )
    }
}

impl<K: TryEncodeKey, V: TryEncode> TryEncode for Entries<K, V> {
    fn try_encode(&self) -> EncodeResult<Map> {
        try_encode_pairs(self.0.iter().map(|(k, v)| (k, v)))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{array, dictionary};

    #[test]
    fn optional_from_null_and_value() {
        assert_eq!(Option::<i64>::decode(&Map::Null), Ok(None));
        assert_eq!(Option::<i64>::decode(&Map::Int(3)), Ok(Some(3)));
        assert!(matches!(
            Option::<i64>::decode(&Map::from("3")),
            Err(DecodeError::CannotInitialize { target: "i64", .. })
        ));
        assert_eq!(Option::<i64>::decode_nil(), Some(None));
    }

    #[test]
    fn optional_encode() {
        assert_eq!(None::<String>.encode(), Map::Null);
        assert_eq!(Some(5i64).encode(), Map::Int(5));
        assert_eq!(Some(5i64).try_encode(), Ok(Map::Int(5)));
    }

    #[test]
    fn sequence_preserves_order() {
        let seq = vec![3i64, 1, 2];
        let map = seq.encode();
        assert_eq!(map, array![3i64, 1i64, 2i64]);
        assert_eq!(Vec::<i64>::decode(&map), Ok(seq));
    }

    #[test]
    fn sequence_requires_array() {
        let err = Vec::<i64>::decode(&Map::Int(1)).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::CannotInitialize { target, ref source } if target.contains("Vec<i64>") && source == "1"
        ));
    }

    #[test]
    fn sequence_element_failure_aborts() {
        assert!(matches!(
            Vec::<i64>::decode(&array![1i64, "two", 3i64]),
            Err(DecodeError::CannotInitialize { target: "i64", .. })
        ));
    }

    #[test]
    fn sequence_keeps_null_optionals() {
        let seq = vec![Some(1i64), None, Some(2)];
        let map = seq.encode();
        assert_eq!(map, array![1i64, Map::Null, 2i64]);
        assert_eq!(Vec::<Option<i64>>::decode(&map), Ok(seq));
    }

    #[test]
    fn nested_sequences() {
        let nested = vec![vec!["a".to_owned()], vec![], vec!["b".to_owned(), "c".to_owned()]];
        assert_eq!(Vec::<Vec<String>>::decode(&nested.encode()), Ok(nested));
    }

    #[test]
    fn mapping_round_trip() {
        let mut scores: HashMap<String, i64> = HashMap::new();
        scores.insert("ada".to_owned(), 36);
        scores.insert("alan".to_owned(), 41);
        let map = scores.encode();
        assert_eq!(map, dictionary! { "alan" => 41i64, "ada" => 36i64 });
        assert_eq!(HashMap::<String, i64>::decode(&map), Ok(scores));
    }

    #[test]
    fn mapping_requires_dictionary() {
        assert!(matches!(
            BTreeMap::<String, i64>::decode(&array![]),
            Err(DecodeError::CannotInitialize { ref source, .. }) if source == "[]"
        ));
    }

    #[test]
    fn mapping_skips_unparsable_keys() {
        let map = dictionary! { "1" => "one", "two" => "two", "3" => "three" };
        let decoded = BTreeMap::<i64, String>::decode(&map).unwrap();
        assert_eq!(decoded.keys().copied().collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn mapping_keeps_null_optionals() {
        let map = dictionary! { "a" => 1i64, "b" => Map::Null };
        let decoded = HashMap::<String, Option<i64>>::decode(&map).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded.get("a"), Some(&Some(1)));
        assert_eq!(decoded.get("b"), Some(&None));

        let mut sparse: HashMap<String, Option<i64>> = HashMap::new();
        sparse.insert("a".to_owned(), None);
        assert_eq!(sparse.encode(), dictionary! { "a" => Map::Null });
        assert_eq!(HashMap::<String, Option<i64>>::decode(&sparse.encode()), Ok(sparse));
    }

    struct Even(i64);

    impl Decode for Even {
        fn decode(map: &Map) -> DecodeResult<Self> {
            i64::decode(map).map(Even)
        }

        fn decode_element(map: &Map) -> DecodeResult<Option<Self>> {
            Ok(Some(Self::decode(map)?).filter(|Even(n)| n % 2 == 0))
        }
    }

    #[test]
    fn opted_out_elements_skipped() {
        let evens = Vec::<Even>::decode(&array![1i64, 2i64, 3i64, 4i64]).unwrap();
        assert_eq!(evens.iter().map(|Even(n)| *n).collect::<Vec<_>>(), vec![2, 4]);
        let map = dictionary! { "a" => 1i64, "b" => 2i64 };
        let kept = BTreeMap::<String, Even>::decode(&map).unwrap();
        assert_eq!(kept.keys().collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn mapping_value_failure_aborts() {
        let map = dictionary! { "a" => 1i64, "b" => true };
        assert!(matches!(
            HashMap::<String, i64>::decode(&map),
            Err(DecodeError::CannotInitialize { target: "i64", .. })
        ));
    }

    #[test]
    fn entries_round_trip() {
        let entries: Entries<i64, bool> = vec![(1, true), (2, false)].into();
        let map = entries.try_encode().unwrap();
        assert_eq!(map, dictionary! { "1" => true, "2" => false });
        let mut decoded = Entries::<i64, bool>::decode(&map).unwrap().into_vec();
        decoded.sort();
        assert_eq!(decoded, vec![(1, true), (2, false)]);
    }
}
