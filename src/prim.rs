//! Conversions for primitive types
//!
//! Every primitive maps to exactly one case of [`Map`], and decoding requires that
//! case to be active; there is no coercion between numeric cases, nor between
//! numbers and strings.
//!
//! Fixed-width integers narrower than `i64` are carried by [`Map::Int`], and fail
//! to decode with [`DecodeError::CannotInitialize`] when the carried value is out
//! of their range. Platform-width and wider integers are carried the same way, but
//! only implement the failing encode path, which reports
//! [`EncodeError::NotRepresentable`] for values outside the range of `i64`. `f32` is
//! carried by [`Map::Double`] and refuses finite doubles beyond its range.

use std::convert::TryFrom;

use crate::conv::error::{DecodeError, DecodeResult, EncodeError, EncodeResult};
use crate::conv::{Decode, DecodeKey, Encode, EncodeKey, TryEncode, TryEncodeKey};
use crate::map::{Bytes, Map};

impl Decode for Map {
    #[inline]
    fn decode(map: &Map) -> DecodeResult<Self> {
        Ok(map.clone())
    }

    #[inline]
    fn decode_nil() -> Option<Self> {
        Some(Map::Null)
    }
}

impl Encode for Map {
    #[inline]
    fn encode(&self) -> Map {
        self.clone()
    }
}

impl TryEncode for Map {
    #[inline]
    fn try_encode(&self) -> EncodeResult<Map> {
        Ok(self.clone())
    }
}

macro_rules! impl_copy_primitive {
    ($($t:ty => $case:ident),* $(,)?) => {
        $(
            impl Decode for $t {
                fn decode(map: &Map) -> DecodeResult<Self> {
                    match map {
                        Map::$case(x) => Ok(*x),
                        _ => Err(DecodeError::cannot_initialize::<$t>(map)),
                    }
                }
            }

            impl Encode for $t {
                #[inline]
                fn encode(&self) -> Map {
                    Map::$case(*self)
                }
            }
        )*
    };
}

impl_copy_primitive! {
    bool => Bool,
    i64 => Int,
    f64 => Double,
}

impl TryEncode for bool {
    #[inline]
    fn try_encode(&self) -> EncodeResult<Map> {
        Ok(self.encode())
    }
}

impl TryEncode for i64 {
    #[inline]
    fn try_encode(&self) -> EncodeResult<Map> {
        Ok(self.encode())
    }
}

impl TryEncode for f64 {
    fn try_encode(&self) -> EncodeResult<Map> {
        #[cfg(feature = "check_finite")]
        {
            if !self.is_finite() {
                return Err(EncodeError::NotRepresentable(
                    std::any::type_name::<f64>(),
                ));
            }
        }
        Ok(self.encode())
    }
}

macro_rules! impl_owned_primitive {
    ($($t:ty => $case:ident),* $(,)?) => {
        $(
            impl Decode for $t {
                fn decode(map: &Map) -> DecodeResult<Self> {
                    match map {
                        Map::$case(x) => Ok(x.clone()),
                        _ => Err(DecodeError::cannot_initialize::<$t>(map)),
                    }
                }
            }

            impl Encode for $t {
                #[inline]
                fn encode(&self) -> Map {
                    Map::$case(self.clone())
                }
            }

            impl TryEncode for $t {
                #[inline]
                fn try_encode(&self) -> EncodeResult<Map> {
                    Ok(self.encode())
                }
            }
        )*
    };
}

impl_owned_primitive! {
    String => String,
    Bytes => Binary,
}

impl Encode for str {
    #[inline]
    fn encode(&self) -> Map {
        Map::String(self.to_owned())
    }
}

impl TryEncode for str {
    #[inline]
    fn try_encode(&self) -> EncodeResult<Map> {
        Ok(self.encode())
    }
}

macro_rules! impl_narrow_int {
    ($($t:ty),* $(,)?) => {
        $(
            impl Decode for $t {
                fn decode(map: &Map) -> DecodeResult<Self> {
                    match map {
                        Map::Int(x) => <$t>::try_from(*x)
                            .map_err(|_| DecodeError::cannot_initialize::<$t>(map)),
                        _ => Err(DecodeError::cannot_initialize::<$t>(map)),
                    }
                }
            }

            impl Encode for $t {
                #[inline]
                fn encode(&self) -> Map {
                    Map::Int(i64::from(*self))
                }
            }

            impl TryEncode for $t {
                #[inline]
                fn try_encode(&self) -> EncodeResult<Map> {
                    Ok(self.encode())
                }
            }
        )*
    };
}

impl_narrow_int!(i8, i16, i32, u8, u16, u32);

/// Integers whose range is not contained in `i64`, so that encoding is checked as
/// well as decoding.
macro_rules! impl_wide_int {
    ($($t:ty),* $(,)?) => {
        $(
            impl Decode for $t {
                fn decode(map: &Map) -> DecodeResult<Self> {
                    match map {
                        Map::Int(x) => <$t>::try_from(*x)
                            .map_err(|_| DecodeError::cannot_initialize::<$t>(map)),
                        _ => Err(DecodeError::cannot_initialize::<$t>(map)),
                    }
                }
            }

            impl TryEncode for $t {
                fn try_encode(&self) -> EncodeResult<Map> {
                    i64::try_from(*self)
                        .map(Map::Int)
                        .map_err(|_| EncodeError::NotRepresentable(std::any::type_name::<$t>()))
                }
            }
        )*
    };
}

impl_wide_int!(isize, usize, u64, i128, u128);

impl Decode for f32 {
    fn decode(map: &Map) -> DecodeResult<Self> {
        match map {
            Map::Double(x) => {
                let narrowed = *x as f32;
                if narrowed.is_infinite() && x.is_finite() {
                    Err(DecodeError::cannot_initialize::<f32>(map))
                } else {
                    Ok(narrowed)
                }
            }
            _ => Err(DecodeError::cannot_initialize::<f32>(map)),
        }
    }
}

impl Encode for f32 {
    #[inline]
    fn encode(&self) -> Map {
        Map::Double(f64::from(*self))
    }
}

impl TryEncode for f32 {
    fn try_encode(&self) -> EncodeResult<Map> {
        f64::from(*self).try_encode()
    }
}

impl DecodeKey for String {
    #[inline]
    fn decode_key(key: &str) -> Option<Self> {
        Some(key.to_owned())
    }
}

impl EncodeKey for String {
    #[inline]
    fn encode_key(&self) -> String {
        self.clone()
    }
}

impl EncodeKey for str {
    #[inline]
    fn encode_key(&self) -> String {
        self.to_owned()
    }
}

impl DecodeKey for i64 {
    fn decode_key(key: &str) -> Option<Self> {
        key.parse().ok()
    }
}

impl EncodeKey for i64 {
    fn encode_key(&self) -> String {
        self.to_string()
    }
}

impl DecodeKey for bool {
    fn decode_key(key: &str) -> Option<Self> {
        match key {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        }
    }
}

impl EncodeKey for bool {
    fn encode_key(&self) -> String {
        self.to_string()
    }
}

macro_rules! impl_try_encode_key {
    ($($t:ty),* $(,)?) => {
        $(
            impl TryEncodeKey for $t {
                #[inline]
                fn try_encode_key(&self) -> EncodeResult<String> {
                    Ok(self.encode_key())
                }
            }
        )*
    };
}

impl_try_encode_key!(String, str, i64, bool);

impl<T: EncodeKey + ?Sized> EncodeKey for &T {
    fn encode_key(&self) -> String {
        (**self).encode_key()
    }
}

impl<T: TryEncodeKey + ?Sized> TryEncodeKey for &T {
    fn try_encode_key(&self) -> EncodeResult<String> {
        (**self).try_encode_key()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn round_trip<T: Encode + Decode + PartialEq + std::fmt::Debug>(val: T) {
        assert_eq!(T::decode(&val.encode()), Ok(val));
    }

    #[test]
    fn primitives_round_trip() {
        round_trip(true);
        round_trip(false);
        round_trip(0i64);
        round_trip(i64::MIN);
        round_trip(i64::MAX);
        round_trip(-2.5f64);
        round_trip(String::new());
        round_trip("Ada".to_owned());
        round_trip(Bytes::from(vec![0u8, 0xff, 0x7f]));
        round_trip(-128i8);
        round_trip(u32::MAX);
    }

    #[test]
    fn map_is_identity() {
        let map = crate::array![1i64, "x", Map::Null];
        assert_eq!(Map::decode(&map), Ok(map.clone()));
        assert_eq!(map.encode(), map);
        assert_eq!(Map::decode_nil(), Some(Map::Null));
    }

    #[test]
    fn bool_into_int_fails() {
        assert_eq!(
            i64::decode(&Map::Bool(true)),
            Err(DecodeError::CannotInitialize {
                target: "i64",
                source: "true".to_owned()
            })
        );
    }

    #[test]
    fn no_numeric_coercion() {
        assert!(matches!(
            f64::decode(&Map::Int(1)),
            Err(DecodeError::CannotInitialize { target: "f64", .. })
        ));
        assert!(matches!(
            i64::decode(&Map::Double(1.0)),
            Err(DecodeError::CannotInitialize { target: "i64", .. })
        ));
        assert!(matches!(
            String::decode(&Map::Int(7)),
            Err(DecodeError::CannotInitialize { target, .. }) if target.ends_with("String")
        ));
    }

    #[test]
    fn narrow_int_out_of_range() {
        assert_eq!(
            u8::decode(&Map::Int(256)),
            Err(DecodeError::CannotInitialize {
                target: "u8",
                source: "256".to_owned()
            })
        );
        assert_eq!(i16::decode(&Map::Int(-300)), Ok(-300i16));
    }

    #[test]
    fn primitives_not_nil_constructible() {
        assert_eq!(i64::decode_nil(), None);
        assert_eq!(String::decode_nil(), None);
    }

    #[test]
    fn keys() {
        assert_eq!(i64::decode_key("42"), Some(42));
        assert_eq!(i64::decode_key("forty-two"), None);
        assert_eq!(bool::decode_key("true"), Some(true));
        assert_eq!(String::decode_key("k"), Some("k".to_owned()));
        assert_eq!((-7i64).encode_key(), "-7");
        assert_eq!("k".try_encode_key(), Ok("k".to_owned()));
    }

    #[test]
    fn wide_ints_checked_both_ways() {
        assert_eq!(usize::decode(&Map::Int(42)), Ok(42usize));
        assert_eq!(42usize.try_encode(), Ok(Map::Int(42)));
        assert_eq!(isize::decode(&Map::Int(-1)), Ok(-1isize));
        assert!(matches!(
            usize::decode(&Map::Int(-1)),
            Err(DecodeError::CannotInitialize { target: "usize", .. })
        ));
        assert_eq!(i128::decode(&Map::Int(i64::MIN)), Ok(i128::from(i64::MIN)));
        assert_eq!(u64::MAX.try_encode(), Err(EncodeError::NotRepresentable("u64")));
        assert_eq!((i128::from(i64::MAX) + 1).try_encode(), Err(EncodeError::NotRepresentable("i128")));
        assert!(u128::decode(&Map::Double(1.0)).is_err());
    }

    #[test]
    fn f32_through_double() {
        round_trip(1.5f32);
        assert_eq!(f32::decode(&Map::Double(0.1)), Ok(0.1f32));
        assert!(matches!(
            f32::decode(&Map::Double(f64::MAX)),
            Err(DecodeError::CannotInitialize { target: "f32", .. })
        ));
        assert_eq!(f32::decode(&Map::Double(f64::INFINITY)), Ok(f32::INFINITY));
        assert!(f32::decode(&Map::Int(1)).is_err());
    }

    #[cfg(feature = "check_finite")]
    #[test]
    fn nan_rejected_on_failing_path() {
        assert_eq!(
            f64::NAN.try_encode(),
            Err(EncodeError::NotRepresentable("f64"))
        );
    }
}
