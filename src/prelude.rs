//! Assorted imports for modules that define or convert their own types
//!
//! ```
//! use cartograph::prelude::*;
//!
//! let map = Some(vec![1i64, 2]).encode();
//! assert_eq!(Option::<Vec<i64>>::decode(&map), Ok(Some(vec![1, 2])));
//! ```

pub use crate::aggregate::{Construct, Field, FieldDescriptor, FieldSource, Fields};
pub use crate::conv::{
    Decode, DecodeError, DecodeKey, DecodeResult, Encode, EncodeError, EncodeKey, EncodeResult, TryEncode,
    TryEncodeKey,
};
pub use crate::erased::Opaque;
pub use crate::map::{Bytes, Dictionary, Map};
pub use crate::{array, dictionary};
