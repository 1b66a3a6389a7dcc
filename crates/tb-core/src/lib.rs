#![deny(missing_docs)]
#![doc = "Shared array, dtype and error types for the tight-binding toolkit."]

pub mod array;
pub mod constants;
pub mod dtype;
pub mod errors;
pub mod hash;
pub mod rng;
pub mod serde;

pub use array::{DynArray, IdArray, UNMATCHED_ID};
pub use dtype::{ElementType, NumericDType};
pub use errors::{ErrorInfo, TbError};
pub use hash::stable_hash_string;
pub use rng::{derive_substream_seed, sample_uniform};
pub use self::serde::{from_json_slice, to_canonical_json_bytes};
