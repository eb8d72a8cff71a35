//! Two independent codecs over raw bytes: the property payload codec
//! ([`payload`]) and the key-packing helpers ([`key`]) used for
//! per-class record keys and secondary index keys.

pub mod key;
pub mod payload;
pub(crate) mod value;
pub(crate) mod varint;

pub use value::{PropertyType, Value};
