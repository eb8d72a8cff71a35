//! Key packing: numeric keys are big-endian and order-preserving
//! (signed types get their sign bit flipped, floats get the standard
//! monotonic bit transform) so that lexicographic byte order matches
//! numeric order; text keys are raw UTF-8; non-unique secondary index
//! keys append the owning RecordId as a tiebreaker.

use crate::{
    codec::Value,
    error::{Error, ErrorKind, Result},
    ids::{ClassId, PositionId, RecordId},
};

pub fn pack_position(pos: PositionId) -> [u8; 8] {
    pos.get().to_be_bytes()
}

pub fn unpack_position(bytes: &[u8]) -> PositionId {
    let mut b = [0u8; 8];
    b.copy_from_slice(&bytes[..8]);
    PositionId(u64::from_be_bytes(b))
}

/// Order-preserving packing of a scalar value for use as (part of) a
/// secondary index key. Blob values are rejected — they are not
/// indexable.
pub fn pack_value(value: &Value) -> Result<Vec<u8>> {
    Ok(match value {
        Value::TinyInt(v) => vec![(*v as u8) ^ 0x80],
        Value::SmallInt(v) => (((*v as u16) ^ 0x8000).to_be_bytes()).to_vec(),
        Value::Int(v) => (((*v as u32) ^ 0x8000_0000).to_be_bytes()).to_vec(),
        Value::BigInt(v) => (((*v as u64) ^ 0x8000_0000_0000_0000).to_be_bytes()).to_vec(),
        Value::UnsignedTinyInt(v) => vec![*v],
        Value::UnsignedSmallInt(v) => v.to_be_bytes().to_vec(),
        Value::UnsignedInt(v) => v.to_be_bytes().to_vec(),
        Value::UnsignedBigInt(v) => v.to_be_bytes().to_vec(),
        Value::Real(v) => pack_f64(*v).to_vec(),
        Value::Text(s) => s.as_bytes().to_vec(),
        Value::Blob(_) => {
            return Err(Error::new(
                ErrorKind::Fatal,
                file!(),
                line!(),
                "blob values are not indexable".to_string(),
            ))
        }
    })
}

fn pack_f64(v: f64) -> [u8; 8] {
    let bits = v.to_bits();
    let t = if bits & 0x8000_0000_0000_0000 != 0 {
        !bits
    } else {
        bits | 0x8000_0000_0000_0000
    };
    t.to_be_bytes()
}

/// Width in bytes of the (ClassId, PositionId) tiebreaker
/// `pack_composite` appends: 8-byte widened ClassId plus 8-byte
/// PositionId.
pub const COMPOSITE_TIEBREAKER_LEN: usize = 16;

/// Append the (ClassId, PositionId) tiebreaker used by non-unique
/// secondary index keys: packed value ∥ 8-byte big-endian ClassId ∥
/// big-endian u64 PositionId.
pub fn pack_composite(value: &Value, rid: RecordId) -> Result<Vec<u8>> {
    let mut key = pack_value(value)?;
    key.extend_from_slice(&(rid.class_id.get() as u64).to_be_bytes());
    key.extend_from_slice(&rid.position.get().to_be_bytes());
    Ok(key)
}

/// Split a composite non-unique index key back into its owning RecordId,
/// given the length of the value prefix.
pub fn unpack_composite_rid(key: &[u8]) -> RecordId {
    let n = key.len();
    let class_bytes = &key[n - COMPOSITE_TIEBREAKER_LEN..n - 8];
    let pos_bytes = &key[n - 8..n];
    let mut cb = [0u8; 8];
    cb.copy_from_slice(class_bytes);
    let mut pb = [0u8; 8];
    pb.copy_from_slice(pos_bytes);
    RecordId::new(
        ClassId(u64::from_be_bytes(cb) as u16),
        PositionId(u64::from_be_bytes(pb)),
    )
}

#[cfg(test)]
#[path = "key_test.rs"]
mod key_test;
