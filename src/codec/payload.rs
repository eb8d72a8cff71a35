//! Record payload codec: a self-describing, length-prefixed
//! concatenation of `(propertyId varint, typeTag u8, length varint,
//! value bytes)`. Decoding is streaming, tolerates trailing garbage, and
//! never needs the catalog to parse a value's bytes — only to name the
//! resulting fields.

use crate::{
    codec::{value::PropertyType, varint, Value},
    err_at,
    error::Result,
    ids::PropertyId,
};

/// Encode fields in the given (writer-chosen) order. Order is never
/// normalized — readers must not assume one.
pub fn encode(fields: &[(PropertyId, Value)]) -> Vec<u8> {
    let mut buf = Vec::new();
    for (id, value) in fields {
        varint::encode(id.get() as u64, &mut buf);
        buf.push(value.property_type().tag());

        let mut vbuf = Vec::new();
        encode_value(value, &mut vbuf);
        varint::encode(vbuf.len() as u64, &mut buf);
        buf.extend_from_slice(&vbuf);
    }
    buf
}

fn encode_value(value: &Value, buf: &mut Vec<u8>) {
    match value {
        Value::TinyInt(v) => buf.push(*v as u8),
        Value::SmallInt(v) => buf.extend_from_slice(&v.to_le_bytes()),
        Value::Int(v) => buf.extend_from_slice(&v.to_le_bytes()),
        Value::BigInt(v) => buf.extend_from_slice(&v.to_le_bytes()),
        Value::UnsignedTinyInt(v) => buf.push(*v),
        Value::UnsignedSmallInt(v) => buf.extend_from_slice(&v.to_le_bytes()),
        Value::UnsignedInt(v) => buf.extend_from_slice(&v.to_le_bytes()),
        Value::UnsignedBigInt(v) => buf.extend_from_slice(&v.to_le_bytes()),
        Value::Real(v) => buf.extend_from_slice(&v.to_le_bytes()),
        Value::Text(s) => buf.extend_from_slice(s.as_bytes()),
        Value::Blob(b) => buf.extend_from_slice(b),
    }
}

fn decode_value(tag: PropertyType, bytes: &[u8]) -> Result<Value> {
    Ok(match tag {
        PropertyType::TinyInt => Value::TinyInt(need::<1>(bytes)?[0] as i8),
        PropertyType::SmallInt => Value::SmallInt(i16::from_le_bytes(need(bytes)?)),
        PropertyType::Int => Value::Int(i32::from_le_bytes(need(bytes)?)),
        PropertyType::BigInt => Value::BigInt(i64::from_le_bytes(need(bytes)?)),
        PropertyType::UnsignedTinyInt => Value::UnsignedTinyInt(need::<1>(bytes)?[0]),
        PropertyType::UnsignedSmallInt => Value::UnsignedSmallInt(u16::from_le_bytes(need(bytes)?)),
        PropertyType::UnsignedInt => Value::UnsignedInt(u32::from_le_bytes(need(bytes)?)),
        PropertyType::UnsignedBigInt => Value::UnsignedBigInt(u64::from_le_bytes(need(bytes)?)),
        PropertyType::Real => Value::Real(f64::from_le_bytes(need(bytes)?)),
        PropertyType::Text => {
            Value::Text(err_at!(DecodeFail, std::str::from_utf8(bytes))?.to_string())
        }
        PropertyType::Blob => Value::Blob(bytes.to_vec()),
    })
}

fn need<const N: usize>(bytes: &[u8]) -> Result<[u8; N]> {
    if bytes.len() < N {
        return err_at!(DecodeFail, msg: "expected {} bytes, got {}", N, bytes.len());
    }
    let mut arr = [0u8; N];
    arr.copy_from_slice(&bytes[..N]);
    Ok(arr)
}

/// Decode a payload into `(PropertyId, Value)` pairs in wire order.
/// Trailing bytes that don't form a complete field are ignored, which is
/// what lets an in-flight write of a shorter/older payload shape stay
/// readable.
pub fn decode(mut buf: &[u8]) -> Result<Vec<(PropertyId, Value)>> {
    let mut fields = Vec::new();
    loop {
        if buf.is_empty() {
            break;
        }
        let (id, used) = match varint::decode(buf) {
            Ok(v) => v,
            Err(_) => break,
        };
        buf = &buf[used..];

        if buf.is_empty() {
            break;
        }
        let tag_byte = buf[0];
        buf = &buf[1..];
        let tag = match PropertyType::from_tag(tag_byte) {
            Some(t) => t,
            None => break,
        };

        let (len, used) = match varint::decode(buf) {
            Ok(v) => v,
            Err(_) => break,
        };
        buf = &buf[used..];

        let len = len as usize;
        if buf.len() < len {
            break;
        }
        let value_bytes = &buf[..len];
        buf = &buf[len..];

        let value = decode_value(tag, value_bytes)?;
        fields.push((PropertyId(id as u16), value));
    }
    Ok(fields)
}

#[cfg(test)]
#[path = "payload_test.rs"]
mod payload_test;
