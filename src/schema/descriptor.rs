//! Wire encoding for the three catalog row kinds. Rows are small and
//! fixed-shape enough that a hand-rolled encoding (reusing the codec's
//! varint and payload primitives) is simpler than pulling in a generic
//! serializer for just this corner.

use crate::{
    codec::{value::PropertyType, varint},
    error::Result,
    ids::{ClassId, IndexId, PropertyId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    Vertex,
    Edge,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDescriptor {
    pub id: ClassId,
    pub name: String,
    pub kind: ClassKind,
    pub base: Option<ClassId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDescriptor {
    pub id: PropertyId,
    pub owning_class: ClassId,
    pub name: String,
    pub prop_type: PropertyType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexDescriptor {
    pub id: IndexId,
    pub class_id: ClassId,
    pub property_id: PropertyId,
    pub unique: bool,
}

pub fn encode_class(c: &ClassDescriptor) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&c.id.get().to_be_bytes());
    buf.push(match c.kind {
        ClassKind::Vertex => 0,
        ClassKind::Edge => 1,
    });
    match c.base {
        Some(b) => {
            buf.push(1);
            buf.extend_from_slice(&b.get().to_be_bytes());
        }
        None => buf.push(0),
    }
    varint::encode(c.name.len() as u64, &mut buf);
    buf.extend_from_slice(c.name.as_bytes());
    buf
}

pub fn decode_class(bytes: &[u8]) -> Result<ClassDescriptor> {
    let id = ClassId(u16::from_be_bytes([bytes[0], bytes[1]]));
    let kind = if bytes[2] == 0 { ClassKind::Vertex } else { ClassKind::Edge };
    let (base, rest) = if bytes[3] == 1 {
        (Some(ClassId(u16::from_be_bytes([bytes[4], bytes[5]]))), &bytes[6..])
    } else {
        (None, &bytes[4..])
    };
    let (len, used) = varint::decode(rest)?;
    let name = String::from_utf8_lossy(&rest[used..used + len as usize]).into_owned();
    Ok(ClassDescriptor { id, name, kind, base })
}

pub fn encode_property(p: &PropertyDescriptor) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&p.id.get().to_be_bytes());
    buf.extend_from_slice(&p.owning_class.get().to_be_bytes());
    buf.push(p.prop_type.tag());
    varint::encode(p.name.len() as u64, &mut buf);
    buf.extend_from_slice(p.name.as_bytes());
    buf
}

pub fn decode_property(bytes: &[u8]) -> Result<PropertyDescriptor> {
    let id = PropertyId(u16::from_be_bytes([bytes[0], bytes[1]]));
    let owning_class = ClassId(u16::from_be_bytes([bytes[2], bytes[3]]));
    let prop_type = PropertyType::from_tag(bytes[4]).expect("valid property type tag on disk");
    let (len, used) = varint::decode(&bytes[5..])?;
    let name = String::from_utf8_lossy(&bytes[5 + used..5 + used + len as usize]).into_owned();
    Ok(PropertyDescriptor { id, owning_class, name, prop_type })
}

pub fn encode_index(ix: &IndexDescriptor) -> Vec<u8> {
    let mut buf = Vec::with_capacity(7);
    buf.extend_from_slice(&ix.id.get().to_be_bytes());
    buf.extend_from_slice(&ix.class_id.get().to_be_bytes());
    buf.extend_from_slice(&ix.property_id.get().to_be_bytes());
    buf.push(ix.unique as u8);
    buf
}

pub fn decode_index(bytes: &[u8]) -> Result<IndexDescriptor> {
    Ok(IndexDescriptor {
        id: IndexId(u16::from_be_bytes([bytes[0], bytes[1]])),
        class_id: ClassId(u16::from_be_bytes([bytes[2], bytes[3]])),
        property_id: PropertyId(u16::from_be_bytes([bytes[4], bytes[5]])),
        unique: bytes[6] != 0,
    })
}
