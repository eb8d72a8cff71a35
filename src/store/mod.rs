//! Per-class record storage: one sub-database `data/<classId>` keyed by
//! big-endian `PositionId`, with a sentinel max-key slot holding the
//! next-free position counter for O(1) append.

use log::trace;

use crate::{
    codec::{key, payload, Value},
    err_at,
    error::{Result, UsageError},
    ids::{ClassId, PositionId, RecordId, POSITION_COUNTER_KEY},
    kv::{DbHandle, Environment, RwTxn},
    schema::{Catalog, ClassKind},
};

pub type Record = Vec<(String, Value)>;

fn data_db_name(class: ClassId) -> String {
    format!("data/{}", class.get())
}

pub fn open_class_db(env: &Environment, class: ClassId) -> Result<DbHandle> {
    env.db(&data_db_name(class), false)
}

fn resolve_fields(
    cat: &Catalog,
    class: ClassId,
    record: &Record,
) -> Result<Vec<(crate::ids::PropertyId, Value)>> {
    let mut out = Vec::with_capacity(record.len());
    for (name, value) in record {
        let prop = cat.property_by_name(class, name).ok_or_else(|| {
            Result::<()>::unwrap_err(err_at!(Usage(UsageError::NoExistProperty), msg: "no property {:?} on class {}", name, class.get()))
        })?;
        if prop.prop_type != value.property_type() {
            return err_at!(
                Usage(UsageError::InvalidPropType),
                msg: "property {:?} expects {}, got {}",
                name, prop.prop_type, value.property_type()
            );
        }
        out.push((prop.id, value.clone()));
    }
    Ok(out)
}

/// Insert a new record of `class`, allocating its position. Validates
/// every field name against the class's effective schema. Does not touch
/// secondary indexes — callers (the relation/index layers) are
/// responsible for wiring those up atomically with this insert.
pub fn add_record(
    txn: &mut RwTxn,
    db: DbHandle,
    cat: &Catalog,
    class: ClassId,
    record: &Record,
) -> Result<RecordId> {
    let fields = resolve_fields(cat, class, record)?;
    let position = next_position(txn, db)?;
    let bytes = payload::encode(&fields);
    txn.put(db, &key::pack_position(position), &bytes)?;
    trace!(target: "store", "add_record class={} position={}", class.get(), position.get());
    Ok(RecordId::new(class, position))
}

fn next_position(txn: &mut RwTxn, db: DbHandle) -> Result<PositionId> {
    let counter_key = key::pack_position(POSITION_COUNTER_KEY);
    let current = match txn.get(db, &counter_key)? {
        Some(bytes) => key::unpack_position(bytes),
        None => PositionId(0),
    };
    let next = PositionId(current.get() + 1);
    txn.put(db, &counter_key, &key::pack_position(next))?;
    Ok(current)
}

/// Merge `record`'s fields into the existing payload (same-id fields
/// replaced, new fields appended) and write it back. Returns the fields
/// whose indexed value changed as `(old, new)` pairs, for the caller to
/// apply to the Secondary Index.
pub fn update_record(
    txn: &mut RwTxn,
    db: DbHandle,
    cat: &Catalog,
    rid: RecordId,
    record: &Record,
) -> Result<Vec<(crate::ids::PropertyId, Option<Value>, Value)>> {
    let existing = get_record_raw(txn.get(db, &key::pack_position(rid.position))?)?;
    let new_fields = resolve_fields(cat, rid.class_id, record)?;

    let mut merged = existing.clone();
    let mut changed = Vec::new();
    for (id, value) in new_fields {
        let old = merged.iter().find(|(eid, _)| *eid == id).map(|(_, v)| v.clone());
        if let Some(slot) = merged.iter_mut().find(|(eid, _)| *eid == id) {
            slot.1 = value.clone();
        } else {
            merged.push((id, value.clone()));
        }
        changed.push((id, old, value));
    }

    let bytes = payload::encode(&merged);
    txn.put(db, &key::pack_position(rid.position), &bytes)?;
    Ok(changed)
}

/// Remove the record's payload from the data sub-database. Callers above
/// this layer are responsible for detaching it from the relation and
/// secondary indexes first.
pub fn delete_record(txn: &mut RwTxn, db: DbHandle, position: PositionId) -> Result<()> {
    txn.del(db, &key::pack_position(position), None)
}

pub fn get_record(
    txn: &crate::kv::RoTxn,
    db: DbHandle,
    cat: &Catalog,
    position: PositionId,
) -> Result<Option<Record>> {
    match txn.get(db, &key::pack_position(position))? {
        Some(bytes) => Ok(Some(decode_named(bytes, Some(cat))?)),
        None => Ok(None),
    }
}

/// As [`get_record`], but against the write transaction's own in-flight
/// view rather than a read-only snapshot, so a fetch can see writes made
/// earlier in the same transaction.
pub fn get_record_rw(
    txn: &RwTxn,
    db: DbHandle,
    cat: &Catalog,
    position: PositionId,
) -> Result<Option<Record>> {
    match txn.get(db, &key::pack_position(position))? {
        Some(bytes) => Ok(Some(decode_named(bytes, Some(cat))?)),
        None => Ok(None),
    }
}

fn get_record_raw(bytes: Option<&[u8]>) -> Result<Vec<(crate::ids::PropertyId, Value)>> {
    match bytes {
        Some(b) => payload::decode(b),
        None => Ok(Vec::new()),
    }
}

fn decode_named(bytes: &[u8], cat: Option<&Catalog>) -> Result<Record> {
    let fields = payload::decode(bytes)?;
    Ok(fields
        .into_iter()
        .map(|(id, value)| {
            let name = cat
                .and_then(|c| c.property(id))
                .map(|p| p.name.clone())
                .unwrap_or_else(|| id.to_string());
            (name, value)
        })
        .collect())
}

/// Lazily scan every live record of `class` in PositionId order, skipping
/// the sentinel counter key.
pub struct ClassScan<'txn> {
    cursor: crate::kv::Cursor<'txn>,
    class: ClassId,
    started: bool,
}

impl<'txn> ClassScan<'txn> {
    pub fn new(txn: &'txn crate::kv::RoTxn, db: DbHandle, class: ClassId) -> Result<ClassScan<'txn>> {
        Ok(ClassScan { cursor: txn.cursor(db)?, class, started: false })
    }

    pub fn next(&mut self) -> Result<Option<(RecordId, Vec<(crate::ids::PropertyId, Value)>)>> {
        loop {
            let entry = if !self.started {
                self.started = true;
                self.cursor.first()?
            } else {
                self.cursor.next()?
            };
            let (k, v) = match entry {
                Some(kv) => kv,
                None => return Ok(None),
            };
            let position = key::unpack_position(k);
            if position == POSITION_COUNTER_KEY {
                continue;
            }
            let fields = payload::decode(v)?;
            return Ok(Some((RecordId::new(self.class, position), fields)));
        }
    }
}

/// `true` if `class`'s data sub-database holds no live records (only, at
/// most, the position counter sentinel).
pub fn class_is_empty(txn: &RwTxn, db: DbHandle) -> Result<bool> {
    let mut cur = txn.cursor(db)?;
    let mut entry = cur.first()?;
    while let Some((k, _)) = entry {
        if key::unpack_position(k) != POSITION_COUNTER_KEY {
            return Ok(false);
        }
        entry = cur.next()?;
    }
    Ok(true)
}

pub fn validate_class_kind(cat: &Catalog, class: ClassId, expect: ClassKind) -> Result<()> {
    let desc = cat.class(class).ok_or_else(|| {
        Result::<()>::unwrap_err(err_at!(Usage(UsageError::NoExistClass), msg: "class id {} not found", class.get()))
    })?;
    if desc.kind != expect {
        return err_at!(
            Usage(UsageError::InvalidClassType),
            msg: "class {:?} is not a {:?}",
            desc.name, expect
        );
    }
    Ok(())
}
