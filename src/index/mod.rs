//! Per (class, property) B+-tree secondary indexes: `idx/<indexId>`.
//! Unique indexes key by the packed value alone; non-unique indexes
//! append the owning RecordId so duplicates coexist under distinct keys
//! while staying range-scannable by the value prefix.

use log::trace;

use crate::{
    codec::{key, Value},
    err_at,
    error::{Result, UsageError},
    ids::{IndexId, RecordId},
    kv::{DbHandle, Environment, RwTxn},
    schema::IndexDescriptor,
    store,
};

pub fn open_index_db(env: &Environment, index: IndexId) -> Result<DbHandle> {
    env.db(&format!("idx/{}", index.get()), false)
}

pub fn index_insert(txn: &mut RwTxn, db: DbHandle, desc: &IndexDescriptor, value: &Value, rid: RecordId) -> Result<()> {
    if desc.unique {
        let k = key::pack_value(value)?;
        if txn.get(db, &k)?.is_some() {
            return err_at!(Usage(UsageError::DuplicateKey), msg: "duplicate key in unique index {}", desc.id.get());
        }
        txn.put(db, &k, &rid_bytes(rid))?;
    } else {
        let k = key::pack_composite(value, rid)?;
        txn.put(db, &k, &[])?;
    }
    trace!(target: "index", "index_insert index={} rid={}", desc.id.get(), rid);
    Ok(())
}

pub fn index_delete(txn: &mut RwTxn, db: DbHandle, desc: &IndexDescriptor, value: &Value, rid: RecordId) -> Result<()> {
    if desc.unique {
        txn.del(db, &key::pack_value(value)?, None)?;
    } else {
        txn.del(db, &key::pack_composite(value, rid)?, None)?;
    }
    Ok(())
}

fn rid_bytes(rid: RecordId) -> [u8; 10] {
    let mut b = [0u8; 10];
    b[..2].copy_from_slice(&rid.class_id.get().to_be_bytes());
    b[2..].copy_from_slice(&rid.position.get().to_be_bytes());
    b
}

fn unpack_rid(bytes: &[u8]) -> RecordId {
    let class_id = crate::ids::ClassId(u16::from_be_bytes([bytes[0], bytes[1]]));
    let mut p = [0u8; 8];
    p.copy_from_slice(&bytes[2..10]);
    RecordId::new(class_id, crate::ids::PositionId(u64::from_be_bytes(p)))
}

/// A lookup predicate against one index's packed values.
#[derive(Debug, Clone)]
pub enum Condition {
    Eq(Value),
    Lt(Value),
    Le(Value),
    Gt(Value),
    Ge(Value),
    Between(Value, Value, bool, bool),
}

/// Evaluate `condition` over `db` (a index sub-database belonging to
/// `desc`), returning matching RecordIds in index key order.
pub fn lookup(txn: &crate::kv::RoTxn, db: DbHandle, desc: &IndexDescriptor, condition: &Condition) -> Result<Vec<RecordId>> {
    let mut out = Vec::new();
    let mut cur = txn.cursor(db)?;

    match condition {
        Condition::Eq(v) => {
            let prefix = key::pack_value(v)?;
            let mut entry = cur.seek_range(&prefix)?;
            while let Some((k, val)) = entry {
                if !k.starts_with(&prefix) {
                    break;
                }
                out.push(entry_rid(desc, k, val));
                entry = cur.next()?;
            }
        }
        Condition::Lt(v) | Condition::Le(v) => {
            let bound = key::pack_value(v)?;
            let inclusive = matches!(condition, Condition::Le(_));
            let mut entry = cur.first()?;
            while let Some((k, val)) = entry {
                let cmp = compare_prefix(k, &bound);
                let keep = if inclusive { cmp != std::cmp::Ordering::Greater } else { cmp == std::cmp::Ordering::Less };
                if !keep {
                    break;
                }
                out.push(entry_rid(desc, k, val));
                entry = cur.next()?;
            }
        }
        Condition::Gt(v) | Condition::Ge(v) => {
            let bound = key::pack_value(v)?;
            let inclusive = matches!(condition, Condition::Ge(_));
            let mut entry = cur.seek_range(&bound)?;
            while let Some((k, val)) = entry {
                let cmp = compare_prefix(k, &bound);
                if !inclusive && cmp == std::cmp::Ordering::Equal {
                    entry = cur.next()?;
                    continue;
                }
                out.push(entry_rid(desc, k, val));
                entry = cur.next()?;
            }
        }
        Condition::Between(lo, hi, lo_inc, hi_inc) => {
            let lo_bytes = key::pack_value(lo)?;
            let hi_bytes = key::pack_value(hi)?;
            if lo_bytes > hi_bytes {
                return Ok(out);
            }
            let mut entry = cur.seek_range(&lo_bytes)?;
            while let Some((k, val)) = entry {
                let cmp_lo = compare_prefix(k, &lo_bytes);
                if !lo_inc && cmp_lo == std::cmp::Ordering::Equal {
                    entry = cur.next()?;
                    continue;
                }
                let cmp_hi = compare_prefix(k, &hi_bytes);
                let within_hi = if *hi_inc { cmp_hi != std::cmp::Ordering::Greater } else { cmp_hi == std::cmp::Ordering::Less };
                if !within_hi {
                    break;
                }
                out.push(entry_rid(desc, k, val));
                entry = cur.next()?;
            }
        }
    }
    Ok(out)
}

/// Compare `key`'s value-prefix (the bytes before the RecordId tiebreaker
/// in a non-unique index, or the whole key in a unique index) against
/// `bound`.
fn compare_prefix(key: &[u8], bound: &[u8]) -> std::cmp::Ordering {
    let prefix = if key.len() > bound.len() && key.len() - bound.len() == key::COMPOSITE_TIEBREAKER_LEN {
        &key[..bound.len()]
    } else {
        key
    };
    prefix.cmp(bound)
}

fn entry_rid(desc: &IndexDescriptor, key: &[u8], value: &[u8]) -> RecordId {
    if desc.unique {
        unpack_rid(value)
    } else {
        crate::codec::key::unpack_composite_rid(key)
    }
}

/// Scan the class once and populate a freshly created index, inserting in
/// sorted key order (the class store is already sorted by PositionId, not
/// by value, so entries are inserted one at a time rather than appended).
pub fn reindex_class(
    txn: &mut RwTxn,
    env: &Environment,
    cat: &crate::schema::Catalog,
    desc: &IndexDescriptor,
) -> Result<()> {
    let class_db = store::open_class_db(env, desc.class_id)?;
    let index_db = open_index_db(env, desc.id)?;
    let prop_name = cat
        .property(desc.property_id)
        .map(|p| p.name.clone())
        .unwrap_or_default();

    let entries = {
        let mut cur = txn.cursor(class_db)?;
        let mut out = Vec::new();
        let mut entry = cur.first()?;
        while let Some((k, v)) = entry {
            let position = key::unpack_position(k);
            if position != crate::ids::POSITION_COUNTER_KEY {
                let fields = crate::codec::payload::decode(v)?;
                if let Some((_, value)) = fields.iter().find(|(id, _)| *id == desc.property_id) {
                    out.push((RecordId::new(desc.class_id, position), value.clone()));
                }
            }
            entry = cur.next()?;
        }
        out
    };

    for (rid, value) in entries {
        index_insert(txn, index_db, desc, &value, rid)?;
    }
    trace!(target: "index", "reindexed class={} property={:?}", desc.class_id.get(), prop_name);
    Ok(())
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod mod_test;
