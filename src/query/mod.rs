//! Primitive find/traverse verbs consuming the lower layers directly;
//! composition of these verbs into a higher-level query language is left
//! to callers.

mod traverse;

pub use traverse::{shortest_path, traverse, Direction, RecordPredicate, Strategy};

use crate::{
    codec::Value,
    error::Result,
    ids::{ClassId, RecordId},
    index::{self, Condition},
    kv::{Environment, RoTxn},
    relation::{ClassFilter, RelationDbs},
    schema::Catalog,
    store,
};

/// `traverseOut(v)`: depth-bounded breadth-first walk following only
/// out-edges.
#[allow(clippy::too_many_arguments)]
pub fn traverse_out(
    txn: &RoTxn,
    env: &Environment,
    rel: &RelationDbs,
    cat: &Catalog,
    start: RecordId,
    max_depth: Option<usize>,
    edge_class: Option<ClassId>,
    filter: Option<&ClassFilter>,
    predicate: Option<&RecordPredicate>,
) -> Result<Vec<(RecordId, usize)>> {
    traverse(
        txn, env, rel, cat, start, Direction::Out, traverse::Strategy::Bfs, max_depth, edge_class, filter, predicate,
    )
}

/// `traverseIn(v)`: symmetric to [`traverse_out`], following only
/// in-edges.
#[allow(clippy::too_many_arguments)]
pub fn traverse_in(
    txn: &RoTxn,
    env: &Environment,
    rel: &RelationDbs,
    cat: &Catalog,
    start: RecordId,
    max_depth: Option<usize>,
    edge_class: Option<ClassId>,
    filter: Option<&ClassFilter>,
    predicate: Option<&RecordPredicate>,
) -> Result<Vec<(RecordId, usize)>> {
    traverse(
        txn, env, rel, cat, start, Direction::In, traverse::Strategy::Bfs, max_depth, edge_class, filter, predicate,
    )
}

/// `traverseAll(v)`: follows edges in either direction.
#[allow(clippy::too_many_arguments)]
pub fn traverse_all(
    txn: &RoTxn,
    env: &Environment,
    rel: &RelationDbs,
    cat: &Catalog,
    start: RecordId,
    max_depth: Option<usize>,
    edge_class: Option<ClassId>,
    filter: Option<&ClassFilter>,
    predicate: Option<&RecordPredicate>,
) -> Result<Vec<(RecordId, usize)>> {
    traverse(
        txn, env, rel, cat, start, Direction::Both, traverse::Strategy::Bfs, max_depth, edge_class, filter, predicate,
    )
}

/// `find(class).where(condition)[.indexed()]`: either a full class scan
/// filtered in process, or (when `.indexed()` names an indexed property)
/// a direct index lookup. Both return the same set of RecordIds for the
/// same predicate.
pub struct Find<'a> {
    class: ClassId,
    predicate: Option<(String, Condition)>,
    use_index: bool,
    cat: &'a Catalog,
}

impl<'a> Find<'a> {
    pub fn new(cat: &'a Catalog, class: ClassId) -> Find<'a> {
        Find { class, predicate: None, use_index: false, cat }
    }

    pub fn where_cond(mut self, property: &str, condition: Condition) -> Find<'a> {
        self.predicate = Some((property.to_string(), condition));
        self
    }

    pub fn indexed(mut self) -> Find<'a> {
        self.use_index = true;
        self
    }

    /// `find(class).where(condition).getCursor()`: the unindexed scan path
    /// as a lazy cursor rather than a materialized `Vec`, so a caller
    /// walking a large class doesn't pay to buffer every match up front.
    /// Bound to `txn`'s lifetime — it cannot outlive the transaction that
    /// produced it.
    pub fn get_cursor<'txn>(self, txn: &'txn RoTxn, env: &crate::kv::Environment) -> Result<FindCursor<'txn>> {
        let db = store::open_class_db(env, self.class)?;
        let scan = store::ClassScan::new(txn, db, self.class)?;
        let predicate = match &self.predicate {
            Some((name, cond)) => self.cat.property_by_name(self.class, name).map(|p| (p.id, cond.clone())),
            None => None,
        };
        Ok(FindCursor { scan, predicate })
    }

    pub fn get(self, txn: &RoTxn, env: &crate::kv::Environment) -> Result<Vec<RecordId>> {
        let (prop_name, condition) = match &self.predicate {
            Some(p) => p,
            None => return self.scan_all(txn, env),
        };

        let prop = match self.cat.property_by_name(self.class, prop_name) {
            Some(p) => p,
            None => return Ok(Vec::new()),
        };

        if self.use_index {
            if let Some(ix) = self.cat.index_of(self.class, prop.id) {
                let db = index::open_index_db(env, ix.id)?;
                return index::lookup(txn, db, ix, condition);
            }
        }
        self.scan_filtered(txn, env, prop.id, condition)
    }

    fn scan_all(&self, txn: &RoTxn, env: &crate::kv::Environment) -> Result<Vec<RecordId>> {
        let db = store::open_class_db(env, self.class)?;
        let mut scan = store::ClassScan::new(txn, db, self.class)?;
        let mut out = Vec::new();
        while let Some((rid, _)) = scan.next()? {
            out.push(rid);
        }
        Ok(out)
    }

    fn scan_filtered(
        &self,
        txn: &RoTxn,
        env: &crate::kv::Environment,
        prop_id: crate::ids::PropertyId,
        condition: &Condition,
    ) -> Result<Vec<RecordId>> {
        let db = store::open_class_db(env, self.class)?;
        let mut scan = store::ClassScan::new(txn, db, self.class)?;
        let mut out = Vec::new();
        while let Some((rid, fields)) = scan.next()? {
            if let Some((_, value)) = fields.iter().find(|(id, _)| *id == prop_id) {
                if matches_condition(value, condition) {
                    out.push(rid);
                }
            }
        }
        Ok(out)
    }
}

/// Lazy sequence over `find(class).where(...).getCursor()`'s unindexed
/// scan path, one record decoded per call to [`FindCursor::next`].
pub struct FindCursor<'txn> {
    scan: store::ClassScan<'txn>,
    predicate: Option<(crate::ids::PropertyId, Condition)>,
}

impl<'txn> FindCursor<'txn> {
    pub fn next(&mut self) -> Result<Option<RecordId>> {
        loop {
            let (rid, fields) = match self.scan.next()? {
                Some(entry) => entry,
                None => return Ok(None),
            };
            match &self.predicate {
                None => return Ok(Some(rid)),
                Some((prop_id, cond)) => {
                    let matched = fields
                        .iter()
                        .find(|(id, _)| id == prop_id)
                        .is_some_and(|(_, value)| matches_condition(value, cond));
                    if matched {
                        return Ok(Some(rid));
                    }
                }
            }
        }
    }
}

fn matches_condition(value: &Value, condition: &Condition) -> bool {
    use std::cmp::Ordering::*;
    let cmp = |a: &Value, b: &Value| -> Option<std::cmp::Ordering> {
        crate::codec::key::pack_value(a).ok().zip(crate::codec::key::pack_value(b).ok()).map(|(x, y)| x.cmp(&y))
    };
    match condition {
        Condition::Eq(v) => cmp(value, v) == Some(Equal),
        Condition::Lt(v) => cmp(value, v) == Some(Less),
        Condition::Le(v) => matches!(cmp(value, v), Some(Less) | Some(Equal)),
        Condition::Gt(v) => cmp(value, v) == Some(Greater),
        Condition::Ge(v) => matches!(cmp(value, v), Some(Greater) | Some(Equal)),
        Condition::Between(lo, hi, lo_inc, hi_inc) => {
            let above_lo = match cmp(value, lo) {
                Some(Less) => false,
                Some(Equal) => *lo_inc,
                Some(Greater) => true,
                None => false,
            };
            let below_hi = match cmp(value, hi) {
                Some(Greater) => false,
                Some(Equal) => *hi_inc,
                Some(Less) => true,
                None => false,
            };
            above_lo && below_hi
        }
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod mod_test;
