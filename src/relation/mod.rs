//! Adjacency between vertices and edges: two reserved sub-databases,
//! `endpoints` (edge → (src, dst)) and a pair of duplicate-sorted
//! `incidence_out`/`incidence_in` sub-databases keyed by (vertex, edge
//! class) holding (peer, edge) tuples.

mod filter;

pub use filter::ClassFilter;

use log::trace;

use crate::{
    error::Result,
    ids::{ClassId, RecordId},
    kv::{Cursor, DbHandle, Environment, RwTxn},
    schema::Catalog,
    store,
};

const DB_ENDPOINTS: &str = "endpoints";
const DB_INCIDENCE_OUT: &str = "incidence_out";
const DB_INCIDENCE_IN: &str = "incidence_in";

pub struct RelationDbs {
    pub endpoints: DbHandle,
    pub incidence_out: DbHandle,
    pub incidence_in: DbHandle,
}

impl RelationDbs {
    pub fn open(env: &Environment) -> Result<RelationDbs> {
        Ok(RelationDbs {
            endpoints: env.db(DB_ENDPOINTS, false)?,
            incidence_out: env.db(DB_INCIDENCE_OUT, true)?,
            incidence_in: env.db(DB_INCIDENCE_IN, true)?,
        })
    }
}

fn rid_bytes(rid: RecordId) -> [u8; 10] {
    let mut buf = [0u8; 10];
    buf[..2].copy_from_slice(&rid.class_id.get().to_be_bytes());
    buf[2..].copy_from_slice(&rid.position.get().to_be_bytes());
    buf
}

fn unpack_rid(bytes: &[u8]) -> RecordId {
    let class_id = ClassId(u16::from_be_bytes([bytes[0], bytes[1]]));
    let mut p = [0u8; 8];
    p.copy_from_slice(&bytes[2..10]);
    RecordId::new(class_id, crate::ids::PositionId(u64::from_be_bytes(p)))
}

fn incidence_key(vertex: RecordId, edge_class: ClassId) -> Vec<u8> {
    let mut key = rid_bytes(vertex).to_vec();
    key.extend_from_slice(&edge_class.get().to_be_bytes());
    key
}

fn incidence_value(peer: RecordId, edge: RecordId) -> Vec<u8> {
    let mut v = rid_bytes(peer).to_vec();
    v.extend_from_slice(&rid_bytes(edge));
    v
}

fn split_incidence_value(v: &[u8]) -> (RecordId, RecordId) {
    (unpack_rid(&v[0..16]), unpack_rid(&v[16..32]))
}

pub fn endpoints(txn: &crate::kv::RoTxn, dbs: &RelationDbs, edge: RecordId) -> Result<Option<(RecordId, RecordId)>> {
    match txn.get(dbs.endpoints, &rid_bytes(edge))? {
        Some(v) => Ok(Some(split_incidence_value(v))),
        None => Ok(None),
    }
}

/// Add an edge: writes its payload via the record store, writes the
/// endpoints row, and inserts one out-incidence entry at `src` and one
/// in-incidence entry at `dst`.
pub fn add_edge(
    txn: &mut RwTxn,
    env: &Environment,
    rel: &RelationDbs,
    cat: &Catalog,
    edge_class: ClassId,
    src: RecordId,
    dst: RecordId,
    payload: &store::Record,
) -> Result<RecordId> {
    store::validate_class_kind(cat, src.class_id, crate::schema::ClassKind::Vertex)?;
    store::validate_class_kind(cat, dst.class_id, crate::schema::ClassKind::Vertex)?;
    require_vertex_exists(txn, env, src)?;
    require_vertex_exists(txn, env, dst)?;

    let edge_db = store::open_class_db(env, edge_class)?;
    let edge_rid = store::add_record(txn, edge_db, cat, edge_class, payload)?;

    txn.put(rel.endpoints, &rid_bytes(edge_rid), &incidence_value(src, dst))?;
    txn.put(
        rel.incidence_out,
        &incidence_key(src, edge_class),
        &incidence_value(dst, edge_rid),
    )?;
    txn.put(
        rel.incidence_in,
        &incidence_key(dst, edge_class),
        &incidence_value(src, edge_rid),
    )?;
    trace!(target: "relation", "add_edge {} {} -> {}", edge_rid, src, dst);
    Ok(edge_rid)
}

fn require_vertex_exists(txn: &mut RwTxn, env: &Environment, rid: RecordId) -> Result<()> {
    let db = store::open_class_db(env, rid.class_id)?;
    let found = txn.get(db, &crate::codec::key::pack_position(rid.position))?.is_some();
    if !found {
        return crate::err_at!(
            Usage(crate::error::UsageError::NoExistVertex),
            msg: "vertex {} does not exist",
            rid
        );
    }
    Ok(())
}

/// Remove an edge: clears both incidence entries, the endpoints row, and
/// the edge's own payload.
pub fn delete_edge(
    txn: &mut RwTxn,
    env: &Environment,
    rel: &RelationDbs,
    edge_class: ClassId,
    edge: RecordId,
) -> Result<()> {
    if let Some((src, dst)) = endpoints_rw(txn, rel, edge)? {
        txn.del(rel.incidence_out, &incidence_key(src, edge_class), Some(&incidence_value(dst, edge)))?;
        txn.del(rel.incidence_in, &incidence_key(dst, edge_class), Some(&incidence_value(src, edge)))?;
        txn.del(rel.endpoints, &rid_bytes(edge), None)?;
    }
    let edge_db = store::open_class_db(env, edge_class)?;
    store::delete_record(txn, edge_db, edge.position)
}

fn endpoints_rw(txn: &mut RwTxn, rel: &RelationDbs, edge: RecordId) -> Result<Option<(RecordId, RecordId)>> {
    match txn.get(rel.endpoints, &rid_bytes(edge))? {
        Some(v) => Ok(Some(split_incidence_value(v))),
        None => Ok(None),
    }
}

/// Remove a vertex: deletes every incident edge (both directions, across
/// every edge class) before removing the vertex's own payload.
pub fn delete_vertex(
    txn: &mut RwTxn,
    env: &Environment,
    rel: &RelationDbs,
    cat: &Catalog,
    vertex: RecordId,
) -> Result<()> {
    for edge_class in cat.classes().filter(|c| c.kind == crate::schema::ClassKind::Edge).map(|c| c.id) {
        loop {
            let entry = {
                let mut cur = txn.cursor(rel.incidence_out)?;
                seek_incidence(&mut cur, vertex, edge_class)?
            };
            let (_, edge_rid) = match entry {
                Some(v) => v,
                None => break,
            };
            delete_edge(txn, env, rel, edge_class, edge_rid)?;
        }
        loop {
            let entry = {
                let mut cur = txn.cursor(rel.incidence_in)?;
                seek_incidence(&mut cur, vertex, edge_class)?
            };
            let (_, edge_rid) = match entry {
                Some(v) => v,
                None => break,
            };
            delete_edge(txn, env, rel, edge_class, edge_rid)?;
        }
    }
    let vdb = store::open_class_db(env, vertex.class_id)?;
    store::delete_record(txn, vdb, vertex.position)
}

fn seek_incidence(cur: &mut Cursor, vertex: RecordId, edge_class: ClassId) -> Result<Option<(RecordId, RecordId)>> {
    let key = incidence_key(vertex, edge_class);
    match cur.seek_exact(&key)? {
        Some((_, v)) => Ok(Some(split_incidence_value(v))),
        None => Ok(None),
    }
}

/// Iterate out-edges of `v`. When `edge_class` is `None`, walks every edge
/// class known to the catalog in ClassId order; `filter` additionally
/// scopes which edge classes are visited.
pub fn out_edges(
    txn: &crate::kv::RoTxn,
    rel: &RelationDbs,
    cat: &Catalog,
    v: RecordId,
    edge_class: Option<ClassId>,
    filter: Option<&ClassFilter>,
) -> Result<Vec<(RecordId, RecordId)>> {
    adjacency(txn, rel.incidence_out, cat, v, edge_class, filter)
}

/// Iterate in-edges of `v`, symmetric to [`out_edges`].
pub fn in_edges(
    txn: &crate::kv::RoTxn,
    rel: &RelationDbs,
    cat: &Catalog,
    v: RecordId,
    edge_class: Option<ClassId>,
    filter: Option<&ClassFilter>,
) -> Result<Vec<(RecordId, RecordId)>> {
    adjacency(txn, rel.incidence_in, cat, v, edge_class, filter)
}

fn adjacency(
    txn: &crate::kv::RoTxn,
    db: DbHandle,
    cat: &Catalog,
    v: RecordId,
    edge_class: Option<ClassId>,
    filter: Option<&ClassFilter>,
) -> Result<Vec<(RecordId, RecordId)>> {
    let classes: Vec<ClassId> = match edge_class {
        Some(c) => vec![c],
        None => {
            let mut cs: Vec<ClassId> = cat
                .classes()
                .filter(|c| c.kind == crate::schema::ClassKind::Edge)
                .map(|c| c.id)
                .collect();
            cs.sort_by_key(|c| c.get());
            cs
        }
    };

    let mut out = Vec::new();
    for class in classes {
        if let Some(f) = filter {
            if !f.allows(class) {
                continue;
            }
        }
        let mut cur = txn.cursor(db)?;
        let prefix = incidence_key(v, class);
        let mut entry = cur.seek_range(&prefix)?;
        while let Some((k, val)) = entry {
            if !k.starts_with(&prefix) {
                break;
            }
            let (peer, edge_rid) = split_incidence_value(val);
            out.push((peer, edge_rid));
            entry = cur.next_dup()?;
        }
    }
    Ok(out)
}
