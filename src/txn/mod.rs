//! Allocates transaction ids, binds a schema snapshot and a KV
//! transaction, and orchestrates commit/rollback across the catalog and
//! the data it governs. The single-writer slot is a latch-and-spin gate
//! reduced to one `AtomicBool`, since unlike a full reader/writer gate,
//! readers never need to block on it here (writer/writer exclusion
//! only).

mod writer_slot;

pub use writer_slot::WriterSlot;

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, RwLock,
};

use log::{debug, warn};

use crate::{
    codec::PropertyType,
    err_at,
    error::{Result, UsageError},
    ids::{ClassId, RecordId, TxnId},
    index,
    kv::{Environment, RoTxn, RwTxn},
    query::{self, RecordPredicate},
    relation::{self, ClassFilter, RelationDbs},
    schema::{Catalog, CatalogOverlay, ClassDescriptor, ClassKind, IndexDescriptor, PropertyDescriptor, SchemaDbs},
    store,
    txn::writer_slot::WriterGuard,
};

/// A read-only transaction: a fixed MVCC snapshot of both the KV store
/// and the schema catalog, captured at construction.
pub struct ReadTxn<'env> {
    pub id: TxnId,
    pub kv: RoTxn<'env>,
    pub catalog: Arc<Catalog>,
    env: &'env Environment,
}

/// A read-write transaction: the above plus a catalog overlay for
/// pending schema mutations and the single-writer slot held for its
/// lifetime (released when this value is dropped, committed, or rolled
/// back).
pub struct WriteTxn<'env> {
    pub id: TxnId,
    pub kv: RwTxn<'env>,
    overlay: CatalogOverlay,
    env: &'env Environment,
    schema_dbs: SchemaDbs,
    committed_pointer: &'env RwLock<Arc<Catalog>>,
    next_txn_counter: &'env AtomicU64,
    _writer: WriterGuard<'env>,
}

/// Owns the committed catalog pointer and the writer slot for one
/// environment. Constructed once per open database; transactions borrow
/// from it.
pub struct TransactionManager {
    env: Environment,
    committed: RwLock<Arc<Catalog>>,
    slot: WriterSlot,
    next_txn: AtomicU64,
}

impl TransactionManager {
    pub fn open(env: Environment) -> Result<TransactionManager> {
        let catalog = {
            let ro = env.begin_ro()?;
            Catalog::load(&env, &ro)?
        };
        let next_txn = catalog.next_txn_counter();
        Ok(TransactionManager {
            env,
            committed: RwLock::new(Arc::new(catalog)),
            slot: WriterSlot::new(),
            next_txn: AtomicU64::new(next_txn),
        })
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    fn alloc_txn_id(&self) -> TxnId {
        TxnId(self.next_txn.fetch_add(1, Ordering::Relaxed))
    }

    /// Begin a read-only transaction: a fresh KV snapshot plus a strong
    /// reference to whatever catalog is currently committed.
    pub fn begin_read(&self) -> Result<ReadTxn<'_>> {
        let id = self.alloc_txn_id();
        let kv = self.env.begin_ro()?;
        let catalog = Arc::clone(&self.committed.read().expect("catalog lock poisoned"));
        debug!(target: "txn", "begin_read id={}", id);
        Ok(ReadTxn { id, kv, catalog, env: &self.env })
    }

    /// Begin a read-write transaction. Fails with `WriterBusy` if another
    /// write transaction is already live.
    pub fn begin_write(&self) -> Result<WriteTxn<'_>> {
        let writer = self
            .slot
            .try_acquire()
            .ok_or_else(|| Result::<()>::unwrap_err(err_at!(Usage(UsageError::WriterBusy), msg: "a write transaction is already in progress")))?;
        let id = self.alloc_txn_id();
        let kv = self.env.begin_rw()?;
        let catalog = Arc::clone(&self.committed.read().expect("catalog lock poisoned"));
        let overlay = catalog.begin_overlay();
        let schema_dbs = Catalog::db_handles(&self.env)?;
        debug!(target: "txn", "begin_write id={}", id);
        Ok(WriteTxn {
            id,
            kv,
            overlay,
            env: &self.env,
            schema_dbs,
            committed_pointer: &self.committed,
            next_txn_counter: &self.next_txn,
            _writer: writer,
        })
    }
}

impl<'env> ReadTxn<'env> {
    pub fn env(&self) -> &'env Environment {
        self.env
    }

    /// `fetchByRid(rid)`: the record's current named fields, or `None` if
    /// it no longer exists as of this transaction's snapshot.
    pub fn fetch_by_rid(&self, rid: RecordId) -> Result<Option<store::Record>> {
        let db = store::open_class_db(self.env, rid.class_id)?;
        store::get_record(&self.kv, db, &self.catalog, rid.position)
    }

    pub fn find(&self, class: &str) -> Result<query::Find<'_>> {
        let desc = self.catalog.class_by_name(class).ok_or_else(|| no_class(class))?;
        Ok(query::Find::new(&self.catalog, desc.id))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn traverse_out(
        &self,
        rel: &RelationDbs,
        start: RecordId,
        max_depth: Option<usize>,
        edge_class: Option<&str>,
        filter: Option<&ClassFilter>,
        predicate: Option<&RecordPredicate>,
    ) -> Result<Vec<(RecordId, usize)>> {
        let edge_class_id = self.resolve_edge_class(edge_class)?;
        query::traverse_out(&self.kv, self.env, rel, &self.catalog, start, max_depth, edge_class_id, filter, predicate)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn traverse_in(
        &self,
        rel: &RelationDbs,
        start: RecordId,
        max_depth: Option<usize>,
        edge_class: Option<&str>,
        filter: Option<&ClassFilter>,
        predicate: Option<&RecordPredicate>,
    ) -> Result<Vec<(RecordId, usize)>> {
        let edge_class_id = self.resolve_edge_class(edge_class)?;
        query::traverse_in(&self.kv, self.env, rel, &self.catalog, start, max_depth, edge_class_id, filter, predicate)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn traverse_all(
        &self,
        rel: &RelationDbs,
        start: RecordId,
        max_depth: Option<usize>,
        edge_class: Option<&str>,
        filter: Option<&ClassFilter>,
        predicate: Option<&RecordPredicate>,
    ) -> Result<Vec<(RecordId, usize)>> {
        let edge_class_id = self.resolve_edge_class(edge_class)?;
        query::traverse_all(&self.kv, self.env, rel, &self.catalog, start, max_depth, edge_class_id, filter, predicate)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn shortest_path(
        &self,
        rel: &RelationDbs,
        start: RecordId,
        goal: RecordId,
        direction: query::Direction,
        edge_class: Option<&str>,
        filter: Option<&ClassFilter>,
        weight_property: Option<&str>,
    ) -> Result<Option<Vec<RecordId>>> {
        let edge_class_id = self.resolve_edge_class(edge_class)?;
        query::shortest_path(
            &self.kv, self.env, rel, &self.catalog, start, goal, direction, edge_class_id, filter, weight_property,
        )
    }

    fn resolve_edge_class(&self, name: Option<&str>) -> Result<Option<ClassId>> {
        match name {
            None => Ok(None),
            Some(n) => Ok(Some(self.catalog.class_by_name(n).ok_or_else(|| no_class(n))?.id)),
        }
    }
}

fn no_class(name: &str) -> crate::error::Error {
    Result::<()>::unwrap_err(err_at!(Usage(UsageError::NoExistClass), msg: "class {:?} not found", name))
}

impl<'env> WriteTxn<'env> {
    pub fn env(&self) -> &'env Environment {
        self.env
    }

    /// Drop a class, refusing when it still owns live records rather
    /// than cascading the delete into the record/relation stores.
    pub fn drop_class(&mut self, name: &str) -> Result<()> {
        if let Some(desc) = self.overlay.view().class_by_name(name) {
            let id = desc.id;
            let db = crate::store::open_class_db(self.env, id)?;
            if !crate::store::class_is_empty(&self.kv, db)? {
                return err_at!(
                    Usage(UsageError::ClassNotEmpty),
                    msg: "class {:?} still has records; delete them before dropping the class",
                    name
                );
            }
        }
        self.overlay.drop_class(name)
    }

    /// The schema as this transaction currently sees it, pending
    /// mutations included.
    pub fn view(&self) -> &Catalog {
        self.overlay.view()
    }

    pub fn add_class(&mut self, name: &str, kind: ClassKind, base: Option<&str>) -> Result<ClassDescriptor> {
        self.overlay.add_class(name, kind, base)
    }

    pub fn rename_class(&mut self, from: &str, to: &str) -> Result<()> {
        self.overlay.rename_class(from, to)
    }

    pub fn add_property(&mut self, class: &str, name: &str, prop_type: PropertyType) -> Result<PropertyDescriptor> {
        self.overlay.add_property(class, name, prop_type)
    }

    pub fn drop_property(&mut self, class: &str, name: &str) -> Result<()> {
        self.overlay.drop_property(class, name)
    }

    pub fn rename_property(&mut self, class: &str, from: &str, to: &str) -> Result<()> {
        self.overlay.rename_property(class, from, to)
    }

    /// Register the index and immediately populate it from every
    /// existing record of `class`.
    pub fn create_index(&mut self, class: &str, property: &str, unique: bool) -> Result<IndexDescriptor> {
        let desc = self.overlay.create_index(class, property, unique)?;
        crate::index::reindex_class(&mut self.kv, self.env, self.overlay.view(), &desc)?;
        Ok(desc)
    }

    pub fn drop_index(&mut self, class: &str, property: &str) -> Result<IndexDescriptor> {
        self.overlay.drop_index(class, property)
    }

    pub fn add_subclass_of(&mut self, class: &str, base: &str) -> Result<()> {
        self.overlay.add_subclass_of(class, base)
    }

    /// `fetchByRid(rid)`, reading through this transaction's own pending
    /// writes rather than a separate snapshot.
    pub fn fetch_by_rid(&self, rid: RecordId) -> Result<Option<store::Record>> {
        let db = store::open_class_db(self.env, rid.class_id)?;
        store::get_record_rw(&self.kv, db, self.overlay.view(), rid.position)
    }

    /// `addVertex(class, record)`: insert a record of a Vertex class and
    /// populate every index on a property the record sets.
    pub fn add_vertex(&mut self, class: &str, record: &store::Record) -> Result<RecordId> {
        let class_id = self.overlay.view().class_by_name(class).ok_or_else(|| no_class(class))?.id;
        store::validate_class_kind(self.overlay.view(), class_id, ClassKind::Vertex)?;
        let db = store::open_class_db(self.env, class_id)?;
        let rid = store::add_record(&mut self.kv, db, self.overlay.view(), class_id, record)?;
        apply_index_inserts(self.overlay.view(), &mut self.kv, self.env, class_id, rid, record)?;
        Ok(rid)
    }

    /// `addEdge(class, src, dst, record)`: validates both endpoints are
    /// live vertices, writes the edge and its adjacency entries, then
    /// indexes any indexed property the record sets.
    pub fn add_edge(&mut self, class: &str, src: RecordId, dst: RecordId, record: &store::Record) -> Result<RecordId> {
        let class_id = self.overlay.view().class_by_name(class).ok_or_else(|| no_class(class))?.id;
        store::validate_class_kind(self.overlay.view(), class_id, ClassKind::Edge)?;
        let rel = RelationDbs::open(self.env)?;
        let rid = relation::add_edge(&mut self.kv, self.env, &rel, self.overlay.view(), class_id, src, dst, record)?;
        apply_index_inserts(self.overlay.view(), &mut self.kv, self.env, class_id, rid, record)?;
        Ok(rid)
    }

    /// `update(rid, record)`: merge `record`'s fields into the existing
    /// payload and re-apply the delta to every affected index
    /// (delete-then-insert for a value that changed).
    pub fn update(&mut self, rid: RecordId, record: &store::Record) -> Result<()> {
        let db = store::open_class_db(self.env, rid.class_id)?;
        let changed = store::update_record(&mut self.kv, db, self.overlay.view(), rid, record)?;
        for (prop_id, old, new) in changed {
            let ix = match self.overlay.view().index_of(rid.class_id, prop_id) {
                Some(ix) => *ix,
                None => continue,
            };
            let index_db = index::open_index_db(self.env, ix.id)?;
            if let Some(old_value) = old {
                index::index_delete(&mut self.kv, index_db, &ix, &old_value, rid)?;
            }
            index::index_insert(&mut self.kv, index_db, &ix, &new, rid)?;
        }
        Ok(())
    }

    /// `remove(rid)`: detach `rid` from every index over its class, then
    /// delete it — cascading to incident edges first if it is a vertex.
    pub fn remove(&mut self, rid: RecordId) -> Result<()> {
        let desc = self
            .overlay
            .view()
            .class(rid.class_id)
            .ok_or_else(|| Result::<()>::unwrap_err(err_at!(Usage(UsageError::NoExistClass), msg: "class id {} not found", rid.class_id.get())))?
            .clone();
        let db = store::open_class_db(self.env, rid.class_id)?;
        if let Some(record) = store::get_record_rw(&self.kv, db, self.overlay.view(), rid.position)? {
            apply_index_deletes(self.overlay.view(), &mut self.kv, self.env, rid.class_id, rid, &record)?;
        }
        match desc.kind {
            ClassKind::Vertex => {
                let rel = RelationDbs::open(self.env)?;
                relation::delete_vertex(&mut self.kv, self.env, &rel, self.overlay.view(), rid)
            }
            ClassKind::Edge => {
                let rel = RelationDbs::open(self.env)?;
                relation::delete_edge(&mut self.kv, self.env, &rel, rid.class_id, rid)
            }
        }
    }

    /// Commit order: (1) persist the catalog overlay, (2) persist id/txn
    /// counters (folded into the same step here since both live in the
    /// `counters` sub-database), (3) commit the KV transaction. Any
    /// failure in (1)/(2) aborts the KV transaction. On success the
    /// committed catalog pointer is swapped so later transactions observe
    /// the new view.
    pub fn commit(mut self) -> Result<()> {
        self.overlay.set_next_txn(self.next_txn_counter.load(Ordering::Relaxed));
        // `_writer` is not touched by any of this and so stays alive in
        // `self` until the function returns on every exit path, releasing
        // the writer slot only once the KV transaction is settled.
        let new_catalog = match self.overlay.persist(&mut self.kv, &self.schema_dbs) {
            Ok(cat) => cat,
            Err(err) => {
                warn!(target: "txn", "commit id={} failed persisting catalog: {}", self.id, err);
                self.kv.abort();
                return Err(err);
            }
        };
        self.kv.commit()?;
        *self.committed_pointer.write().expect("catalog lock poisoned") = Arc::new(new_catalog);
        debug!(target: "txn", "commit id={} ok", self.id);
        Ok(())
    }

    pub fn rollback(self) {
        self.overlay.rollback();
        self.kv.abort();
        debug!(target: "txn", "rollback id={}", self.id);
    }
}

/// Insert `rid` into every index covering a property `record` sets.
fn apply_index_inserts(
    cat: &Catalog,
    kv: &mut RwTxn,
    env: &Environment,
    class_id: ClassId,
    rid: RecordId,
    record: &store::Record,
) -> Result<()> {
    for ix in cat.indexes_of_class(class_id).copied().collect::<Vec<_>>() {
        let prop_name = match cat.property(ix.property_id) {
            Some(p) => &p.name,
            None => continue,
        };
        if let Some((_, value)) = record.iter().find(|(name, _)| name == prop_name) {
            let db = index::open_index_db(env, ix.id)?;
            index::index_insert(kv, db, &ix, value, rid)?;
        }
    }
    Ok(())
}

/// Remove `rid` from every index covering a property `record` carries.
fn apply_index_deletes(
    cat: &Catalog,
    kv: &mut RwTxn,
    env: &Environment,
    class_id: ClassId,
    rid: RecordId,
    record: &store::Record,
) -> Result<()> {
    for ix in cat.indexes_of_class(class_id).copied().collect::<Vec<_>>() {
        let prop_name = match cat.property(ix.property_id) {
            Some(p) => &p.name,
            None => continue,
        };
        if let Some((_, value)) = record.iter().find(|(name, _)| name == prop_name) {
            let db = index::open_index_db(env, ix.id)?;
            index::index_delete(kv, db, &ix, value, rid)?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod mod_test;
