//! Versioned schema registry: classes, properties, index descriptors,
//! name-to-id maps, and the id/txn counters. Kept in process memory as an
//! immutable value shared by readers and mutated by a writer only through
//! a copy-on-write overlay (see [`Catalog::begin_overlay`]).

mod descriptor;
mod overlay;

pub use descriptor::{ClassDescriptor, ClassKind, IndexDescriptor, PropertyDescriptor};
pub use overlay::CatalogOverlay;

use std::{collections::HashMap, sync::Arc};

use log::debug;

use crate::{
    err_at,
    error::{Result, UsageError},
    ids::{ClassId, IndexId, PropertyId},
    kv::{DbHandle, Environment, RoTxn, RwTxn},
};

const DB_CLASSES: &str = "classes";
const DB_PROPERTIES: &str = "properties";
const DB_INDEXES: &str = "indexes";
const DB_COUNTERS: &str = "counters";

const COUNTER_CLASS: &[u8] = b"class";
const COUNTER_PROPERTY: &[u8] = b"property";
const COUNTER_INDEX: &[u8] = b"index";
const COUNTER_TXN: &[u8] = b"txn";

/// The committed schema as of some point in time: a plain value, cheap to
/// clone by reference ([`Arc`]) and share across concurrently running
/// readers.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    classes: HashMap<ClassId, ClassDescriptor>,
    class_names: HashMap<String, ClassId>,
    properties: HashMap<PropertyId, PropertyDescriptor>,
    indexes: HashMap<IndexId, IndexDescriptor>,
    next_class: u32,
    next_property: u32,
    next_index: u32,
    next_txn: u64,
}

impl Catalog {
    pub fn class_by_name(&self, name: &str) -> Option<&ClassDescriptor> {
        self.class_names.get(name).and_then(|id| self.classes.get(id))
    }

    pub fn class(&self, id: ClassId) -> Option<&ClassDescriptor> {
        self.classes.get(&id)
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassDescriptor> {
        self.classes.values()
    }

    pub fn property_by_name(&self, class: ClassId, name: &str) -> Option<&PropertyDescriptor> {
        self.effective_properties(class)
            .into_iter()
            .find(|p| p.name == name)
    }

    pub fn property(&self, id: PropertyId) -> Option<&PropertyDescriptor> {
        self.properties.get(&id)
    }

    pub fn index_of(&self, class: ClassId, property: PropertyId) -> Option<&IndexDescriptor> {
        self.indexes
            .values()
            .find(|ix| ix.class_id == class && ix.property_id == property)
    }

    pub fn index(&self, id: IndexId) -> Option<&IndexDescriptor> {
        self.indexes.get(&id)
    }

    pub fn indexes_of_class(&self, class: ClassId) -> impl Iterator<Item = &IndexDescriptor> {
        self.indexes.values().filter(move |ix| ix.class_id == class)
    }

    /// Own properties plus those of every ancestor, walking the base
    /// chain. Recomputed on every call; no flattened cache outlives a
    /// transaction.
    pub fn effective_properties(&self, class: ClassId) -> Vec<&PropertyDescriptor> {
        let mut out = Vec::new();
        let mut cur = Some(class);
        while let Some(id) = cur {
            for p in self.properties.values().filter(|p| p.owning_class == id) {
                out.push(p);
            }
            cur = self.classes.get(&id).and_then(|c| c.base);
        }
        out
    }

    /// Subclasses (direct and transitive) of `class`, including `class`
    /// itself.
    pub fn subclasses_of(&self, class: ClassId) -> Vec<ClassId> {
        let mut out = vec![class];
        let mut frontier = vec![class];
        while let Some(cur) = frontier.pop() {
            for c in self.classes.values().filter(|c| c.base == Some(cur)) {
                out.push(c.id);
                frontier.push(c.id);
            }
        }
        out
    }

    pub fn next_txn_id(&mut self) -> u64 {
        let id = self.next_txn;
        self.next_txn += 1;
        id
    }

    pub fn next_txn_counter(&self) -> u64 {
        self.next_txn
    }

    pub fn begin_overlay(self: &Arc<Catalog>) -> CatalogOverlay {
        CatalogOverlay::new(Arc::clone(self))
    }

    /// Load the committed catalog from its reserved sub-databases.
    pub fn load(env: &Environment, txn: &RoTxn) -> Result<Catalog> {
        let classes_db = env.db(DB_CLASSES, false)?;
        let properties_db = env.db(DB_PROPERTIES, false)?;
        let indexes_db = env.db(DB_INDEXES, false)?;
        let counters_db = env.db(DB_COUNTERS, false)?;

        let mut cat = Catalog::default();

        scan_all(txn, classes_db, |_, v| {
            let c: ClassDescriptor = descriptor::decode_class(v)?;
            cat.class_names.insert(c.name.clone(), c.id);
            cat.classes.insert(c.id, c);
            Ok(())
        })?;
        scan_all(txn, properties_db, |_, v| {
            let p: PropertyDescriptor = descriptor::decode_property(v)?;
            cat.properties.insert(p.id, p);
            Ok(())
        })?;
        scan_all(txn, indexes_db, |_, v| {
            let ix: IndexDescriptor = descriptor::decode_index(v)?;
            cat.indexes.insert(ix.id, ix);
            Ok(())
        })?;

        cat.next_class = read_counter(txn, counters_db, COUNTER_CLASS)? as u32;
        cat.next_property = read_counter(txn, counters_db, COUNTER_PROPERTY)? as u32;
        cat.next_index = read_counter(txn, counters_db, COUNTER_INDEX)? as u32;
        cat.next_txn = read_counter(txn, counters_db, COUNTER_TXN)?;

        debug!(target: "schema", "loaded catalog: {} classes, {} properties, {} indexes",
            cat.classes.len(), cat.properties.len(), cat.indexes.len());
        Ok(cat)
    }

    pub(crate) fn db_handles(env: &Environment) -> Result<SchemaDbs> {
        Ok(SchemaDbs {
            classes: env.db(DB_CLASSES, false)?,
            properties: env.db(DB_PROPERTIES, false)?,
            indexes: env.db(DB_INDEXES, false)?,
            counters: env.db(DB_COUNTERS, false)?,
        })
    }
}

pub(crate) struct SchemaDbs {
    pub classes: DbHandle,
    pub properties: DbHandle,
    pub indexes: DbHandle,
    pub counters: DbHandle,
}

fn scan_all<F>(txn: &RoTxn, db: DbHandle, mut f: F) -> Result<()>
where
    F: FnMut(&[u8], &[u8]) -> Result<()>,
{
    let mut cur = txn.cursor(db)?;
    let mut entry = cur.first()?;
    while let Some((k, v)) = entry {
        f(k, v)?;
        entry = cur.next()?;
    }
    Ok(())
}

fn read_counter(txn: &RoTxn, db: DbHandle, key: &[u8]) -> Result<u64> {
    match txn.get(db, key)? {
        Some(bytes) => {
            let mut b = [0u8; 8];
            b.copy_from_slice(&bytes[..8]);
            Ok(u64::from_be_bytes(b))
        }
        None => Ok(0),
    }
}

pub(crate) fn write_counter(txn: &mut RwTxn, db: DbHandle, key: &[u8], value: u64) -> Result<()> {
    txn.put(db, key, &value.to_be_bytes())
}

pub(crate) fn validate_class_name(name: &str) -> Result<()> {
    if name.is_empty() || !name.chars().next().unwrap().is_alphabetic() {
        return err_at!(
            Usage(UsageError::InvalidClassName),
            msg: "class name {:?} must be non-empty and start with a letter",
            name
        );
    }
    if !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return err_at!(
            Usage(UsageError::InvalidClassName),
            msg: "class name {:?} may only contain alphanumerics and underscore",
            name
        );
    }
    Ok(())
}

pub(crate) fn validate_property_name(name: &str) -> Result<()> {
    if name.is_empty() || !name.chars().next().unwrap().is_alphabetic() {
        return err_at!(
            Usage(UsageError::InvalidPropertyName),
            msg: "property name {:?} must be non-empty and start with a letter",
            name
        );
    }
    if !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return err_at!(
            Usage(UsageError::InvalidPropertyName),
            msg: "property name {:?} may only contain alphanumerics and underscore",
            name
        );
    }
    Ok(())
}

pub(crate) const COUNTER_KEYS: (&[u8], &[u8], &[u8], &[u8]) =
    (COUNTER_CLASS, COUNTER_PROPERTY, COUNTER_INDEX, COUNTER_TXN);
