//! Per-transaction catalog view: the committed catalog plus the pending
//! mutations of one write transaction. Reads resolve against the working
//! copy so that read-after-write sees pending changes; on commit only the
//! touched rows are persisted, on rollback the overlay is simply dropped.

use std::{collections::HashSet, sync::Arc};

use crate::{
    err_at,
    error::{Result, UsageError},
    ids::{ClassId, IndexId, PropertyId},
    kv::RwTxn,
    schema::{
        descriptor, validate_class_name, validate_property_name, Catalog, ClassDescriptor,
        ClassKind, IndexDescriptor, PropertyDescriptor, SchemaDbs,
    },
};

fn no_class(name: &str) -> crate::error::Error {
    Result::<()>::unwrap_err(err_at!(Usage(UsageError::NoExistClass), msg: "class {:?} not found", name))
}

fn no_property(class: &str, name: &str) -> crate::error::Error {
    Result::<()>::unwrap_err(err_at!(Usage(UsageError::NoExistProperty), msg: "property {:?} not found on class {:?}", name, class))
}

pub struct CatalogOverlay {
    base: Arc<Catalog>,
    working: Catalog,
    touched_classes: HashSet<ClassId>,
    deleted_classes: HashSet<ClassId>,
    touched_properties: HashSet<PropertyId>,
    deleted_properties: HashSet<PropertyId>,
    touched_indexes: HashSet<IndexId>,
    deleted_indexes: HashSet<IndexId>,
}

impl CatalogOverlay {
    pub(crate) fn new(base: Arc<Catalog>) -> CatalogOverlay {
        let working = (*base).clone();
        CatalogOverlay {
            base,
            working,
            touched_classes: HashSet::new(),
            deleted_classes: HashSet::new(),
            touched_properties: HashSet::new(),
            deleted_properties: HashSet::new(),
            touched_indexes: HashSet::new(),
            deleted_indexes: HashSet::new(),
        }
    }

    pub fn view(&self) -> &Catalog {
        &self.working
    }

    pub fn add_class(
        &mut self,
        name: &str,
        kind: ClassKind,
        base: Option<&str>,
    ) -> Result<ClassDescriptor> {
        validate_class_name(name)?;
        if self.working.class_by_name(name).is_some() {
            return err_at!(Usage(UsageError::DuplicateClass), msg: "class {:?} already exists", name);
        }
        let base_id = match base {
            Some(bn) => Some(self.working.class_by_name(bn).ok_or_else(|| no_class(bn))?.id),
            None => None,
        };
        let id = ClassId(self.working.next_class as u16);
        self.working.next_class += 1;
        let desc = ClassDescriptor { id, name: name.to_string(), kind, base: base_id };
        self.working.class_names.insert(name.to_string(), id);
        self.working.classes.insert(id, desc.clone());
        self.touched_classes.insert(id);
        Ok(desc)
    }

    /// Drop a class and everything it owns. Does not cascade to
    /// subclasses: their `base` is rewritten to the dropped class's base.
    pub fn drop_class(&mut self, name: &str) -> Result<()> {
        let id = self.working.class_by_name(name).ok_or_else(|| no_class(name))?.id;

        let orphan_base = self.working.classes.get(&id).and_then(|c| c.base);
        let children: Vec<ClassId> = self
            .working
            .classes
            .values()
            .filter(|c| c.base == Some(id))
            .map(|c| c.id)
            .collect();
        for child in children {
            if let Some(c) = self.working.classes.get_mut(&child) {
                c.base = orphan_base;
            }
            self.touched_classes.insert(child);
        }

        let owned_props: Vec<PropertyId> = self
            .working
            .properties
            .values()
            .filter(|p| p.owning_class == id)
            .map(|p| p.id)
            .collect();
        for pid in owned_props {
            self.working.properties.remove(&pid);
            self.touched_properties.remove(&pid);
            self.deleted_properties.insert(pid);
        }

        let owned_idx: Vec<IndexId> = self
            .working
            .indexes
            .values()
            .filter(|ix| ix.class_id == id)
            .map(|ix| ix.id)
            .collect();
        for ixid in owned_idx {
            self.working.indexes.remove(&ixid);
            self.touched_indexes.remove(&ixid);
            self.deleted_indexes.insert(ixid);
        }

        if let Some(c) = self.working.classes.remove(&id) {
            self.working.class_names.remove(&c.name);
        }
        self.touched_classes.remove(&id);
        self.deleted_classes.insert(id);
        Ok(())
    }

    /// Re-base an existing class onto another existing class, after
    /// creation. Rejects turning a class into its own ancestor.
    pub fn add_subclass_of(&mut self, class: &str, base: &str) -> Result<()> {
        let class_id = self.working.class_by_name(class).ok_or_else(|| no_class(class))?.id;
        let base_id = self.working.class_by_name(base).ok_or_else(|| no_class(base))?.id;
        if class_id == base_id {
            return err_at!(
                Usage(UsageError::CyclicInheritance),
                msg: "class {:?} cannot be its own base",
                class
            );
        }
        if self.working.subclasses_of(class_id).contains(&base_id) {
            return err_at!(
                Usage(UsageError::CyclicInheritance),
                msg: "{:?} is already a descendant of {:?}; cannot make it a base",
                base, class
            );
        }
        self.working.classes.get_mut(&class_id).unwrap().base = Some(base_id);
        self.touched_classes.insert(class_id);
        Ok(())
    }

    pub fn rename_class(&mut self, from: &str, to: &str) -> Result<()> {
        validate_class_name(to)?;
        if self.working.class_by_name(to).is_some() {
            return err_at!(Usage(UsageError::DuplicateClass), msg: "class {:?} already exists", to);
        }
        let id = self.working.class_by_name(from).ok_or_else(|| no_class(from))?.id;
        self.working.class_names.remove(from);
        self.working.class_names.insert(to.to_string(), id);
        self.working.classes.get_mut(&id).unwrap().name = to.to_string();
        self.touched_classes.insert(id);
        Ok(())
    }

    pub fn add_property(
        &mut self,
        class: &str,
        name: &str,
        prop_type: crate::codec::PropertyType,
    ) -> Result<PropertyDescriptor> {
        validate_property_name(name)?;
        let class_id = self.working.class_by_name(class).ok_or_else(|| no_class(class))?.id;
        if self.working.property_by_name(class_id, name).is_some() {
            return err_at!(
                Usage(UsageError::DuplicateProperty),
                msg: "property {:?} already exists on class {:?} or an ancestor",
                name, class
            );
        }
        let id = PropertyId(self.working.next_property as u16);
        self.working.next_property += 1;
        let desc = PropertyDescriptor { id, owning_class: class_id, name: name.to_string(), prop_type };
        self.working.properties.insert(id, desc.clone());
        self.touched_properties.insert(id);
        Ok(desc)
    }

    pub fn drop_property(&mut self, class: &str, name: &str) -> Result<()> {
        let class_id = self.working.class_by_name(class).ok_or_else(|| no_class(class))?.id;
        let id = self
            .working
            .properties
            .values()
            .find(|p| p.owning_class == class_id && p.name == name)
            .ok_or_else(|| no_property(class, name))?
            .id;
        if let Some(ix) = self.working.index_of(class_id, id) {
            let ixid = ix.id;
            self.working.indexes.remove(&ixid);
            self.touched_indexes.remove(&ixid);
            self.deleted_indexes.insert(ixid);
        }
        self.working.properties.remove(&id);
        self.touched_properties.remove(&id);
        self.deleted_properties.insert(id);
        Ok(())
    }

    pub fn rename_property(&mut self, class: &str, from: &str, to: &str) -> Result<()> {
        validate_property_name(to)?;
        let class_id = self.working.class_by_name(class).ok_or_else(|| no_class(class))?.id;
        if self.working.property_by_name(class_id, to).is_some() {
            return err_at!(
                Usage(UsageError::DuplicateProperty),
                msg: "property {:?} already exists on class {:?} or an ancestor",
                to, class
            );
        }
        let id = self
            .working
            .properties
            .values()
            .find(|p| p.owning_class == class_id && p.name == from)
            .ok_or_else(|| no_property(class, from))?
            .id;
        self.working.properties.get_mut(&id).unwrap().name = to.to_string();
        self.touched_properties.insert(id);
        Ok(())
    }

    pub fn create_index(
        &mut self,
        class: &str,
        property: &str,
        unique: bool,
    ) -> Result<IndexDescriptor> {
        let class_id = self.working.class_by_name(class).ok_or_else(|| no_class(class))?.id;
        let prop = self
            .working
            .property_by_name(class_id, property)
            .ok_or_else(|| no_property(class, property))?
            .clone();
        if !prop.prop_type.is_indexable() {
            return err_at!(
                Usage(UsageError::InvalidPropType),
                msg: "property {:?} of type {} is not indexable",
                property, prop.prop_type
            );
        }
        if self.working.index_of(class_id, prop.id).is_some() {
            return err_at!(
                Usage(UsageError::DuplicateIndex),
                msg: "index on {:?}.{:?} already exists",
                class, property
            );
        }
        let id = IndexId(self.working.next_index as u16);
        self.working.next_index += 1;
        let desc = IndexDescriptor { id, class_id, property_id: prop.id, unique };
        self.working.indexes.insert(id, desc);
        self.touched_indexes.insert(id);
        Ok(desc)
    }

    pub fn drop_index(&mut self, class: &str, property: &str) -> Result<IndexDescriptor> {
        let class_id = self.working.class_by_name(class).ok_or_else(|| no_class(class))?.id;
        let prop = self
            .working
            .property_by_name(class_id, property)
            .ok_or_else(|| no_property(class, property))?
            .id;
        let ix = *self.working.index_of(class_id, prop).ok_or_else(|| {
            Result::<()>::unwrap_err(err_at!(Usage(UsageError::NoExistIndex), msg: "no index on {:?}.{:?}", class, property))
        })?;
        self.working.indexes.remove(&ix.id);
        self.touched_indexes.remove(&ix.id);
        self.deleted_indexes.insert(ix.id);
        Ok(ix)
    }

    /// Discard this overlay; the base catalog is left untouched.
    pub fn rollback(self) {}

    pub(crate) fn set_next_txn(&mut self, value: u64) {
        self.working.next_txn = value;
    }

    /// Write touched/deleted rows to the catalog sub-databases and return
    /// the new committed catalog to publish. The caller still owns
    /// committing the surrounding KV transaction.
    pub(crate) fn persist(self, txn: &mut RwTxn, dbs: &SchemaDbs) -> Result<Catalog> {
        for id in &self.touched_classes {
            let c = &self.working.classes[id];
            txn.put(dbs.classes, &id.get().to_be_bytes(), &descriptor::encode_class(c))?;
        }
        for id in &self.deleted_classes {
            txn.del(dbs.classes, &id.get().to_be_bytes(), None)?;
        }
        for id in &self.touched_properties {
            let p = &self.working.properties[id];
            txn.put(dbs.properties, &id.get().to_be_bytes(), &descriptor::encode_property(p))?;
        }
        for id in &self.deleted_properties {
            txn.del(dbs.properties, &id.get().to_be_bytes(), None)?;
        }
        for id in &self.touched_indexes {
            let ix = &self.working.indexes[id];
            txn.put(dbs.indexes, &id.get().to_be_bytes(), &descriptor::encode_index(ix))?;
        }
        for id in &self.deleted_indexes {
            txn.del(dbs.indexes, &id.get().to_be_bytes(), None)?;
        }

        crate::schema::write_counter(txn, dbs.counters, crate::schema::COUNTER_KEYS.0, self.working.next_class as u64)?;
        crate::schema::write_counter(txn, dbs.counters, crate::schema::COUNTER_KEYS.1, self.working.next_property as u64)?;
        crate::schema::write_counter(txn, dbs.counters, crate::schema::COUNTER_KEYS.2, self.working.next_index as u64)?;
        crate::schema::write_counter(txn, dbs.counters, crate::schema::COUNTER_KEYS.3, self.working.next_txn)?;

        let _ = &self.base;
        Ok(self.working)
    }
}

#[cfg(test)]
#[path = "overlay_test.rs"]
mod overlay_test;
