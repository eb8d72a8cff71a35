use std::{collections::HashMap, path::Path, sync::Mutex};

use crate::{
    config::EnvConfig,
    err_at,
    error::Result,
    kv::txn::{RoTxn, RwTxn},
    lock::LockFile,
};

/// Opaque handle to a named sub-database, cheap to copy. Used for the
/// reserved catalog sub-databases plus one `data/<classId>` per class
/// and `idx/<indexId>` per index.
pub type DbHandle = lmdb::Database;

/// One memory-mapped file plus its sibling advisory lock file.
/// Acquisition is exclusive per directory — the first opener holds
/// `LockFile` until it drops.
pub struct Environment {
    inner: lmdb::Environment,
    // Held for its Drop impl; never read again after construction.
    #[allow(dead_code)]
    lock: LockFile,
    dbs: Mutex<HashMap<String, lmdb::Database>>,
}

impl Environment {
    /// Open (creating if necessary) the environment rooted at `dir`.
    pub fn open(dir: &Path, config: &EnvConfig) -> Result<Environment> {
        err_at!(IoError, std::fs::create_dir_all(dir))?;
        let lock = LockFile::acquire(dir, &config.lock_file_name)?;

        let mut flags = lmdb::EnvironmentFlags::empty();
        flags.insert(lmdb::EnvironmentFlags::NO_TLS);

        let inner = lmdb::Environment::new()
            .set_flags(flags)
            .set_map_size(config.map_size)
            .set_max_readers(config.max_readers)
            .set_max_dbs(config.max_dbs)
            .open(dir)?;

        Ok(Environment {
            inner,
            lock,
            dbs: Mutex::new(HashMap::new()),
        })
    }

    /// Begin a read-only transaction: an MVCC snapshot as of now. Never
    /// blocks, never fails except on exhaustion of the reader slot table.
    pub fn begin_ro(&self) -> Result<RoTxn<'_>> {
        let txn = self.inner.begin_ro_txn()?;
        Ok(RoTxn::new(txn))
    }

    /// Begin a read-write transaction. Callers above this layer (the
    /// transaction manager) are responsible for enforcing single-writer
    /// discipline at the application level; this call itself will block
    /// if LMDB's own writer mutex is already held.
    pub fn begin_rw(&self) -> Result<RwTxn<'_>> {
        let txn = self.inner.begin_rw_txn()?;
        Ok(RwTxn::new(txn))
    }

    /// Resolve (creating lazily if absent) the named sub-database handle.
    /// `dup_sort` allows duplicate values per key, used by the relation
    /// index's incidence sub-databases.
    pub fn db(&self, name: &str, dup_sort: bool) -> Result<DbHandle> {
        let mut dbs = self.dbs.lock().expect("db cache lock poisoned");
        if let Some(db) = dbs.get(name) {
            return Ok(*db);
        }
        let mut flags = lmdb::DatabaseFlags::empty();
        if dup_sort {
            flags.insert(lmdb::DatabaseFlags::DUP_SORT);
        }
        let db = self.inner.create_db(Some(name), flags)?;
        dbs.insert(name.to_string(), db);
        Ok(db)
    }
}

#[cfg(test)]
#[path = "env_test.rs"]
mod env_test;
