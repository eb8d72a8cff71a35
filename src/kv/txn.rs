use lmdb::Transaction as _;

use crate::{
    error::Result,
    kv::{cursor::{Cursor, WriteCursor}, env::DbHandle},
};

/// Read-only KV transaction: an MVCC snapshot fixed at `begin_ro`.
/// `get` returns `Ok(None)` on a missing key — key-not-found is a value,
/// not an error.
pub struct RoTxn<'env> {
    inner: lmdb::RoTransaction<'env>,
}

impl<'env> RoTxn<'env> {
    pub(crate) fn new(inner: lmdb::RoTransaction<'env>) -> RoTxn<'env> {
        RoTxn { inner }
    }

    pub fn get(&self, db: DbHandle, key: &[u8]) -> Result<Option<&[u8]>> {
        match self.inner.get(db, &key) {
            Ok(v) => Ok(Some(v)),
            Err(lmdb::Error::NotFound) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    pub fn cursor(&self, db: DbHandle) -> Result<Cursor<'_>> {
        let cur = self.inner.open_ro_cursor(db)?;
        Ok(Cursor::new(cur))
    }
}

/// Read-write KV transaction. Either commits atomically or aborts with
/// no visible effect.
pub struct RwTxn<'env> {
    inner: Option<lmdb::RwTransaction<'env>>,
}

impl<'env> RwTxn<'env> {
    pub(crate) fn new(inner: lmdb::RwTransaction<'env>) -> RwTxn<'env> {
        RwTxn { inner: Some(inner) }
    }

    fn inner(&self) -> &lmdb::RwTransaction<'env> {
        self.inner.as_ref().expect("txn used after commit/abort")
    }

    fn inner_mut(&mut self) -> &mut lmdb::RwTransaction<'env> {
        self.inner.as_mut().expect("txn used after commit/abort")
    }

    pub fn get(&self, db: DbHandle, key: &[u8]) -> Result<Option<&[u8]>> {
        match self.inner().get(db, &key) {
            Ok(v) => Ok(Some(v)),
            Err(lmdb::Error::NotFound) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    pub fn put(&mut self, db: DbHandle, key: &[u8], value: &[u8]) -> Result<()> {
        self.put_flags(db, key, value, lmdb::WriteFlags::empty())
    }

    pub fn put_flags(
        &mut self,
        db: DbHandle,
        key: &[u8],
        value: &[u8],
        flags: lmdb::WriteFlags,
    ) -> Result<()> {
        self.inner_mut().put(db, &key, &value, flags)?;
        Ok(())
    }

    /// Delete `key`. If `value` is given, only the matching duplicate is
    /// removed (for duplicate-sort sub-databases).
    pub fn del(&mut self, db: DbHandle, key: &[u8], value: Option<&[u8]>) -> Result<()> {
        match self.inner_mut().del(db, &key, value) {
            Ok(()) => Ok(()),
            Err(lmdb::Error::NotFound) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    pub fn cursor(&self, db: DbHandle) -> Result<Cursor<'_>> {
        let cur = self.inner().open_ro_cursor(db)?;
        Ok(Cursor::new(cur))
    }

    pub fn write_cursor(&mut self, db: DbHandle) -> Result<WriteCursor<'_>> {
        let cur = self.inner_mut().open_rw_cursor(db)?;
        Ok(WriteCursor::new(cur))
    }

    pub fn commit(mut self) -> Result<()> {
        self.inner.take().expect("txn used after commit/abort").commit()?;
        Ok(())
    }

    pub fn abort(mut self) {
        if let Some(inner) = self.inner.take() {
            inner.abort();
        }
    }
}
