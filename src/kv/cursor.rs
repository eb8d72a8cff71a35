use lmdb::Cursor as LmdbCursorTrait;
use lmdb_sys::{
    MDB_FIRST, MDB_GET_CURRENT, MDB_LAST, MDB_NEXT, MDB_NEXT_DUP, MDB_PREV, MDB_SET_KEY,
    MDB_SET_RANGE,
};

use crate::error::Result;

/// A positioned, read-only cursor over one sub-database: first, last,
/// next, prev, next-duplicate, seek-exact, seek-range. Borrowed from its
/// owning transaction; cannot outlive it.
pub struct Cursor<'txn> {
    inner: lmdb::RoCursor<'txn>,
}

impl<'txn> Cursor<'txn> {
    pub(crate) fn new(inner: lmdb::RoCursor<'txn>) -> Cursor<'txn> {
        Cursor { inner }
    }

    pub fn first(&mut self) -> Result<Option<(&'txn [u8], &'txn [u8])>> {
        self.position(None, None, MDB_FIRST)
    }

    pub fn last(&mut self) -> Result<Option<(&'txn [u8], &'txn [u8])>> {
        self.position(None, None, MDB_LAST)
    }

    pub fn next(&mut self) -> Result<Option<(&'txn [u8], &'txn [u8])>> {
        self.position(None, None, MDB_NEXT)
    }

    pub fn prev(&mut self) -> Result<Option<(&'txn [u8], &'txn [u8])>> {
        self.position(None, None, MDB_PREV)
    }

    pub fn next_dup(&mut self) -> Result<Option<(&'txn [u8], &'txn [u8])>> {
        self.position(None, None, MDB_NEXT_DUP)
    }

    /// Position exactly on `key`; `None` if absent.
    pub fn seek_exact(&mut self, key: &[u8]) -> Result<Option<(&'txn [u8], &'txn [u8])>> {
        self.position(Some(key), None, MDB_SET_KEY)
    }

    /// Position on the first key `>= key`; `None` if every key is smaller.
    pub fn seek_range(&mut self, key: &[u8]) -> Result<Option<(&'txn [u8], &'txn [u8])>> {
        self.position(Some(key), None, MDB_SET_RANGE)
    }

    fn position(
        &mut self,
        key: Option<&[u8]>,
        data: Option<&[u8]>,
        op: u32,
    ) -> Result<Option<(&'txn [u8], &'txn [u8])>> {
        match self.inner.get(key, data, op) {
            Ok((Some(k), v)) => Ok(Some((k, v))),
            // MDB_SET_KEY positions on an unchanged key the caller already
            // supplied; LMDB does not echo it back in that case. Re-fetch
            // the current key so the returned slice is tied to `'txn`
            // rather than to the caller's (possibly shorter-lived) buffer.
            Ok((None, v)) => match self.inner.get(None, None, MDB_GET_CURRENT) {
                Ok((Some(k), _)) => Ok(Some((k, v))),
                Ok((None, _)) => Ok(Some((&[], v))),
                Err(err) => Err(err.into()),
            },
            Err(lmdb::Error::NotFound) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

/// A cursor opened within a read-write transaction, able to insert and
/// delete at its current position (used by index reconstruction on
/// `createIndex`).
pub struct WriteCursor<'txn> {
    inner: lmdb::RwCursor<'txn>,
}

impl<'txn> WriteCursor<'txn> {
    pub(crate) fn new(inner: lmdb::RwCursor<'txn>) -> WriteCursor<'txn> {
        WriteCursor { inner }
    }

    /// Append-only put, used when populating a secondary index in sorted
    /// key order for B+-tree append efficiency.
    pub fn append(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.inner.put(&key, &value, lmdb::WriteFlags::APPEND)?;
        Ok(())
    }

    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.inner.put(&key, &value, lmdb::WriteFlags::empty())?;
        Ok(())
    }
}
