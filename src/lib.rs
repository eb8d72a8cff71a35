//! Embedded, single-process transactional graph storage core: an LMDB
//! key-value engine underneath a versioned schema catalog, per-class
//! record storage, vertex/edge adjacency, secondary indexes, and an
//! MVCC transaction manager tying them together.
//!
//! Readers run against a fixed snapshot of both the data files and the
//! schema; exactly one write transaction may be in flight at a time,
//! enforced by an advisory in-process slot plus an inter-process file
//! lock for the data directory itself.

pub mod codec;
pub mod config;
pub mod error;
pub mod ids;
pub mod index;
pub mod kv;
pub mod lock;
pub mod query;
pub mod relation;
pub mod schema;
mod support;
pub mod store;
pub mod txn;

pub use codec::{PropertyType, Value};
pub use config::EnvConfig;
pub use error::{Error, ErrorKind, Result, StorageError, UsageError};
pub use ids::{ClassId, IndexId, PositionId, PropertyId, RecordId, TxnId};
pub use kv::Environment;
pub use lock::LockFile;
pub use query::{Direction, RecordPredicate};
pub use relation::{ClassFilter, RelationDbs};
pub use schema::{Catalog, ClassDescriptor, ClassKind, IndexDescriptor, PropertyDescriptor};
pub use store::Record;
pub use txn::{ReadTxn, TransactionManager, WriteTxn};
