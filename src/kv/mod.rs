//! A thin layer over an ordered, transactional, memory-mapped B+-tree
//! store (LMDB via the `lmdb` crate).
//!
//! Everything above this module (codec, catalog, record store, relation
//! index, secondary index) talks to the KV store exclusively through
//! [`Environment`], [`RoTxn`]/[`RwTxn`] and [`Cursor`]; none of it
//! depends on `lmdb` types directly.

mod cursor;
mod env;
mod txn;

pub use cursor::{Cursor, WriteCursor};
pub use env::{DbHandle, Environment};
pub use txn::{RoTxn, RwTxn};
