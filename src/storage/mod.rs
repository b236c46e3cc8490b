//! Storage Module
//!
//! The durable-store collaborator behind the cache. A [`Connector`] opens
//! [`Connection`]s; each connection exposes the four table operations the
//! service needs.
//!
//! Operations take typed keys and values. Implementations talking to a
//! query-language backend must bind them as parameters and never splice
//! them into query text.

mod memory;

use serde::{Deserialize, Serialize};

use crate::error::StorageResult;

pub use memory::{MemoryConnection, MemoryTable};

/// One row of the durable table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub key: i64,
    pub value: String,
}

impl Record {
    pub fn new(key: i64, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

/// A single session with the durable store.
///
/// Every operation may fail independently of whether the key exists.
pub trait Connection: Send {
    /// Returns at most `limit` records.
    fn scan(&mut self, limit: usize) -> StorageResult<Vec<Record>>;

    /// Point lookup by key.
    fn lookup(&mut self, key: i64) -> StorageResult<Option<String>>;

    /// Inserts the record or replaces the value of an existing one.
    fn upsert(&mut self, key: i64, value: &str) -> StorageResult<()>;

    /// Deletes by key. Returns whether a record matched.
    fn delete(&mut self, key: i64) -> StorageResult<bool>;

    /// Ends the session. Called exactly once per connection by the pool.
    fn close(&mut self);
}

/// Opens connections to a durable store.
pub trait Connector: Send + Sync {
    type Connection: Connection;

    fn connect(&self) -> StorageResult<Self::Connection>;
}
