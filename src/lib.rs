//! Pooled KV - A key-value server with a read cache and a pooled durable store
//!
//! Reads are served from a fixed-capacity LRU cache and loaded through from
//! the durable store on a miss; writes go through the cache to the store
//! over a bounded pool of connections.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod pool;
pub mod service;
pub mod storage;

pub use api::{create_router, AppState};
pub use config::Config;
pub use error::{KvError, PoolError, StorageError};
pub use service::KvService;
