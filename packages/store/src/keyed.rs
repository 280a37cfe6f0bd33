//! # KeyedStore — abstract network-backed key/record storage
//!
//! This module defines the storage seam the auth core is written against.
//! [`KeyedStore`] models the portal's backing database: a flat JSON tree
//! addressed by `/`-separated string keys (e.g. `otp_verification/a@b_com`,
//! `games/<id>`). All reads and writes in the core go through this trait, so
//! the same logic works against an in-memory store ([`crate::MemoryStore`],
//! used in tests and local development) or a real network backend.
//!
//! ## Operations
//!
//! | Method | Description |
//! |--------|-------------|
//! | [`read`](KeyedStore::read) | Fetch the record at a key, `None` if absent. |
//! | [`write`](KeyedStore::write) | Create or overwrite the record at a key. |
//! | [`delete`](KeyedStore::delete) | Remove the record at a key; a no-op if absent. |
//! | [`list`](KeyedStore::list) | Snapshot of every `(key, record)` under a prefix. |
//! | [`watch`](KeyedStore::watch) | Live subscription to a prefix: the receiver yields the full child list on every mutation. Dropping the receiver unsubscribes. |
//!
//! Records are [`serde_json::Value`]s on the wire; callers serialize their own
//! typed shapes through serde.

use serde_json::Value;
use tokio::sync::watch;

/// Errors from the keyed store backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A record could not be encoded or decoded.
    #[error("record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Async interface to a key/record store.
pub trait KeyedStore {
    /// Read the record at `key`.
    fn read(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Option<Value>, StoreError>>;

    /// Write (create or overwrite) the record at `key`.
    fn write(
        &self,
        key: &str,
        value: Value,
    ) -> impl std::future::Future<Output = Result<(), StoreError>>;

    /// Delete the record at `key`. Deleting an absent key is not an error.
    fn delete(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<(), StoreError>>;

    /// List all `(key, record)` pairs whose key starts with `prefix`.
    fn list(
        &self,
        prefix: &str,
    ) -> impl std::future::Future<Output = Result<Vec<(String, Value)>, StoreError>>;

    /// Subscribe to the children of `prefix`. The receiver holds the current
    /// child list and is updated after every write or delete under the prefix.
    fn watch(&self, prefix: &str) -> watch::Receiver<Vec<(String, Value)>>;
}
