// Transaction context - the per-invocation handle the execution engine
// hands to the service. Implemented by `MemoryContext` for tests and by
// `storage::LedgerTransaction` for the SQLite-backed ledger.

mod memory;

pub use memory::*;

use std::collections::BTreeMap;
use std::future::Future;

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::domain::Partition;

/// Out-of-band input supplied alongside a transaction. Never written to the
/// ledger record. Ordered so iteration never depends on hashing.
pub type TransientMap = BTreeMap<String, Vec<u8>>;

/// Everything an operation may touch while executing one transaction.
pub trait TransactionContext: Send + Sync {
    /// Identifier assigned by the engine, unique across the ledger.
    fn tx_id(&self) -> &str;

    /// Timestamp assigned by the client when the transaction was proposed.
    fn tx_timestamp(&self) -> DateTime<Utc>;

    fn transient(&self) -> &TransientMap;

    /// Fetch the bytes stored under `key`, or `None` if the key was never
    /// written or has been deleted.
    fn get_state(
        &self,
        partition: &Partition,
        key: &str,
    ) -> impl Future<Output = Result<Option<Vec<u8>>>> + Send;

    fn put_state(
        &mut self,
        partition: &Partition,
        key: &str,
        value: Vec<u8>,
    ) -> impl Future<Output = Result<()>> + Send;

    fn delete_state(
        &mut self,
        partition: &Partition,
        key: &str,
    ) -> impl Future<Output = Result<()>> + Send;
}
