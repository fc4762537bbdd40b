use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{DateTime, Utc};

use super::{TransactionContext, TransientMap};
use crate::domain::Partition;

/// In-process transaction context. Writes are applied immediately; there is
/// no commit step and no conflict detection.
#[derive(Debug, Clone)]
pub struct MemoryContext {
    tx_id: String,
    timestamp: DateTime<Utc>,
    transient: TransientMap,
    state: BTreeMap<Partition, BTreeMap<String, Vec<u8>>>,
}

impl MemoryContext {
    pub fn new(tx_id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            tx_id: tx_id.into(),
            timestamp,
            transient: TransientMap::new(),
            state: BTreeMap::new(),
        }
    }

    /// Seed a key with raw bytes.
    pub fn with_state(
        mut self,
        partition: Partition,
        key: impl Into<String>,
        value: impl Into<Vec<u8>>,
    ) -> Self {
        self.state
            .entry(partition)
            .or_default()
            .insert(key.into(), value.into());
        self
    }

    pub fn with_transient(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.transient.insert(key.into(), value.into());
        self
    }

    /// Start a new transaction that sees the state left by this one.
    /// Transient input is not carried over.
    pub fn next_transaction(&self, tx_id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            tx_id: tx_id.into(),
            timestamp,
            transient: TransientMap::new(),
            state: self.state.clone(),
        }
    }

    /// Raw bytes currently stored under `key`.
    pub fn state(&self, partition: &Partition, key: &str) -> Option<&[u8]> {
        self.state
            .get(partition)
            .and_then(|entries| entries.get(key))
            .map(Vec::as_slice)
    }

    /// Keys currently present in a partition, in order.
    pub fn keys(&self, partition: &Partition) -> Vec<String> {
        self.state
            .get(partition)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl TransactionContext for MemoryContext {
    fn tx_id(&self) -> &str {
        &self.tx_id
    }

    fn tx_timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn transient(&self) -> &TransientMap {
        &self.transient
    }

    async fn get_state(&self, partition: &Partition, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.state(partition, key).map(<[u8]>::to_vec))
    }

    async fn put_state(&mut self, partition: &Partition, key: &str, value: Vec<u8>) -> Result<()> {
        self.state
            .entry(partition.clone())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn delete_state(&mut self, partition: &Partition, key: &str) -> Result<()> {
        if let Some(entries) = self.state.get_mut(partition) {
            entries.remove(key);
        }
        Ok(())
    }
}
