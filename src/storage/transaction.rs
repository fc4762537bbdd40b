use std::collections::BTreeMap;
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use super::{ReadEntry, ReadWriteSet, Repository, ValidationCode, WriteEntry};
use crate::context::{TransactionContext, TransientMap};
use crate::domain::Partition;

type StateKey = (String, String);

#[derive(Error, Debug)]
pub enum CommitError {
    #[error("Transaction {tx_id} read {namespace}/{key}, which changed before commit")]
    ReadConflict {
        tx_id: String,
        namespace: String,
        key: String,
    },

    #[error("Transaction already committed: {0}")]
    DuplicateTxId(String),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

/// Result of a successful commit.
#[derive(Debug, Clone)]
pub struct CommitReceipt {
    pub tx_id: String,
    pub sequence: i64,
    pub write_count: usize,
}

/// A transaction executing against the SQLite ledger.
///
/// Reads see committed state only and record the version they observed.
/// Writes and deletes are buffered and reach the store in one piece on
/// [`commit`](Self::commit). Dropping the transaction discards them.
pub struct LedgerTransaction<'r> {
    repo: &'r Repository,
    tx_id: String,
    timestamp: DateTime<Utc>,
    transient: TransientMap,
    reads: Mutex<BTreeMap<StateKey, Option<i64>>>,
    writes: BTreeMap<StateKey, Option<Vec<u8>>>,
}

impl<'r> LedgerTransaction<'r> {
    /// Start a transaction with a fresh id and the current time.
    pub fn begin(repo: &'r Repository, transient: TransientMap) -> Self {
        Self::with_id(repo, Uuid::new_v4().to_string(), Utc::now(), transient)
    }

    /// Start a transaction with an id and timestamp chosen by the caller,
    /// e.g. to re-execute a proposal.
    pub fn with_id(
        repo: &'r Repository,
        tx_id: impl Into<String>,
        timestamp: DateTime<Utc>,
        transient: TransientMap,
    ) -> Self {
        Self {
            repo,
            tx_id: tx_id.into(),
            timestamp,
            transient,
            reads: Mutex::new(BTreeMap::new()),
            writes: BTreeMap::new(),
        }
    }

    /// Number of buffered writes and deletes.
    pub fn pending_writes(&self) -> usize {
        self.writes.len()
    }

    /// Build the read/write set this transaction would submit.
    pub fn read_write_set(&self) -> Result<ReadWriteSet> {
        let reads = self
            .reads
            .lock()
            .map_err(|_| anyhow!("read set lock poisoned"))?
            .iter()
            .map(|((namespace, key), version)| ReadEntry {
                namespace: namespace.clone(),
                key: key.clone(),
                version: *version,
            })
            .collect();

        let writes = self
            .writes
            .iter()
            .map(|((namespace, key), value)| WriteEntry {
                namespace: namespace.clone(),
                key: key.clone(),
                value: value.clone(),
            })
            .collect();

        Ok(ReadWriteSet {
            tx_id: self.tx_id.clone(),
            tx_timestamp: self.timestamp,
            reads,
            writes,
        })
    }

    /// Validate and apply the buffered writes.
    pub async fn commit(self) -> Result<CommitReceipt, CommitError> {
        let rw_set = self.read_write_set()?;

        match self.repo.commit(&rw_set).await? {
            ValidationCode::Valid { sequence } => {
                tracing::info!(
                    tx_id = %self.tx_id,
                    sequence,
                    writes = rw_set.writes.len(),
                    "transaction committed"
                );
                Ok(CommitReceipt {
                    tx_id: self.tx_id,
                    sequence,
                    write_count: rw_set.writes.len(),
                })
            }
            ValidationCode::MvccReadConflict { namespace, key } => {
                tracing::warn!(tx_id = %self.tx_id, %namespace, %key, "read conflict, transaction rejected");
                Err(CommitError::ReadConflict {
                    tx_id: self.tx_id,
                    namespace,
                    key,
                })
            }
            ValidationCode::DuplicateTxId => {
                tracing::warn!(tx_id = %self.tx_id, "duplicate transaction id, transaction rejected");
                Err(CommitError::DuplicateTxId(self.tx_id))
            }
        }
    }

    fn state_key(partition: &Partition, key: &str) -> StateKey {
        (partition.namespace(), key.to_string())
    }
}

impl TransactionContext for LedgerTransaction<'_> {
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
        let state_key = Self::state_key(partition, key);
        let committed = self.repo.get(&state_key.0, &state_key.1).await?;

        self.reads
            .lock()
            .map_err(|_| anyhow!("read set lock poisoned"))?
            .entry(state_key)
            .or_insert(committed.as_ref().map(|v| v.version));

        Ok(committed.map(|v| v.value))
    }

    async fn put_state(&mut self, partition: &Partition, key: &str, value: Vec<u8>) -> Result<()> {
        self.writes
            .insert(Self::state_key(partition, key), Some(value));
        Ok(())
    }

    async fn delete_state(&mut self, partition: &Partition, key: &str) -> Result<()> {
        self.writes.insert(Self::state_key(partition, key), None);
        Ok(())
    }
}
