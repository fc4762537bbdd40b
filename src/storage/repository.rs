use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqliteConnection, SqlitePool};

use super::MIGRATION_001_INITIAL;

/// A value as currently committed, with the version it was written at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedValue {
    pub value: Vec<u8>,
    pub version: i64,
}

/// Version of a key observed during execution. `None` means the key was absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadEntry {
    pub namespace: String,
    pub key: String,
    pub version: Option<i64>,
}

/// A pending mutation. `value: None` deletes the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteEntry {
    pub namespace: String,
    pub key: String,
    pub value: Option<Vec<u8>>,
}

/// Everything a transaction produced, submitted for validation and commit.
#[derive(Debug, Clone)]
pub struct ReadWriteSet {
    pub tx_id: String,
    pub tx_timestamp: DateTime<Utc>,
    pub reads: Vec<ReadEntry>,
    pub writes: Vec<WriteEntry>,
}

/// Outcome of validating a read/write set against committed state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationCode {
    /// Applied; every written key now carries `sequence` as its version
    Valid { sequence: i64 },
    /// A key read during execution has changed since
    MvccReadConflict { namespace: String, key: String },
    /// The transaction id was already committed
    DuplicateTxId,
}

/// Summary of a committed transaction.
#[derive(Debug, Clone)]
pub struct CommittedTransaction {
    pub tx_id: String,
    pub sequence: i64,
    pub tx_timestamp: DateTime<Utc>,
    pub committed_at: DateTime<Utc>,
    pub write_count: i64,
}

/// Repository over the SQLite-backed world state.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// Get the committed value of a key.
    pub async fn get(&self, namespace: &str, key: &str) -> Result<Option<VersionedValue>> {
        let row = sqlx::query("SELECT value, version FROM world_state WHERE namespace = ? AND key = ?")
            .bind(namespace)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch state")?;

        Ok(row.map(|row| VersionedValue {
            value: row.get("value"),
            version: row.get("version"),
        }))
    }

    /// List committed keys of a namespace in key order.
    pub async fn list_keys(&self, namespace: &str) -> Result<Vec<String>> {
        let keys = sqlx::query_scalar("SELECT key FROM world_state WHERE namespace = ? ORDER BY key")
            .bind(namespace)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list keys")?;
        Ok(keys)
    }

    /// Validate a read/write set and, if valid, apply it atomically.
    ///
    /// Validation and application run in one `BEGIN IMMEDIATE` transaction;
    /// the write lock is held before any read version is checked. On any
    /// non-valid outcome nothing is written.
    pub async fn commit(&self, rw_set: &ReadWriteSet) -> Result<ValidationCode> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .context("Failed to acquire connection")?;

        sqlx::query("BEGIN IMMEDIATE")
            .execute(&mut *conn)
            .await
            .context("Failed to begin commit")?;

        let outcome = Self::validate_and_apply(&mut *conn, rw_set).await;
        let finish = match outcome {
            Ok(ValidationCode::Valid { .. }) => "COMMIT",
            _ => "ROLLBACK",
        };
        sqlx::query(finish)
            .execute(&mut *conn)
            .await
            .with_context(|| format!("Failed to {} transaction", finish.to_lowercase()))?;

        outcome
    }

    async fn validate_and_apply(
        conn: &mut SqliteConnection,
        rw_set: &ReadWriteSet,
    ) -> Result<ValidationCode> {
        let seen: Option<i64> = sqlx::query_scalar("SELECT sequence FROM transactions WHERE tx_id = ?")
            .bind(&rw_set.tx_id)
            .fetch_optional(&mut *conn)
            .await
            .context("Failed to check transaction id")?;
        if seen.is_some() {
            return Ok(ValidationCode::DuplicateTxId);
        }

        for read in &rw_set.reads {
            let current: Option<i64> =
                sqlx::query_scalar("SELECT version FROM world_state WHERE namespace = ? AND key = ?")
                    .bind(&read.namespace)
                    .bind(&read.key)
                    .fetch_optional(&mut *conn)
                    .await
                    .context("Failed to validate read set")?;

            if current != read.version {
                return Ok(ValidationCode::MvccReadConflict {
                    namespace: read.namespace.clone(),
                    key: read.key.clone(),
                });
            }
        }

        let sequence: i64 = sqlx::query_scalar(
            r#"
            UPDATE sequence_counter
            SET value = value + 1
            WHERE name = 'commit_sequence'
            RETURNING value
            "#,
        )
        .fetch_one(&mut *conn)
        .await
        .context("Failed to get next commit sequence")?;

        for write in &rw_set.writes {
            match &write.value {
                Some(value) => {
                    sqlx::query(
                        r#"
                        INSERT INTO world_state (namespace, key, value, version)
                        VALUES (?, ?, ?, ?)
                        ON CONFLICT (namespace, key)
                        DO UPDATE SET value = excluded.value, version = excluded.version
                        "#,
                    )
                    .bind(&write.namespace)
                    .bind(&write.key)
                    .bind(value.as_slice())
                    .bind(sequence)
                    .execute(&mut *conn)
                    .await
                    .context("Failed to write state")?;
                }
                None => {
                    sqlx::query("DELETE FROM world_state WHERE namespace = ? AND key = ?")
                        .bind(&write.namespace)
                        .bind(&write.key)
                        .execute(&mut *conn)
                        .await
                        .context("Failed to delete state")?;
                }
            }
        }

        sqlx::query(
            r#"
            INSERT INTO transactions (tx_id, sequence, tx_timestamp, committed_at, write_count)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&rw_set.tx_id)
        .bind(sequence)
        .bind(rw_set.tx_timestamp.to_rfc3339())
        .bind(Utc::now().to_rfc3339())
        .bind(rw_set.writes.len() as i64)
        .execute(&mut *conn)
        .await
        .context("Failed to record transaction")?;

        Ok(ValidationCode::Valid { sequence })
    }

    /// Get a committed transaction by id.
    pub async fn get_transaction(&self, tx_id: &str) -> Result<Option<CommittedTransaction>> {
        let row = sqlx::query(
            r#"
            SELECT tx_id, sequence, tx_timestamp, committed_at, write_count
            FROM transactions
            WHERE tx_id = ?
            "#,
        )
        .bind(tx_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch transaction")?;

        row.as_ref().map(Self::row_to_transaction).transpose()
    }

    fn row_to_transaction(row: &sqlx::sqlite::SqliteRow) -> Result<CommittedTransaction> {
        let tx_timestamp_str: String = row.get("tx_timestamp");
        let committed_at_str: String = row.get("committed_at");

        Ok(CommittedTransaction {
            tx_id: row.get("tx_id"),
            sequence: row.get("sequence"),
            tx_timestamp: DateTime::parse_from_rfc3339(&tx_timestamp_str)
                .context("Invalid tx_timestamp")?
                .with_timezone(&Utc),
            committed_at: DateTime::parse_from_rfc3339(&committed_at_str)
                .context("Invalid committed_at timestamp")?
                .with_timezone(&Utc),
            write_count: row.get("write_count"),
        })
    }
}
