// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use asset_ledger::application::{AssetLedgerService, ServiceConfig};
use asset_ledger::context::TransientMap;
use asset_ledger::storage::{LedgerTransaction, Repository};
use tempfile::TempDir;

/// Helper to create a repository over a temporary database
pub async fn test_repository() -> Result<(Repository, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let repo = Repository::init(&format!("sqlite:{}?mode=rwc", db_path.display())).await?;
    Ok((repo, temp_dir))
}

pub fn test_service() -> AssetLedgerService {
    AssetLedgerService::new(ServiceConfig::default())
}

/// Build a transient map from string pairs
pub fn transient(entries: &[(&str, &str)]) -> TransientMap {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.as_bytes().to_vec()))
        .collect()
}

/// Create a public asset in its own committed transaction
pub async fn create_committed(
    service: &AssetLedgerService,
    repo: &Repository,
    value: &str,
) -> Result<String> {
    let mut txn = LedgerTransaction::begin(repo, TransientMap::new());
    let id = service.create(&mut txn, value).await?;
    txn.commit().await?;
    Ok(id)
}

/// Create a private asset in its own committed transaction
pub async fn create_private_committed(
    service: &AssetLedgerService,
    repo: &Repository,
    value: &str,
) -> Result<String> {
    let mut txn = LedgerTransaction::begin(repo, transient(&[("asset", value)]));
    let id = service.create_private(&mut txn).await?;
    txn.commit().await?;
    Ok(id)
}
