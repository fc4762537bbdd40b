use crate::context::TransactionContext;
use crate::domain::{Asset, Partition};

use super::AppError;

/// Asset CRUD against a single partition. The public and private paths of
/// the service share this one implementation and differ only in the
/// partition they pass in.
#[derive(Debug, Clone, Copy)]
pub struct AssetStore<'p> {
    partition: &'p Partition,
}

impl<'p> AssetStore<'p> {
    pub fn new(partition: &'p Partition) -> Self {
        Self { partition }
    }

    /// True iff the partition holds a non-empty record under `id`.
    pub async fn exists<C: TransactionContext>(&self, ctx: &C, id: &str) -> Result<bool, AppError> {
        Ok(self.fetch(ctx, id).await?.is_some())
    }

    /// Write a new record. Fails if `id` is already taken.
    pub async fn insert<C: TransactionContext>(
        &self,
        ctx: &mut C,
        id: &str,
        asset: &Asset,
    ) -> Result<(), AppError> {
        if self.exists(ctx, id).await? {
            return Err(AppError::AssetAlreadyExists(id.to_string()));
        }

        ctx.put_state(self.partition, id, asset.to_bytes()?).await?;
        tracing::debug!(partition = %self.partition, id, "asset created");
        Ok(())
    }

    pub async fn read<C: TransactionContext>(&self, ctx: &C, id: &str) -> Result<Asset, AppError> {
        let bytes = self
            .fetch(ctx, id)
            .await?
            .ok_or_else(|| AppError::AssetNotFound(id.to_string()))?;

        Asset::from_bytes(&bytes).map_err(|source| AppError::MalformedRecord {
            id: id.to_string(),
            source,
        })
    }

    /// Overwrite an existing record. The previous value is discarded, not merged.
    pub async fn replace<C: TransactionContext>(
        &self,
        ctx: &mut C,
        id: &str,
        asset: &Asset,
    ) -> Result<(), AppError> {
        self.require(ctx, id).await?;

        ctx.put_state(self.partition, id, asset.to_bytes()?).await?;
        tracing::debug!(partition = %self.partition, id, "asset updated");
        Ok(())
    }

    pub async fn remove<C: TransactionContext>(&self, ctx: &mut C, id: &str) -> Result<(), AppError> {
        self.require(ctx, id).await?;

        ctx.delete_state(self.partition, id).await?;
        tracing::debug!(partition = %self.partition, id, "asset deleted");
        Ok(())
    }

    async fn require<C: TransactionContext>(&self, ctx: &C, id: &str) -> Result<(), AppError> {
        if !self.exists(ctx, id).await? {
            return Err(AppError::AssetNotFound(id.to_string()));
        }
        Ok(())
    }

    // An empty payload counts as absent.
    async fn fetch<C: TransactionContext>(
        &self,
        ctx: &C,
        id: &str,
    ) -> Result<Option<Vec<u8>>, AppError> {
        let bytes = ctx.get_state(self.partition, id).await?;
        Ok(bytes.filter(|b| !b.is_empty()))
    }
}
