use crate::context::TransactionContext;
use crate::domain::{Asset, AssetId, DEFAULT_PRIVATE_COLLECTION, Partition, derive_asset_id};

use super::{AppError, AssetStore, extract_transient};

/// Settings fixed for the lifetime of a service instance.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Private data collection backing the private partition
    pub private_collection: String,
    /// Transient entry holding the value for private mutations. When unset,
    /// callers must supply exactly one transient entry.
    pub transient_key: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            private_collection: DEFAULT_PRIVATE_COLLECTION.to_string(),
            transient_key: None,
        }
    }
}

/// Asset lifecycle operations, invoked once per transaction.
///
/// Holds no state between calls: every operation reads and writes only
/// through the context it is given.
#[derive(Debug, Clone)]
pub struct AssetLedgerService {
    public: Partition,
    private: Partition,
    transient_key: Option<String>,
}

impl AssetLedgerService {
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            public: Partition::Public,
            private: Partition::private(config.private_collection),
            transient_key: config.transient_key,
        }
    }

    pub fn private_partition(&self) -> &Partition {
        &self.private
    }

    /// Id an asset created in this transaction will receive.
    pub fn generate_id<C: TransactionContext>(&self, ctx: &C) -> AssetId {
        derive_asset_id(ctx.tx_id(), ctx.tx_timestamp())
    }

    // ========================
    // Public partition
    // ========================

    pub async fn exists<C: TransactionContext>(&self, ctx: &C, id: &str) -> Result<bool, AppError> {
        self.public_store().exists(ctx, id).await
    }

    /// Create an asset holding `value` and return its generated id.
    pub async fn create<C: TransactionContext>(
        &self,
        ctx: &mut C,
        value: impl Into<String>,
    ) -> Result<AssetId, AppError> {
        let id = self.generate_id(ctx);
        self.public_store()
            .insert(ctx, &id, &Asset::new(value))
            .await?;
        Ok(id)
    }

    pub async fn read<C: TransactionContext>(&self, ctx: &C, id: &str) -> Result<Asset, AppError> {
        self.public_store().read(ctx, id).await
    }

    pub async fn update<C: TransactionContext>(
        &self,
        ctx: &mut C,
        id: &str,
        value: impl Into<String>,
    ) -> Result<AssetId, AppError> {
        self.public_store()
            .replace(ctx, id, &Asset::new(value))
            .await?;
        Ok(id.to_string())
    }

    pub async fn delete<C: TransactionContext>(
        &self,
        ctx: &mut C,
        id: &str,
    ) -> Result<AssetId, AppError> {
        self.public_store().remove(ctx, id).await?;
        Ok(id.to_string())
    }

    // ========================
    // Private partition
    // ========================

    pub async fn exists_private<C: TransactionContext>(
        &self,
        ctx: &C,
        id: &str,
    ) -> Result<bool, AppError> {
        self.private_store().exists(ctx, id).await
    }

    /// Create a private asset whose value comes from the transient input.
    pub async fn create_private<C: TransactionContext>(
        &self,
        ctx: &mut C,
    ) -> Result<AssetId, AppError> {
        let id = self.generate_id(ctx);
        let value = self.transient_value(ctx)?;
        self.private_store()
            .insert(ctx, &id, &Asset::new(value))
            .await?;
        Ok(id)
    }

    pub async fn read_private<C: TransactionContext>(
        &self,
        ctx: &C,
        id: &str,
    ) -> Result<Asset, AppError> {
        self.private_store().read(ctx, id).await
    }

    pub async fn update_private<C: TransactionContext>(
        &self,
        ctx: &mut C,
        id: &str,
    ) -> Result<AssetId, AppError> {
        let value = self.transient_value(ctx)?;
        self.private_store()
            .replace(ctx, id, &Asset::new(value))
            .await?;
        Ok(id.to_string())
    }

    pub async fn delete_private<C: TransactionContext>(
        &self,
        ctx: &mut C,
        id: &str,
    ) -> Result<(), AppError> {
        self.private_store().remove(ctx, id).await
    }

    fn public_store(&self) -> AssetStore<'_> {
        AssetStore::new(&self.public)
    }

    fn private_store(&self) -> AssetStore<'_> {
        AssetStore::new(&self.private)
    }

    fn transient_value<C: TransactionContext>(&self, ctx: &C) -> Result<String, AppError> {
        extract_transient(ctx.transient(), self.transient_key.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};

    use super::*;
    use crate::context::MemoryContext;

    fn timestamp() -> DateTime<Utc> {
        Utc.timestamp_opt(1_600_000_000, 123_456_789).unwrap()
    }

    fn service() -> AssetLedgerService {
        AssetLedgerService::new(ServiceConfig::default())
    }

    /// Context with assets 1001 and 1002 in both partitions.
    fn seeded_context(service: &AssetLedgerService) -> MemoryContext {
        let private = service.private_partition().clone();
        MemoryContext::new("tx-1", timestamp())
            .with_state(Partition::Public, "1001", r#"{"value":"perf test 1001 value"}"#)
            .with_state(Partition::Public, "1002", r#"{"value":"perf test 1002 value"}"#)
            .with_state(private.clone(), "1001", r#"{"value":"private 1001 value"}"#)
            .with_state(private, "1002", r#"{"value":"private 1002 value"}"#)
    }

    #[test]
    fn test_generate_id_is_deterministic_per_transaction() {
        let service = service();
        let ctx = MemoryContext::new("tx-1", timestamp());
        let replay = MemoryContext::new("tx-1", timestamp());
        let other = MemoryContext::new("tx-2", timestamp());

        assert_eq!(service.generate_id(&ctx), service.generate_id(&replay));
        assert_ne!(service.generate_id(&ctx), service.generate_id(&other));
    }

    #[tokio::test]
    async fn test_exists() {
        let service = service();
        let ctx = seeded_context(&service);

        assert!(service.exists(&ctx, "1001").await.unwrap());
        assert!(!service.exists(&ctx, "1003").await.unwrap());
    }

    #[tokio::test]
    async fn test_create_writes_record_under_generated_id() {
        let service = service();
        let mut ctx = seeded_context(&service);

        let id = service.create(&mut ctx, "perf test 1003 value").await.unwrap();

        assert_eq!(id, service.generate_id(&ctx));
        assert_eq!(
            ctx.state(&Partition::Public, &id),
            Some(&br#"{"value":"perf test 1003 value"}"#[..])
        );
        assert!(ctx.state(service.private_partition(), &id).is_none());
    }

    #[tokio::test]
    async fn test_create_fails_when_generated_id_is_taken() {
        let service = service();
        let mut ctx = MemoryContext::new("tx-1", timestamp());
        let id = service.create(&mut ctx, "first").await.unwrap();

        // Replaying the same transaction regenerates the same id.
        let mut replay = ctx.next_transaction("tx-1", timestamp());
        let err = service.create(&mut replay, "second").await.unwrap_err();

        assert!(matches!(err, AppError::AssetAlreadyExists(ref taken) if *taken == id));
        assert_eq!(err.to_string(), format!("Asset already exists: {}", id));
        assert_eq!(service.read(&replay, &id).await.unwrap(), Asset::new("first"));
    }

    #[tokio::test]
    async fn test_read() {
        let service = service();
        let ctx = seeded_context(&service);

        let asset = service.read(&ctx, "1001").await.unwrap();
        assert_eq!(asset, Asset::new("perf test 1001 value"));

        let err = service.read(&ctx, "1003").await.unwrap_err();
        assert_eq!(err.to_string(), "Asset not found: 1003");
    }

    #[tokio::test]
    async fn test_update_replaces_value() {
        let service = service();
        let mut ctx = seeded_context(&service);

        let id = service.update(&mut ctx, "1001", "new value").await.unwrap();

        assert_eq!(id, "1001");
        assert_eq!(
            ctx.state(&Partition::Public, "1001"),
            Some(&br#"{"value":"new value"}"#[..])
        );
    }

    #[tokio::test]
    async fn test_update_missing_asset() {
        let service = service();
        let mut ctx = seeded_context(&service);

        let err = service.update(&mut ctx, "1003", "x").await.unwrap_err();
        assert!(matches!(err, AppError::AssetNotFound(id) if id == "1003"));
        assert!(ctx.state(&Partition::Public, "1003").is_none());
    }

    #[tokio::test]
    async fn test_delete() {
        let service = service();
        let mut ctx = seeded_context(&service);

        let id = service.delete(&mut ctx, "1001").await.unwrap();

        assert_eq!(id, "1001");
        assert!(!service.exists(&ctx, "1001").await.unwrap());
        assert!(matches!(
            service.read(&ctx, "1001").await,
            Err(AppError::AssetNotFound(_))
        ));
        // The private asset with the same id is untouched.
        assert!(service.exists_private(&ctx, "1001").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_missing_asset() {
        let service = service();
        let mut ctx = seeded_context(&service);

        let err = service.delete(&mut ctx, "1003").await.unwrap_err();
        assert!(matches!(err, AppError::AssetNotFound(id) if id == "1003"));
    }

    #[tokio::test]
    async fn test_exists_private() {
        let service = service();
        let ctx = seeded_context(&service);

        assert!(service.exists_private(&ctx, "1001").await.unwrap());
        assert!(!service.exists_private(&ctx, "1003").await.unwrap());
    }

    #[tokio::test]
    async fn test_create_private_uses_transient_value() {
        let service = service();
        let mut ctx = seeded_context(&service).with_transient("asset", "secret value");

        let id = service.create_private(&mut ctx).await.unwrap();

        assert_eq!(
            ctx.state(service.private_partition(), &id),
            Some(&br#"{"value":"secret value"}"#[..])
        );
        assert!(ctx.state(&Partition::Public, &id).is_none());
    }

    #[tokio::test]
    async fn test_create_private_without_transient_data() {
        let service = service();
        let mut ctx = seeded_context(&service);

        let err = service.create_private(&mut ctx).await.unwrap_err();
        assert!(matches!(err, AppError::NoTransientData));
    }

    #[tokio::test]
    async fn test_create_private_with_empty_transient_value() {
        let service = service();
        let mut ctx = seeded_context(&service).with_transient("asset", "");

        let err = service.create_private(&mut ctx).await.unwrap_err();
        assert!(matches!(err, AppError::EmptyTransientValue(_)));
        assert_eq!(ctx.keys(service.private_partition()), vec!["1001", "1002"]);
    }

    #[tokio::test]
    async fn test_create_private_fails_when_generated_id_is_taken() {
        let service = service();
        let mut ctx = MemoryContext::new("tx-1", timestamp()).with_transient("asset", "a");
        let id = service.create_private(&mut ctx).await.unwrap();

        let mut replay = ctx
            .next_transaction("tx-1", timestamp())
            .with_transient("asset", "b");
        let err = service.create_private(&mut replay).await.unwrap_err();

        assert!(matches!(err, AppError::AssetAlreadyExists(ref taken) if *taken == id));
    }

    #[tokio::test]
    async fn test_read_private() {
        let service = service();
        let ctx = seeded_context(&service);

        let asset = service.read_private(&ctx, "1002").await.unwrap();
        assert_eq!(asset, Asset::new("private 1002 value"));

        let err = service.read_private(&ctx, "1003").await.unwrap_err();
        assert!(matches!(err, AppError::AssetNotFound(id) if id == "1003"));
    }

    #[tokio::test]
    async fn test_update_private() {
        let service = service();
        let mut ctx = seeded_context(&service).with_transient("asset", "rotated");

        let id = service.update_private(&mut ctx, "1001").await.unwrap();

        assert_eq!(id, "1001");
        assert_eq!(
            service.read_private(&ctx, "1001").await.unwrap(),
            Asset::new("rotated")
        );
        assert_eq!(
            service.read(&ctx, "1001").await.unwrap(),
            Asset::new("perf test 1001 value")
        );
    }

    #[tokio::test]
    async fn test_update_private_checks_transient_before_existence() {
        let service = service();
        let mut ctx = seeded_context(&service);

        let err = service.update_private(&mut ctx, "1003").await.unwrap_err();
        assert!(matches!(err, AppError::NoTransientData));

        let mut ctx = ctx.with_transient("asset", "v");
        let err = service.update_private(&mut ctx, "1003").await.unwrap_err();
        assert!(matches!(err, AppError::AssetNotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_private() {
        let service = service();
        let mut ctx = seeded_context(&service);

        service.delete_private(&mut ctx, "1001").await.unwrap();

        assert!(!service.exists_private(&ctx, "1001").await.unwrap());
        assert!(service.exists(&ctx, "1001").await.unwrap());

        let err = service.delete_private(&mut ctx, "1001").await.unwrap_err();
        assert!(matches!(err, AppError::AssetNotFound(_)));
    }

    #[tokio::test]
    async fn test_configured_transient_key_selects_entry() {
        let service = AssetLedgerService::new(ServiceConfig {
            private_collection: "Audit".to_string(),
            transient_key: Some("asset".to_string()),
        });
        let mut ctx = MemoryContext::new("tx-1", timestamp())
            .with_transient("asset", "chosen")
            .with_transient("extra", "ignored");

        let id = service.create_private(&mut ctx).await.unwrap();

        assert_eq!(service.private_partition(), &Partition::private("Audit"));
        assert_eq!(
            service.read_private(&ctx, &id).await.unwrap(),
            Asset::new("chosen")
        );
    }

    #[tokio::test]
    async fn test_seeded_lifecycle() {
        let service = service();
        let mut ctx = seeded_context(&service);

        assert!(service.exists(&ctx, "1001").await.unwrap());
        assert_eq!(
            service.read(&ctx, "1001").await.unwrap(),
            Asset::new("perf test 1001 value")
        );

        service.update(&mut ctx, "1001", "new value").await.unwrap();
        assert_eq!(
            service.read(&ctx, "1001").await.unwrap(),
            Asset::new("new value")
        );

        service.delete(&mut ctx, "1001").await.unwrap();
        assert!(!service.exists(&ctx, "1001").await.unwrap());
        assert!(matches!(
            service.read(&ctx, "1001").await,
            Err(AppError::AssetNotFound(_))
        ));
    }
}
