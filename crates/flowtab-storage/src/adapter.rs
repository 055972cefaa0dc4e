// SPDX-FileCopyrightText: 2026 Flowtab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the MarketplaceStore trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use flowtab_config::model::StorageConfig;
use flowtab_core::{
    AccountConnection, BillingMonth, ConnectionStatus, CreatorPayout, FlowCopyEvent,
    FlowtabError, HealthStatus, MarketplaceStore, PayoutStatus, PluginAdapter, Provider,
    RecordedCopy, VaultItem,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed marketplace store.
///
/// Wraps a [`Database`] handle and delegates to the typed query modules.
/// The database is opened on the first call to
/// [`MarketplaceStore::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// The database connection is not opened until `initialize` is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Wrap an already opened database, e.g. an in-memory one in tests.
    pub fn with_database(config: StorageConfig, db: Database) -> Self {
        Self {
            config,
            db: OnceCell::new_with(Some(db)),
        }
    }

    fn db(&self) -> Result<&Database, FlowtabError> {
        self.db.get().ok_or_else(|| FlowtabError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    async fn checkpoint(db: &Database) -> Result<(), FlowtabError> {
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    async fn health_check(&self) -> Result<HealthStatus, FlowtabError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), FlowtabError> {
        if let Some(db) = self.db.get() {
            Self::checkpoint(db).await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl MarketplaceStore for SqliteStorage {
    async fn initialize(&self) -> Result<(), FlowtabError> {
        let path = self.config.database_path.clone();
        let db = Database::open_with(&path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| FlowtabError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), FlowtabError> {
        Self::checkpoint(self.db()?).await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    // --- Copy events ---

    async fn copy_exists(
        &self,
        user_id: &str,
        flow_id: &str,
        month: BillingMonth,
    ) -> Result<bool, FlowtabError> {
        queries::copies::copy_exists(self.db()?, user_id, flow_id, month).await
    }

    async fn count_counted_copies(
        &self,
        user_id: &str,
        month: BillingMonth,
    ) -> Result<u32, FlowtabError> {
        queries::copies::count_counted_copies(self.db()?, user_id, month).await
    }

    async fn insert_copy(&self, event: &FlowCopyEvent) -> Result<(), FlowtabError> {
        queries::copies::insert_copy(self.db()?, event).await
    }

    async fn insert_copy_within_cap(
        &self,
        event: &FlowCopyEvent,
        cap: u32,
        reject_over_cap: bool,
    ) -> Result<RecordedCopy, FlowtabError> {
        queries::copies::insert_copy_within_cap(self.db()?, event, cap, reject_over_cap).await
    }

    async fn list_copies(
        &self,
        user_id: &str,
        month: BillingMonth,
    ) -> Result<Vec<FlowCopyEvent>, FlowtabError> {
        queries::copies::list_copies(self.db()?, user_id, month).await
    }

    async fn get_copy(&self, id: &str) -> Result<Option<FlowCopyEvent>, FlowtabError> {
        queries::copies::get_copy(self.db()?, id).await
    }

    async fn count_creator_copies(
        &self,
        creator_id: &str,
        month: BillingMonth,
    ) -> Result<u32, FlowtabError> {
        queries::copies::count_creator_copies(self.db()?, creator_id, month).await
    }

    async fn creators_with_copies(&self, month: BillingMonth) -> Result<Vec<String>, FlowtabError> {
        queries::copies::creators_with_copies(self.db()?, month).await
    }

    // --- Payouts ---

    async fn get_or_create_payout(
        &self,
        creator_id: &str,
        month: BillingMonth,
        now: DateTime<Utc>,
    ) -> Result<CreatorPayout, FlowtabError> {
        queries::payouts::get_or_create_payout(self.db()?, creator_id, month, now).await
    }

    async fn set_payout_totals(
        &self,
        payout_id: &str,
        copy_count: u32,
        amount_cents: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, FlowtabError> {
        queries::payouts::set_payout_totals(self.db()?, payout_id, copy_count, amount_cents, now)
            .await
    }

    async fn get_payout(&self, payout_id: &str) -> Result<Option<CreatorPayout>, FlowtabError> {
        queries::payouts::get_payout(self.db()?, payout_id).await
    }

    async fn set_payout_status(
        &self,
        payout_id: &str,
        status: PayoutStatus,
        transfer_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), FlowtabError> {
        queries::payouts::set_payout_status(self.db()?, payout_id, status, transfer_id, now).await
    }

    async fn list_payouts(
        &self,
        creator_id: &str,
        limit: u32,
    ) -> Result<Vec<CreatorPayout>, FlowtabError> {
        queries::payouts::list_payouts(self.db()?, creator_id, limit).await
    }

    async fn sum_payouts(
        &self,
        creator_id: &str,
        statuses: &[PayoutStatus],
    ) -> Result<i64, FlowtabError> {
        queries::payouts::sum_payouts(self.db()?, creator_id, statuses).await
    }

    // --- Providers and connections ---

    async fn upsert_provider(&self, provider: &Provider) -> Result<(), FlowtabError> {
        queries::connections::upsert_provider(self.db()?, provider).await
    }

    async fn get_provider(&self, id: &str) -> Result<Option<Provider>, FlowtabError> {
        queries::connections::get_provider(self.db()?, id).await
    }

    async fn list_providers(&self, active_only: bool) -> Result<Vec<Provider>, FlowtabError> {
        queries::connections::list_providers(self.db()?, active_only).await
    }

    async fn create_connection(
        &self,
        connection: &AccountConnection,
        items: &[VaultItem],
        manual_config: Option<&str>,
    ) -> Result<(), FlowtabError> {
        queries::connections::create_connection(self.db()?, connection, items, manual_config).await
    }

    async fn get_connection(&self, id: &str) -> Result<Option<AccountConnection>, FlowtabError> {
        queries::connections::get_connection(self.db()?, id).await
    }

    async fn list_connections(&self, user_id: &str) -> Result<Vec<AccountConnection>, FlowtabError> {
        queries::connections::list_connections(self.db()?, user_id).await
    }

    async fn vault_items(&self, connection_id: &str) -> Result<Vec<VaultItem>, FlowtabError> {
        queries::connections::vault_items(self.db()?, connection_id).await
    }

    async fn manual_config(&self, connection_id: &str) -> Result<Option<String>, FlowtabError> {
        queries::connections::manual_config(self.db()?, connection_id).await
    }

    async fn delete_connection(&self, id: &str) -> Result<bool, FlowtabError> {
        queries::connections::delete_connection(self.db()?, id).await
    }

    async fn update_connection_status(
        &self,
        id: &str,
        status: ConnectionStatus,
        last_error: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), FlowtabError> {
        queries::connections::update_connection_status(self.db()?, id, status, last_error, now)
            .await
    }

    async fn touch_connection(&self, id: &str, now: DateTime<Utc>) -> Result<(), FlowtabError> {
        queries::connections::touch_connection(self.db()?, id, now).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn sqlite_storage_implements_plugin_adapter() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        assert_eq!(storage.name(), "sqlite");
        assert_eq!(storage.version(), semver::Version::new(0, 1, 0));
    }

    #[tokio::test]
    async fn initialize_opens_database_at_configured_path() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("init_test.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        storage.initialize().await.unwrap();
        assert!(db_path.exists(), "database file should be created");
    }

    #[tokio::test]
    async fn initialize_twice_returns_error() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("double_init.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        storage.initialize().await.unwrap();
        assert!(storage.initialize().await.is_err());
    }

    #[tokio::test]
    async fn health_check_tracks_initialization() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("health.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        assert!(storage.health_check().await.is_err());
        storage.initialize().await.unwrap();
        assert_eq!(storage.health_check().await.unwrap(), HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn copy_and_payout_flow_through_adapter() {
        let storage = SqliteStorage::with_database(
            StorageConfig::default(),
            Database::open_in_memory().await.unwrap(),
        );
        let now = Utc.with_ymd_and_hms(2026, 1, 10, 9, 0, 0).unwrap();
        let month = BillingMonth::containing(now);

        storage
            .insert_copy(&FlowCopyEvent::new("alice", "F1", "bob", true, now))
            .await
            .unwrap();
        assert!(storage.copy_exists("alice", "F1", month).await.unwrap());
        assert_eq!(storage.count_creator_copies("bob", month).await.unwrap(), 1);

        let payout = storage.get_or_create_payout("bob", month, now).await.unwrap();
        assert!(storage.set_payout_totals(&payout.id, 1, 7, now).await.unwrap());
        let stored = storage.get_payout(&payout.id).await.unwrap().unwrap();
        assert_eq!(stored.amount_cents, 7);
        assert_eq!(
            storage
                .sum_payouts("bob", &[PayoutStatus::Pending])
                .await
                .unwrap(),
            7
        );
    }

    #[tokio::test]
    async fn shutdown_runs_checkpoint() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("shutdown.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));
        storage.initialize().await.unwrap();
        storage.shutdown().await.unwrap();
        storage.close().await.unwrap();
    }
}
