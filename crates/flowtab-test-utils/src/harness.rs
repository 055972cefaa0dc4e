// SPDX-FileCopyrightText: 2026 Flowtab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the complete marketplace stack on a temp SQLite
//! database with a [`FixedClock`], so month boundaries can be crossed by
//! moving the clock instead of waiting.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use flowtab_config::model::{
    FlowtabConfig, MonetizationConfig, OverQuotaPolicy, StorageConfig, VaultConfig,
};
use flowtab_core::{Clock, FixedClock, FlowtabError, MarketplaceStore, Provider};
use flowtab_payouts::{CopyService, EarningsService, PayoutEngine};
use flowtab_storage::SqliteStorage;
use flowtab_vault::{CredentialVault, EncryptionService, generate_key_hex};

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    start: DateTime<Utc>,
    monetization: MonetizationConfig,
    encryption_key: Option<String>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            start: Utc
                .with_ymd_and_hms(2026, 1, 15, 12, 0, 0)
                .single()
                .unwrap_or_else(Utc::now),
            monetization: MonetizationConfig::default(),
            encryption_key: None,
        }
    }

    /// Start the clock at `moment` instead of mid-January 2026.
    pub fn starting_at(mut self, moment: DateTime<Utc>) -> Self {
        self.start = moment;
        self
    }

    /// Set the monthly copy cap.
    pub fn with_copy_cap(mut self, cap: u32) -> Self {
        self.monetization.monthly_copy_cap = cap;
        self
    }

    /// Set the per-copy payout rate in cents.
    pub fn with_rate_cents(mut self, rate: i64) -> Self {
        self.monetization.payout_rate_cents = rate;
        self
    }

    /// Set what happens to copies past the cap.
    pub fn with_over_quota(mut self, policy: OverQuotaPolicy) -> Self {
        self.monetization.over_quota = policy;
        self
    }

    /// Use a fixed hex encryption key instead of a random one.
    pub fn with_encryption_key(mut self, key_hex: impl Into<String>) -> Self {
        self.encryption_key = Some(key_hex.into());
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, FlowtabError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| FlowtabError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");

        let storage_config = StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        };
        let storage = SqliteStorage::new(storage_config.clone());
        storage.initialize().await?;
        let store: Arc<dyn MarketplaceStore> = Arc::new(storage);

        let clock = Arc::new(FixedClock::new(self.start));

        let key_hex = match self.encryption_key {
            Some(key) => key,
            None => generate_key_hex()?,
        };
        let encryption = Arc::new(EncryptionService::from_hex(&key_hex)?);

        let vault = CredentialVault::new(store.clone(), encryption.clone(), clock.clone());
        let copies = CopyService::from_config(store.clone(), clock.clone(), &self.monetization);
        let engine = Arc::new(PayoutEngine::new(
            store.clone(),
            clock.clone(),
            self.monetization.payout_rate_cents,
        ));
        let earnings =
            EarningsService::new(engine.clone(), self.monetization.payout_history_limit);

        let config = FlowtabConfig {
            storage: storage_config,
            vault: VaultConfig {
                encryption_key: Some(key_hex),
            },
            monetization: self.monetization,
            ..FlowtabConfig::default()
        };

        Ok(TestHarness {
            store,
            clock,
            encryption,
            vault,
            copies,
            engine,
            earnings,
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete marketplace stack over temp storage.
pub struct TestHarness {
    /// SQLite store (temp DB, cleaned up on drop).
    pub store: Arc<dyn MarketplaceStore>,
    /// Settable clock shared by every service.
    pub clock: Arc<FixedClock>,
    pub encryption: Arc<EncryptionService>,
    pub vault: CredentialVault,
    pub copies: CopyService,
    pub engine: Arc<PayoutEngine>,
    pub earnings: EarningsService,
    /// Effective configuration, including the generated key.
    pub config: FlowtabConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Register an active provider accepting every connection type.
    pub async fn seed_provider(&self, slug: &str) -> Result<Provider, FlowtabError> {
        let provider = Provider {
            id: slug.to_string(),
            slug: slug.to_string(),
            display_name: slug.to_string(),
            supports_api_key: true,
            supports_oauth: true,
            supports_manual: true,
            is_active: true,
            created_at: self.clock.now(),
        };
        self.store.upsert_provider(&provider).await?;
        Ok(provider)
    }

    /// Move the clock to the given UTC date at noon.
    pub fn set_date(&self, year: i32, month: u32, day: u32) {
        if let Some(moment) = Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).single() {
            self.clock.set(moment);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowtab_core::{BillingMonth, PluginAdapter};

    #[tokio::test]
    async fn builder_creates_working_environment() {
        let harness = TestHarness::builder().build().await.unwrap();
        assert!(harness.store.health_check().await.is_ok());
        assert!(harness.store.list_connections("anyone").await.unwrap().is_empty());
        assert_eq!(
            harness.copies.ledger().current_month(),
            BillingMonth::from_ym(2026, 1).unwrap()
        );
    }

    #[tokio::test]
    async fn fixed_key_is_used() {
        let key = "00".repeat(32);
        let harness = TestHarness::builder()
            .with_encryption_key(key.clone())
            .build()
            .await
            .unwrap();
        assert_eq!(harness.config.vault.encryption_key.as_deref(), Some(key.as_str()));
        let encoded = harness.encryption.encrypt("x").unwrap();
        let other = EncryptionService::from_hex(&key).unwrap();
        assert_eq!(other.decrypt(&encoded).unwrap(), "x");
    }

    #[tokio::test]
    async fn set_date_moves_clock() {
        let harness = TestHarness::builder().build().await.unwrap();
        harness.set_date(2026, 3, 2);
        assert_eq!(
            harness.copies.ledger().current_month(),
            BillingMonth::from_ym(2026, 3).unwrap()
        );
    }
}
