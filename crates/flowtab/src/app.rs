// SPDX-FileCopyrightText: 2026 Flowtab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process bootstrap: logging and service wiring.

use std::sync::Arc;

use flowtab_config::model::FlowtabConfig;
use flowtab_core::{Clock, FlowtabError, MarketplaceStore, PluginAdapter, SystemClock};
use flowtab_payouts::{CopyService, EarningsService, PayoutEngine};
use flowtab_storage::SqliteStorage;
use flowtab_vault::{CredentialVault, EncryptionService};
use tracing::info;

/// Initialize the tracing subscriber with an env filter.
///
/// `RUST_LOG` wins over the configured level.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("flowtab={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Render a command result as pretty JSON.
pub fn render_json<T: serde::Serialize>(value: &T) -> Result<String, FlowtabError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| FlowtabError::Internal(format!("failed to serialize output: {e}")))
}

/// Build the encryption service from configuration.
pub fn encryption_from_config(config: &FlowtabConfig) -> Result<EncryptionService, FlowtabError> {
    let key = config.vault.encryption_key.as_deref().ok_or_else(|| {
        FlowtabError::Config(
            "no encryption key configured (set vault.encryption_key or FLOWTAB_VAULT_ENCRYPTION_KEY)"
                .to_string(),
        )
    })?;
    EncryptionService::from_hex(key)
}

/// Storage-backed services for one CLI invocation.
pub struct App {
    pub store: Arc<dyn MarketplaceStore>,
    pub clock: Arc<dyn Clock>,
    pub copies: CopyService,
    pub engine: Arc<PayoutEngine>,
    pub earnings: EarningsService,
}

impl App {
    /// Open storage and construct the payout services.
    pub async fn open(config: &FlowtabConfig) -> Result<Self, FlowtabError> {
        let storage = SqliteStorage::new(config.storage.clone());
        storage.initialize().await?;
        let store: Arc<dyn MarketplaceStore> = Arc::new(storage);
        info!(path = %config.storage.database_path, "storage ready");
        Ok(Self::with_store(store, Arc::new(SystemClock), config))
    }

    /// Construct services over an existing store and clock.
    pub fn with_store(
        store: Arc<dyn MarketplaceStore>,
        clock: Arc<dyn Clock>,
        config: &FlowtabConfig,
    ) -> Self {
        let monetization = &config.monetization;
        let copies = CopyService::from_config(store.clone(), clock.clone(), monetization);
        let engine = Arc::new(PayoutEngine::new(
            store.clone(),
            clock.clone(),
            monetization.payout_rate_cents,
        ));
        let earnings = EarningsService::new(engine.clone(), monetization.payout_history_limit);
        Self {
            store,
            clock,
            copies,
            engine,
            earnings,
        }
    }

    /// A credential vault over this app's store. Requires a configured key.
    pub fn vault(&self, config: &FlowtabConfig) -> Result<CredentialVault, FlowtabError> {
        Ok(CredentialVault::new(
            self.store.clone(),
            Arc::new(encryption_from_config(config)?),
            self.clock.clone(),
        ))
    }

    /// Flush and close storage.
    pub async fn shutdown(&self) -> Result<(), FlowtabError> {
        self.store.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowtab_config::model::VaultConfig;

    #[test]
    fn render_json_reports_serialization_failure() {
        let mut bad = std::collections::BTreeMap::new();
        bad.insert((1u8, 2u8), "tuple keys are not JSON object keys");
        assert!(matches!(render_json(&bad), Err(FlowtabError::Internal(_))));

        let ok = render_json(&serde_json::json!({ "counted": true })).unwrap();
        assert!(ok.contains("\"counted\": true"));
    }

    #[test]
    fn missing_key_is_a_config_error() {
        let config = FlowtabConfig::default();
        assert!(matches!(
            encryption_from_config(&config),
            Err(FlowtabError::Config(_))
        ));
    }

    #[test]
    fn configured_key_builds_service() {
        let config = FlowtabConfig {
            vault: VaultConfig {
                encryption_key: Some("11".repeat(32)),
            },
            ..FlowtabConfig::default()
        };
        let svc = encryption_from_config(&config).unwrap();
        let encoded = svc.encrypt("hello").unwrap();
        assert_eq!(svc.decrypt(&encoded).unwrap(), "hello");
    }

    #[tokio::test]
    async fn app_opens_configured_database() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = FlowtabConfig::default();
        config.storage.database_path = dir.path().join("app.db").to_string_lossy().to_string();
        let app = App::open(&config).await.unwrap();
        assert!(app.vault(&config).is_err());
        app.shutdown().await.unwrap();
    }
}
