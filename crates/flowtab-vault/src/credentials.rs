// SPDX-FileCopyrightText: 2026 Flowtab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Account connections whose credentials live encrypted in the vault.
//!
//! Plaintext credentials exist only in the request that creates a
//! connection and in the [`SecretString`] values handed back by
//! [`CredentialVault::credentials`]. What reaches the store is always the
//! `nonce:tag:ciphertext` form.

use std::collections::BTreeMap;
use std::sync::Arc;

use flowtab_core::{
    AccountConnection, Clock, ConnectionStatus, ConnectionType, FlowtabError, MarketplaceStore,
    VaultItem,
};
use secrecy::SecretString;
use tracing::{debug, error, info};

use crate::encryption::EncryptionService;

/// Request to link a provider account.
#[derive(Debug, Clone)]
pub struct NewConnection {
    pub provider_id: String,
    pub label: String,
    pub connection_type: ConnectionType,
    /// Credential name to plaintext value.
    pub credentials: BTreeMap<String, String>,
    /// JSON object for `manual` connections.
    pub manual_config: Option<String>,
}

/// Encrypting front end over the connection tables.
pub struct CredentialVault {
    store: Arc<dyn MarketplaceStore>,
    encryption: Arc<EncryptionService>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for CredentialVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialVault")
            .field("store", &self.store.name())
            .field("encryption", &self.encryption)
            .finish()
    }
}

impl CredentialVault {
    pub fn new(
        store: Arc<dyn MarketplaceStore>,
        encryption: Arc<EncryptionService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            encryption,
            clock,
        }
    }

    /// Validate and persist a new connection with its encrypted credentials.
    pub async fn create_connection(
        &self,
        user_id: &str,
        request: NewConnection,
    ) -> Result<AccountConnection, FlowtabError> {
        let provider = self
            .store
            .get_provider(&request.provider_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or_else(|| FlowtabError::NotFound {
                entity: "provider",
                id: request.provider_id.clone(),
            })?;

        if !provider.supports(request.connection_type) {
            return Err(FlowtabError::Validation(format!(
                "provider {} does not support {} connections",
                provider.slug, request.connection_type
            )));
        }
        if request.label.trim().is_empty() {
            return Err(FlowtabError::Validation("label must not be empty".to_string()));
        }
        if request.connection_type == ConnectionType::ApiKey && request.credentials.is_empty() {
            return Err(FlowtabError::Validation(
                "api_key connections require at least one credential".to_string(),
            ));
        }
        if let Some(ref config) = request.manual_config {
            let parsed: serde_json::Value = serde_json::from_str(config).map_err(|e| {
                FlowtabError::Validation(format!("manual config is not valid JSON: {e}"))
            })?;
            if !parsed.is_object() {
                return Err(FlowtabError::Validation(
                    "manual config must be a JSON object".to_string(),
                ));
            }
        }

        let now = self.clock.now();
        let connection = AccountConnection {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            provider_id: provider.id.clone(),
            label: request.label.trim().to_string(),
            connection_type: request.connection_type,
            status: ConnectionStatus::Active,
            last_used_at: None,
            last_error: None,
            created_at: now,
            updated_at: now,
        };

        let mut items = Vec::with_capacity(request.credentials.len());
        for (key_name, plaintext) in &request.credentials {
            items.push(VaultItem {
                id: uuid::Uuid::new_v4().to_string(),
                connection_id: connection.id.clone(),
                key_name: key_name.clone(),
                encrypted_data: self.encryption.encrypt(plaintext)?,
                created_at: now,
            });
        }

        self.store
            .create_connection(&connection, &items, request.manual_config.as_deref())
            .await?;

        info!(
            user_id = %user_id,
            connection_id = %connection.id,
            provider = %provider.slug,
            credentials = items.len(),
            "connection created"
        );
        Ok(connection)
    }

    /// Fetch a connection owned by the user.
    async fn owned(&self, user_id: &str, id: &str) -> Result<AccountConnection, FlowtabError> {
        self.store
            .get_connection(id)
            .await?
            .filter(|c| c.user_id == user_id)
            .ok_or_else(|| FlowtabError::NotFound {
                entity: "connection",
                id: id.to_string(),
            })
    }

    /// Decrypt all credentials of a connection the user owns.
    ///
    /// Any decryption problem is logged in full and reported to the caller
    /// only as [`FlowtabError::CredentialUnavailable`].
    pub async fn credentials(
        &self,
        user_id: &str,
        connection_id: &str,
    ) -> Result<BTreeMap<String, SecretString>, FlowtabError> {
        self.owned(user_id, connection_id).await?;

        let mut out = BTreeMap::new();
        for item in self.store.vault_items(connection_id).await? {
            match self.encryption.decrypt(&item.encrypted_data) {
                Ok(plaintext) => {
                    out.insert(item.key_name, SecretString::from(plaintext));
                }
                Err(e) => {
                    error!(
                        connection_id = %connection_id,
                        vault_item_id = %item.id,
                        key_name = %item.key_name,
                        error = %e,
                        error_debug = ?e,
                        "credential decryption failed"
                    );
                    return Err(FlowtabError::CredentialUnavailable);
                }
            }
        }
        debug!(connection_id = %connection_id, count = out.len(), "credentials decrypted");
        Ok(out)
    }

    /// Remove a connection the user owns. Returns `false` if it did not exist.
    pub async fn delete_connection(&self, user_id: &str, id: &str) -> Result<bool, FlowtabError> {
        match self.owned(user_id, id).await {
            Ok(_) => {}
            Err(FlowtabError::NotFound { .. }) => return Ok(false),
            Err(e) => return Err(e),
        }
        let removed = self.store.delete_connection(id).await?;
        if removed {
            info!(user_id = %user_id, connection_id = %id, "connection deleted");
        }
        Ok(removed)
    }

    pub async fn list_connections(
        &self,
        user_id: &str,
    ) -> Result<Vec<AccountConnection>, FlowtabError> {
        self.store.list_connections(user_id).await
    }

    /// The manual override JSON of a connection the user owns.
    pub async fn manual_config(
        &self,
        user_id: &str,
        id: &str,
    ) -> Result<Option<serde_json::Value>, FlowtabError> {
        self.owned(user_id, id).await?;
        match self.store.manual_config(id).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| FlowtabError::Internal(format!("stored manual config is corrupt: {e}"))),
            None => Ok(None),
        }
    }

    /// Record a successful use of the connection.
    pub async fn mark_used(&self, id: &str) -> Result<(), FlowtabError> {
        self.store.touch_connection(id, self.clock.now()).await
    }

    /// Set the connection status, e.g. after the provider rejected a key.
    pub async fn set_status(
        &self,
        id: &str,
        status: ConnectionStatus,
        last_error: Option<&str>,
    ) -> Result<(), FlowtabError> {
        self.store
            .update_connection_status(id, status, last_error, self.clock.now())
            .await?;
        if status == ConnectionStatus::Error {
            info!(connection_id = %id, last_error = ?last_error, "connection marked as errored");
        }
        Ok(())
    }
}
