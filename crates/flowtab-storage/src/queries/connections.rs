// SPDX-FileCopyrightText: 2026 Flowtab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider catalog, account connections, vault items, and manual overrides.

use chrono::{DateTime, Utc};
use flowtab_core::{
    AccountConnection, ConnectionStatus, FlowtabError, Provider, VaultItem,
};
use rusqlite::params;

use crate::database::Database;
use crate::queries::parse_column;

const PROVIDER_COLUMNS: &str = "id, slug, display_name, supports_api_key, supports_oauth, \
     supports_manual, is_active, created_at";

const CONNECTION_COLUMNS: &str = "id, user_id, provider_id, label, connection_type, status, \
     last_used_at, last_error, created_at, updated_at";

fn provider_from_row(row: &rusqlite::Row<'_>) -> Result<Provider, rusqlite::Error> {
    Ok(Provider {
        id: row.get(0)?,
        slug: row.get(1)?,
        display_name: row.get(2)?,
        supports_api_key: row.get(3)?,
        supports_oauth: row.get(4)?,
        supports_manual: row.get(5)?,
        is_active: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn connection_from_row(row: &rusqlite::Row<'_>) -> Result<AccountConnection, rusqlite::Error> {
    Ok(AccountConnection {
        id: row.get(0)?,
        user_id: row.get(1)?,
        provider_id: row.get(2)?,
        label: row.get(3)?,
        connection_type: parse_column(4, row.get(4)?)?,
        status: parse_column(5, row.get(5)?)?,
        last_used_at: row.get(6)?,
        last_error: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn not_found(id: &str) -> FlowtabError {
    FlowtabError::NotFound {
        entity: "connection",
        id: id.to_string(),
    }
}

/// Insert or update a provider, keyed by ID.
pub async fn upsert_provider(db: &Database, provider: &Provider) -> Result<(), FlowtabError> {
    let p = provider.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO providers
                 (id, slug, display_name, supports_api_key, supports_oauth, supports_manual, is_active, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT (id) DO UPDATE SET
                     slug = excluded.slug,
                     display_name = excluded.display_name,
                     supports_api_key = excluded.supports_api_key,
                     supports_oauth = excluded.supports_oauth,
                     supports_manual = excluded.supports_manual,
                     is_active = excluded.is_active",
                params![
                    p.id,
                    p.slug,
                    p.display_name,
                    p.supports_api_key,
                    p.supports_oauth,
                    p.supports_manual,
                    p.is_active,
                    p.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetch a provider by ID.
pub async fn get_provider(db: &Database, id: &str) -> Result<Option<Provider>, FlowtabError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!("SELECT {PROVIDER_COLUMNS} FROM providers WHERE id = ?1"),
                params![id],
                provider_from_row,
            );
            match result {
                Ok(provider) => Ok(Some(provider)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List providers by display name, optionally only active ones.
pub async fn list_providers(db: &Database, active_only: bool) -> Result<Vec<Provider>, FlowtabError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PROVIDER_COLUMNS} FROM providers
                 WHERE (?1 = 0 OR is_active = 1)
                 ORDER BY display_name"
            ))?;
            let rows = stmt.query_map(params![active_only], provider_from_row)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Insert a connection, its vault items, and its manual override in one transaction.
pub async fn create_connection(
    db: &Database,
    connection: &AccountConnection,
    items: &[VaultItem],
    manual_config: Option<&str>,
) -> Result<(), FlowtabError> {
    let c = connection.clone();
    let items = items.to_vec();
    let manual_config = manual_config.map(str::to_string);
    let override_id = uuid::Uuid::new_v4().to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO account_connections
                 (id, user_id, provider_id, label, connection_type, status, last_used_at, last_error, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    c.id,
                    c.user_id,
                    c.provider_id,
                    c.label,
                    c.connection_type.to_string(),
                    c.status.to_string(),
                    c.last_used_at,
                    c.last_error,
                    c.created_at,
                    c.updated_at,
                ],
            )?;
            for item in &items {
                tx.execute(
                    "INSERT INTO credential_vault_items
                     (id, connection_id, key_name, encrypted_data, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        item.id,
                        item.connection_id,
                        item.key_name,
                        item.encrypted_data,
                        item.created_at,
                    ],
                )?;
            }
            if let Some(config) = manual_config {
                tx.execute(
                    "INSERT INTO manual_overrides (id, connection_id, config, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?4)",
                    params![override_id, c.id, config, c.created_at],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetch a connection by ID.
pub async fn get_connection(
    db: &Database,
    id: &str,
) -> Result<Option<AccountConnection>, FlowtabError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!("SELECT {CONNECTION_COLUMNS} FROM account_connections WHERE id = ?1"),
                params![id],
                connection_from_row,
            );
            match result {
                Ok(connection) => Ok(Some(connection)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All of a user's connections, newest first.
pub async fn list_connections(
    db: &Database,
    user_id: &str,
) -> Result<Vec<AccountConnection>, FlowtabError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONNECTION_COLUMNS} FROM account_connections
                 WHERE user_id = ?1 ORDER BY created_at DESC"
            ))?;
            let rows = stmt.query_map(params![user_id], connection_from_row)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Encrypted credentials of a connection, ordered by key name.
pub async fn vault_items(db: &Database, connection_id: &str) -> Result<Vec<VaultItem>, FlowtabError> {
    let connection_id = connection_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, connection_id, key_name, encrypted_data, created_at
                 FROM credential_vault_items WHERE connection_id = ?1 ORDER BY key_name",
            )?;
            let rows = stmt.query_map(params![connection_id], |row| {
                Ok(VaultItem {
                    id: row.get(0)?,
                    connection_id: row.get(1)?,
                    key_name: row.get(2)?,
                    encrypted_data: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Raw JSON of a connection's manual override, if any.
pub async fn manual_config(db: &Database, connection_id: &str) -> Result<Option<String>, FlowtabError> {
    let connection_id = connection_id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT config FROM manual_overrides WHERE connection_id = ?1",
                params![connection_id],
                |row| row.get(0),
            );
            match result {
                Ok(config) => Ok(Some(config)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete a connection with its vault items and override.
pub async fn delete_connection(db: &Database, id: &str) -> Result<bool, FlowtabError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM credential_vault_items WHERE connection_id = ?1",
                params![id],
            )?;
            tx.execute("DELETE FROM manual_overrides WHERE connection_id = ?1", params![id])?;
            let removed = tx.execute("DELETE FROM account_connections WHERE id = ?1", params![id])?;
            tx.commit()?;
            Ok(removed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Set status and last error.
pub async fn update_connection_status(
    db: &Database,
    id: &str,
    status: ConnectionStatus,
    last_error: Option<&str>,
    now: DateTime<Utc>,
) -> Result<(), FlowtabError> {
    let id_owned = id.to_string();
    let status = status.to_string();
    let last_error = last_error.map(str::to_string);
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE account_connections SET status = ?2, last_error = ?3, updated_at = ?4
                 WHERE id = ?1",
                params![id_owned, status, last_error, now],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    if changed == 0 {
        return Err(not_found(id));
    }
    Ok(())
}

/// Mark a connection as used successfully.
pub async fn touch_connection(db: &Database, id: &str, now: DateTime<Utc>) -> Result<(), FlowtabError> {
    let id_owned = id.to_string();
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE account_connections
                 SET last_used_at = ?2, status = 'active', last_error = NULL, updated_at = ?2
                 WHERE id = ?1",
                params![id_owned, now],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    if changed == 0 {
        return Err(not_found(id));
    }
    Ok(())
}
