// SPDX-FileCopyrightText: 2026 Flowtab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Flowtab marketplace.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Flowtab configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FlowtabConfig {
    /// Process identity and logging.
    #[serde(default)]
    pub app: AppConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Credential vault settings.
    #[serde(default)]
    pub vault: VaultConfig,

    /// Copy quota and creator payout settings.
    #[serde(default)]
    pub monetization: MonetizationConfig,
}

/// Process identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Instance name, shown in logs.
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_app_name() -> String {
    "flowtab".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("flowtab").join("flowtab.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("flowtab.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Credential vault configuration.
///
/// The encryption key is 32 bytes written as 64 hex characters. It is
/// optional here so that commands which never touch credentials can run
/// without one; the vault refuses to start without it.
#[derive(Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VaultConfig {
    /// AES-256-GCM key as 64 hex characters.
    #[serde(default)]
    pub encryption_key: Option<String>,
}

impl std::fmt::Debug for VaultConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultConfig")
            .field(
                "encryption_key",
                &self.encryption_key.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// What happens to a copy once the user's monthly cap is used up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverQuotaPolicy {
    /// Record the copy but do not count it toward payouts.
    #[default]
    Record,
    /// Refuse the copy with a quota error.
    Reject,
}

/// Copy quota and creator payout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MonetizationConfig {
    /// Counted copies allowed per user per billing month.
    #[serde(default = "default_monthly_copy_cap")]
    pub monthly_copy_cap: u32,

    /// Amount credited to the flow's creator per counted copy, in cents.
    #[serde(default = "default_payout_rate_cents")]
    pub payout_rate_cents: i64,

    /// Behavior for copies beyond `monthly_copy_cap`.
    #[serde(default)]
    pub over_quota: OverQuotaPolicy,

    /// Number of months returned by payout history queries.
    #[serde(default = "default_payout_history_limit")]
    pub payout_history_limit: u32,
}

impl Default for MonetizationConfig {
    fn default() -> Self {
        Self {
            monthly_copy_cap: default_monthly_copy_cap(),
            payout_rate_cents: default_payout_rate_cents(),
            over_quota: OverQuotaPolicy::default(),
            payout_history_limit: default_payout_history_limit(),
        }
    }
}

fn default_monthly_copy_cap() -> u32 {
    100
}

fn default_payout_rate_cents() -> i64 {
    7
}

fn default_payout_history_limit() -> u32 {
    12
}
