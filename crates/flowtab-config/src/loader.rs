// SPDX-FileCopyrightText: 2026 Flowtab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./flowtab.toml` > `~/.config/flowtab/flowtab.toml` > `/etc/flowtab/flowtab.toml`
//! with environment variable overrides via `FLOWTAB_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::FlowtabConfig;

/// Top-level sections that `FLOWTAB_<SECTION>_<KEY>` variables may target.
const ENV_SECTIONS: &[&str] = &["app", "storage", "vault", "monetization"];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/flowtab/flowtab.toml` (system-wide)
/// 3. `~/.config/flowtab/flowtab.toml` (user XDG config)
/// 4. `./flowtab.toml` (local directory)
/// 5. `ENCRYPTION_KEY` (bare variable used by existing deployments)
/// 6. `FLOWTAB_*` environment variables
pub fn load_config() -> Result<FlowtabConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<FlowtabConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(FlowtabConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<FlowtabConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(FlowtabConfig::default()))
        .merge(Toml::file(path))
        .merge(legacy_key_provider())
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(FlowtabConfig::default()))
        .merge(Toml::file("/etc/flowtab/flowtab.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("flowtab/flowtab.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("flowtab.toml"))
        .merge(legacy_key_provider())
        .merge(env_provider())
}

/// Map the bare `ENCRYPTION_KEY` variable onto `vault.encryption_key`.
fn legacy_key_provider() -> Env {
    Env::raw()
        .only(&["encryption_key"])
        .map(|_| "vault.encryption_key".into())
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")`: `FLOWTAB_VAULT_ENCRYPTION_KEY`
/// must map to `vault.encryption_key`, not `vault.encryption.key`.
fn env_provider() -> Env {
    Env::prefixed("FLOWTAB_").map(|key| map_env_key(key.as_str()).into())
}

/// Turn a lowercased, prefix-stripped env key into a dotted config path.
pub(crate) fn map_env_key(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_to_sections() {
        assert_eq!(map_env_key("vault_encryption_key"), "vault.encryption_key");
        assert_eq!(
            map_env_key("monetization_monthly_copy_cap"),
            "monetization.monthly_copy_cap"
        );
        assert_eq!(map_env_key("storage_database_path"), "storage.database_path");
        assert_eq!(map_env_key("app_log_level"), "app.log_level");
    }

    #[test]
    fn unknown_section_is_left_alone() {
        assert_eq!(map_env_key("telemetry_endpoint"), "telemetry_endpoint");
    }
}
