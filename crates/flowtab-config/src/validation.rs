// SPDX-FileCopyrightText: 2026 Flowtab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as key lengths, non-empty paths, and positive quotas.

use crate::diagnostic::ConfigError;
use crate::model::FlowtabConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &FlowtabConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.app.log_level.to_lowercase().as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "app.log_level `{}` is not one of {}",
                config.app.log_level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    // The key itself never appears in the message.
    if let Some(key) = &config.vault.encryption_key {
        if key.len() != 64 {
            errors.push(ConfigError::Validation {
                message: format!(
                    "vault.encryption_key must be 64 hex characters (32 bytes), got {} characters",
                    key.len()
                ),
            });
        } else if !key.chars().all(|c| c.is_ascii_hexdigit()) {
            errors.push(ConfigError::Validation {
                message: "vault.encryption_key must contain only hex characters".to_string(),
            });
        }
    }

    if config.monetization.monthly_copy_cap == 0 {
        errors.push(ConfigError::Validation {
            message: "monetization.monthly_copy_cap must be at least 1".to_string(),
        });
    }

    if config.monetization.payout_rate_cents < 0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "monetization.payout_rate_cents must be non-negative, got {}",
                config.monetization.payout_rate_cents
            ),
        });
    }

    if config.monetization.payout_history_limit == 0 {
        errors.push(ConfigError::Validation {
            message: "monetization.payout_history_limit must be at least 1".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_message(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_validates() {
        let config = FlowtabConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = FlowtabConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "database_path"));
    }

    #[test]
    fn short_encryption_key_fails_validation() {
        let mut config = FlowtabConfig::default();
        config.vault.encryption_key = Some("00".repeat(16));
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "64 hex characters"));
    }

    #[test]
    fn non_hex_encryption_key_fails_validation() {
        let mut config = FlowtabConfig::default();
        config.vault.encryption_key = Some("zz".repeat(32));
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "only hex"));
        assert!(!errors.iter().any(|e| e.to_string().contains("zzzz")));
    }

    #[test]
    fn valid_encryption_key_passes() {
        let mut config = FlowtabConfig::default();
        config.vault.encryption_key = Some("00".repeat(32));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn zero_copy_cap_fails_validation() {
        let mut config = FlowtabConfig::default();
        config.monetization.monthly_copy_cap = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "monthly_copy_cap"));
    }

    #[test]
    fn errors_are_collected_not_fail_fast() {
        let mut config = FlowtabConfig::default();
        config.app.log_level = "loud".to_string();
        config.monetization.payout_rate_cents = -1;
        config.monetization.payout_history_limit = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(has_message(&errors, "log_level"));
        assert!(has_message(&errors, "payout_rate_cents"));
    }
}
