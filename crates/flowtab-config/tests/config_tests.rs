// SPDX-FileCopyrightText: 2026 Flowtab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Flowtab configuration system.

use flowtab_config::diagnostic::{suggest_key, ConfigError};
use flowtab_config::model::{FlowtabConfig, OverQuotaPolicy};
use flowtab_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_flowtab_config() {
    let toml = r#"
[app]
name = "marketplace-eu"
log_level = "debug"

[storage]
database_path = "/tmp/test.db"
wal_mode = false

[vault]
encryption_key = "0000000000000000000000000000000000000000000000000000000000000000"

[monetization]
monthly_copy_cap = 50
payout_rate_cents = 10
over_quota = "reject"
payout_history_limit = 6
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.app.name, "marketplace-eu");
    assert_eq!(config.app.log_level, "debug");
    assert_eq!(config.storage.database_path, "/tmp/test.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.vault.encryption_key.as_deref().map(str::len), Some(64));
    assert_eq!(config.monetization.monthly_copy_cap, 50);
    assert_eq!(config.monetization.payout_rate_cents, 10);
    assert_eq!(config.monetization.over_quota, OverQuotaPolicy::Reject);
    assert_eq!(config.monetization.payout_history_limit, 6);
}

/// Unknown field in [monetization] section produces an UnknownField error.
#[test]
fn unknown_field_in_monetization_produces_error() {
    let toml = r#"
[monetization]
monthly_copy_cp = 10
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("monthly_copy_cp"),
        "error should mention unknown field or the bad key, got: {err_str}"
    );
}

/// Missing optional sections use defaults without error.
#[test]
fn missing_optional_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.app.name, "flowtab");
    assert_eq!(config.app.log_level, "info");
    assert!(config.storage.database_path.ends_with("flowtab.db"));
    assert!(config.storage.wal_mode);
    assert!(config.vault.encryption_key.is_none());
    assert_eq!(config.monetization.monthly_copy_cap, 100);
    assert_eq!(config.monetization.payout_rate_cents, 7);
    assert_eq!(config.monetization.over_quota, OverQuotaPolicy::Record);
}

/// `FLOWTAB_VAULT_ENCRYPTION_KEY` lands on `vault.encryption_key`.
#[test]
fn env_override_sets_encryption_key() {
    use figment::{
        providers::{Format, Serialized, Toml},
        Figment,
    };

    let key = "ab".repeat(32);
    // Simulate the env provider by merging the dotted path it produces.
    let config: FlowtabConfig = Figment::new()
        .merge(Serialized::defaults(FlowtabConfig::default()))
        .merge(Toml::string("[vault]\nencryption_key = \"from-toml\"\n"))
        .merge(("vault.encryption_key", key.clone()))
        .extract()
        .expect("should merge env override");

    assert_eq!(config.vault.encryption_key, Some(key));
}

/// Env overrides for numeric monetization settings.
#[test]
fn env_override_sets_copy_cap() {
    use figment::{providers::Serialized, Figment};

    let config: FlowtabConfig = Figment::new()
        .merge(Serialized::defaults(FlowtabConfig::default()))
        .merge(("monetization.monthly_copy_cap", 5))
        .extract()
        .expect("should set copy cap via dot notation");

    assert_eq!(config.monetization.monthly_copy_cap, 5);
}

/// Missing config files are silently skipped (Figment's Toml::file() behavior).
#[test]
fn missing_config_files_silently_skipped() {
    use figment::{
        providers::{Format, Serialized, Toml},
        Figment,
    };

    let config: FlowtabConfig = Figment::new()
        .merge(Serialized::defaults(FlowtabConfig::default()))
        .merge(Toml::file("/nonexistent/path/flowtab.toml"))
        .extract()
        .expect("missing file should be silently skipped");

    assert_eq!(config.app.name, "flowtab");
}

/// Unexpected top-level section is rejected by deny_unknown_fields.
#[test]
fn deny_unknown_fields_at_top_level() {
    let toml = r#"
[stripe]
secret = "sk_live"
"#;

    let err = load_config_from_str(toml).expect_err("unknown top-level section should be rejected");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("stripe"),
        "error should mention unknown field, got: {err_str}"
    );
}

/// Unknown key "naem" in [app] produces suggestion "did you mean `name`?"
#[test]
fn diagnostic_naem_suggests_name() {
    let valid_keys = &["name", "log_level"];
    let suggestion = suggest_key("naem", valid_keys);
    assert_eq!(suggestion, Some("name".to_string()));
}

/// Error output from load_and_validate_str includes the unknown key name and a suggestion.
#[test]
fn diagnostic_error_includes_unknown_key() {
    let toml = r#"
[vault]
encryption_kye = "00"
"#;

    let errors = load_and_validate_str(toml).expect_err("should produce errors");
    let has_unknown_key = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { key, suggestion, valid_keys, .. } if {
            key == "encryption_kye"
                && suggestion.as_deref() == Some("encryption_key")
                && valid_keys.contains("encryption_key")
        })
    });
    assert!(
        has_unknown_key,
        "should have UnknownKey error for 'encryption_kye', got: {errors:?}"
    );
}

/// The span of an unknown key points at the key inside its own section.
#[test]
fn diagnostic_span_points_into_storage_section() {
    let toml = "[app]\nname = \"flowtab\"\n\n[storage]\nwal_mod = true\n";

    let errors = load_and_validate_str(toml).expect_err("typo should be rejected");
    let span = errors
        .iter()
        .find_map(|e| match e {
            ConfigError::UnknownKey {
                key,
                section,
                suggestion,
                span,
                ..
            } if key == "wal_mod" => {
                assert_eq!(section.as_deref(), Some("storage"));
                assert_eq!(suggestion.as_deref(), Some("wal_mode"));
                *span
            }
            _ => None,
        })
        .expect("should carry a span for wal_mod");
    assert_eq!(&toml[span.offset()..span.offset() + span.len()], "wal_mod");
}

/// A misspelled section name is suggested against the known sections.
#[test]
fn diagnostic_misspelled_section_suggests_monetization() {
    let toml = r#"
[monetizaton]
monthly_copy_cap = 10
"#;

    let errors = load_and_validate_str(toml).expect_err("unknown section should be rejected");
    let error = errors
        .iter()
        .find(|e| matches!(e, ConfigError::UnknownKey { key, .. } if key == "monetizaton"))
        .expect("should report the section name");
    match error {
        ConfigError::UnknownKey {
            section,
            suggestion,
            valid_keys,
            ..
        } => {
            assert!(section.is_none());
            assert_eq!(suggestion.as_deref(), Some("monetization"));
            assert!(valid_keys.contains("storage"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(error.to_string().contains("the top level"));
}

/// Invalid type (string where number expected) produces clear message.
#[test]
fn diagnostic_invalid_type_message() {
    let toml = r#"
[monetization]
monthly_copy_cap = "lots"
"#;

    let err = load_config_from_str(toml).expect_err("should reject invalid type");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("invalid type") || err_str.contains("monthly_copy_cap"),
        "error should mention type mismatch, got: {err_str}"
    );
}

/// ConfigError can be rendered using miette's graphical handler.
#[test]
fn config_error_renders_with_miette() {
    use miette::{Diagnostic, GraphicalReportHandler};

    let error = ConfigError::UnknownKey {
        key: "naem".to_string(),
        section: Some("app".to_string()),
        suggestion: Some("name".to_string()),
        valid_keys: "name, log_level".to_string(),
        span: None,
        src: None,
    };
    assert!(error.code().is_some(), "should have diagnostic code");
    let help = error.help().expect("should have help text").to_string();
    assert!(help.contains("did you mean `name`"), "got: {help}");

    let handler = GraphicalReportHandler::new();
    let mut buf = String::new();
    handler
        .render_report(&mut buf, &error)
        .expect("should render without error");
    assert!(buf.contains("naem"), "rendered report should mention the key");
}

/// A short key fails validation through the high-level entry point.
#[test]
fn validation_catches_short_encryption_key() {
    let toml = r#"
[vault]
encryption_key = "000000000000000000000000"
"#;

    let errors = load_and_validate_str(toml).expect_err("24-char key should fail");
    assert!(errors.iter().any(|e| {
        matches!(e, ConfigError::Validation { message } if message.contains("encryption_key"))
    }));
}

/// A config file on disk is loaded and validated.
#[test]
fn load_and_validate_path_reads_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flowtab.toml");
    std::fs::write(
        &path,
        "[monetization]\nmonthly_copy_cap = 3\n\n[storage]\ndatabase_path = \"/tmp/x.db\"\n",
    )
    .unwrap();

    let config = load_and_validate_path(&path).expect("file config should validate");
    assert_eq!(config.monetization.monthly_copy_cap, 3);
    assert_eq!(config.storage.database_path, "/tmp/x.db");
}

/// load_and_validate with defaults works (no config file needed).
#[test]
#[serial_test::serial]
fn load_and_validate_defaults() {
    let config = flowtab_config::load_and_validate().expect("defaults should validate");
    assert_eq!(config.monetization.monthly_copy_cap, 100);
}
