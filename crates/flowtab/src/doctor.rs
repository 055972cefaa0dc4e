// SPDX-FileCopyrightText: 2026 Flowtab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `flowtab config check` command implementation.
//!
//! Runs diagnostic checks against the loaded configuration: database
//! reachability, the vault key, and monetization settings.

use std::io::IsTerminal;
use std::time::{Duration, Instant};

use flowtab_config::model::{FlowtabConfig, OverQuotaPolicy};
use flowtab_payouts::pricing::format_cents;
use flowtab_vault::EncryptionService;

/// Status of a diagnostic check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>, start: Instant) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            duration: start.elapsed(),
        }
    }
}

/// Run all checks and print a report. Returns the number of failed checks.
pub async fn run_config_check(config: &FlowtabConfig, deep: bool, plain: bool) -> usize {
    let use_color = !plain && std::io::stdout().is_terminal();

    let mut results = vec![
        CheckResult::new("Configuration", CheckStatus::Pass, "valid", Instant::now()),
        check_database(&config.storage.database_path).await,
        check_encryption_key(config),
        check_monetization(config),
    ];
    if deep {
        results.push(check_db_integrity(&config.storage.database_path).await);
    }

    println!();
    println!("  flowtab config check");
    println!("  {}", "-".repeat(50));

    let mut fail_count = 0;
    let mut warn_count = 0;
    for result in &results {
        match result.status {
            CheckStatus::Warn => warn_count += 1,
            CheckStatus::Fail => fail_count += 1,
            CheckStatus::Pass => {}
        }
        println!("{}", format_line(result, use_color));
    }
    println!();

    if fail_count > 0 || warn_count > 0 {
        let issues = fail_count + warn_count;
        let issue_word = if issues == 1 { "issue" } else { "issues" };
        println!("  {issues} {issue_word} found.");
        if !deep {
            println!("  Run with --deep for detailed diagnostics.");
        }
    } else {
        println!("  All checks passed.");
    }
    println!();

    fail_count
}

fn format_line(result: &CheckResult, use_color: bool) -> String {
    let duration_ms = result.duration.as_millis();
    if use_color {
        use colored::Colorize;
        let (symbol, message) = match result.status {
            CheckStatus::Pass => ("✓".green(), result.message.normal()),
            CheckStatus::Warn => ("!".yellow(), result.message.yellow()),
            CheckStatus::Fail => ("✗".red(), result.message.red()),
        };
        format!("    {symbol} {:<20} {message} ({duration_ms}ms)", result.name)
    } else {
        let tag = match result.status {
            CheckStatus::Pass => "[OK]  ",
            CheckStatus::Warn => "[WARN]",
            CheckStatus::Fail => "[FAIL]",
        };
        format!(
            "    {tag} {:<20} {} ({duration_ms}ms)",
            result.name, result.message
        )
    }
}

/// Check the database file exists, opens, and has been migrated.
async fn check_database(db_path: &str) -> CheckResult {
    let start = Instant::now();
    if !std::path::Path::new(db_path).exists() {
        return CheckResult::new(
            "Database",
            CheckStatus::Warn,
            format!("not found: {db_path} (will be created on first use)"),
            start,
        );
    }

    let conn = match tokio_rusqlite::Connection::open(db_path).await {
        Ok(conn) => conn,
        Err(e) => {
            return CheckResult::new("Database", CheckStatus::Fail, format!("open failed: {e}"), start);
        }
    };
    let applied: Result<i64, tokio_rusqlite::Error> = conn
        .call(|conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM sqlite_master
                 WHERE type = 'table' AND name = 'refinery_schema_history'",
                [],
                |row| row.get::<_, i64>(0),
            )
        })
        .await;

    match applied {
        Ok(0) => CheckResult::new(
            "Database",
            CheckStatus::Warn,
            "connected, schema not yet migrated",
            start,
        ),
        Ok(_) => CheckResult::new("Database", CheckStatus::Pass, "connected", start),
        Err(e) => CheckResult::new("Database", CheckStatus::Fail, format!("query failed: {e}"), start),
    }
}

/// Check the vault key decodes and survives an encrypt/decrypt self-test.
fn check_encryption_key(config: &FlowtabConfig) -> CheckResult {
    let start = Instant::now();
    let Some(key) = config.vault.encryption_key.as_deref() else {
        return CheckResult::new(
            "Encryption key",
            CheckStatus::Warn,
            "not configured (vault commands unavailable)",
            start,
        );
    };

    let outcome = EncryptionService::from_hex(key).and_then(|svc| {
        let sealed = svc.encrypt("flowtab-self-test")?;
        svc.decrypt(&sealed)
    });
    match outcome {
        Ok(ref value) if value == "flowtab-self-test" => {
            CheckResult::new("Encryption key", CheckStatus::Pass, "AES-256-GCM ready", start)
        }
        Ok(_) => CheckResult::new("Encryption key", CheckStatus::Fail, "self-test mismatch", start),
        Err(e) => CheckResult::new("Encryption key", CheckStatus::Fail, e.to_string(), start),
    }
}

/// Summarize quota and payout settings.
fn check_monetization(config: &FlowtabConfig) -> CheckResult {
    let start = Instant::now();
    let m = &config.monetization;
    let policy = match m.over_quota {
        OverQuotaPolicy::Record => "record uncounted",
        OverQuotaPolicy::Reject => "reject",
    };
    CheckResult::new(
        "Monetization",
        CheckStatus::Pass,
        format!(
            "{} copies/month at {} each, over quota: {policy}",
            m.monthly_copy_cap,
            format_cents(m.payout_rate_cents)
        ),
        start,
    )
}

/// Deep check: SQLite integrity check.
async fn check_db_integrity(db_path: &str) -> CheckResult {
    let start = Instant::now();
    if !std::path::Path::new(db_path).exists() {
        return CheckResult::new(
            "DB integrity",
            CheckStatus::Warn,
            "database not found (skipped)",
            start,
        );
    }

    let conn = match tokio_rusqlite::Connection::open(db_path).await {
        Ok(conn) => conn,
        Err(e) => {
            return CheckResult::new("DB integrity", CheckStatus::Fail, format!("open failed: {e}"), start);
        }
    };
    let result: Result<Vec<String>, tokio_rusqlite::Error> = conn
        .call(|conn| {
            let mut stmt = conn.prepare("PRAGMA integrity_check")?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            rows.collect()
        })
        .await;

    match result {
        Ok(rows) if rows.len() == 1 && rows[0] == "ok" => {
            CheckResult::new("DB integrity", CheckStatus::Pass, "ok", start)
        }
        Ok(rows) => CheckResult::new(
            "DB integrity",
            CheckStatus::Fail,
            format!("{} issue(s) found", rows.len()),
            start,
        ),
        Err(e) => CheckResult::new("DB integrity", CheckStatus::Fail, format!("check failed: {e}"), start),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowtab_config::model::VaultConfig;

    #[test]
    fn check_status_equality() {
        assert_eq!(CheckStatus::Pass, CheckStatus::Pass);
        assert_ne!(CheckStatus::Pass, CheckStatus::Fail);
    }

    #[test]
    fn plain_line_has_tag_and_name() {
        let result = CheckResult::new("Database", CheckStatus::Warn, "missing", Instant::now());
        let line = format_line(&result, false);
        assert!(line.contains("[WARN]"));
        assert!(line.contains("Database"));
        assert!(line.contains("missing"));
    }

    #[tokio::test]
    async fn check_database_missing_warns() {
        let result = check_database("/nonexistent/path/flowtab.db").await;
        assert_eq!(result.status, CheckStatus::Warn);
    }

    #[tokio::test]
    async fn check_database_passes_after_migration() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("check.db");
        let path = path.to_str().unwrap();
        flowtab_storage::Database::open(path)
            .await
            .unwrap()
            .close()
            .await
            .unwrap();
        assert_eq!(check_database(path).await.status, CheckStatus::Pass);
        assert_eq!(check_db_integrity(path).await.status, CheckStatus::Pass);
    }

    #[test]
    fn encryption_key_checks() {
        let mut config = FlowtabConfig::default();
        assert_eq!(check_encryption_key(&config).status, CheckStatus::Warn);

        config.vault = VaultConfig {
            encryption_key: Some("ab".repeat(32)),
        };
        assert_eq!(check_encryption_key(&config).status, CheckStatus::Pass);

        config.vault = VaultConfig {
            encryption_key: Some("ab".repeat(16)),
        };
        let result = check_encryption_key(&config);
        assert_eq!(result.status, CheckStatus::Fail);
        assert!(!result.message.contains(&"ab".repeat(16)));
    }

    #[test]
    fn monetization_summary_mentions_rate() {
        let result = check_monetization(&FlowtabConfig::default());
        assert!(result.message.contains("100 copies/month"));
        assert!(result.message.contains("$0.07"));
    }
}
