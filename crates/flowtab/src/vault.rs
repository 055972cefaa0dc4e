// SPDX-FileCopyrightText: 2026 Flowtab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `flowtab vault` command implementation.

use std::io::{IsTerminal, Read};

use flowtab_config::model::FlowtabConfig;
use flowtab_core::{AccountConnection, FlowtabError};
use flowtab_vault::generate_key_hex;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::warn;

use crate::app::{App, encryption_from_config, render_json};

/// Print a fresh 64-hex-character key.
pub fn run_keygen() -> Result<(), FlowtabError> {
    println!("{}", generate_key_hex()?);
    eprintln!("Store this as vault.encryption_key or FLOWTAB_VAULT_ENCRYPTION_KEY.");
    Ok(())
}

/// Encrypt a secret with the configured key and print the stored form.
///
/// Without an argument, or with `-`, the secret is read from stdin: a hidden
/// prompt on a terminal, otherwise everything piped in.
pub fn run_encrypt(config: &FlowtabConfig, plaintext: Option<&str>) -> Result<(), FlowtabError> {
    let service = encryption_from_config(config)?;
    let secret = match plaintext {
        Some(value) if value != "-" => {
            warn!("secret passed as an argument; prefer stdin to keep it out of shell history");
            SecretString::from(value.to_string())
        }
        _ => read_secret_from_stdin()?,
    };
    println!("{}", service.encrypt(secret.expose_secret())?);
    Ok(())
}

fn read_secret_from_stdin() -> Result<SecretString, FlowtabError> {
    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        eprint!("Secret to encrypt: ");
        let secret = rpassword::read_password()
            .map_err(|e| FlowtabError::Validation(format!("failed to read secret: {e}")))?;
        return Ok(SecretString::from(secret));
    }
    read_secret(stdin.lock())
}

/// Read a piped secret, dropping one trailing line ending.
fn read_secret(mut reader: impl Read) -> Result<SecretString, FlowtabError> {
    let mut buf = String::new();
    reader
        .read_to_string(&mut buf)
        .map_err(|e| FlowtabError::Validation(format!("failed to read secret from stdin: {e}")))?;
    if buf.ends_with('\n') {
        buf.pop();
        if buf.ends_with('\r') {
            buf.pop();
        }
    }
    Ok(SecretString::from(buf))
}

/// Decrypt a stored secret with the configured key.
pub fn run_decrypt(config: &FlowtabConfig, encoded: &str) -> Result<(), FlowtabError> {
    let service = encryption_from_config(config)?;
    println!("{}", service.decrypt(encoded.trim())?);
    Ok(())
}

/// One row of `vault connections` output.
#[derive(Debug, Serialize)]
pub struct ConnectionReport {
    #[serde(flatten)]
    pub connection: AccountConnection,
    /// Whether every stored credential decrypts under the configured key.
    pub readable: bool,
}

/// List a user's connections and check their credentials decrypt.
///
/// Only readability is reported; plaintext never reaches stdout.
pub async fn run_connections(
    app: &App,
    config: &FlowtabConfig,
    user_id: &str,
    json: bool,
) -> Result<(), FlowtabError> {
    let vault = app.vault(config)?;
    let mut reports = Vec::new();
    for connection in vault.list_connections(user_id).await? {
        let readable = match vault.credentials(user_id, &connection.id).await {
            Ok(_) => true,
            Err(FlowtabError::CredentialUnavailable) => false,
            Err(e) => return Err(e),
        };
        reports.push(ConnectionReport {
            connection,
            readable,
        });
    }

    if json {
        println!("{}", render_json(&reports)?);
        return Ok(());
    }

    if reports.is_empty() {
        println!("no connections for {user_id}");
        return Ok(());
    }
    for report in &reports {
        let c = &report.connection;
        println!(
            "{}  {:<12} {:<8} {:<8} {}{}",
            c.id,
            c.provider_id,
            c.connection_type.to_string(),
            c.status.to_string(),
            c.label,
            if report.readable { "" } else { "  (credentials unreadable)" },
        );
    }
    Ok(())
}
