// SPDX-FileCopyrightText: 2026 Flowtab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Flowtab marketplace core.

use thiserror::Error;

use crate::types::{BillingMonth, PayoutStatus};

/// The primary error type used across all Flowtab crates.
///
/// Each variant maps to a stable caller-facing category via
/// [`FlowtabError::status_code`], so transport layers never have to match on
/// message text.
#[derive(Debug, Error)]
pub enum FlowtabError {
    /// Configuration errors (missing or malformed encryption key, bad settings).
    #[error("configuration error: {0}")]
    Config(String),

    /// An encoded secret is not of the form `nonce:tag:ciphertext` in hex.
    #[error("invalid encrypted secret format: {0}")]
    SecretFormat(String),

    /// Authenticated decryption failed: wrong key or tampered data.
    #[error("decryption failed: {message}")]
    Decryption {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The user already copied this flow in the given billing month.
    #[error("user {user_id} already copied flow {flow_id} in billing month {billing_month}")]
    DuplicateCopy {
        user_id: String,
        flow_id: String,
        billing_month: BillingMonth,
    },

    /// The user exhausted the monthly copy cap under the `reject` policy.
    #[error("monthly copy limit of {cap} reached for user {user_id}")]
    QuotaExceeded { user_id: String, cap: u32 },

    /// A referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A payout status change that the lifecycle does not allow.
    #[error("invalid payout transition {from} -> {to}")]
    InvalidTransition { from: PayoutStatus, to: PayoutStatus },

    /// Caller-supplied input failed validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// A stored credential could not be read back. Details are logged, never returned.
    #[error("failed to retrieve credential")]
    CredentialUnavailable,

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl FlowtabError {
    /// Shorthand for a decryption failure without an underlying cause.
    pub fn decryption(message: impl Into<String>) -> Self {
        Self::Decryption {
            message: message.into(),
            source: None,
        }
    }

    /// HTTP-equivalent status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::SecretFormat(_) | Self::Decryption { .. } | Self::Validation(_) => 400,
            Self::NotFound { .. } => 404,
            Self::DuplicateCopy { .. } | Self::InvalidTransition { .. } => 409,
            Self::QuotaExceeded { .. } => 429,
            Self::Config(_)
            | Self::CredentialUnavailable
            | Self::Storage { .. }
            | Self::Internal(_) => 500,
        }
    }

    /// Whether the caller can fix this error by changing the request.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}
