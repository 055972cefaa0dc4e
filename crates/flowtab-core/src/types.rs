// SPDX-FileCopyrightText: 2026 Flowtab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the storage, vault, and payout crates.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::clock::Clock;
use crate::error::FlowtabError;

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// A UTC calendar month, identified by its first day.
///
/// This is the only value used to decide whether two copy events fall in the
/// same month. Construct it from a moment with [`BillingMonth::containing`].
/// Deserialized dates are truncated to the first of their month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "NaiveDate", into = "NaiveDate")]
pub struct BillingMonth(NaiveDate);

impl BillingMonth {
    /// The billing month that contains `moment` (interpreted in UTC).
    pub fn containing(moment: DateTime<Utc>) -> Self {
        let date = moment.date_naive();
        Self(date - Days::new(u64::from(date.day0())))
    }

    /// The current billing month according to `clock`.
    pub fn current(clock: &dyn Clock) -> Self {
        Self::containing(clock.now())
    }

    /// Build a billing month from a year and a 1-based month number.
    pub fn from_ym(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(Self)
    }

    /// The first calendar day of the month.
    pub fn first_day(&self) -> NaiveDate {
        self.0
    }

    /// Midnight UTC on the first day of the month.
    pub fn start(&self) -> DateTime<Utc> {
        self.0.and_time(NaiveTime::MIN).and_utc()
    }

    /// The following billing month.
    pub fn next(&self) -> Self {
        Self(self.0 + Months::new(1))
    }

    /// The preceding billing month.
    pub fn previous(&self) -> Self {
        Self(self.0 - Months::new(1))
    }

    /// Short `YYYY-MM` label for display.
    pub fn label(&self) -> String {
        self.0.format("%Y-%m").to_string()
    }
}

impl From<NaiveDate> for BillingMonth {
    fn from(date: NaiveDate) -> Self {
        Self(date - Days::new(u64::from(date.day0())))
    }
}

impl From<BillingMonth> for NaiveDate {
    fn from(month: BillingMonth) -> Self {
        month.0
    }
}

impl fmt::Display for BillingMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for BillingMonth {
    type Err = FlowtabError;

    /// Accepts `YYYY-MM` or `YYYY-MM-DD`; a full date is truncated to its month.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Ok(Self::from(date));
        }
        NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d")
            .map(Self)
            .map_err(|_| {
                FlowtabError::Validation(format!("`{s}` is not a billing month (expected YYYY-MM)"))
            })
    }
}

/// A single copy of a flow by a user. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowCopyEvent {
    /// Unique event identifier (UUID v4).
    pub id: String,
    /// The user who copied the flow.
    pub user_id: String,
    /// The flow that was copied.
    pub flow_id: String,
    /// Owner of the flow at copy time. Never re-derived later.
    pub creator_id: String,
    /// Whether this copy counts toward the user's quota and the creator's payout.
    pub counted_for_payout: bool,
    /// When the copy happened.
    pub copied_at: DateTime<Utc>,
    /// Billing month derived from `copied_at`.
    pub billing_month: BillingMonth,
}

impl FlowCopyEvent {
    /// Build a new event stamped at `copied_at`, with a fresh id.
    pub fn new(
        user_id: impl Into<String>,
        flow_id: impl Into<String>,
        creator_id: impl Into<String>,
        counted_for_payout: bool,
        copied_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            flow_id: flow_id.into(),
            creator_id: creator_id.into(),
            counted_for_payout,
            copied_at,
            billing_month: BillingMonth::containing(copied_at),
        }
    }
}

/// A copy event as the store recorded it under the monthly cap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCopy {
    /// The stored event; `counted_for_payout` is the flag the store decided.
    pub event: FlowCopyEvent,
    /// Counted copies by the user in the event's month, including this one.
    pub counted_this_month: u32,
}

/// Lifecycle state of a creator payout.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PayoutStatus {
    Pending,
    Processing,
    Paid,
    Failed,
}

impl PayoutStatus {
    /// Whether moving from `self` to `next` is a legal lifecycle step.
    ///
    /// `paid` is terminal. A `failed` payout may be retried.
    pub fn can_transition_to(self, next: PayoutStatus) -> bool {
        use PayoutStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Pending, Failed)
                | (Processing, Paid)
                | (Processing, Failed)
                | (Failed, Processing)
        )
    }

    /// Money that is still owed to the creator.
    pub fn is_outstanding(self) -> bool {
        matches!(self, PayoutStatus::Pending | PayoutStatus::Processing)
    }
}

/// Per-creator, per-month payout aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatorPayout {
    pub id: String,
    pub creator_id: String,
    pub billing_month: BillingMonth,
    /// Counted copies of this creator's flows in the month.
    pub copy_count: u32,
    /// `copy_count` times the per-copy rate, in cents.
    pub amount_cents: i64,
    pub status: PayoutStatus,
    /// Reference assigned by the payment processor, if any.
    pub transfer_id: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// How an account connection authenticates against its provider.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    ApiKey,
    Oauth,
    Manual,
}

/// Health of an account connection as last observed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Active,
    Inactive,
    Error,
}

/// A third-party service that users can connect accounts for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub id: String,
    /// Stable machine name, e.g. `openai`.
    pub slug: String,
    pub display_name: String,
    pub supports_api_key: bool,
    pub supports_oauth: bool,
    pub supports_manual: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Provider {
    /// Whether this provider accepts connections of the given type.
    pub fn supports(&self, kind: ConnectionType) -> bool {
        match kind {
            ConnectionType::ApiKey => self.supports_api_key,
            ConnectionType::Oauth => self.supports_oauth,
            ConnectionType::Manual => self.supports_manual,
        }
    }
}

/// A user's linked account at a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountConnection {
    pub id: String,
    pub user_id: String,
    pub provider_id: String,
    pub label: String,
    pub connection_type: ConnectionType,
    pub status: ConnectionStatus,
    pub last_used_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One encrypted credential belonging to a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultItem {
    pub id: String,
    pub connection_id: String,
    /// Credential name, e.g. `api_key`.
    pub key_name: String,
    /// `hex(nonce):hex(tag):hex(ciphertext)`.
    pub encrypted_data: String,
    pub created_at: DateTime<Utc>,
}
