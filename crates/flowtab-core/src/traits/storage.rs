// SPDX-FileCopyrightText: 2026 Flowtab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence trait for copy events, payouts, and credential connections.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::FlowtabError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    AccountConnection, BillingMonth, ConnectionStatus, CreatorPayout, FlowCopyEvent,
    PayoutStatus, Provider, RecordedCopy, VaultItem,
};

/// Adapter for the marketplace's persistent store.
///
/// Implementations must enforce uniqueness of `(user_id, flow_id,
/// billing_month)` for copy events and of `(creator_id, billing_month)` for
/// payouts at the storage level. Callers rely on those constraints, not on
/// read-then-write checks, for correctness under concurrency.
#[async_trait]
pub trait MarketplaceStore: PluginAdapter {
    /// Initializes the storage backend (migrations, connection, etc.).
    async fn initialize(&self) -> Result<(), FlowtabError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), FlowtabError>;

    // --- Copy events ---

    /// Whether any event (counted or not) exists for the triple.
    async fn copy_exists(
        &self,
        user_id: &str,
        flow_id: &str,
        month: BillingMonth,
    ) -> Result<bool, FlowtabError>;

    /// Number of counted events for the user in the month.
    async fn count_counted_copies(
        &self,
        user_id: &str,
        month: BillingMonth,
    ) -> Result<u32, FlowtabError>;

    /// Insert an event. A uniqueness conflict is reported as
    /// [`FlowtabError::DuplicateCopy`].
    async fn insert_copy(&self, event: &FlowCopyEvent) -> Result<(), FlowtabError>;

    /// Insert an event whose `counted_for_payout` flag is decided by the
    /// store: counted while the user has fewer than `cap` counted events in
    /// the month. The count and the insert are one atomic step.
    ///
    /// With `reject_over_cap`, an event that would be uncounted is not
    /// stored and [`FlowtabError::QuotaExceeded`] is returned instead. A
    /// uniqueness conflict is reported as [`FlowtabError::DuplicateCopy`].
    async fn insert_copy_within_cap(
        &self,
        event: &FlowCopyEvent,
        cap: u32,
        reject_over_cap: bool,
    ) -> Result<RecordedCopy, FlowtabError>;

    /// All events for the user in the month, newest first.
    async fn list_copies(
        &self,
        user_id: &str,
        month: BillingMonth,
    ) -> Result<Vec<FlowCopyEvent>, FlowtabError>;

    async fn get_copy(&self, id: &str) -> Result<Option<FlowCopyEvent>, FlowtabError>;

    /// Number of counted events attributed to the creator in the month.
    async fn count_creator_copies(
        &self,
        creator_id: &str,
        month: BillingMonth,
    ) -> Result<u32, FlowtabError>;

    /// Creators with at least one counted event in the month.
    async fn creators_with_copies(&self, month: BillingMonth) -> Result<Vec<String>, FlowtabError>;

    // --- Payouts ---

    /// Return the payout for the pair, inserting a zeroed `pending` row first
    /// if none exists. Safe under concurrent calls.
    async fn get_or_create_payout(
        &self,
        creator_id: &str,
        month: BillingMonth,
        now: DateTime<Utc>,
    ) -> Result<CreatorPayout, FlowtabError>;

    /// Overwrite the totals of a payout that is not yet `paid`.
    ///
    /// Returns `false` when the payout is `paid` and was left untouched.
    async fn set_payout_totals(
        &self,
        payout_id: &str,
        copy_count: u32,
        amount_cents: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, FlowtabError>;

    async fn get_payout(&self, payout_id: &str) -> Result<Option<CreatorPayout>, FlowtabError>;

    /// Set status, recording `transfer_id` when given and stamping `paid_at`
    /// when the new status is `paid`.
    async fn set_payout_status(
        &self,
        payout_id: &str,
        status: PayoutStatus,
        transfer_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), FlowtabError>;

    /// Most recent payouts for the creator, newest month first.
    async fn list_payouts(
        &self,
        creator_id: &str,
        limit: u32,
    ) -> Result<Vec<CreatorPayout>, FlowtabError>;

    /// Sum of `amount_cents` over the creator's payouts in any of `statuses`.
    async fn sum_payouts(
        &self,
        creator_id: &str,
        statuses: &[PayoutStatus],
    ) -> Result<i64, FlowtabError>;

    // --- Providers and connections ---

    async fn upsert_provider(&self, provider: &Provider) -> Result<(), FlowtabError>;

    async fn get_provider(&self, id: &str) -> Result<Option<Provider>, FlowtabError>;

    async fn list_providers(&self, active_only: bool) -> Result<Vec<Provider>, FlowtabError>;

    /// Insert a connection together with its vault items and optional manual
    /// configuration, atomically.
    async fn create_connection(
        &self,
        connection: &AccountConnection,
        items: &[VaultItem],
        manual_config: Option<&str>,
    ) -> Result<(), FlowtabError>;

    async fn get_connection(&self, id: &str) -> Result<Option<AccountConnection>, FlowtabError>;

    async fn list_connections(&self, user_id: &str) -> Result<Vec<AccountConnection>, FlowtabError>;

    async fn vault_items(&self, connection_id: &str) -> Result<Vec<VaultItem>, FlowtabError>;

    async fn manual_config(&self, connection_id: &str) -> Result<Option<String>, FlowtabError>;

    /// Delete a connection and everything it owns. Returns `false` if absent.
    async fn delete_connection(&self, id: &str) -> Result<bool, FlowtabError>;

    async fn update_connection_status(
        &self,
        id: &str,
        status: ConnectionStatus,
        last_error: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), FlowtabError>;

    /// Record a successful use: stamps `last_used_at`, marks the connection
    /// active, and clears `last_error`.
    async fn touch_connection(&self, id: &str, now: DateTime<Utc>) -> Result<(), FlowtabError>;
}
