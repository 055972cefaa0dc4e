// SPDX-FileCopyrightText: 2026 Flowtab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-creator monthly payout aggregation.
//!
//! A payout row is derived state: [`PayoutEngine::recompute_payout`] always
//! writes absolute totals counted from the copy log, so it can be re-run any
//! number of times. Rows already marked `paid` are never rewritten.

use std::sync::Arc;

use flowtab_core::{
    BillingMonth, Clock, CreatorPayout, FlowtabError, MarketplaceStore, PayoutStatus,
};
use tracing::{debug, info, warn};

use crate::pricing::payout_amount_cents;

/// Creator payout aggregation and lifecycle.
pub struct PayoutEngine {
    store: Arc<dyn MarketplaceStore>,
    clock: Arc<dyn Clock>,
    rate_cents: i64,
}

impl PayoutEngine {
    pub fn new(store: Arc<dyn MarketplaceStore>, clock: Arc<dyn Clock>, rate_cents: i64) -> Self {
        Self {
            store,
            clock,
            rate_cents,
        }
    }

    /// Cents earned by a creator per counted copy.
    pub fn rate_cents(&self) -> i64 {
        self.rate_cents
    }

    /// The payout for the pair, created zeroed and `pending` if missing.
    pub async fn get_or_create_payout(
        &self,
        creator_id: &str,
        month: BillingMonth,
    ) -> Result<CreatorPayout, FlowtabError> {
        self.store
            .get_or_create_payout(creator_id, month, self.clock.now())
            .await
    }

    /// Set the payout's totals from the counted copies in the month.
    pub async fn recompute_payout(
        &self,
        creator_id: &str,
        month: BillingMonth,
    ) -> Result<CreatorPayout, FlowtabError> {
        let payout = self.get_or_create_payout(creator_id, month).await?;
        let copy_count = self.store.count_creator_copies(creator_id, month).await?;
        let amount_cents = payout_amount_cents(copy_count, self.rate_cents)?;

        let updated = self
            .store
            .set_payout_totals(&payout.id, copy_count, amount_cents, self.clock.now())
            .await?;
        if !updated {
            if payout.copy_count != copy_count {
                warn!(
                    payout_id = %payout.id,
                    creator_id = %creator_id,
                    stored = payout.copy_count,
                    counted = copy_count,
                    "paid payout differs from copy log, leaving it unchanged"
                );
            }
            return Ok(payout);
        }

        debug!(
            creator_id = %creator_id,
            billing_month = %month.label(),
            copy_count,
            amount_cents,
            "payout recomputed"
        );
        self.store
            .get_payout(&payout.id)
            .await?
            .ok_or_else(|| FlowtabError::NotFound {
                entity: "payout",
                id: payout.id.clone(),
            })
    }

    /// Recompute the payout of every creator with counted copies in the month.
    pub async fn aggregate_month(
        &self,
        month: BillingMonth,
    ) -> Result<Vec<CreatorPayout>, FlowtabError> {
        let creators = self.store.creators_with_copies(month).await?;
        let mut payouts = Vec::with_capacity(creators.len());
        for creator_id in &creators {
            payouts.push(self.recompute_payout(creator_id, month).await?);
        }
        let total: i64 = payouts.iter().map(|p| p.amount_cents).sum();
        info!(
            billing_month = %month.label(),
            creators = payouts.len(),
            total_cents = total,
            "monthly payouts aggregated"
        );
        Ok(payouts)
    }

    /// Move a payout to `status`, recording `transfer_id` when given.
    pub async fn update_payout_status(
        &self,
        payout_id: &str,
        status: PayoutStatus,
        transfer_id: Option<&str>,
    ) -> Result<CreatorPayout, FlowtabError> {
        let current = self
            .store
            .get_payout(payout_id)
            .await?
            .ok_or_else(|| FlowtabError::NotFound {
                entity: "payout",
                id: payout_id.to_string(),
            })?;

        if !current.status.can_transition_to(status) {
            warn!(
                payout_id = %payout_id,
                from = %current.status,
                to = %status,
                "rejected payout transition"
            );
            return Err(FlowtabError::InvalidTransition {
                from: current.status,
                to: status,
            });
        }

        self.store
            .set_payout_status(payout_id, status, transfer_id, self.clock.now())
            .await?;
        info!(
            payout_id = %payout_id,
            creator_id = %current.creator_id,
            from = %current.status,
            to = %status,
            transfer_id = ?transfer_id,
            "payout status updated"
        );

        self.store
            .get_payout(payout_id)
            .await?
            .ok_or_else(|| FlowtabError::NotFound {
                entity: "payout",
                id: payout_id.to_string(),
            })
    }

    /// Recent payouts for the creator, newest month first.
    pub async fn payouts_for_creator(
        &self,
        creator_id: &str,
        limit: u32,
    ) -> Result<Vec<CreatorPayout>, FlowtabError> {
        self.store.list_payouts(creator_id, limit).await
    }

    /// Lifetime earnings: the sum over `paid` payouts only.
    pub async fn get_total_earnings(&self, creator_id: &str) -> Result<i64, FlowtabError> {
        self.store
            .sum_payouts(creator_id, &[PayoutStatus::Paid])
            .await
    }

    /// Money still owed: `pending` and `processing` payouts.
    pub async fn outstanding_balance(&self, creator_id: &str) -> Result<i64, FlowtabError> {
        self.store
            .sum_payouts(creator_id, &[PayoutStatus::Pending, PayoutStatus::Processing])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use flowtab_config::model::StorageConfig;
    use flowtab_core::{FixedClock, FlowCopyEvent};
    use flowtab_storage::{Database, SqliteStorage};

    async fn setup() -> (PayoutEngine, Arc<dyn MarketplaceStore>) {
        let store: Arc<dyn MarketplaceStore> = Arc::new(SqliteStorage::with_database(
            StorageConfig::default(),
            Database::open_in_memory().await.unwrap(),
        ));
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2026, 2, 3, 9, 0, 0).unwrap(),
        ));
        (PayoutEngine::new(store.clone(), clock, 7), store)
    }

    fn jan() -> BillingMonth {
        BillingMonth::from_ym(2026, 1).unwrap()
    }

    async fn copy(store: &Arc<dyn MarketplaceStore>, user: &str, flow: &str, creator: &str, counted: bool) {
        let at = Utc.with_ymd_and_hms(2026, 1, 20, 12, 0, 0).unwrap();
        store
            .insert_copy(&FlowCopyEvent::new(user, flow, creator, counted, at))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn fresh_payout_is_zeroed_pending() {
        let (engine, _store) = setup().await;
        let payout = engine.get_or_create_payout("bob", jan()).await.unwrap();
        assert_eq!(payout.copy_count, 0);
        assert_eq!(payout.amount_cents, 0);
        assert_eq!(payout.status, PayoutStatus::Pending);

        let again = engine.get_or_create_payout("bob", jan()).await.unwrap();
        assert_eq!(again.id, payout.id);
    }

    #[tokio::test]
    async fn recompute_is_idempotent() {
        let (engine, store) = setup().await;
        copy(&store, "alice", "F1", "bob", true).await;
        copy(&store, "carol", "F1", "bob", true).await;
        copy(&store, "dave", "F1", "bob", false).await;

        let first = engine.recompute_payout("bob", jan()).await.unwrap();
        let second = engine.recompute_payout("bob", jan()).await.unwrap();
        assert_eq!(first.copy_count, 2);
        assert_eq!(first.amount_cents, 14);
        assert_eq!(second.copy_count, first.copy_count);
        assert_eq!(second.amount_cents, first.amount_cents);
    }

    #[tokio::test]
    async fn aggregate_month_covers_each_creator() {
        let (engine, store) = setup().await;
        copy(&store, "alice", "F1", "bob", true).await;
        copy(&store, "alice", "F2", "carol", true).await;
        copy(&store, "dave", "F2", "carol", true).await;

        let payouts = engine.aggregate_month(jan()).await.unwrap();
        assert_eq!(payouts.len(), 2);
        assert_eq!(payouts[0].creator_id, "bob");
        assert_eq!(payouts[0].amount_cents, 7);
        assert_eq!(payouts[1].creator_id, "carol");
        assert_eq!(payouts[1].amount_cents, 14);
    }

    #[tokio::test]
    async fn status_lifecycle_and_earnings() {
        let (engine, store) = setup().await;
        copy(&store, "alice", "F1", "bob", true).await;
        let payout = engine.recompute_payout("bob", jan()).await.unwrap();
        assert_eq!(engine.get_total_earnings("bob").await.unwrap(), 0);
        assert_eq!(engine.outstanding_balance("bob").await.unwrap(), 7);

        let err = engine
            .update_payout_status(&payout.id, PayoutStatus::Paid, None)
            .await
            .unwrap_err();
        assert!(matches!(err, FlowtabError::InvalidTransition { .. }));

        engine
            .update_payout_status(&payout.id, PayoutStatus::Processing, Some("tr_123"))
            .await
            .unwrap();
        let paid = engine
            .update_payout_status(&payout.id, PayoutStatus::Paid, None)
            .await
            .unwrap();
        assert_eq!(paid.status, PayoutStatus::Paid);
        assert_eq!(paid.transfer_id.as_deref(), Some("tr_123"));
        assert!(paid.paid_at.is_some());
        assert_eq!(engine.get_total_earnings("bob").await.unwrap(), 7);
        assert_eq!(engine.outstanding_balance("bob").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn paid_payout_is_not_recomputed() {
        let (engine, store) = setup().await;
        copy(&store, "alice", "F1", "bob", true).await;
        let payout = engine.recompute_payout("bob", jan()).await.unwrap();
        engine
            .update_payout_status(&payout.id, PayoutStatus::Processing, None)
            .await
            .unwrap();
        engine
            .update_payout_status(&payout.id, PayoutStatus::Paid, None)
            .await
            .unwrap();

        copy(&store, "carol", "F1", "bob", true).await;
        let after = engine.recompute_payout("bob", jan()).await.unwrap();
        assert_eq!(after.copy_count, 1);
        assert_eq!(after.amount_cents, 7);
    }

    #[tokio::test]
    async fn unknown_payout_is_not_found() {
        let (engine, _store) = setup().await;
        let err = engine
            .update_payout_status("missing", PayoutStatus::Processing, None)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404);
    }
}
