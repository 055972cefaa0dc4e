// SPDX-FileCopyrightText: 2026 Flowtab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Caller-facing operations: copying a flow and reading earnings.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use flowtab_config::model::MonetizationConfig;
use flowtab_core::{BillingMonth, Clock, FlowtabError, MarketplaceStore, PayoutStatus};
use serde::{Deserialize, Serialize};

use crate::engine::PayoutEngine;
use crate::ledger::CopyLedger;
use crate::quota::QuotaPolicy;

/// Result of a successful copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyReceipt {
    pub event_id: String,
    pub counted: bool,
    /// Counted copies by the user this month, including this one.
    pub copies_this_month: u32,
    pub copies_remaining: u32,
    /// Cents this copy earned the creator (the rate, or 0).
    pub payout_earned_cents: i64,
    pub copied_at: DateTime<Utc>,
}

/// Records copies subject to the monthly quota.
pub struct CopyService {
    ledger: CopyLedger,
    quota: QuotaPolicy,
    rate_cents: i64,
}

impl CopyService {
    pub fn new(ledger: CopyLedger, quota: QuotaPolicy, rate_cents: i64) -> Self {
        Self {
            ledger,
            quota,
            rate_cents,
        }
    }

    pub fn from_config(
        store: Arc<dyn MarketplaceStore>,
        clock: Arc<dyn Clock>,
        config: &MonetizationConfig,
    ) -> Self {
        Self::new(
            CopyLedger::new(store, clock),
            QuotaPolicy::from_config(config),
            config.payout_rate_cents,
        )
    }

    pub fn ledger(&self) -> &CopyLedger {
        &self.ledger
    }

    /// Record that `user_id` copied `flow_id`, authored by `creator_id`.
    pub async fn copy_flow(
        &self,
        user_id: &str,
        flow_id: &str,
        creator_id: &str,
    ) -> Result<CopyReceipt, FlowtabError> {
        let recorded = self
            .ledger
            .record_capped_copy(
                user_id,
                flow_id,
                creator_id,
                self.quota.cap(),
                self.quota.rejects_over_cap(),
            )
            .await?;

        let counted = recorded.event.counted_for_payout;
        self.quota
            .observe(user_id, counted, recorded.counted_this_month);
        Ok(CopyReceipt {
            event_id: recorded.event.id,
            counted,
            copies_this_month: recorded.counted_this_month,
            copies_remaining: self.quota.remaining(recorded.counted_this_month),
            payout_earned_cents: if counted { self.rate_cents } else { 0 },
            copied_at: recorded.event.copied_at,
        })
    }
}

/// One month in a creator's earnings history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyEarnings {
    pub billing_month: BillingMonth,
    pub copy_count: u32,
    pub amount_cents: i64,
    pub status: PayoutStatus,
    pub paid_at: Option<DateTime<Utc>>,
}

/// A creator's earnings overview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarningsSummary {
    /// Owed but not yet paid.
    pub account_balance_cents: i64,
    /// Paid out so far.
    pub total_earnings_cents: i64,
    pub monthly_breakdown: Vec<MonthlyEarnings>,
}

/// Read side of creator payouts.
pub struct EarningsService {
    engine: Arc<PayoutEngine>,
    history_limit: u32,
}

impl EarningsService {
    pub fn new(engine: Arc<PayoutEngine>, history_limit: u32) -> Self {
        Self {
            engine,
            history_limit,
        }
    }

    pub async fn my_earnings(&self, creator_id: &str) -> Result<EarningsSummary, FlowtabError> {
        let payouts = self
            .engine
            .payouts_for_creator(creator_id, self.history_limit)
            .await?;
        Ok(EarningsSummary {
            account_balance_cents: self.engine.outstanding_balance(creator_id).await?,
            total_earnings_cents: self.engine.get_total_earnings(creator_id).await?,
            monthly_breakdown: payouts
                .into_iter()
                .map(|p| MonthlyEarnings {
                    billing_month: p.billing_month,
                    copy_count: p.copy_count,
                    amount_cents: p.amount_cents,
                    status: p.status,
                    paid_at: p.paid_at,
                })
                .collect(),
        })
    }
}
