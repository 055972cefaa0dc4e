// SPDX-FileCopyrightText: 2026 Flowtab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Monthly copy quota.
//!
//! Each user may make `monthly_copy_cap` counted copies per billing month.
//! Under the default `record` policy, later copies are still recorded but
//! do not earn the creator anything. Under `reject` they fail with
//! [`FlowtabError::QuotaExceeded`]. The store applies the cap atomically
//! with the insert; this policy carries the settings and logs a
//! `tracing::warn` once a user passes 80% of the cap.

use flowtab_config::model::{MonetizationConfig, OverQuotaPolicy};
use tracing::warn;

/// Cap enforcement for counted copies.
#[derive(Debug, Clone)]
pub struct QuotaPolicy {
    cap: u32,
    over_quota: OverQuotaPolicy,
}

impl QuotaPolicy {
    pub fn new(cap: u32, over_quota: OverQuotaPolicy) -> Self {
        Self { cap, over_quota }
    }

    pub fn from_config(config: &MonetizationConfig) -> Self {
        Self::new(config.monthly_copy_cap, config.over_quota)
    }

    pub fn cap(&self) -> u32 {
        self.cap
    }

    /// Whether copies past the cap are refused instead of recorded uncounted.
    pub fn rejects_over_cap(&self) -> bool {
        self.over_quota == OverQuotaPolicy::Reject
    }

    /// Log quota state after a copy was recorded.
    pub fn observe(&self, user_id: &str, counted: bool, counted_this_month: u32) {
        if !counted {
            warn!(
                user_id = %user_id,
                counted = counted_this_month,
                cap = self.cap,
                "monthly copy cap reached"
            );
        } else if u64::from(counted_this_month) * 5 >= u64::from(self.cap) * 4 {
            warn!(
                user_id = %user_id,
                counted = counted_this_month,
                cap = self.cap,
                "approaching monthly copy cap (80%+)"
            );
        }
    }

    /// Copies left this month after `counted` counted copies.
    pub fn remaining(&self, counted: u32) -> u32 {
        self.cap.saturating_sub(counted)
    }
}
