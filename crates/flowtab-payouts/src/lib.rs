// SPDX-FileCopyrightText: 2026 Flowtab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Copy tracking and creator payouts for the Flowtab marketplace.
//!
//! This crate provides:
//! - **Copy ledger**: append-only record of flow copies, one per user, flow
//!   and billing month
//! - **Quota policy**: per-user monthly cap on copies that earn creators money
//! - **Payout engine**: idempotent per-creator monthly aggregation and the
//!   payout status lifecycle
//! - **Services**: the copy and earnings operations exposed to callers

pub mod billing;
pub mod engine;
pub mod ledger;
pub mod pricing;
pub mod quota;
pub mod service;

pub use billing::{billing_month_start, current_billing_month};
pub use engine::PayoutEngine;
pub use ledger::CopyLedger;
pub use quota::QuotaPolicy;
pub use service::{CopyReceipt, CopyService, EarningsService, EarningsSummary, MonthlyEarnings};
