// SPDX-FileCopyrightText: 2026 Flowtab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Billing month arithmetic.

use chrono::{DateTime, NaiveDate, Utc};
use flowtab_core::{BillingMonth, Clock};

/// First day of the UTC calendar month containing `moment`.
pub fn billing_month_start(moment: DateTime<Utc>) -> NaiveDate {
    BillingMonth::containing(moment).first_day()
}

/// The billing month the clock is currently in.
pub fn current_billing_month(clock: &dyn Clock) -> BillingMonth {
    BillingMonth::current(clock)
}
