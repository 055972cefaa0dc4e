// SPDX-FileCopyrightText: 2026 Flowtab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Creator payout arithmetic. All amounts are integer cents.

use flowtab_core::FlowtabError;

/// Amount owed for `copy_count` counted copies at `rate_cents` each.
pub fn payout_amount_cents(copy_count: u32, rate_cents: i64) -> Result<i64, FlowtabError> {
    i64::from(copy_count)
        .checked_mul(rate_cents)
        .ok_or_else(|| {
            FlowtabError::Internal(format!(
                "payout overflow: {copy_count} copies at {rate_cents} cents"
            ))
        })
}

/// Render cents as a dollar string, e.g. `1234` -> `$12.34`.
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}${}.{:02}", abs / 100, abs % 100)
}
