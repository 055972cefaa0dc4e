// SPDX-FileCopyrightText: 2026 Flowtab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Creator payout queries.

use chrono::{DateTime, NaiveDate, Utc};
use flowtab_core::{BillingMonth, CreatorPayout, FlowtabError, PayoutStatus};
use rusqlite::params;

use crate::database::Database;
use crate::queries::parse_column;

const PAYOUT_COLUMNS: &str = "id, creator_id, billing_month, copy_count, amount_cents, status, \
     transfer_id, paid_at, created_at, updated_at";

fn payout_from_row(row: &rusqlite::Row<'_>) -> Result<CreatorPayout, rusqlite::Error> {
    Ok(CreatorPayout {
        id: row.get(0)?,
        creator_id: row.get(1)?,
        billing_month: BillingMonth::from(row.get::<_, NaiveDate>(2)?),
        copy_count: row.get(3)?,
        amount_cents: row.get(4)?,
        status: parse_column(5, row.get(5)?)?,
        transfer_id: row.get(6)?,
        paid_at: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn not_found(id: &str) -> FlowtabError {
    FlowtabError::NotFound {
        entity: "payout",
        id: id.to_string(),
    }
}

/// Return the payout for `(creator_id, month)`, creating a zeroed `pending`
/// row first if none exists.
///
/// Uses `ON CONFLICT DO NOTHING` so concurrent callers converge on one row.
pub async fn get_or_create_payout(
    db: &Database,
    creator_id: &str,
    month: BillingMonth,
    now: DateTime<Utc>,
) -> Result<CreatorPayout, FlowtabError> {
    let creator_id = creator_id.to_string();
    let new_id = uuid::Uuid::new_v4().to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO creator_payouts
                 (id, creator_id, billing_month, copy_count, amount_cents, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, 0, 0, 'pending', ?4, ?4)
                 ON CONFLICT (creator_id, billing_month) DO NOTHING",
                params![new_id, creator_id, month.first_day(), now],
            )?;
            conn.query_row(
                &format!(
                    "SELECT {PAYOUT_COLUMNS} FROM creator_payouts
                     WHERE creator_id = ?1 AND billing_month = ?2"
                ),
                params![creator_id, month.first_day()],
                payout_from_row,
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Overwrite copy count and amount unless the payout is already `paid`.
///
/// Returns `Ok(false)` when the row is `paid` and was left as is.
pub async fn set_payout_totals(
    db: &Database,
    payout_id: &str,
    copy_count: u32,
    amount_cents: i64,
    now: DateTime<Utc>,
) -> Result<bool, FlowtabError> {
    let id = payout_id.to_string();
    let outcome = db
        .connection()
        .call(move |conn| -> Result<Option<bool>, rusqlite::Error> {
            let changed = conn.execute(
                "UPDATE creator_payouts
                 SET copy_count = ?2, amount_cents = ?3, updated_at = ?4
                 WHERE id = ?1 AND status != 'paid'",
                params![id, copy_count, amount_cents, now],
            )?;
            if changed > 0 {
                return Ok(Some(true));
            }
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM creator_payouts WHERE id = ?1)",
                params![id],
                |row| row.get(0),
            )?;
            Ok(exists.then_some(false))
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    outcome.ok_or_else(|| not_found(payout_id))
}

/// Fetch a payout by ID.
pub async fn get_payout(db: &Database, payout_id: &str) -> Result<Option<CreatorPayout>, FlowtabError> {
    let id = payout_id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!("SELECT {PAYOUT_COLUMNS} FROM creator_payouts WHERE id = ?1"),
                params![id],
                payout_from_row,
            );
            match result {
                Ok(payout) => Ok(Some(payout)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Set the payout status. A given transfer id is always recorded; `paid`
/// stamps `paid_at`.
pub async fn set_payout_status(
    db: &Database,
    payout_id: &str,
    status: PayoutStatus,
    transfer_id: Option<&str>,
    now: DateTime<Utc>,
) -> Result<(), FlowtabError> {
    let id = payout_id.to_string();
    let status_str = status.to_string();
    let transfer_id = transfer_id.map(str::to_string);
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE creator_payouts
                 SET status = ?2,
                     transfer_id = COALESCE(?3, transfer_id),
                     paid_at = CASE WHEN ?2 = 'paid' THEN ?4 ELSE paid_at END,
                     updated_at = ?4
                 WHERE id = ?1",
                params![id, status_str, transfer_id, now],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    if changed == 0 {
        return Err(not_found(payout_id));
    }
    Ok(())
}

/// The creator's most recent payouts, newest billing month first.
pub async fn list_payouts(
    db: &Database,
    creator_id: &str,
    limit: u32,
) -> Result<Vec<CreatorPayout>, FlowtabError> {
    let creator_id = creator_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PAYOUT_COLUMNS} FROM creator_payouts
                 WHERE creator_id = ?1
                 ORDER BY billing_month DESC
                 LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![creator_id, limit], payout_from_row)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Sum of `amount_cents` over the creator's payouts whose status is in `statuses`.
pub async fn sum_payouts(
    db: &Database,
    creator_id: &str,
    statuses: &[PayoutStatus],
) -> Result<i64, FlowtabError> {
    if statuses.is_empty() {
        return Ok(0);
    }
    let placeholders = vec!["?"; statuses.len()].join(", ");
    let sql = format!(
        "SELECT COALESCE(SUM(amount_cents), 0) FROM creator_payouts
         WHERE creator_id = ? AND status IN ({placeholders})"
    );
    let values: Vec<String> = std::iter::once(creator_id.to_string())
        .chain(statuses.iter().map(|s| s.to_string()))
        .collect();
    db.connection()
        .call(move |conn| {
            conn.query_row(&sql, rusqlite::params_from_iter(values.iter()), |row| {
                row.get(0)
            })
        })
        .await
        .map_err(crate::database::map_tr_err)
}
