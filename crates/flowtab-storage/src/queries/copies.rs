// SPDX-FileCopyrightText: 2026 Flowtab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Flow copy event queries. There is no update or delete path.

use chrono::NaiveDate;
use flowtab_core::{BillingMonth, FlowCopyEvent, FlowtabError, RecordedCopy};
use rusqlite::{TransactionBehavior, params};
use tracing::debug;

use crate::database::Database;
use crate::queries::is_unique_violation;

const COPY_COLUMNS: &str =
    "id, user_id, flow_id, creator_id, counted_for_payout, copied_at, billing_month";

fn copy_from_row(row: &rusqlite::Row<'_>) -> Result<FlowCopyEvent, rusqlite::Error> {
    Ok(FlowCopyEvent {
        id: row.get(0)?,
        user_id: row.get(1)?,
        flow_id: row.get(2)?,
        creator_id: row.get(3)?,
        counted_for_payout: row.get(4)?,
        copied_at: row.get(5)?,
        billing_month: BillingMonth::from(row.get::<_, NaiveDate>(6)?),
    })
}

/// Whether the user has any copy of the flow in the month.
pub async fn copy_exists(
    db: &Database,
    user_id: &str,
    flow_id: &str,
    month: BillingMonth,
) -> Result<bool, FlowtabError> {
    let user_id = user_id.to_string();
    let flow_id = flow_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM flow_copies
                 WHERE user_id = ?1 AND flow_id = ?2 AND billing_month = ?3)",
                params![user_id, flow_id, month.first_day()],
                |row| row.get(0),
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Counted copies made by the user in the month.
pub async fn count_counted_copies(
    db: &Database,
    user_id: &str,
    month: BillingMonth,
) -> Result<u32, FlowtabError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| count_counted(conn, &user_id, month))
        .await
        .map_err(crate::database::map_tr_err)
}

fn insert_row(conn: &rusqlite::Connection, row: &FlowCopyEvent) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO flow_copies
         (id, user_id, flow_id, creator_id, counted_for_payout, copied_at, billing_month)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            row.id,
            row.user_id,
            row.flow_id,
            row.creator_id,
            row.counted_for_payout,
            row.copied_at,
            row.billing_month.first_day(),
        ],
    )
}

fn count_counted(
    conn: &rusqlite::Connection,
    user_id: &str,
    month: BillingMonth,
) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT COUNT(*) FROM flow_copies
         WHERE user_id = ?1 AND billing_month = ?2 AND counted_for_payout = 1",
        params![user_id, month.first_day()],
        |row| row.get(0),
    )
}

fn duplicate(event: &FlowCopyEvent) -> FlowtabError {
    debug!(
        user_id = %event.user_id,
        flow_id = %event.flow_id,
        "copy rejected by unique constraint"
    );
    FlowtabError::DuplicateCopy {
        user_id: event.user_id.clone(),
        flow_id: event.flow_id.clone(),
        billing_month: event.billing_month,
    }
}

/// Insert a copy event as given.
///
/// The table's UNIQUE(user_id, flow_id, billing_month) constraint is the
/// authoritative duplicate guard; a violation becomes
/// [`FlowtabError::DuplicateCopy`].
pub async fn insert_copy(db: &Database, event: &FlowCopyEvent) -> Result<(), FlowtabError> {
    let row = event.clone();
    let inserted = db
        .connection()
        .call(move |conn| match insert_row(conn, &row) {
            Ok(_) => Ok(true),
            Err(e) if is_unique_violation(&e) => Ok(false),
            Err(e) => Err(e),
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    if !inserted {
        return Err(duplicate(event));
    }
    Ok(())
}

enum CappedInsert {
    Inserted { counted: bool, counted_after: u32 },
    OverCap,
    Duplicate,
}

/// Count the user's counted copies and insert the event in one
/// `BEGIN IMMEDIATE` transaction, setting `counted_for_payout` to whether
/// the user is still under `cap`.
///
/// With `reject_over_cap`, nothing is written once the cap is reached and
/// [`FlowtabError::QuotaExceeded`] is returned.
pub async fn insert_copy_within_cap(
    db: &Database,
    event: &FlowCopyEvent,
    cap: u32,
    reject_over_cap: bool,
) -> Result<RecordedCopy, FlowtabError> {
    let mut row = event.clone();
    let outcome = db
        .connection()
        .call(move |conn| -> Result<CappedInsert, rusqlite::Error> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let counted_before = count_counted(&tx, &row.user_id, row.billing_month)?;
            let counted = counted_before < cap;
            if !counted && reject_over_cap {
                return Ok(CappedInsert::OverCap);
            }
            row.counted_for_payout = counted;
            match insert_row(&tx, &row) {
                Ok(_) => {}
                Err(e) if is_unique_violation(&e) => return Ok(CappedInsert::Duplicate),
                Err(e) => return Err(e),
            }
            tx.commit()?;
            Ok(CappedInsert::Inserted {
                counted,
                counted_after: counted_before + u32::from(counted),
            })
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    match outcome {
        CappedInsert::Inserted {
            counted,
            counted_after,
        } => {
            let mut stored = event.clone();
            stored.counted_for_payout = counted;
            Ok(RecordedCopy {
                event: stored,
                counted_this_month: counted_after,
            })
        }
        CappedInsert::OverCap => Err(FlowtabError::QuotaExceeded {
            user_id: event.user_id.clone(),
            cap,
        }),
        CappedInsert::Duplicate => Err(duplicate(event)),
    }
}

/// All copies by the user in the month, newest first.
pub async fn list_copies(
    db: &Database,
    user_id: &str,
    month: BillingMonth,
) -> Result<Vec<FlowCopyEvent>, FlowtabError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COPY_COLUMNS} FROM flow_copies
                 WHERE user_id = ?1 AND billing_month = ?2
                 ORDER BY copied_at DESC"
            ))?;
            let rows = stmt.query_map(params![user_id, month.first_day()], copy_from_row)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetch a single copy event by ID.
pub async fn get_copy(db: &Database, id: &str) -> Result<Option<FlowCopyEvent>, FlowtabError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!("SELECT {COPY_COLUMNS} FROM flow_copies WHERE id = ?1"),
                params![id],
                copy_from_row,
            );
            match result {
                Ok(event) => Ok(Some(event)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Counted copies of the creator's flows in the month.
pub async fn count_creator_copies(
    db: &Database,
    creator_id: &str,
    month: BillingMonth,
) -> Result<u32, FlowtabError> {
    let creator_id = creator_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM flow_copies
                 WHERE creator_id = ?1 AND billing_month = ?2 AND counted_for_payout = 1",
                params![creator_id, month.first_day()],
                |row| row.get(0),
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Distinct creators with at least one counted copy in the month.
pub async fn creators_with_copies(
    db: &Database,
    month: BillingMonth,
) -> Result<Vec<String>, FlowtabError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT creator_id FROM flow_copies
                 WHERE billing_month = ?1 AND counted_for_payout = 1
                 ORDER BY creator_id",
            )?;
            let rows = stmt.query_map(params![month.first_day()], |row| row.get(0))?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn jan(day: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, day, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn insert_and_get_copy_roundtrips() {
        let (db, _dir) = setup_db().await;
        let event = FlowCopyEvent::new("alice", "F1", "bob", true, jan(10));

        insert_copy(&db, &event).await.unwrap();
        let fetched = get_copy(&db, &event.id).await.unwrap().unwrap();
        assert_eq!(fetched, event);

        assert!(get_copy(&db, "missing").await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn unique_constraint_reports_duplicate() {
        let (db, _dir) = setup_db().await;
        let month = BillingMonth::containing(jan(1));
        insert_copy(&db, &FlowCopyEvent::new("alice", "F1", "bob", true, jan(1)))
            .await
            .unwrap();

        // Same triple later in the month, with a fresh id.
        let err = insert_copy(&db, &FlowCopyEvent::new("alice", "F1", "bob", true, jan(20)))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FlowtabError::DuplicateCopy { ref user_id, billing_month, .. }
                if user_id == "alice" && billing_month == month
        ));

        let copies = list_copies(&db, "alice", month).await.unwrap();
        assert_eq!(copies.len(), 1);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn counts_only_counted_copies() {
        let (db, _dir) = setup_db().await;
        let month = BillingMonth::containing(jan(1));
        insert_copy(&db, &FlowCopyEvent::new("alice", "F1", "bob", true, jan(1)))
            .await
            .unwrap();
        insert_copy(&db, &FlowCopyEvent::new("alice", "F2", "bob", false, jan(2)))
            .await
            .unwrap();
        insert_copy(&db, &FlowCopyEvent::new("alice", "F3", "carol", true, jan(3)))
            .await
            .unwrap();

        assert_eq!(count_counted_copies(&db, "alice", month).await.unwrap(), 2);
        assert_eq!(count_creator_copies(&db, "bob", month).await.unwrap(), 1);
        assert_eq!(count_creator_copies(&db, "carol", month).await.unwrap(), 1);
        assert!(copy_exists(&db, "alice", "F2", month).await.unwrap());
        assert!(!copy_exists(&db, "alice", "F9", month).await.unwrap());
        assert_eq!(
            creators_with_copies(&db, month).await.unwrap(),
            vec!["bob".to_string(), "carol".to_string()]
        );

        let listed = list_copies(&db, "alice", month).await.unwrap();
        assert_eq!(listed.len(), 3);
        assert_eq!(listed[0].flow_id, "F3");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn months_are_isolated() {
        let (db, _dir) = setup_db().await;
        let feb = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        insert_copy(&db, &FlowCopyEvent::new("alice", "F1", "bob", true, jan(31)))
            .await
            .unwrap();
        insert_copy(&db, &FlowCopyEvent::new("alice", "F1", "bob", true, feb))
            .await
            .unwrap();

        let feb_month = BillingMonth::containing(feb);
        assert_eq!(count_counted_copies(&db, "alice", feb_month).await.unwrap(), 1);
        assert_eq!(
            count_counted_copies(&db, "alice", feb_month.previous()).await.unwrap(),
            1
        );
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn capped_insert_decides_counted_flag() {
        let (db, _dir) = setup_db().await;
        let month = BillingMonth::containing(jan(1));

        // The caller's flag is ignored; the store decides.
        let first = insert_copy_within_cap(
            &db,
            &FlowCopyEvent::new("alice", "F1", "bob", false, jan(1)),
            2,
            false,
        )
        .await
        .unwrap();
        assert!(first.event.counted_for_payout);
        assert_eq!(first.counted_this_month, 1);

        let second = insert_copy_within_cap(
            &db,
            &FlowCopyEvent::new("alice", "F2", "bob", true, jan(2)),
            2,
            false,
        )
        .await
        .unwrap();
        assert!(second.event.counted_for_payout);
        assert_eq!(second.counted_this_month, 2);

        let over = insert_copy_within_cap(
            &db,
            &FlowCopyEvent::new("alice", "F3", "bob", true, jan(3)),
            2,
            false,
        )
        .await
        .unwrap();
        assert!(!over.event.counted_for_payout);
        assert_eq!(over.counted_this_month, 2);

        let stored = get_copy(&db, &over.event.id).await.unwrap().unwrap();
        assert!(!stored.counted_for_payout);
        assert_eq!(count_counted_copies(&db, "alice", month).await.unwrap(), 2);
        assert_eq!(list_copies(&db, "alice", month).await.unwrap().len(), 3);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn capped_insert_rejects_without_writing() {
        let (db, _dir) = setup_db().await;
        let month = BillingMonth::containing(jan(1));
        insert_copy_within_cap(
            &db,
            &FlowCopyEvent::new("alice", "F1", "bob", true, jan(1)),
            1,
            true,
        )
        .await
        .unwrap();

        let err = insert_copy_within_cap(
            &db,
            &FlowCopyEvent::new("alice", "F2", "bob", true, jan(2)),
            1,
            true,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, FlowtabError::QuotaExceeded { cap: 1, .. }));
        assert!(!copy_exists(&db, "alice", "F2", month).await.unwrap());

        let dup = insert_copy_within_cap(
            &db,
            &FlowCopyEvent::new("alice", "F1", "bob", true, jan(3)),
            5,
            false,
        )
        .await
        .unwrap_err();
        assert!(matches!(dup, FlowtabError::DuplicateCopy { .. }));
        assert_eq!(list_copies(&db, "alice", month).await.unwrap().len(), 1);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn copy_rows_are_append_only() {
        let (db, _dir) = setup_db().await;
        let event = FlowCopyEvent::new("alice", "F1", "bob", true, jan(5));
        insert_copy(&db, &event).await.unwrap();

        let id = event.id.clone();
        let result = db
            .connection()
            .call(move |conn| {
                conn.execute("DELETE FROM flow_copies WHERE id = ?1", params![id])
            })
            .await;
        assert!(result.is_err(), "delete must be refused");

        let id = event.id.clone();
        let result = db
            .connection()
            .call(move |conn| {
                conn.execute(
                    "UPDATE flow_copies SET counted_for_payout = 0 WHERE id = ?1",
                    params![id],
                )
            })
            .await;
        assert!(result.is_err(), "update must be refused");
        db.close().await.unwrap();
    }
}
