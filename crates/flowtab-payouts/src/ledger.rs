// SPDX-FileCopyrightText: 2026 Flowtab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only log of flow copy events.
//!
//! A user may copy a given flow at most once per billing month. The store's
//! uniqueness constraint is what guarantees this; the existence check in
//! [`CopyLedger::record_flow_copy`] only saves a round trip in the common
//! case.

use std::sync::Arc;

use flowtab_core::{
    BillingMonth, Clock, FlowCopyEvent, FlowtabError, MarketplaceStore, RecordedCopy,
};
use tracing::{debug, info, warn};

/// Copy event ledger backed by a [`MarketplaceStore`].
pub struct CopyLedger {
    store: Arc<dyn MarketplaceStore>,
    clock: Arc<dyn Clock>,
}

impl CopyLedger {
    pub fn new(store: Arc<dyn MarketplaceStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// The billing month the ledger's clock is in.
    pub fn current_month(&self) -> BillingMonth {
        BillingMonth::current(self.clock.as_ref())
    }

    /// Whether the user already copied the flow this month, counted or not.
    pub async fn has_copied_this_month(
        &self,
        user_id: &str,
        flow_id: &str,
    ) -> Result<bool, FlowtabError> {
        self.store
            .copy_exists(user_id, flow_id, self.current_month())
            .await
    }

    /// Counted copies the user made this month.
    pub async fn count_copies_this_month(&self, user_id: &str) -> Result<u32, FlowtabError> {
        self.store
            .count_counted_copies(user_id, self.current_month())
            .await
    }

    /// Record a copy in the current billing month.
    ///
    /// Fails with [`FlowtabError::DuplicateCopy`] if the user already copied
    /// the flow this month, whether the pre-check or the insert detects it.
    pub async fn record_flow_copy(
        &self,
        user_id: &str,
        flow_id: &str,
        creator_id: &str,
        counted_for_payout: bool,
    ) -> Result<FlowCopyEvent, FlowtabError> {
        let event = FlowCopyEvent::new(
            user_id,
            flow_id,
            creator_id,
            counted_for_payout,
            self.clock.now(),
        );
        self.reject_known_duplicate(&event).await?;

        if let Err(e) = self.store.insert_copy(&event).await {
            log_insert_error(&event, &e);
            return Err(e);
        }

        info!(
            event_id = %event.id,
            user_id = %user_id,
            flow_id = %flow_id,
            creator_id = %creator_id,
            counted = counted_for_payout,
            "flow copy recorded"
        );
        Ok(event)
    }

    /// Record a copy in the current billing month, letting the store decide
    /// in the same atomic step whether it counts against `cap`.
    ///
    /// Concurrent calls for one user never produce more than `cap` counted
    /// copies in a month. With `reject_over_cap`, a copy past the cap is not
    /// stored and [`FlowtabError::QuotaExceeded`] is returned.
    pub async fn record_capped_copy(
        &self,
        user_id: &str,
        flow_id: &str,
        creator_id: &str,
        cap: u32,
        reject_over_cap: bool,
    ) -> Result<RecordedCopy, FlowtabError> {
        let event = FlowCopyEvent::new(user_id, flow_id, creator_id, true, self.clock.now());
        self.reject_known_duplicate(&event).await?;

        let recorded = match self
            .store
            .insert_copy_within_cap(&event, cap, reject_over_cap)
            .await
        {
            Ok(recorded) => recorded,
            Err(e) => {
                log_insert_error(&event, &e);
                return Err(e);
            }
        };

        info!(
            event_id = %recorded.event.id,
            user_id = %user_id,
            flow_id = %flow_id,
            creator_id = %creator_id,
            counted = recorded.event.counted_for_payout,
            counted_this_month = recorded.counted_this_month,
            "flow copy recorded"
        );
        Ok(recorded)
    }

    async fn reject_known_duplicate(&self, event: &FlowCopyEvent) -> Result<(), FlowtabError> {
        if self
            .store
            .copy_exists(&event.user_id, &event.flow_id, event.billing_month)
            .await?
        {
            warn!(
                user_id = %event.user_id,
                flow_id = %event.flow_id,
                billing_month = %event.billing_month.label(),
                "duplicate copy attempt"
            );
            return Err(FlowtabError::DuplicateCopy {
                user_id: event.user_id.clone(),
                flow_id: event.flow_id.clone(),
                billing_month: event.billing_month,
            });
        }
        Ok(())
    }

    /// Every copy the user made this month, newest first.
    pub async fn copies_this_month(&self, user_id: &str) -> Result<Vec<FlowCopyEvent>, FlowtabError> {
        let copies = self
            .store
            .list_copies(user_id, self.current_month())
            .await?;
        debug!(user_id = %user_id, count = copies.len(), "listed copies");
        Ok(copies)
    }

    pub async fn get_copy(&self, id: &str) -> Result<Option<FlowCopyEvent>, FlowtabError> {
        self.store.get_copy(id).await
    }
}

fn log_insert_error(event: &FlowCopyEvent, err: &FlowtabError) {
    match err {
        FlowtabError::DuplicateCopy { .. } => warn!(
            user_id = %event.user_id,
            flow_id = %event.flow_id,
            "duplicate copy detected at insert"
        ),
        FlowtabError::QuotaExceeded { cap, .. } => warn!(
            user_id = %event.user_id,
            flow_id = %event.flow_id,
            cap,
            "copy refused at monthly cap"
        ),
        _ => {}
    }
}
