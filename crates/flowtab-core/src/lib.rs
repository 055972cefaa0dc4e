// SPDX-FileCopyrightText: 2026 Flowtab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Flowtab marketplace.
//!
//! This crate provides the error taxonomy, domain types, the injectable
//! [`Clock`], and the storage trait that the rest of the workspace is built
//! on.

pub mod clock;
pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::FlowtabError;
pub use types::{
    AccountConnection, BillingMonth, ConnectionStatus, ConnectionType, CreatorPayout,
    FlowCopyEvent, HealthStatus, PayoutStatus, Provider, RecordedCopy, VaultItem,
};

pub use traits::{MarketplaceStore, PluginAdapter};
