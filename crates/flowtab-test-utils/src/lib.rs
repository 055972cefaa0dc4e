// SPDX-FileCopyrightText: 2026 Flowtab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Flowtab integration tests.
//!
//! [`TestHarness`] wires storage, vault, and payout services together on a
//! temp database with a controllable clock.

pub mod harness;

pub use harness::{TestHarness, TestHarnessBuilder};
