// SPDX-FileCopyrightText: 2026 Flowtab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AES-256-GCM credential vault for the Flowtab marketplace.
//!
//! [`EncryptionService`] turns secrets into the stored
//! `hex(nonce):hex(tag):hex(ciphertext)` form and back. [`CredentialVault`]
//! builds account connections on top of it.

pub mod credentials;
pub mod crypto;
pub mod encryption;

pub use credentials::{CredentialVault, NewConnection};
pub use encryption::{EncryptionService, generate_key_hex, mask_secret};
