// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Wallet login for the Relational Wallet frontend.
//!
//! ## Auth Flow
//!
//! 1. The wallet login page signs its own address with `personal_sign`
//! 2. It wraps `{address, signature}` in a compact JWE encrypted to the
//!    server's RSA key and redirects to `/v1/authenticate?jwe=<token>`
//! 3. The server:
//!    - Decrypts the token (RSA-OAEP-256 + AES-GCM)
//!    - Parses the claim
//!    - Recovers the signer and compares it to the claimed address
//!    - Issues (or reuses) a session and redirects back to the frontend
//!
//! ## Security
//!
//! - Every login rejection returns the same 403 body
//! - The session cookie is HMAC-signed, `HttpOnly` and `SameSite=Strict`
//! - Sessions expire one hour after creation and are never extended

pub mod claim;
pub mod error;
pub mod jwe;
pub mod session;
pub mod signature;

pub use claim::AuthClaim;
pub use error::AuthError;
pub use jwe::JweDecryptor;
pub use session::{SessionIssuer, SessionOutcome};
pub use signature::verify_claim;
