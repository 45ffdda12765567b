// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Data Models
//!
//! Session records persisted by the session store, plus the JSON bodies
//! returned by the API. Response types derive `ToSchema` for the OpenAPI
//! document.
//!
//! ## Wallet Address Type
//!
//! The [`WalletAddress`] newtype wraps EIP-55 checksummed addresses
//! (`0x` followed by 40 hex characters). Sessions only ever store the
//! checksummed form recovered from a verified signature.

use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Absolute session lifetime. Sessions are never renewed.
pub const SESSION_TTL_SECS: i64 = 3600;

/// Session ids carry 128 bits of OS randomness.
const SESSION_ID_BYTES: usize = 16;

// =============================================================================
// Wallet Address Type
// =============================================================================

/// Ethereum-compatible wallet address wrapper.
///
/// # Example
///
/// ```rust,ignore
/// let addr = WalletAddress::from("0x2c7536E3605D9C16a7a3D7b1898e529396a65c23");
/// assert_eq!(addr.masked().unwrap(), "0x2c7536...96a65c23");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash)]
pub struct WalletAddress(pub String);

impl WalletAddress {
    /// Whether this looks like a `0x`-prefixed 20-byte hex address.
    pub fn is_well_formed(&self) -> bool {
        self.0.len() == 42
            && self.0.starts_with("0x")
            && self.0[2..].bytes().all(|b| b.is_ascii_hexdigit())
    }

    /// First 8 and last 8 characters joined by an ellipsis.
    ///
    /// Returns `None` for values that are not well-formed addresses.
    pub fn masked(&self) -> Option<String> {
        if !self.is_well_formed() {
            return None;
        }
        Some(format!("{}...{}", &self.0[..8], &self.0[self.0.len() - 8..]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for WalletAddress {
    fn from(value: String) -> Self {
        WalletAddress(value)
    }
}

impl From<&str> for WalletAddress {
    fn from(value: &str) -> Self {
        WalletAddress(value.to_string())
    }
}

// =============================================================================
// Session Models
// =============================================================================

/// Opaque session identifier: 32 lowercase hex characters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Draw a fresh id from the OS CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; SESSION_ID_BYTES];
        OsRng.fill_bytes(&mut bytes);
        SessionId(alloy::primitives::hex::encode(bytes))
    }

    /// Accept only values shaped like ids produced by [`SessionId::generate`].
    pub fn parse(value: &str) -> Option<Self> {
        let well_formed = value.len() == SESSION_ID_BYTES * 2
            && value
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        well_formed.then(|| SessionId(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Server-side session bound to a verified wallet address.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionRecord {
    pub id: SessionId,
    pub address: WalletAddress,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    /// New record with a fresh id, expiring [`SESSION_TTL_SECS`] after `now`.
    pub fn new(address: impl Into<WalletAddress>, now: DateTime<Utc>) -> Self {
        Self {
            id: SessionId::generate(),
            address: address.into(),
            created_at: now,
            expires_at: now + Duration::seconds(SESSION_TTL_SECS),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

// =============================================================================
// API Bodies
// =============================================================================

/// Identity of the logged-in wallet, with the address masked.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct WalletIdentity {
    /// `<first 8>...<last 8>` of the checksummed address.
    #[schema(example = "0x2c7536...96a65c23")]
    pub address: String,
}

/// Error body returned for every failed request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ErrorBody {
    pub message: String,
}
