// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Session Storage
//!
//! Server-side session records live behind the [`SessionStore`] trait so the
//! issuer does not care where they are kept.
//!
//! ## Backends
//!
//! - [`InMemorySessionStore`]: process-local map, lost on restart (default)
//! - [`SessionDatabase`]: embedded redb file, survives restarts
//!   (`SESSION_DB_PATH`)
//!
//! Records are keyed by their unique id, so logins for different wallets
//! never contend. There is no address-to-session index.

use chrono::{DateTime, Utc};

use crate::models::{SessionId, SessionRecord, WalletAddress};

pub mod memory;
pub mod session_db;

pub use memory::InMemorySessionStore;
pub use session_db::SessionDatabase;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The backing store could not be read or written.
    #[error("session store unavailable: {0}")]
    StoreUnavailable(String),

    /// A stored record could not be decoded into a [`SessionRecord`].
    #[error("session {id} is corrupt: {reason}")]
    Corrupt { id: String, reason: String },

    /// A session cookie could not be encoded as a header value.
    #[error("invalid session cookie: {0}")]
    Cookie(String),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Keyed storage for session records.
pub trait SessionStore: Send + Sync {
    /// Look up a record. Expired records are returned as stored; callers
    /// decide what expiry means for them.
    fn get(&self, id: &SessionId) -> SessionResult<Option<SessionRecord>>;

    /// Insert or overwrite a record.
    fn save(&self, record: &SessionRecord) -> SessionResult<()>;

    /// Remove a record. Returns whether it existed.
    fn delete(&self, id: &SessionId) -> SessionResult<bool>;

    /// Remove every record expired at `now`. Returns how many were removed.
    fn purge_expired(&self, now: DateTime<Utc>) -> SessionResult<usize>;

    /// Number of stored records, expired or not.
    fn len(&self) -> SessionResult<usize>;

    fn is_empty(&self) -> SessionResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Build a new, unsaved record for `address`.
    fn create(&self, address: WalletAddress, now: DateTime<Utc>) -> SessionRecord {
        SessionRecord::new(address, now)
    }

    /// Cheap liveness probe used by the readiness endpoint.
    fn ping(&self) -> SessionResult<()> {
        self.len().map(|_| ())
    }
}
