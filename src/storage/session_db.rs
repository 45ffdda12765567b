// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded session database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `sessions`: session id → serialized SessionRecord (JSON bytes)

use std::path::Path;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};

use super::{SessionError, SessionResult, SessionStore};
use crate::models::{SessionId, SessionRecord};

/// Primary table: session id → serialized SessionRecord (JSON bytes).
const SESSIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("sessions");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SessionDbError {
    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl From<SessionDbError> for SessionError {
    fn from(err: SessionDbError) -> Self {
        SessionError::StoreUnavailable(err.to_string())
    }
}

type SessionDbResult<T> = Result<T, SessionDbError>;

// =============================================================================
// SessionDatabase
// =============================================================================

/// Persistent session store.
pub struct SessionDatabase {
    db: Database,
}

impl SessionDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> Result<Self, SessionDbError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create the table so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(SESSIONS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    fn read_raw(&self, id: &SessionId) -> SessionDbResult<Option<Vec<u8>>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SESSIONS)?;
        Ok(table.get(id.as_str())?.map(|value| value.value().to_vec()))
    }

    fn write(&self, record: &SessionRecord) -> SessionDbResult<()> {
        let json = serde_json::to_vec(record)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(SESSIONS)?;
            table.insert(record.id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn remove(&self, id: &SessionId) -> SessionDbResult<bool> {
        let write_txn = self.db.begin_write()?;
        let existed = {
            let mut table = write_txn.open_table(SESSIONS)?;
            let removed = table.remove(id.as_str())?;
            removed.is_some()
        };
        write_txn.commit()?;
        Ok(existed)
    }

    /// Delete expired records, plus any that no longer decode.
    fn purge(&self, now: DateTime<Utc>) -> SessionDbResult<usize> {
        let write_txn = self.db.begin_write()?;
        let purged = {
            let mut table = write_txn.open_table(SESSIONS)?;

            let mut stale = Vec::new();
            for entry in table.iter()? {
                let (key, value) = entry?;
                let expired = match serde_json::from_slice::<SessionRecord>(value.value()) {
                    Ok(record) => record.is_expired(now),
                    Err(e) => {
                        tracing::warn!(
                            session_id = %key.value(),
                            error = %e,
                            "Purging undecodable session record"
                        );
                        true
                    }
                };
                if expired {
                    stale.push(key.value().to_string());
                }
            }

            for key in &stale {
                table.remove(key.as_str())?;
            }
            stale.len()
        };
        write_txn.commit()?;
        Ok(purged)
    }

    fn count(&self) -> SessionDbResult<usize> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SESSIONS)?;
        Ok(table.len()? as usize)
    }
}

impl SessionStore for SessionDatabase {
    fn get(&self, id: &SessionId) -> SessionResult<Option<SessionRecord>> {
        let Some(bytes) = self.read_raw(id)? else {
            return Ok(None);
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| SessionError::Corrupt {
                id: id.to_string(),
                reason: e.to_string(),
            })
    }

    fn save(&self, record: &SessionRecord) -> SessionResult<()> {
        Ok(self.write(record)?)
    }

    fn delete(&self, id: &SessionId) -> SessionResult<bool> {
        Ok(self.remove(id)?)
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> SessionResult<usize> {
        Ok(self.purge(now)?)
    }

    fn len(&self) -> SessionResult<usize> {
        Ok(self.count()?)
    }
}
