// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Process-local session store.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};

use super::{SessionError, SessionResult, SessionStore};
use crate::models::{SessionId, SessionRecord};

#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionId, SessionRecord>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: PoisonError<T>) -> SessionError {
    SessionError::StoreUnavailable("session map lock poisoned".to_string())
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, id: &SessionId) -> SessionResult<Option<SessionRecord>> {
        let sessions = self.sessions.read().map_err(poisoned)?;
        Ok(sessions.get(id).cloned())
    }

    fn save(&self, record: &SessionRecord) -> SessionResult<()> {
        let mut sessions = self.sessions.write().map_err(poisoned)?;
        sessions.insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn delete(&self, id: &SessionId) -> SessionResult<bool> {
        let mut sessions = self.sessions.write().map_err(poisoned)?;
        Ok(sessions.remove(id).is_some())
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> SessionResult<usize> {
        let mut sessions = self.sessions.write().map_err(poisoned)?;
        let before = sessions.len();
        sessions.retain(|_, record| !record.is_expired(now));
        Ok(before - sessions.len())
    }

    fn len(&self) -> SessionResult<usize> {
        Ok(self.sessions.read().map_err(poisoned)?.len())
    }
}
