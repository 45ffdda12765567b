// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session issuance and lookup.
//!
//! A successful login produces two cookies scoped to the apex domain:
//!
//! - `WALLET_SESSION`: `HttpOnly`, `SameSite=Strict`, carrying
//!   `<session id>.<HMAC-SHA256(secret, session id)>`. This is the cookie the
//!   server trusts.
//! - `WALLET_SESSION_ID` (name configurable): readable by page scripts,
//!   carrying only the opaque session id so the frontend can tell whether it
//!   is logged in. It never contains the address.
//!
//! The authoritative record lives in the [`SessionStore`].

use std::sync::Arc;

use axum::http::{header::COOKIE, HeaderMap, HeaderValue};
use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::AuthError;
use crate::config::{AppConfig, ConfigError, SESSION_COOKIE};
use crate::models::{SessionId, SessionRecord, WalletAddress, SESSION_TTL_SECS};
use crate::storage::{SessionError, SessionResult, SessionStore};

type HmacSha256 = Hmac<Sha256>;

/// `Expires` format required by RFC 6265 (IMF-fixdate).
const COOKIE_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Result of a successful login.
#[derive(Debug)]
pub enum SessionOutcome {
    /// The request already carried a live session for this wallet.
    Reused(SessionRecord),
    /// A new session was stored; `cookies` must be sent as `Set-Cookie`.
    Created {
        record: SessionRecord,
        cookies: [HeaderValue; 2],
    },
}

/// Creates, resolves and ends wallet sessions.
pub struct SessionIssuer {
    store: Arc<dyn SessionStore>,
    mac: HmacSha256,
    session_id_cookie: String,
    cookie_domain: String,
}

impl SessionIssuer {
    pub fn new(config: &AppConfig, store: Arc<dyn SessionStore>) -> Result<Self, ConfigError> {
        let mac = HmacSha256::new_from_slice(&config.session_secret).map_err(|e| {
            ConfigError::Invalid {
                var: crate::config::SESSION_SECRET_ENV,
                reason: e.to_string(),
            }
        })?;

        if !config
            .cookie_domain
            .bytes()
            .all(|b| b.is_ascii_graphic() && b != b';' && b != b',')
        {
            return Err(ConfigError::Invalid {
                var: crate::config::REDIRECT_URI_ENV,
                reason: format!("`{}` cannot be used as a cookie domain", config.cookie_domain),
            });
        }

        Ok(Self {
            store,
            mac,
            session_id_cookie: config.session_id_cookie.clone(),
            cookie_domain: config.cookie_domain.clone(),
        })
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Start a session for `address` unless the request already carries a
    /// live one, in which case that session is kept as is.
    pub fn issue_or_reuse(
        &self,
        headers: &HeaderMap,
        address: &str,
    ) -> SessionResult<SessionOutcome> {
        let now = Utc::now();

        if let Some(existing) = self.presented_session(headers, now)? {
            tracing::debug!(
                session_id = %existing.id,
                "Request already carries a live session"
            );
            return Ok(SessionOutcome::Reused(existing));
        }

        let record = self.store.create(WalletAddress::from(address), now);
        self.store.save(&record)?;

        let cookies = [
            self.session_cookie(&record.id)?,
            self.session_id_cookie(&record.id, record.expires_at)?,
        ];

        tracing::info!(
            session_id = %record.id,
            address = %record.address,
            expires_at = %record.expires_at,
            "Session created"
        );

        Ok(SessionOutcome::Created { record, cookies })
    }

    /// Resolve the session on the request to its masked wallet address.
    pub fn who_am_i(&self, headers: &HeaderMap) -> Result<String, AuthError> {
        let record = self.current_session(headers)?;
        record.address.masked().ok_or_else(|| {
            AuthError::CorruptSession(format!(
                "session {} holds no usable wallet address",
                record.id
            ))
        })
    }

    /// Load the session the request authenticates with.
    ///
    /// Requires the client-visible id cookie plus a correctly signed session
    /// cookie for the same id, pointing at a live record. Store read failures
    /// are reported as [`AuthError::NoSession`]; undecodable records as
    /// [`AuthError::CorruptSession`].
    pub fn current_session(&self, headers: &HeaderMap) -> Result<SessionRecord, AuthError> {
        let visible_id = parse_cookie(headers, &self.session_id_cookie)
            .ok_or_else(|| AuthError::NoSession("no session id cookie".to_string()))?;

        let signed = parse_cookie(headers, SESSION_COOKIE)
            .ok_or_else(|| AuthError::NoSession("no session cookie".to_string()))?;
        let id = self
            .verify_session_value(&signed)
            .ok_or_else(|| AuthError::NoSession("session cookie signature invalid".to_string()))?;
        if id.as_str() != visible_id {
            return Err(AuthError::NoSession(
                "session cookies refer to different sessions".to_string(),
            ));
        }

        let record = match self.store.get(&id) {
            Ok(Some(record)) => record,
            Ok(None) => {
                return Err(AuthError::NoSession(format!("session {id} not found")));
            }
            Err(e @ SessionError::Corrupt { .. }) => return Err(e.into()),
            Err(e) => return Err(AuthError::NoSession(format!("session lookup failed: {e}"))),
        };

        if record.is_expired(Utc::now()) {
            return Err(AuthError::NoSession(format!("session {id} expired")));
        }
        Ok(record)
    }

    /// End the session on the request, if any, and return expiring cookies.
    pub fn logout(&self, headers: &HeaderMap) -> SessionResult<[HeaderValue; 2]> {
        let signed_id = parse_cookie(headers, SESSION_COOKIE)
            .and_then(|value| self.verify_session_value(&value));

        if let Some(id) = signed_id {
            if self.store.delete(&id)? {
                tracing::info!(session_id = %id, "Session ended");
            }
        }

        Ok([
            self.clear_cookie(SESSION_COOKIE, true)?,
            self.clear_cookie(&self.session_id_cookie, false)?,
        ])
    }

    /// Signed value for the `WALLET_SESSION` cookie.
    pub fn sign_session_id(&self, id: &SessionId) -> String {
        let mut mac = self.mac.clone();
        mac.update(id.as_str().as_bytes());
        let tag = mac.finalize().into_bytes();
        format!("{id}.{}", Base64UrlUnpadded::encode_string(&tag))
    }

    /// Check a `WALLET_SESSION` cookie value and extract its session id.
    pub fn verify_session_value(&self, value: &str) -> Option<SessionId> {
        let (id, tag) = value.split_once('.')?;
        let id = SessionId::parse(id)?;
        let tag = Base64UrlUnpadded::decode_vec(tag).ok()?;

        let mut mac = self.mac.clone();
        mac.update(id.as_str().as_bytes());
        mac.verify_slice(&tag).ok()?;
        Some(id)
    }

    /// The client-sent id cookie, if it names a live session.
    fn presented_session(
        &self,
        headers: &HeaderMap,
        now: DateTime<Utc>,
    ) -> SessionResult<Option<SessionRecord>> {
        let Some(id) = parse_cookie(headers, &self.session_id_cookie)
            .and_then(|value| SessionId::parse(&value))
        else {
            return Ok(None);
        };
        match self.store.get(&id) {
            Ok(record) => Ok(record.filter(|record| !record.is_expired(now))),
            Err(e @ SessionError::Corrupt { .. }) => {
                tracing::warn!(session_id = %id, error = %e, "Ignoring unreadable session");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn session_cookie(&self, id: &SessionId) -> SessionResult<HeaderValue> {
        header_value(format!(
            "{SESSION_COOKIE}={}; Path=/; Domain={}; Max-Age={SESSION_TTL_SECS}; Secure; HttpOnly; SameSite=Strict",
            self.sign_session_id(id),
            self.cookie_domain,
        ))
    }

    fn session_id_cookie(
        &self,
        id: &SessionId,
        expires_at: DateTime<Utc>,
    ) -> SessionResult<HeaderValue> {
        header_value(format!(
            "{}={id}; Path=/; Domain={}; Expires={}; Secure",
            self.session_id_cookie,
            self.cookie_domain,
            expires_at.format(COOKIE_DATE_FORMAT),
        ))
    }

    fn clear_cookie(&self, name: &str, http_only: bool) -> SessionResult<HeaderValue> {
        let flags = if http_only {
            "; HttpOnly; SameSite=Strict"
        } else {
            ""
        };
        header_value(format!(
            "{name}=; Path=/; Domain={}; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Secure{flags}",
            self.cookie_domain,
        ))
    }
}

fn header_value(cookie: String) -> SessionResult<HeaderValue> {
    HeaderValue::try_from(cookie).map_err(|e| SessionError::Cookie(e.to_string()))
}

/// Find a cookie by name across all `Cookie` headers.
pub fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .filter(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"'))
        .find(|value| !value.is_empty())
        .map(str::to_string)
}
