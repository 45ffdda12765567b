// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use axum::http::HeaderValue;

use crate::auth::{JweDecryptor, SessionIssuer};
use crate::config::{AppConfig, ConfigError, REDIRECT_URI_ENV};
use crate::storage::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub decryptor: Arc<JweDecryptor>,
    pub sessions: Arc<SessionIssuer>,
    /// `Location` sent after a successful login.
    pub redirect_location: HeaderValue,
    /// The only origin allowed to make credentialed cross-origin calls.
    pub cors_origin: HeaderValue,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn SessionStore>) -> Result<Self, ConfigError> {
        let header = |value: &str| {
            HeaderValue::from_str(value).map_err(|e| ConfigError::Invalid {
                var: REDIRECT_URI_ENV,
                reason: e.to_string(),
            })
        };
        let redirect_location = header(config.redirect_uri.as_str())?;
        let cors_origin = header(&config.allowed_origin)?;

        let sessions = SessionIssuer::new(&config, store)?;
        let decryptor = JweDecryptor::new(config.private_key.clone());

        Ok(Self {
            config: Arc::new(config),
            decryptor: Arc::new(decryptor),
            sessions: Arc::new(sessions),
            redirect_location,
            cors_origin,
        })
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        self.sessions.store()
    }
}
