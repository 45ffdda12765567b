// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Expired Session Sweeper
//!
//! Background task that deletes session records past their expiry. Expired
//! sessions are already refused on lookup; the sweeper only keeps the store
//! from growing without bound.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown. `main`
//! cancels the token when the server receives Ctrl-C or SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::DEFAULT_SWEEP_INTERVAL;
use crate::storage::SessionStore;

pub struct SessionSweeper {
    store: Arc<dyn SessionStore>,
    interval: Duration,
}

impl SessionSweeper {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run until the cancellation token is triggered.
    ///
    /// ```rust,ignore
    /// tokio::spawn(sweeper.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Session sweeper starting"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Session sweeper shutting down");
                    return;
                }
            }

            self.sweep();
        }
    }

    /// Purge once. Returns how many records were removed.
    pub fn sweep(&self) -> usize {
        match self.store.purge_expired(Utc::now()) {
            Ok(0) => {
                debug!("Session sweeper: nothing to purge");
                0
            }
            Ok(removed) => {
                info!(removed, "Session sweeper: purged expired sessions");
                removed
            }
            Err(e) => {
                warn!(error = %e, "Session sweeper: purge failed");
                0
            }
        }
    }
}
