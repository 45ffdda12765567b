// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{process::ExitCode, sync::Arc};

use axum_server::tls_rustls::RustlsConfig;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use wallet_auth::{
    api::router,
    config::{AppConfig, TlsPaths},
    logging::{self, LogFormat},
    session_sweeper::SessionSweeper,
    state::AppState,
    storage::{InMemorySessionStore, SessionDatabase, SessionStore},
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            let _ = logging::init(LogFormat::default());
            error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    logging::init(config.log_format).expect("Failed to install tracing subscriber");
    info!(config = ?config, "Configuration loaded");

    let store: Arc<dyn SessionStore> = match &config.session_db_path {
        Some(path) => {
            info!(path = %path.display(), "Using persistent session store");
            match SessionDatabase::open(path) {
                Ok(db) => Arc::new(db),
                Err(e) => {
                    error!(error = %e, path = %path.display(), "Failed to open session database");
                    return ExitCode::FAILURE;
                }
            }
        }
        None => {
            info!("Using in-memory session store; sessions are lost on restart");
            Arc::new(InMemorySessionStore::new())
        }
    };

    let bind_addr = config.bind_addr;
    let tls = config.tls.clone();
    let sweep_interval = config.sweep_interval;

    let state = match AppState::new(config, store.clone()) {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    let app = router(state);

    let shutdown = CancellationToken::new();
    let sweeper = SessionSweeper::new(store).with_interval(sweep_interval);
    let sweeper_handle = tokio::spawn(sweeper.run(shutdown.clone()));

    match tls {
        Some(paths) => serve_tls(bind_addr, &paths, app, shutdown.clone()).await,
        None => serve_plain(bind_addr, app, shutdown.clone()).await,
    }

    shutdown.cancel();
    join_background("session sweeper", sweeper_handle).await;
    info!("Server stopped");
    ExitCode::SUCCESS
}

async fn serve_plain(addr: std::net::SocketAddr, app: axum::Router, shutdown: CancellationToken) {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");

    info!("Wallet auth server listening on http://{addr} (docs at /docs)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .expect("HTTP server failed");
}

async fn serve_tls(
    addr: std::net::SocketAddr,
    paths: &TlsPaths,
    app: axum::Router,
    shutdown: CancellationToken,
) {
    // Install the ring crypto provider for rustls (must be done before any TLS operations)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let tls_config = RustlsConfig::from_pem_file(&paths.cert, &paths.key)
        .await
        .expect("Failed to load TLS certificate and key");

    info!("Wallet auth server listening on https://{addr} (docs at /docs)");

    tokio::select! {
        result = axum_server::bind_rustls(addr, tls_config).serve(app.into_make_service()) => {
            result.expect("HTTPS server failed");
        }
        _ = shutdown_signal(shutdown) => {}
    }
}

/// Wait for a background task, logging it if it panicked or was aborted.
async fn join_background(name: &str, handle: tokio::task::JoinHandle<()>) -> bool {
    match handle.await {
        Ok(()) => true,
        Err(e) => {
            warn!(task = name, error = %e, "Background task failed");
            false
        }
    }
}

/// Resolve on Ctrl-C or SIGTERM, cancelling `shutdown` for background tasks.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
    shutdown.cancel();
}
