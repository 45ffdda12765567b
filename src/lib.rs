// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relational Wallet Auth - Wallet Signature Login Service
//!
//! Proves control of an EVM wallet address and turns that proof into a
//! server-side session for the Relational Wallet frontend.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - JWE decryption, signature recovery and session issuance
//! - `config` - Environment configuration
//! - `logging` - Tracing subscriber setup
//! - `session_sweeper` - Background purge of expired sessions
//! - `storage` - Session stores (in-memory, redb)

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod session_sweeper;
pub mod state;
pub mod storage;

#[cfg(test)]
mod test_support;
