// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared fixtures for unit tests.

use std::sync::{Arc, OnceLock};

use k256::ecdsa::SigningKey;
use rand::rngs::OsRng;
use rsa::RsaPrivateKey;

use crate::auth::signature::personal_message_hash;
use crate::config::AppConfig;
use crate::state::AppState;
use crate::storage::InMemorySessionStore;

/// Well-known test wallet key.
pub const WALLET_KEY_HEX: &str =
    "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
/// Checksummed address of [`WALLET_KEY_HEX`].
pub const WALLET_ADDRESS: &str = "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23";

pub const TEST_SECRET: &str = "0123456789abcdef0123456789abcdef";
pub const TEST_REDIRECT_URI: &str = "https://www.example.com/wallet";

fn generate_rsa_key() -> RsaPrivateKey {
    RsaPrivateKey::new(&mut OsRng, 2048).expect("generate RSA key")
}

/// Server key shared by every test in the process.
pub fn test_rsa_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(generate_rsa_key)
}

/// A second key unrelated to [`test_rsa_key`].
pub fn other_rsa_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(generate_rsa_key)
}

pub fn wallet() -> SigningKey {
    let bytes = alloy::primitives::hex::decode(WALLET_KEY_HEX).expect("valid hex");
    SigningKey::from_slice(&bytes).expect("valid secp256k1 key")
}

/// `personal_sign` of `message`, hex encoded as `r ‖ s ‖ v`.
///
/// `yellow_paper` selects `v` in 27/28 rather than 0/1.
pub fn sign_personal(key: &SigningKey, message: &str, yellow_paper: bool) -> String {
    let digest = personal_message_hash(message);
    let (signature, recovery_id) = key
        .sign_prehash_recoverable(&digest)
        .expect("sign digest");
    let mut bytes = signature.to_bytes().to_vec();
    let v = recovery_id.to_byte();
    bytes.push(if yellow_paper { v + 27 } else { v });
    alloy::primitives::hex::encode_prefixed(bytes)
}

pub fn test_config() -> AppConfig {
    AppConfig::new(test_rsa_key().clone(), TEST_SECRET, TEST_REDIRECT_URI).expect("test config")
}

pub fn test_state() -> AppState {
    AppState::new(test_config(), Arc::new(InMemorySessionStore::new())).expect("test state")
}
