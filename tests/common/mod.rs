// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

#![allow(dead_code)]

use std::sync::{Arc, OnceLock};

use alloy::primitives::hex;
use alloy::signers::{local::PrivateKeySigner, SignerSync};
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, Response, StatusCode},
    Router,
};
use rand::rngs::OsRng;
use rsa::RsaPrivateKey;
use tower::ServiceExt;

use wallet_auth::{
    api::router,
    auth::{
        jwe::{encrypt, ContentEncryption},
        AuthClaim,
    },
    config::AppConfig,
    state::AppState,
    storage::{InMemorySessionStore, SessionStore},
};

pub const WALLET_KEY_HEX: &str =
    "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
pub const OTHER_KEY_HEX: &str =
    "0x1111111111111111111111111111111111111111111111111111111111111111";
pub const SECRET: &str = "integration-secret-0123456789abcdef";
pub const REDIRECT_URI: &str = "https://www.example.com/wallet";
pub const ORIGIN: &str = "https://www.example.com";

pub fn server_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| RsaPrivateKey::new(&mut OsRng, 2048).expect("generate RSA key"))
}

pub fn config() -> AppConfig {
    AppConfig::new(server_key().clone(), SECRET, REDIRECT_URI).expect("config")
}

pub struct TestApp {
    pub state: AppState,
    pub router: Router,
}

impl TestApp {
    pub fn in_memory() -> Self {
        Self::with_store(Arc::new(InMemorySessionStore::new()))
    }

    pub fn with_store(store: Arc<dyn SessionStore>) -> Self {
        let state = AppState::new(config(), store).expect("state");
        let router = router(state.clone());
        Self { state, router }
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        self.state.store()
    }

    pub async fn get(&self, uri: &str, cookies: &[String]) -> Response<Body> {
        let mut request = Request::builder().method("GET").uri(uri);
        if !cookies.is_empty() {
            request = request.header(header::COOKIE, cookies.join("; "));
        }
        self.router
            .clone()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    /// Token for a wallet signing its own address.
    pub fn login_token(&self, signer: &PrivateKeySigner) -> String {
        let address = signer.address().to_checksum(None);
        let signature = signer.sign_message_sync(address.as_bytes()).unwrap();
        self.token(&address, &hex::encode_prefixed(signature.as_bytes()))
    }

    pub fn token(&self, address: &str, signature: &str) -> String {
        let claim = serde_json::to_vec(&AuthClaim {
            address: address.to_string(),
            signature: signature.to_string(),
        })
        .unwrap();
        encrypt(&server_key().to_public_key(), &claim, ContentEncryption::A256Gcm).unwrap()
    }

    /// Log in and return `name=value` pairs for both cookies.
    pub async fn login(&self, signer: &PrivateKeySigner) -> Vec<String> {
        let uri = format!("/v1/authenticate?jwe={}", self.login_token(signer));
        let response = self.get(&uri, &[]).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        cookie_pairs(&response)
    }
}

pub fn wallet() -> PrivateKeySigner {
    WALLET_KEY_HEX.parse().unwrap()
}

pub fn other_wallet() -> PrivateKeySigner {
    OTHER_KEY_HEX.parse().unwrap()
}

pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

/// The `name=value` part of each `Set-Cookie`.
pub fn cookie_pairs(response: &Response<Body>) -> Vec<String> {
    set_cookies(response)
        .into_iter()
        .map(|c| c.split(';').next().unwrap().to_string())
        .collect()
}

pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
