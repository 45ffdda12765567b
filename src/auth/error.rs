// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.
//!
//! Every variant keeps its low-level cause for the server log. Clients only
//! ever see the HTTP status and a generic `{"message": ...}` body; the
//! login failures in particular all share one message so the response does
//! not reveal which stage rejected the token.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use super::{claim::ParseError, jwe::DecryptError, signature::VerifyError};
use crate::models::ErrorBody;
use crate::storage::SessionError;

/// Message for every 403 on the login endpoint.
pub const AUTHENTICATION_FAILED: &str = "authentication failed";
/// Message for a missing or stale session.
pub const NO_ACTIVE_SESSION: &str = "no active session found";
/// Message for a missing `jwe` parameter.
pub const MISSING_TOKEN: &str = "jwe query param is required but is not present or empty";

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No `jwe` query parameter, or an empty one.
    #[error("jwe query param is missing or empty")]
    MissingToken,

    /// Token is not a well-formed compact JWE we accept.
    #[error("malformed token: {0}")]
    MalformedToken(&'static str),

    /// Token is well-formed but did not decrypt under the server key.
    #[error("token decryption failed: {0}")]
    DecryptionFailed(&'static str),

    /// Plaintext is not a valid `{address, signature}` claim.
    #[error(transparent)]
    ParseError(#[from] ParseError),

    /// Signature is not 65 bytes of hex.
    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    /// No public key could be recovered from the signature.
    #[error("signature recovery failed: {0}")]
    RecoveryFailed(String),

    /// Signature is valid but was made by another wallet.
    #[error("signature recovers {recovered}, not claimed address {claimed}")]
    AddressMismatch { claimed: String, recovered: String },

    /// Request carries no usable session.
    #[error("no active session: {0}")]
    NoSession(String),

    /// Stored session does not hold a usable address.
    #[error("corrupt session: {0}")]
    CorruptSession(String),

    /// Session could not be persisted or issued.
    #[error("session store unavailable: {0}")]
    StoreUnavailable(String),
}

impl From<DecryptError> for AuthError {
    fn from(err: DecryptError) -> Self {
        match err {
            DecryptError::MalformedToken(reason) => AuthError::MalformedToken(reason),
            DecryptError::DecryptionFailed(reason) => AuthError::DecryptionFailed(reason),
        }
    }
}

impl From<VerifyError> for AuthError {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::MalformedSignature(reason) => AuthError::MalformedSignature(reason),
            VerifyError::RecoveryFailed(reason) => AuthError::RecoveryFailed(reason),
        }
    }
}

impl From<SessionError> for AuthError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Corrupt { .. } => AuthError::CorruptSession(err.to_string()),
            SessionError::StoreUnavailable(_) | SessionError::Cookie(_) => {
                AuthError::StoreUnavailable(err.to_string())
            }
        }
    }
}

impl AuthError {
    /// Stable machine-readable code, used in logs.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "missing_token",
            AuthError::MalformedToken(_) => "malformed_token",
            AuthError::DecryptionFailed(_) => "decryption_failed",
            AuthError::ParseError(_) => "parse_error",
            AuthError::MalformedSignature(_) => "malformed_signature",
            AuthError::RecoveryFailed(_) => "recovery_failed",
            AuthError::AddressMismatch { .. } => "address_mismatch",
            AuthError::NoSession(_) => "no_session",
            AuthError::CorruptSession(_) => "corrupt_session",
            AuthError::StoreUnavailable(_) => "store_unavailable",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingToken => StatusCode::BAD_REQUEST,
            AuthError::MalformedToken(_)
            | AuthError::DecryptionFailed(_)
            | AuthError::ParseError(_)
            | AuthError::MalformedSignature(_)
            | AuthError::RecoveryFailed(_)
            | AuthError::AddressMismatch { .. }
            | AuthError::NoSession(_) => StatusCode::FORBIDDEN,
            AuthError::CorruptSession(_) | AuthError::StoreUnavailable(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// The message safe to show to clients.
    pub fn public_message(&self) -> &'static str {
        match self {
            AuthError::MissingToken => MISSING_TOKEN,
            AuthError::NoSession(_) => NO_ACTIVE_SESSION,
            AuthError::CorruptSession(_) => "failed to read session",
            AuthError::StoreUnavailable(_) => "failed to initiate session",
            _ => AUTHENTICATION_FAILED,
        }
    }

    /// Record the full error server-side.
    pub fn log(&self) {
        let code = self.error_code();
        match self {
            AuthError::CorruptSession(_) | AuthError::StoreUnavailable(_) => {
                tracing::error!(error_code = code, error = %self, "Request failed");
            }
            AuthError::AddressMismatch { .. } => {
                tracing::warn!(error_code = code, error = %self, "Login rejected: address mismatch");
            }
            AuthError::MissingToken | AuthError::NoSession(_) => {
                tracing::info!(error_code = code, error = %self, "Request rejected");
            }
            AuthError::MalformedToken(_) | AuthError::DecryptionFailed(_) => {
                tracing::debug!(error_code = code, error = %self, "Login rejected");
            }
            _ => {
                tracing::warn!(error_code = code, error = %self, "Login rejected");
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            message: self.public_message().to_string(),
        });
        (self.status_code(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claim::AuthClaim;
    use axum::body::to_bytes;

    async fn body_of(err: AuthError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body_bytes).unwrap())
    }

    #[tokio::test]
    async fn missing_token_returns_400() {
        let (status, body) = body_of(AuthError::MissingToken).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], MISSING_TOKEN);
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let parse_error = AuthClaim::parse(b"{}").unwrap_err();
        let failures = vec![
            AuthError::MalformedToken("expected five segments"),
            AuthError::DecryptionFailed("content authentication"),
            AuthError::ParseError(parse_error),
            AuthError::MalformedSignature("invalid hex".into()),
            AuthError::RecoveryFailed("invalid recovery byte 29".into()),
            AuthError::AddressMismatch {
                claimed: "0xA".into(),
                recovered: "0xB".into(),
            },
        ];

        for err in failures {
            let code = err.error_code();
            let (status, body) = body_of(err).await;
            assert_eq!(status, StatusCode::FORBIDDEN, "{code}");
            assert_eq!(body, serde_json::json!({ "message": AUTHENTICATION_FAILED }), "{code}");
        }
    }

    #[tokio::test]
    async fn server_faults_return_500_without_detail() {
        for err in [
            AuthError::CorruptSession("session abc is corrupt: missing field `address`".into()),
            AuthError::StoreUnavailable("redb commit error: disk full".into()),
        ] {
            let (status, body) = body_of(err).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            let message = body["message"].as_str().unwrap();
            assert!(!message.contains("redb") && !message.contains("address"));
        }
    }

    #[tokio::test]
    async fn no_session_returns_403() {
        let (status, body) = body_of(AuthError::NoSession("no cookie".into())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], NO_ACTIVE_SESSION);
    }

    #[test]
    fn session_errors_map_to_server_faults() {
        let corrupt: AuthError = SessionError::Corrupt {
            id: "abc".into(),
            reason: "missing field".into(),
        }
        .into();
        assert!(matches!(corrupt, AuthError::CorruptSession(_)));

        let unavailable: AuthError = SessionError::StoreUnavailable("locked".into()).into();
        assert!(matches!(unavailable, AuthError::StoreUnavailable(_)));
    }
}
