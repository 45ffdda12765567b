// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet login endpoints.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{
        header::{LOCATION, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    auth::{verify_claim, AuthClaim, AuthError, SessionOutcome},
    models::{ErrorBody, WalletIdentity},
    state::AppState,
};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AuthenticateQuery {
    /// Compact JWE carrying the signed `{address, signature}` claim.
    pub jwe: Option<String>,
}

/// Exchange a signed, encrypted wallet claim for a session.
///
/// On success the browser is redirected back to the frontend with the
/// session cookies set. A request that already carries a live session for
/// the same wallet is redirected without issuing new cookies.
#[utoipa::path(
    get,
    path = "/v1/authenticate",
    params(AuthenticateQuery),
    tag = "Auth",
    responses(
        (status = 302, description = "Logged in; redirect to the frontend"),
        (status = 400, description = "Missing `jwe` parameter", body = ErrorBody),
        (status = 403, description = "Token rejected", body = ErrorBody),
        (status = 500, description = "Session could not be created", body = ErrorBody)
    )
)]
pub async fn authenticate(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<AuthenticateQuery>, QueryRejection>,
) -> Response {
    let token = query.ok().and_then(|Query(q)| q.jwe).unwrap_or_default();

    match login(&state, &headers, &token) {
        Ok(response) => response,
        Err(err) => {
            err.log();
            err.into_response()
        }
    }
}

fn login(state: &AppState, headers: &HeaderMap, token: &str) -> Result<Response, AuthError> {
    if token.is_empty() {
        return Err(AuthError::MissingToken);
    }

    let plaintext = state.decryptor.decrypt(token)?;
    let claim = AuthClaim::parse(&plaintext)?;
    let address = verify_claim(&claim)?;

    let cookies = match state.sessions.issue_or_reuse(headers, &address)? {
        SessionOutcome::Reused(_) => None,
        SessionOutcome::Created { cookies, .. } => Some(cookies),
    };

    Ok(redirect(state.redirect_location.clone(), cookies))
}

/// Current wallet identity, with the address masked.
#[utoipa::path(
    get,
    path = "/v1/me",
    tag = "Auth",
    responses(
        (status = 200, body = WalletIdentity),
        (status = 403, description = "No active session", body = ErrorBody),
        (status = 500, description = "Session record is unreadable", body = ErrorBody)
    )
)]
pub async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<WalletIdentity>, AuthError> {
    let address = state.sessions.who_am_i(&headers).inspect_err(AuthError::log)?;
    Ok(Json(WalletIdentity { address }))
}

/// End the current session and clear both cookies.
#[utoipa::path(
    get,
    path = "/v1/logout",
    tag = "Auth",
    responses(
        (status = 302, description = "Logged out; redirect to the frontend"),
        (status = 500, description = "Session store failure", body = ErrorBody)
    )
)]
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, AuthError> {
    let cookies = state
        .sessions
        .logout(&headers)
        .map_err(AuthError::from)
        .inspect_err(AuthError::log)?;
    Ok(redirect(state.redirect_location.clone(), Some(cookies)))
}

/// 302 to `location`, optionally setting cookies.
fn redirect(location: HeaderValue, cookies: Option<[HeaderValue; 2]>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(LOCATION, location);
    for cookie in cookies.into_iter().flatten() {
        headers.append(SET_COOKIE, cookie);
    }
    (StatusCode::FOUND, headers).into_response()
}
