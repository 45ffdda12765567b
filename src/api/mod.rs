// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::{
        header::{CONTENT_TYPE, ORIGIN},
        Method,
    },
    routing::get,
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    error::ApiError,
    models::{ErrorBody, WalletIdentity},
    state::AppState,
};

pub mod auth;
pub mod health;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list([state.cors_origin.clone()]))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([ORIGIN, CONTENT_TYPE]);

    let v1_routes = Router::new()
        .route("/authenticate", get(auth::authenticate))
        .route("/me", get(auth::me))
        .route("/logout", get(auth::logout));

    let health_routes = Router::new()
        .route("/live", get(health::liveness))
        .route("/ready", get(health::readiness));

    Router::new()
        .nest("/v1", v1_routes)
        .nest("/health", health_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .fallback(not_found)
        .layer(cors)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

async fn not_found() -> ApiError {
    ApiError::not_found("route not found")
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::authenticate,
        auth::me,
        auth::logout,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            WalletIdentity,
            ErrorBody,
            health::HealthResponse,
            health::ReadyResponse,
            health::HealthChecks
        )
    ),
    tags(
        (name = "Auth", description = "Wallet login and session identity"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_state;

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let app = router(test_state());
        // Ensure the router can be converted into a service without panicking.
        let _ = app.into_make_service();
    }

    #[test]
    fn openapi_document_lists_every_endpoint() {
        let doc = ApiDoc::openapi();
        for path in ["/v1/authenticate", "/v1/me", "/v1/logout", "/health/live", "/health/ready"] {
            assert!(doc.paths.paths.contains_key(path), "{path}");
        }

        let doc = serde_json::to_value(&doc).unwrap();
        let params = &doc["paths"]["/v1/authenticate"]["get"]["parameters"];
        assert_eq!(params[0]["name"], "jwe");
        assert_eq!(params[0]["in"], "query");
        assert_ne!(params[0]["required"], true);
    }
}
