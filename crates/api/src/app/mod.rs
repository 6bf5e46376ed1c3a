//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: the in-memory stockroom and the command helpers routes share
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request bodies, query strings and response envelopes
//! - `errors.rs`: consistent error responses
//! - `seed.rs`: admin account and demo catalog at startup

use std::sync::Arc;

use axum::{Extension, Router, http::HeaderValue};
use tower::ServiceBuilder;

use stockroom_auth::Hs256JwtValidator;
use stockroom_infra::{LoggingNotifier, OtpNotifier};

use crate::config::Settings;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod seed;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(settings: &Settings) -> anyhow::Result<Router> {
    build_app_with_notifier(settings, Arc::new(LoggingNotifier))
}

/// Same as [`build_app`] with a caller-supplied delivery for reset codes.
pub fn build_app_with_notifier(settings: &Settings, notifier: Arc<dyn OtpNotifier>) -> anyhow::Result<Router> {
    let services = Arc::new(services::AppServices::new(settings, notifier));
    seed::seed_admin(&services, &settings.admin)?;
    if settings.seed_demo_data {
        seed::seed_demo_catalog(&services)?;
    }

    let auth_state = middleware::AuthState {
        jwt: Arc::new(Hs256JwtValidator::new(settings.jwt_secret().as_bytes())),
        services: services.clone(),
    };
    let origin = HeaderValue::from_str(&settings.server.allowed_origin)?;

    // Protected routes: require a valid token for an existing account.
    let protected = routes::router().layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));

    Ok(Router::new()
        .nest("/api", routes::public_router().merge(protected))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(origin, middleware::cors_middleware))
                .layer(Extension(services)),
        ))
}
