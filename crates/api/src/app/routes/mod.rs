use axum::{
    Router,
    routing::{get, post},
};

pub mod admin;
pub mod alerts;
pub mod auth;
pub mod common;
pub mod dashboard;
pub mod fashion;
pub mod products;
pub mod stock_transactions;
pub mod system;
pub mod transactions;

/// Endpoints reachable without a token.
pub fn public_router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/verify-otp", post(auth::verify_otp))
        .route("/auth/reset-password", post(auth::reset_password))
}

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/auth/me", get(auth::me))
        .route("/auth/logout", post(auth::logout))
        .nest("/products", products::router())
        .nest("/fashion-products", fashion::router())
        .nest("/stock-transactions", stock_transactions::router())
        .nest("/transactions", transactions::router())
        .nest("/alerts", alerts::router())
        .nest("/admin", admin::router())
        .nest("/dashboard", dashboard::router())
}
