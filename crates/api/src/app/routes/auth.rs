//! Registration, login and the password-reset flow.

use std::sync::Arc;

use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde_json::json;

use stockroom_auth::{OtpError, Role, UserStatus, hash_password, verify_password};

use crate::app::dto::{self, ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest, VerifyOtpRequest};
use crate::app::errors::{self, ApiResult};
use crate::app::services::{AppServices, NewUser};
use crate::context::PrincipalContext;

const INVALID_CREDENTIALS: &str = "Invalid email or password";
const OTP_SENT_IF_KNOWN: &str = "If the email exists in our system, an OTP has been sent.";

fn otp_error(err: OtpError) -> Response {
    match err {
        OtpError::RateLimited => errors::json_error(StatusCode::TOO_MANY_REQUESTS, "rate_limited", err.to_string()),
        other => errors::json_error(StatusCode::BAD_REQUEST, "invalid_otp", other.to_string()),
    }
}

/// Argon2 is CPU-bound; run it off the async workers.
async fn hash_blocking(password: String) -> Result<String, Response> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(join_error)?
        .map_err(errors::password_error)
}

async fn verify_blocking(password: String, hash: String) -> Result<bool, Response> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(join_error)
}

fn join_error(err: tokio::task::JoinError) -> Response {
    tracing::error!(error = %err, "password task failed");
    errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "hash_error", "Password processing failed")
}

/// POST /auth/register - self-service sign-up (STAFF or MANAGER)
pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<RegisterRequest>,
) -> ApiResult {
    let role = match body.role.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
        Some(raw) => raw.parse::<Role>().map_err(errors::bad_request)?,
        None => Role::Staff,
    };
    if role == Role::Admin {
        return Err(errors::bad_request("Cannot register as ADMIN"));
    }

    let password_hash = hash_blocking(body.password.clone()).await?;

    let user = services
        .register_user(NewUser {
            username: body.username.trim().to_string(),
            email: body.email,
            password_hash,
            role,
            allow_admin: false,
        })
        .map_err(errors::dispatch_error_to_response)?;

    let message = match role {
        Role::Staff => "Staff registered successfully. You can login now.",
        _ => "Manager registered successfully. Waiting for admin approval.",
    };
    tracing::info!(user_id = %user.id, role = %user.role, "user registered");
    Ok(dto::api_response(message, user))
}

/// POST /auth/login - exchange credentials for a bearer token
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<LoginRequest>,
) -> ApiResult {
    if body.email.trim().is_empty() {
        return Err(errors::bad_request("Email is required"));
    }
    if body.password.trim().is_empty() {
        return Err(errors::bad_request("Password is required"));
    }

    let Some(user) = services.stockroom().users.by_email(&body.email) else {
        tracing::warn!(email = %body.email, "login rejected: unknown email");
        return Err(errors::json_error(StatusCode::BAD_REQUEST, "invalid_credentials", INVALID_CREDENTIALS));
    };
    if !verify_blocking(body.password.clone(), user.password_hash.clone()).await? {
        tracing::warn!(user_id = %user.id, "login rejected: wrong password");
        return Err(errors::json_error(StatusCode::BAD_REQUEST, "invalid_credentials", INVALID_CREDENTIALS));
    }

    if user.role != Role::Admin && user.status != UserStatus::Approved {
        let message = match user.status {
            UserStatus::Rejected => "Account has been rejected by admin",
            _ => "Account pending admin approval",
        };
        tracing::warn!(user_id = %user.id, status = %user.status, "login rejected: not approved");
        return Err(errors::json_error(StatusCode::FORBIDDEN, "not_approved", message));
    }

    let token = services.issue_token(&user, Utc::now()).map_err(|e| {
        errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "token_error", e.to_string())
    })?;

    Ok(dto::ok_json(json!({
        "token": token,
        "type": "Bearer",
        "user": user,
    })))
}

/// POST /auth/forgot-password - issue a reset code
pub async fn forgot_password(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<ForgotPasswordRequest>,
) -> ApiResult {
    if services.stockroom().users.by_email(&body.email).is_none() {
        return Ok(dto::api_message(OTP_SENT_IF_KNOWN));
    }

    let record = services.otp().issue(&body.email, Utc::now()).map_err(|e| {
        tracing::warn!(email = %body.email, error = %e, "otp request refused");
        otp_error(e)
    })?;
    services.notifier().send(&record);

    Ok(dto::api_message("OTP has been sent to your email address. Please check your inbox."))
}

/// POST /auth/verify-otp - check a code without redeeming it
pub async fn verify_otp(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<VerifyOtpRequest>,
) -> ApiResult {
    services
        .otp()
        .verify(&body.email, &body.otp, Utc::now())
        .map_err(otp_error)?;
    Ok(dto::api_message("OTP verified successfully. You can now reset your password."))
}

/// POST /auth/reset-password - redeem a code and set a new password
pub async fn reset_password(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<ResetPasswordRequest>,
) -> ApiResult {
    if body.new_password != body.confirm_password {
        return Err(otp_error(OtpError::PasswordsDoNotMatch));
    }
    let password_hash = hash_blocking(body.new_password.clone()).await?;

    services
        .otp()
        .consume(&body.email, &body.otp, Utc::now())
        .map_err(otp_error)?;

    let user = services
        .stockroom()
        .users
        .by_email(&body.email)
        .ok_or_else(|| errors::not_found("User not found."))?;
    services
        .change_password(user.id, password_hash)
        .map_err(errors::dispatch_error_to_response)?;

    tracing::info!(user_id = %user.id, "password reset");
    Ok(dto::api_message(
        "Password has been reset successfully. You can now login with your new password.",
    ))
}

/// GET /auth/me
pub async fn me(Extension(principal): Extension<PrincipalContext>) -> impl IntoResponse {
    dto::api_response("User details retrieved", principal.user())
}

/// POST /auth/logout - tokens are stateless; the client drops its copy
pub async fn logout() -> impl IntoResponse {
    dto::api_message("Logout successful")
}
