//! Authentication route handlers.
//!
//! Email and password accounts with a server-side session. The session
//! cookie is `HttpOnly`; the frontend learns who is logged in from `/me`.

use axum::extract::State;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{
    ApiJson, ApiResponse, AppError, Result, add_breadcrumb, clear_sentry_user, set_sentry_user,
};
use crate::middleware::{RequireAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::services::auth::{AuthService, LoginRequest, RegisterRequest};
use crate::state::AppState;

/// Store the user in the session and tag Sentry with them.
async fn start_session(session: &Session, user: &User) -> Result<()> {
    set_current_user(session, &CurrentUser::from(user))
        .await
        .map_err(|e| AppError::Internal(format!("session write failed: {e}")))?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

/// Register a customer account and log it in.
#[instrument(skip(state, session, request), fields(email = %request.email))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<ApiResponse<User>> {
    let user = AuthService::new(state.pool()).register(&request).await?;
    start_session(&session, &user).await?;

    add_breadcrumb("auth", "Registered", None);
    Ok(ApiResponse::ok(user).with_message("Account created"))
}

/// Log in with email and password.
#[instrument(skip(state, session, request))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<ApiResponse<User>> {
    let user = match AuthService::new(state.pool()).login(&request).await {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!(error = %e, "login failed");
            return Err(e.into());
        }
    };
    start_session(&session, &user).await?;

    tracing::info!(user_id = %user.id, role = %user.role, "user logged in");
    Ok(ApiResponse::ok(user).with_message("Logged in"))
}

/// End the session.
pub async fn logout(session: Session) -> Result<ApiResponse<()>> {
    clear_current_user(&session)
        .await
        .map_err(|e| AppError::Internal(format!("session flush failed: {e}")))?;
    clear_sentry_user();
    Ok(ApiResponse::message("Logged out"))
}

/// The logged-in user's account.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn me(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<ApiResponse<User>> {
    let account = AuthService::new(state.pool()).get_user(user.id).await?;
    Ok(ApiResponse::ok(account))
}
