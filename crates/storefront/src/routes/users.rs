//! User registration, login and profile handlers.

use axum::{Json, extract::State, http::StatusCode};
use tower_sessions::Session;

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::extract::ApiJson;
use crate::middleware::{RequireAuth, RequireOperator, clear_current_user, set_current_user};
use crate::models::{
    CurrentUser, LoginRequest, RegisterRequest, RegisteredUser, UpdateProfileRequest, User,
};
use crate::state::AppState;

async fn start_session(session: &Session, user: &User) -> Result<()> {
    let current = CurrentUser {
        id: user.id,
        email: user.email.clone(),
        role: user.role,
    };
    set_current_user(session, &current).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

/// `POST /api/users`
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisteredUser>)> {
    let user = state.auth().register(&req).await?;
    start_session(&session, &user).await?;
    Ok((StatusCode::CREATED, Json(RegisteredUser::from(&user))))
}

/// `POST /api/users/login`
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<User>> {
    let user = state.auth().login(&req.email, &req.password).await?;
    start_session(&session, &user).await?;
    Ok(Json(user))
}

/// `POST /api/users/logout`
pub async fn logout(session: Session) -> Result<StatusCode> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/users/profile`
pub async fn profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<User>> {
    Ok(Json(state.auth().get_user(user.id).await?))
}

/// `PUT /api/users/profile`
pub async fn update_profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> Result<Json<User>> {
    Ok(Json(state.auth().update_profile(user.id, &req).await?))
}

/// `GET /api/users`
pub async fn list(
    State(state): State<AppState>,
    RequireOperator(user): RequireOperator,
) -> Result<Json<Vec<User>>> {
    Ok(Json(state.auth().list_users(&user).await?))
}
