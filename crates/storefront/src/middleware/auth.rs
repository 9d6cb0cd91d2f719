//! Authentication extractors and session identity helpers.
//!
//! A caller is either a signed-in user (`CURRENT_USER` in the session) or an
//! anonymous guest whose owner id was allocated at checkout (`GUEST_ID`).

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use plateshop_core::OwnerId;

use crate::error::AppError;
use crate::models::{Caller, CurrentUser, session_keys};

/// Read the signed-in user, if any.
async fn session_user(session: &Session) -> Option<CurrentUser> {
    session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

/// Read the guest owner id, if one was allocated.
async fn session_guest(session: &Session) -> Option<OwnerId> {
    session
        .get::<OwnerId>(session_keys::GUEST_ID)
        .await
        .ok()
        .flatten()
}

fn session_from_parts(parts: &Parts) -> Result<&Session, AppError> {
    parts
        .extensions
        .get::<Session>()
        .ok_or_else(|| AppError::Internal("session layer missing".to_owned()))
}

/// Extractor that requires a signed-in user.
///
/// Rejects with `unauthorized` when nobody is logged in.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.email)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = session_from_parts(parts)?;
        let user = session_user(session)
            .await
            .ok_or_else(|| AppError::Unauthorized("login required".to_owned()))?;

        Ok(Self(user))
    }
}

/// Extractor that requires a signed-in operator.
///
/// Rejects with `unauthorized` when nobody is logged in and `forbidden` for
/// customers.
pub struct RequireOperator(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireOperator
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;

        if !user.role.is_operator() {
            return Err(AppError::Forbidden("operator role required".to_owned()));
        }

        Ok(Self(user))
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAuth`, this does not reject the request if nobody is logged in.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => session_user(session).await,
            None => None,
        };

        Ok(Self(user))
    }
}

/// Extractor for the identity an existing order is accessed with.
///
/// A signed-in user wins over a guest id held by the same session. Rejects
/// with `unauthorized` when the session carries neither.
pub struct SessionCaller(pub Caller);

impl<S> FromRequestParts<S> for SessionCaller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = session_from_parts(parts)?;

        if let Some(user) = session_user(session).await {
            return Ok(Self(Caller::user(&user)));
        }

        session_guest(session)
            .await
            .map(|guest| Self(Caller::guest(guest)))
            .ok_or_else(|| AppError::Unauthorized("no active session".to_owned()))
    }
}

/// The caller for a checkout, allocating a guest owner id when needed.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn caller_or_new_guest(
    session: &Session,
    user: Option<&CurrentUser>,
) -> Result<Caller, tower_sessions::session::Error> {
    if let Some(user) = user {
        return Ok(Caller::user(user));
    }

    if let Some(guest) = session_guest(session).await {
        return Ok(Caller::guest(guest));
    }

    let guest = OwnerId::random();
    session.insert(session_keys::GUEST_ID, guest).await?;
    tracing::debug!(%guest, "Allocated guest owner id");
    Ok(Caller::guest(guest))
}

/// Helper to set the current user in the session.
///
/// Cycles the session id first so a pre-login id cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Helper to clear the session (logout).
///
/// Drops both the user and any guest identity.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::Internal(format!("session error: {err}"))
    }
}
