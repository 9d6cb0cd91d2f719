//! Authentication service.
//!
//! Email and password accounts with Argon2id hashes. Session handling lives in
//! the middleware; this service only decides who the caller is.

mod error;

pub use error::AuthError;

use std::sync::Arc;
use std::time::Duration;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tracing::{info, instrument};

use plateshop_core::{Email, UserId};

use super::with_deadline;
use crate::db::{RepositoryError, Storage};
use crate::models::session::CurrentUser;
use crate::models::user::{NewUser, ProfileUpdate, RegisterRequest, UpdateProfileRequest, User};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Authentication service.
///
/// Handles user registration, login and profile management.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn Storage>,
    timeout: Duration,
}

impl AuthService {
    /// Create a new authentication service.
    #[must_use]
    pub fn new(store: Arc<dyn Storage>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Register a new customer.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email or ID number is taken.
    #[instrument(skip(self, req), fields(email = %req.email))]
    pub async fn register(&self, req: &RegisterRequest) -> Result<User, AuthError> {
        let new_user = NewUser {
            name: required(&req.name, "name")?,
            email: Email::parse(&req.email)?,
            phone: required(&req.phone, "phone")?,
            id_number: required(&req.id_number, "ID number")?,
            address: optional(req.address.as_deref()),
            city: optional(req.city.as_deref()),
        };

        validate_password(&req.password)?;
        let password_hash = hash_password(&req.password)?;

        let user = with_deadline(
            self.timeout,
            "create_user",
            self.store.create_user(&new_user, &password_hash),
        )
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(msg) => AuthError::UserAlreadyExists(msg),
            other => AuthError::Repository(other),
        })?;

        info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = with_deadline(
            self.timeout,
            "get_password_hash",
            self.store.get_password_hash(&email),
        )
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        info!(user_id = %user.id, "User logged in");
        Ok(user)
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, AuthError> {
        with_deadline(self.timeout, "get_user", self.store.get_user(user_id))
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Update the signed-in user's profile.
    ///
    /// An empty request returns the stored profile unchanged.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingField` if a required field is set to blank.
    pub async fn update_profile(
        &self,
        user_id: UserId,
        req: &UpdateProfileRequest,
    ) -> Result<User, AuthError> {
        let update = ProfileUpdate {
            name: req.name.as_deref().map(|n| required(n, "name")).transpose()?,
            phone: req.phone.as_deref().map(|p| required(p, "phone")).transpose()?,
            address: optional(req.address.as_deref()),
            city: optional(req.city.as_deref()),
        };

        if update.is_empty() {
            return self.get_user(user_id).await;
        }

        with_deadline(
            self.timeout,
            "update_profile",
            self.store.update_profile(user_id, &update),
        )
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AuthError::UserNotFound,
            other => AuthError::Repository(other),
        })
    }

    /// Every registered user. Operators only.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Forbidden` for non-operators.
    pub async fn list_users(&self, caller: &CurrentUser) -> Result<Vec<User>, AuthError> {
        if !caller.role.is_operator() {
            return Err(AuthError::Forbidden);
        }
        Ok(with_deadline(self.timeout, "list_users", self.store.list_users()).await?)
    }
}

fn required(value: &str, field: &'static str) -> Result<String, AuthError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AuthError::MissingField(field));
    }
    Ok(value.to_owned())
}

fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
