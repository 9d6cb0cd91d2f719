//! Session-related types.
//!
//! Types stored in the session for identity, and the caller identity handed to
//! services.

use serde::{Deserialize, Serialize};

use plateshop_core::{Email, OwnerId, UserId, UserRole};

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// Role at login time.
    pub role: UserRole,
}

/// Who is calling a workflow operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub owner_id: OwnerId,
    pub is_operator: bool,
}

impl Caller {
    /// An anonymous checkout identified by a session-scoped guest id.
    #[must_use]
    pub const fn guest(owner_id: OwnerId) -> Self {
        Self {
            owner_id,
            is_operator: false,
        }
    }

    #[must_use]
    pub fn user(user: &CurrentUser) -> Self {
        Self {
            owner_id: OwnerId::from(user.id),
            is_operator: user.role.is_operator(),
        }
    }
}

/// Session keys for identity data.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the guest owner id allocated on anonymous checkout.
    pub const GUEST_ID: &str = "guest_id";
}
