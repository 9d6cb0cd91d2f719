//! User domain types.
//!
//! These types represent validated domain objects separate from database row types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use plateshop_core::{Email, UserId, UserRole};

/// A registered customer or operator.
///
/// The password hash is never part of this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub phone: String,
    /// National ID number, unique per user.
    pub id_number: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated registration data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: Email,
    pub phone: String,
    pub id_number: String,
    pub address: Option<String>,
    pub city: Option<String>,
}

/// Profile fields a user may change. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
}

impl ProfileUpdate {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.phone.is_none() && self.address.is_none() && self.city.is_none()
    }

    /// Apply the update to an in-memory user.
    pub fn apply_to(&self, user: &mut User) {
        if let Some(name) = &self.name {
            user.name.clone_from(name);
        }
        if let Some(phone) = &self.phone {
            user.phone.clone_from(phone);
        }
        if let Some(address) = &self.address {
            user.address = Some(address.clone());
        }
        if let Some(city) = &self.city {
            user.city = Some(city.clone());
        }
    }
}

// =============================================================================
// Request Types
// =============================================================================

/// Body of `POST /api/users`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub id_number: String,
    pub password: String,
    pub address: Option<String>,
    pub city: Option<String>,
}

/// Body of `POST /api/users/login`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body of `PUT /api/users/profile`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
}

/// Response of `POST /api/users`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredUser {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub role: UserRole,
}

impl From<&User> for RegisteredUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: UserId::random(),
            name: "Otieno".to_owned(),
            email: Email::parse("otieno@example.com").unwrap(),
            phone: "0700000000".to_owned(),
            id_number: "22334455".to_owned(),
            address: None,
            city: None,
            role: UserRole::Customer,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_profile_update_applies_only_present_fields() {
        let mut user = user();
        let update = ProfileUpdate {
            city: Some("Kisumu".to_owned()),
            ..ProfileUpdate::default()
        };
        update.apply_to(&mut user);
        assert_eq!(user.city.as_deref(), Some("Kisumu"));
        assert_eq!(user.name, "Otieno");
        assert!(ProfileUpdate::default().is_empty());
    }

    #[test]
    fn test_user_json_has_no_password_field() {
        let json = serde_json::to_value(user()).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["idNumber"], "22334455");
    }

    #[test]
    fn test_register_request_rejects_unknown_fields() {
        let body = r#"{"name":"A","email":"a@b.co","phone":"1","idNumber":"2","password":"x","role":"operator"}"#;
        assert!(serde_json::from_str::<RegisterRequest>(body).is_err());
    }
}
