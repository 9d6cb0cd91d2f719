//! User queries for [`PgStore`].
//!
//! Password hashes live on the `users` row but never leave this module except
//! through [`UserStore::get_password_hash`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use plateshop_core::{Email, UserId, UserRole};

use super::{PgStore, RepositoryError, UserStore};
use crate::models::user::{NewUser, ProfileUpdate, User};

const USER_COLUMNS: &str =
    "id, name, email, phone, id_number, address, city, role, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: UserId,
    name: String,
    email: String,
    phone: String,
    id_number: String,
    address: Option<String>,
    city: Option<String>,
    role: UserRole,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct UserWithHashRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            name: row.name,
            email,
            phone: row.phone,
            id_number: row.id_number,
            address: row.address,
            city: row.city,
            role: row.role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Name the unique column a violation came from.
fn user_conflict(err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        let what = match db_err.constraint() {
            Some("users_id_number_key") => "ID number",
            _ => "email",
        };
        return RepositoryError::Conflict(format!("{what} already registered"));
    }
    RepositoryError::Database(err)
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(
        &self,
        user: &NewUser,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r"
            INSERT INTO users (id, name, email, phone, id_number, address, city, password_hash)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(UserId::random())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.id_number)
        .bind(user.address.as_deref())
        .bind(user.city.as_deref())
        .bind(password_hash)
        .fetch_one(self.pool())
        .await
        .map_err(user_conflict)?;

        User::try_from(row)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, UserWithHashRow>(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool())
        .await?;

        match row {
            Some(row) => Ok(Some((User::try_from(row.user)?, row.password_hash))),
            None => Ok(None),
        }
    }

    async fn update_profile(
        &self,
        id: UserId,
        update: &ProfileUpdate,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r"
            UPDATE users
            SET name = COALESCE($2, name),
                phone = COALESCE($3, phone),
                address = COALESCE($4, address),
                city = COALESCE($5, city),
                updated_at = now()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(update.name.as_deref())
        .bind(update.phone.as_deref())
        .bind(update.address.as_deref())
        .bind(update.city.as_deref())
        .fetch_optional(self.pool())
        .await?
        .ok_or(RepositoryError::NotFound)?;

        User::try_from(row)
    }

    async fn list_users(&self) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at"
        ))
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(User::try_from).collect()
    }

    async fn set_role(&self, email: &Email, role: UserRole) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r"
            UPDATE users SET role = $2, updated_at = now()
            WHERE email = $1
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(email)
        .bind(role)
        .fetch_optional(self.pool())
        .await?
        .ok_or(RepositoryError::NotFound)?;

        User::try_from(row)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn row(email: &str) -> UserRow {
        UserRow {
            id: UserId::random(),
            name: "Wanjiku".to_owned(),
            email: email.to_owned(),
            phone: "0712345678".to_owned(),
            id_number: "12345678".to_owned(),
            address: None,
            city: Some("Nairobi".to_owned()),
            role: UserRole::Customer,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_row_into_user() {
        let user = User::try_from(row("w@example.co.ke")).unwrap();
        assert_eq!(user.email.as_str(), "w@example.co.ke");
        assert_eq!(user.role, UserRole::Customer);
    }

    #[test]
    fn test_invalid_email_is_corruption() {
        let err = User::try_from(row("not-an-email")).unwrap_err();
        assert!(matches!(err, RepositoryError::DataCorruption(_)));
    }

    #[test]
    fn test_user_conflict_passes_other_errors_through() {
        assert!(matches!(
            user_conflict(sqlx::Error::PoolClosed),
            RepositoryError::Database(_)
        ));
    }
}
