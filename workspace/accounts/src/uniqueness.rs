//! Username and email uniqueness checks shared by sign-up and account edits.

use model::entities::user;
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter, SqlErr};
use tracing::debug;

use crate::error::{AccountError, FieldErrors};

pub const USERNAME_TAKEN: &str = "That username is taken. Please choose a different one.";
pub const EMAIL_TAKEN: &str = "That email is taken. Please choose a different one.";

/// Field errors for each of `username` / `email` already held by someone.
///
/// `None` skips the check for that field.
pub async fn conflicts<C: ConnectionTrait>(
    db: &C,
    username: Option<&str>,
    email: Option<&str>,
) -> Result<FieldErrors, DbErr> {
    let mut fields = FieldErrors::new();

    if let Some(username) = username {
        let taken = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .count(db)
            .await?
            > 0;
        if taken {
            debug!("Username {} already registered", username);
            fields.add("username", USERNAME_TAKEN);
        }
    }

    if let Some(email) = email {
        let taken = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .count(db)
            .await?
            > 0;
        if taken {
            debug!("Email already registered");
            fields.add("email", EMAIL_TAKEN);
        }
    }

    Ok(fields)
}

/// Turn a unique-constraint failure into the matching field error.
///
/// Covers the window between [`conflicts`] and the write, where a concurrent
/// request may have claimed the same value.
pub fn map_write_error(err: DbErr) -> AccountError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => {
            debug!("Unique constraint violated on write: {}", detail);
            if detail.contains("email") {
                AccountError::Validation(FieldErrors::single("email", EMAIL_TAKEN))
            } else {
                AccountError::Validation(FieldErrors::single("username", USERNAME_TAKEN))
            }
        }
        _ => AccountError::Database(err),
    }
}
