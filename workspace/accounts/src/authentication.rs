use model::entities::user;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use tracing::{debug, info, instrument, trace};

use crate::credentials::PasswordHasher;
use crate::error::AccountError;
use crate::forms::{LoginForm, normalize_email};

/// Check a login form against stored users.
///
/// Unknown email and wrong password both yield
/// [`AccountError::AuthenticationFailure`] after the same amount of bcrypt
/// work, so neither the error nor its timing reveals which one happened.
#[instrument(skip_all)]
pub async fn authenticate<C: ConnectionTrait>(
    db: &C,
    hasher: &PasswordHasher,
    form: &LoginForm,
) -> Result<user::Model, AccountError> {
    trace!("Entering authenticate function");

    let errors = form.check();
    if !errors.is_empty() {
        return Err(AccountError::Validation(errors));
    }

    let email = normalize_email(&form.email);
    let found = user::Entity::find()
        .filter(user::Column::Email.eq(email))
        .one(db)
        .await?;

    let stored = found.as_ref().map(|user| user.password.as_str());
    let verified = hasher.verify_async(&form.password, stored).await?;

    match found {
        Some(user) if verified => {
            info!("User {} authenticated", user.id);
            Ok(user)
        }
        Some(user) => {
            debug!("Password mismatch for user {}", user.id);
            Err(AccountError::AuthenticationFailure)
        }
        None => {
            debug!("No user for submitted email");
            Err(AccountError::AuthenticationFailure)
        }
    }
}
