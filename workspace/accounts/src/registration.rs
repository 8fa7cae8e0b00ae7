use model::entities::user;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set};
use tracing::{debug, info, instrument, trace};

use crate::credentials::PasswordHasher;
use crate::error::AccountError;
use crate::forms::RegistrationForm;
use crate::uniqueness;

/// Create a user from a sign-up form. The password is stored hashed only.
#[instrument(skip_all, fields(username = %form.username))]
pub async fn register<C: ConnectionTrait>(
    db: &C,
    hasher: &PasswordHasher,
    form: RegistrationForm,
) -> Result<user::Model, AccountError> {
    trace!("Entering register function");
    let form = form.normalized();

    let mut errors = form.check();
    if errors.is_empty() {
        errors.merge(
            uniqueness::conflicts(db, Some(form.username.as_str()), Some(form.email.as_str())).await?,
        );
    }
    if !errors.is_empty() {
        debug!("Registration rejected: {:?}", errors);
        return Err(AccountError::Validation(errors));
    }

    let password = hasher.hash_async(&form.password).await?;
    let new_user = user::ActiveModel {
        username: Set(form.username.clone()),
        email: Set(form.email.clone()),
        password: Set(password),
        ..Default::default()
    };

    let created = new_user
        .insert(db)
        .await
        .map_err(uniqueness::map_write_error)?;
    info!("User created with ID: {}, username: {}", created.id, created.username);
    Ok(created)
}
