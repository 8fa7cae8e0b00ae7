//! Account page: pre-populate from the stored user, apply submitted changes.

use model::entities::user;
use sea_orm::{ActiveModelTrait, ConnectionTrait, DbErr, Set, TransactionTrait};
use tracing::{debug, info, instrument, trace};

use crate::error::AccountError;
use crate::forms::{AccountForm, AccountUpdate};
use crate::images::{ImageProcessor, allowed_extension, extension_message};
use crate::uniqueness;

/// Applies account form submissions to users, storing new pictures on the way.
#[derive(Clone, Debug)]
pub struct ProfileUpdater {
    images: ImageProcessor,
}

impl ProfileUpdater {
    pub fn new(images: ImageProcessor) -> Self {
        Self { images }
    }

    pub fn images(&self) -> &ImageProcessor {
        &self.images
    }

    /// Form values for an unsubmitted account page.
    pub fn prefill(user: &user::Model) -> AccountForm {
        AccountForm {
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }

    /// Validate and apply `update` to `user` in one transaction.
    ///
    /// The picture is processed only after the form passes validation, and
    /// `image_file` is only touched once the new file is safely on disk. A
    /// failed commit removes that file again, so either everything changes or
    /// nothing does.
    #[instrument(skip_all, fields(user_id = user.id))]
    pub async fn update<C>(
        &self,
        db: &C,
        user: user::Model,
        update: AccountUpdate,
    ) -> Result<user::Model, AccountError>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        trace!("Entering update function");
        let form = update.form.normalized();
        let picture = update.picture.filter(|p| !p.is_empty());

        let mut errors = form.check();
        if let Some(picture) = &picture {
            if allowed_extension(&picture.file_name).is_none() {
                errors.add("picture", extension_message());
            }
        }
        if errors.is_empty() {
            let username = (form.username != user.username).then_some(form.username.as_str());
            let email = (form.email != user.email).then_some(form.email.as_str());
            errors.merge(uniqueness::conflicts(db, username, email).await?);
        }
        if !errors.is_empty() {
            debug!("Account update rejected: {:?}", errors);
            return Err(AccountError::Validation(errors));
        }

        let image_file = match picture {
            Some(picture) => Some(self.images.process(picture).await?),
            None => None,
        };

        match commit(db, &user, &form, image_file.as_deref()).await {
            Ok(updated) => {
                info!(
                    "User {} updated (username: {}, new picture: {})",
                    updated.id,
                    updated.username,
                    image_file.is_some()
                );
                Ok(updated)
            }
            Err(e) => {
                if let Some(stored) = &image_file {
                    self.images.discard(stored).await;
                }
                Err(e)
            }
        }
    }
}

async fn commit<C>(
    db: &C,
    user: &user::Model,
    form: &AccountForm,
    image_file: Option<&str>,
) -> Result<user::Model, AccountError>
where
    C: ConnectionTrait + TransactionTrait,
{
    let txn = db.begin().await?;

    let mut active: user::ActiveModel = user.clone().into();
    active.username = Set(form.username.clone());
    active.email = Set(form.email.clone());
    if let Some(image_file) = image_file {
        active.image_file = Set(image_file.to_string());
    }

    // Dropping `txn` on the error paths rolls back.
    let updated = active.update(&txn).await.map_err(|e| match e {
        DbErr::RecordNotUpdated => AccountError::UserNotFound(user.id),
        other => uniqueness::map_write_error(other),
    })?;
    txn.commit().await?;
    Ok(updated)
}
