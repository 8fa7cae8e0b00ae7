use accounts::{AccountError, AccountForm, AccountUpdate, FieldErrors, ProfileUpdater, Upload};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, trace, warn};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::flash::FlashCategory;
use crate::schemas::AppState;
use crate::session::{CurrentUser, login_redirect};
use crate::views::{picture_url, render_with_status};

pub const UPDATED_MESSAGE: &str = "Your account has been updated!";
pub const INVALID_IMAGE_MESSAGE: &str = "The uploaded file is not a valid image.";
pub const STORAGE_FAILED_MESSAGE: &str = "Your picture could not be saved. Please try again.";

const ACCOUNT_PATH: &str = "/account";

/// Multipart body accepted by `POST /account`
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct AccountUpload {
    pub username: String,
    pub email: String,
    /// JPEG or PNG; leave empty to keep the current picture
    #[schema(value_type = Option<String>, format = Binary)]
    pub picture: Option<Vec<u8>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccountView {
    pub form: AccountForm,
    pub errors: FieldErrors,
    pub image_url: String,
}

/// Render the account page with an explicit status.
async fn account_view(
    current: &CurrentUser,
    status: StatusCode,
    form: AccountForm,
    errors: FieldErrors,
) -> Result<Response, AppError> {
    let view = AccountView {
        form,
        errors,
        image_url: picture_url(&current.user.image_file),
    };
    render_with_status(&current.session, status, "account.html", Some("Account"), view).await
}

/// Account page, pre-populated from the signed-in user
#[utoipa::path(
    get,
    path = "/account",
    tag = "account",
    responses(
        (status = 200, description = "Rendered `account.html` page"),
        (status = 303, description = "Not signed in, redirect to `/login?next=/account`")
    )
)]
#[instrument(skip_all, fields(user_id = current.user.id))]
pub async fn account_page(current: CurrentUser) -> Result<Response, AppError> {
    trace!("Entering account_page function");
    let form = ProfileUpdater::prefill(&current.user);
    account_view(&current, StatusCode::OK, form, FieldErrors::new()).await
}

/// Update username, email and optionally the profile picture
#[utoipa::path(
    post,
    path = "/account",
    tag = "account",
    request_body(content = AccountUpload, content_type = "multipart/form-data"),
    responses(
        (status = 303, description = "Account updated, redirect to `/account`"),
        (status = 200, description = "Form re-rendered with field errors"),
        (status = 500, description = "Picture could not be written; form re-rendered")
    )
)]
#[instrument(skip_all, fields(user_id = current.user.id))]
pub async fn update_account(
    State(state): State<AppState>,
    current: CurrentUser,
    multipart: Multipart,
) -> Result<Response, AppError> {
    trace!("Entering update_account function");
    let update = read_account_update(multipart).await?;
    let submitted = update.form.clone().normalized();

    match state
        .profiles
        .update(&state.db, current.user.clone(), update)
        .await
    {
        Ok(updated) => {
            info!("Account {} updated", updated.id);
            current
                .session
                .flash(FlashCategory::Success, UPDATED_MESSAGE)
                .await?;
            Ok(Redirect::to(ACCOUNT_PATH).into_response())
        }
        Err(AccountError::Validation(errors)) => {
            debug!("Account update rejected: {:?}", errors);
            account_view(&current, StatusCode::OK, submitted, errors).await
        }
        Err(AccountError::InvalidImage(reason)) => {
            debug!("Uploaded picture rejected: {}", reason);
            let errors = FieldErrors::single("picture", INVALID_IMAGE_MESSAGE);
            account_view(&current, StatusCode::OK, submitted, errors).await
        }
        Err(AccountError::StorageWrite(e)) => {
            error!("Picture storage failed: {}", e);
            current
                .session
                .flash(FlashCategory::Danger, STORAGE_FAILED_MESSAGE)
                .await?;
            account_view(
                &current,
                StatusCode::INTERNAL_SERVER_ERROR,
                submitted,
                FieldErrors::new(),
            )
            .await
        }
        Err(AccountError::UserNotFound(id)) => {
            warn!("User {} vanished during update", id);
            current.session.logout().await?;
            Ok(login_redirect(ACCOUNT_PATH).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// Collect the `username`, `email` and `picture` parts. Unknown parts are
/// skipped; a file input left empty arrives as a part with no bytes.
async fn read_account_update(mut multipart: Multipart) -> Result<AccountUpdate, AppError> {
    let mut update = AccountUpdate::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "username" => update.form.username = field.text().await?,
            "email" => update.form.email = field.text().await?,
            "picture" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                trace!("Received picture {:?} ({} bytes)", file_name, bytes.len());
                update.picture = Some(Upload::new(file_name, bytes.to_vec()));
            }
            other => debug!("Ignoring multipart field {:?}", other),
        }
    }
    Ok(update)
}
