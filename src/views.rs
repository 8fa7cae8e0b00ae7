//! Page view models. A page is rendered as JSON naming its template, so any
//! front end can turn it into HTML.

use accounts::FieldErrors;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::flash::Flash;
use crate::session::AuthSession;

/// Site name shown in every title.
pub const SITE_TITLE: &str = "Quill Blog";

/// URL prefix stored pictures are served under.
pub const PROFILE_PICS_URL: &str = "/static/profile_pics";

pub fn picture_url(image_file: &str) -> String {
    format!("{}/{}", PROFILE_PICS_URL, image_file)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Page<T> {
    pub template: String,
    pub title: String,
    pub authenticated: bool,
    pub flashes: Vec<Flash>,
    pub context: T,
}

/// A form echoed back with its field errors.
#[derive(Debug, Serialize, Deserialize)]
pub struct FormView<F> {
    pub form: F,
    pub errors: FieldErrors,
}

impl<F> FormView<F> {
    pub fn new(form: F) -> Self {
        Self {
            form,
            errors: FieldErrors::new(),
        }
    }

    pub fn with_errors(form: F, errors: FieldErrors) -> Self {
        Self { form, errors }
    }
}

fn page_title(title: Option<&str>) -> String {
    match title {
        Some(title) => format!("{} - {}", SITE_TITLE, title),
        None => SITE_TITLE.to_string(),
    }
}

/// Render `template` with `context`, draining the session's flashes.
pub async fn render<T: Serialize>(
    session: &AuthSession,
    template: &str,
    title: Option<&str>,
    context: T,
) -> Result<Response, AppError> {
    render_with_status(session, StatusCode::OK, template, title, context).await
}

pub async fn render_with_status<T: Serialize>(
    session: &AuthSession,
    status: StatusCode,
    template: &str,
    title: Option<&str>,
    context: T,
) -> Result<Response, AppError> {
    let page = Page {
        template: template.to_string(),
        title: page_title(title),
        authenticated: session.is_authenticated().await?,
        flashes: session.take_flashes().await?,
        context,
    };
    Ok((status, Json(page)).into_response())
}
