use accounts::{AccountError, LoginForm, RegistrationForm, authenticate, register as register_user};
use axum::extract::{Form, Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use tracing::{debug, info, instrument, trace};

use crate::error::AppError;
use crate::flash::FlashCategory;
use crate::schemas::{AppState, NextQuery};
use crate::session::{AuthSession, LOGIN_PATH, safe_next};
use crate::views::{FormView, render};

pub const REGISTERED_MESSAGE: &str = "Your account has been created! You are now able to log in.";
pub const LOGIN_FAILED_MESSAGE: &str = "Login unsuccessful. Please check your email and password.";

fn home_redirect() -> Response {
    Redirect::to("/").into_response()
}

/// Sign-up page
#[utoipa::path(
    get,
    path = "/register",
    tag = "auth",
    responses(
        (status = 200, description = "Rendered `register.html` page"),
        (status = 303, description = "Already signed in, redirect to `/`")
    )
)]
#[instrument(skip_all)]
pub async fn register_page(session: AuthSession) -> Result<Response, AppError> {
    if session.is_authenticated().await? {
        return Ok(home_redirect());
    }
    render(
        &session,
        "register.html",
        Some("Register"),
        FormView::new(RegistrationForm::default()),
    )
    .await
}

/// Create an account
#[utoipa::path(
    post,
    path = "/register",
    tag = "auth",
    request_body(content = RegistrationForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Account created, redirect to `/login`; or already signed in, redirect to `/`"),
        (status = 200, description = "Form re-rendered with field errors")
    )
)]
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    session: AuthSession,
    Form(form): Form<RegistrationForm>,
) -> Result<Response, AppError> {
    trace!("Entering register function");
    if session.is_authenticated().await? {
        return Ok(home_redirect());
    }

    let echo = form.redacted();
    match register_user(&state.db, &state.hasher, form).await {
        Ok(user) => {
            info!("Registered user {} ({})", user.id, user.username);
            session.flash(FlashCategory::Success, REGISTERED_MESSAGE).await?;
            Ok(Redirect::to(LOGIN_PATH).into_response())
        }
        Err(AccountError::Validation(errors)) => {
            debug!("Registration rejected: {:?}", errors);
            render(
                &session,
                "register.html",
                Some("Register"),
                FormView::with_errors(echo.normalized(), errors),
            )
            .await
        }
        Err(e) => Err(e.into()),
    }
}

/// Sign-in page
#[utoipa::path(
    get,
    path = "/login",
    tag = "auth",
    params(NextQuery),
    responses(
        (status = 200, description = "Rendered `login.html` page"),
        (status = 303, description = "Already signed in, redirect to `/`")
    )
)]
#[instrument(skip_all)]
pub async fn login_page(session: AuthSession) -> Result<Response, AppError> {
    if session.is_authenticated().await? {
        return Ok(home_redirect());
    }
    render(
        &session,
        "login.html",
        Some("Login"),
        FormView::new(LoginForm::default()),
    )
    .await
}

/// Sign in
#[utoipa::path(
    post,
    path = "/login",
    tag = "auth",
    params(NextQuery),
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Signed in, redirect to `next` when it is a local path, otherwise `/`"),
        (status = 200, description = "Form re-rendered with field errors or a failure flash")
    )
)]
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: AuthSession,
    Query(query): Query<NextQuery>,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    trace!("Entering login function");
    if session.is_authenticated().await? {
        return Ok(home_redirect());
    }

    match authenticate(&state.db, &state.hasher, &form).await {
        Ok(user) => {
            session.login(user.id, form.remember).await?;
            let target = match query.next.as_deref() {
                Some(next) => safe_next(next).unwrap_or_else(|| {
                    debug!("Ignoring unsafe next target {:?}", next);
                    "/"
                }),
                None => "/",
            };
            Ok(Redirect::to(target).into_response())
        }
        Err(AccountError::Validation(errors)) => {
            render(
                &session,
                "login.html",
                Some("Login"),
                FormView::with_errors(form.redacted(), errors),
            )
            .await
        }
        Err(AccountError::AuthenticationFailure) => {
            session.flash(FlashCategory::Danger, LOGIN_FAILED_MESSAGE).await?;
            render(
                &session,
                "login.html",
                Some("Login"),
                FormView::new(form.redacted()),
            )
            .await
        }
        Err(e) => Err(e.into()),
    }
}

/// Sign out
#[utoipa::path(
    get,
    path = "/logout",
    tag = "auth",
    responses(
        (status = 303, description = "Session destroyed, redirect to `/`")
    )
)]
#[instrument(skip_all)]
pub async fn logout(session: AuthSession) -> Result<Response, AppError> {
    session.logout().await?;
    Ok(home_redirect())
}
