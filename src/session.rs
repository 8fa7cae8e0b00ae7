//! Login state on top of `tower-sessions`.
//!
//! A request is Anonymous until [`AuthSession::login`] stores a user id, and
//! Authenticated while that id names an existing user. Protected handlers take
//! a [`CurrentUser`], which turns Anonymous requests into a redirect to the
//! login page carrying the original destination.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Redirect, Response};
use model::entities::user;
use sea_orm::EntityTrait;
use tower_sessions::{Expiry, Session};
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::error::AppError;
use crate::flash::{self, Flash, FlashCategory};
use crate::schemas::AppState;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "quillblog.sid";

pub const LOGIN_PATH: &str = "/login";

pub const LOGIN_REQUIRED_MESSAGE: &str = "Please log in to access this page.";

const USER_ID_KEY: &str = "user_id";

/// The request's session, seen as a login state.
#[derive(Clone, Debug)]
pub struct AuthSession {
    session: Session,
    remember_for: time::Duration,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthSession {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;
        Ok(Self::new(
            session,
            time::Duration::days(state.settings.remember_days),
        ))
    }
}

impl AuthSession {
    pub fn new(session: Session, remember_for: time::Duration) -> Self {
        Self {
            session,
            remember_for,
        }
    }

    /// Id stored by the last login, whether or not that user still exists.
    pub async fn user_id(&self) -> Result<Option<i32>, AppError> {
        Ok(self.session.get::<i32>(USER_ID_KEY).await?)
    }

    pub async fn is_authenticated(&self) -> Result<bool, AppError> {
        Ok(self.user_id().await?.is_some())
    }

    /// Start an authenticated session for `user_id`.
    ///
    /// The session id is replaced so an id planted before login is useless
    /// afterwards. Without `remember` the cookie dies with the browser
    /// session.
    pub async fn login(&self, user_id: i32, remember: bool) -> Result<(), AppError> {
        trace!("Entering login function");
        self.session.cycle_id().await?;
        self.session.insert(USER_ID_KEY, user_id).await?;

        let expiry = if remember {
            Expiry::OnInactivity(self.remember_for)
        } else {
            Expiry::OnSessionEnd
        };
        self.session.set_expiry(Some(expiry));
        info!("User {} logged in (remember: {})", user_id, remember);
        Ok(())
    }

    /// Drop the whole session. Calling this without a session does nothing.
    pub async fn logout(&self) -> Result<(), AppError> {
        match self.user_id().await? {
            Some(id) => info!("User {} logged out", id),
            None => debug!("Logout without an active login"),
        }
        self.session.flush().await?;
        Ok(())
    }

    pub async fn flash(&self, category: FlashCategory, message: impl Into<String>) -> Result<(), AppError> {
        flash::push(&self.session, Flash::new(category, message)).await?;
        Ok(())
    }

    pub async fn take_flashes(&self) -> Result<Vec<Flash>, AppError> {
        Ok(flash::drain(&self.session).await?)
    }
}

/// The signed-in user. Rejects Anonymous requests with a login redirect.
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub user: user::Model,
    pub session: AuthSession,
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = AuthSession::from_request_parts(parts, state).await?;

        if let Some(id) = session.user_id().await.map_err(IntoResponse::into_response)? {
            let found = user::Entity::find_by_id(id)
                .one(&state.db)
                .await
                .map_err(|e| AppError::from(e).into_response())?;
            match found {
                Some(user) => return Ok(Self { user, session }),
                None => {
                    warn!("Session refers to missing user {}, clearing it", id);
                    session.logout().await.map_err(IntoResponse::into_response)?;
                }
            }
        }

        let destination = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        debug!("Anonymous request for {}, redirecting to login", destination);
        session
            .flash(FlashCategory::Info, LOGIN_REQUIRED_MESSAGE)
            .await
            .map_err(IntoResponse::into_response)?;
        Err(login_redirect(destination).into_response())
    }
}

/// `303` to the login page, remembering where the visitor wanted to go.
pub fn login_redirect(destination: &str) -> Redirect {
    let next: String = url::form_urlencoded::byte_serialize(destination.as_bytes()).collect();
    Redirect::to(&format!("{}?next={}", LOGIN_PATH, next))
}

/// Accept `next` only if it stays on this site.
pub fn safe_next(next: &str) -> Option<&str> {
    let relative = next.starts_with('/')
        && !next.starts_with("//")
        && !next.contains('\\')
        && !next.chars().any(char::is_control)
        && Url::parse(next).is_err();
    relative.then_some(next)
}
