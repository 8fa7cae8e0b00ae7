use std::sync::Arc;

use accounts::{AccountForm, LoginForm, PasswordHasher, ProfileUpdater, RegistrationForm};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, OpenApi, ToSchema};

use crate::config::Settings;
use crate::flash::{Flash, FlashCategory};
use crate::session_store::SeaOrmSessionStore;

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Database connection
    pub db: DatabaseConnection,
    /// Password hashing with the configured work factor
    pub hasher: PasswordHasher,
    /// Account edits and the picture pipeline behind them
    pub profiles: ProfileUpdater,
    /// Server-side session storage, in the application database
    pub sessions: SeaOrmSessionStore,
    pub settings: Arc<Settings>,
}

/// Error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    pub code: String,
    /// Success status (always false for errors)
    pub success: bool,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
}

/// Post-login destination
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NextQuery {
    /// Relative path to return to after signing in
    pub next: Option<String>,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::pages::home,
        crate::handlers::pages::about,
        crate::handlers::auth::register_page,
        crate::handlers::auth::register,
        crate::handlers::auth::login_page,
        crate::handlers::auth::login,
        crate::handlers::auth::logout,
        crate::handlers::account::account_page,
        crate::handlers::account::update_account,
    ),
    components(
        schemas(
            ErrorResponse,
            HealthResponse,
            Flash,
            FlashCategory,
            RegistrationForm,
            LoginForm,
            AccountForm,
            crate::handlers::account::AccountUpload,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "pages", description = "Public pages"),
        (name = "auth", description = "Registration, login and logout"),
        (name = "account", description = "Profile of the signed-in user"),
    ),
    info(
        title = "Quillblog",
        description = "A small blog: accounts, sessions, profile pictures and a post listing",
        version = "0.1.0",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
pub struct ApiDoc;
