use crate::handlers::{
    account::{account_page, update_account},
    auth::{login, login_page, logout, register, register_page},
    health::health_check,
    pages::{about, home},
};
use crate::schemas::{ApiDoc, AppState};
use crate::session::SESSION_COOKIE;
use crate::views::PROFILE_PICS_URL;
use axum::{extract::DefaultBodyLimit, routing::get, Router};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, services::ServeDir, timeout::TimeoutLayer, trace::TraceLayer,
};
use tower_sessions::{cookie::SameSite, Expiry, SessionManagerLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Create application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    let settings = state.settings.clone();

    let session_layer = SessionManagerLayer::new(state.sessions.clone())
        .with_name(SESSION_COOKIE)
        .with_http_only(true)
        .with_same_site(SameSite::Lax)
        .with_secure(settings.secure_cookies)
        .with_expiry(Expiry::OnSessionEnd);

    let pictures = ServeDir::new(state.profiles.images().dir());

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Pages
        .route("/", get(home))
        .route("/home", get(home))
        .route("/about", get(about))
        // Accounts and login state
        .route("/register", get(register_page).post(register))
        .route("/login", get(login_page).post(login))
        .route("/logout", get(logout))
        .route("/account", get(account_page).post(update_account))
        .layer(DefaultBodyLimit::max(settings.max_upload_bytes))
        // Stored profile pictures
        .nest_service(PROFILE_PICS_URL, pictures)
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(Duration::from_secs(settings.request_timeout_secs)))
                .layer(session_layer),
        )
        .with_state(state)
}
