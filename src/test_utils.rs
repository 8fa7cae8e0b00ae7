#[cfg(test)]
pub mod test_utils {
    use std::sync::Arc;

    use accounts::credentials::MIN_COST;
    use accounts::{ImageProcessor, PasswordHasher, ProfileUpdater, RegistrationForm};
    use axum::Router;
    use axum_test::TestServer;
    use chrono::{TimeZone, Utc};
    use migration::{Migrator, MigratorTrait};
    use model::entities::{post, user};
    use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};
    use tempfile::TempDir;
    use tracing::Level;
    use tracing_subscriber::FmtSubscriber;

    use crate::config::Settings;
    use crate::router::create_router;
    use crate::schemas::AppState;
    use crate::session_store::SeaOrmSessionStore;

    pub const TEST_PASSWORD: &str = "testing123";

    /// Create an in-memory SQLite database for testing
    pub async fn setup_test_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to connect to in-memory database");

        // Run migrations
        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        db
    }

    /// AppState over an in-memory database and a temporary picture directory.
    ///
    /// The directory lives as long as the returned guard.
    pub async fn setup_test_app_state() -> (AppState, TempDir) {
        let db = setup_test_db().await;
        let pictures = tempfile::tempdir().expect("Failed to create picture directory");

        let settings = Settings {
            database_url: "sqlite::memory:".to_string(),
            profile_pics_dir: pictures.path().to_path_buf(),
            bcrypt_cost: MIN_COST,
            ..Settings::default()
        };

        let images = ImageProcessor::new(pictures.path(), settings.thumbnail_size);
        images
            .ensure_placeholder(user::DEFAULT_IMAGE_FILE)
            .await
            .expect("Failed to create placeholder picture");

        let state = AppState {
            sessions: SeaOrmSessionStore::new(db.clone()),
            db,
            hasher: PasswordHasher::new(MIN_COST).expect("Failed to build hasher"),
            profiles: ProfileUpdater::new(images),
            settings: Arc::new(settings),
        };
        (state, pictures)
    }

    /// Register a user with [`TEST_PASSWORD`].
    pub async fn create_test_user(state: &AppState, username: &str, email: &str) -> user::Model {
        let form = RegistrationForm {
            username: username.to_string(),
            email: email.to_string(),
            password: TEST_PASSWORD.to_string(),
            confirm_password: TEST_PASSWORD.to_string(),
        };
        accounts::register(&state.db, &state.hasher, form)
            .await
            .expect("Failed to create test user")
    }

    pub async fn create_test_post(state: &AppState, author: &user::Model, title: &str, day: u32) -> post::Model {
        post::ActiveModel {
            title: Set(title.to_string()),
            content: Set(format!("{} content", title)),
            date_posted: Set(Utc.with_ymd_and_hms(2018, 4, day, 12, 0, 0).unwrap()),
            user_id: Set(author.id),
            ..Default::default()
        }
        .insert(&state.db)
        .await
        .expect("Failed to create test post")
    }

    /// Initialize tracing for tests with output to STDERR.
    ///
    /// The log level is determined by the RUST_LOG environment variable,
    /// defaulting to WARN if not set.
    pub fn init_test_tracing() -> tracing::subscriber::DefaultGuard {
        let log_level = std::env::var("RUST_LOG")
            .ok()
            .and_then(|level| match level.to_uppercase().as_str() {
                "ERROR" => Some(Level::ERROR),
                "WARN" => Some(Level::WARN),
                "INFO" => Some(Level::INFO),
                "DEBUG" => Some(Level::DEBUG),
                "TRACE" => Some(Level::TRACE),
                _ => None,
            })
            .unwrap_or(Level::WARN);

        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    /// Create axum app for testing
    pub fn setup_test_app(state: AppState) -> Router {
        create_router(state)
    }

    /// Test server that keeps cookies between requests, like a browser.
    pub fn setup_test_server(state: AppState) -> TestServer {
        let mut server = TestServer::new(setup_test_app(state)).expect("Failed to start test server");
        server.do_save_cookies();
        server
    }
}
