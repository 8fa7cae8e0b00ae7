//! Account core of the blog: credentials, profile pictures, sign-up, sign-in
//! and profile edits. Nothing in here knows about HTTP or sessions.

pub mod authentication;
pub mod credentials;
pub mod error;
pub mod forms;
pub mod images;
pub mod profile;
pub mod registration;
pub mod uniqueness;

pub use authentication::authenticate;
pub use credentials::PasswordHasher;
pub use error::{AccountError, FieldErrors};
pub use forms::{AccountForm, AccountUpdate, LoginForm, RegistrationForm};
pub use images::{ImageProcessor, Upload};
pub use profile::ProfileUpdater;
pub use registration::register;

#[cfg(test)]
pub(crate) mod testing {
    use migration::{Migrator, MigratorTrait};
    use sea_orm::{Database, DatabaseConnection};

    /// Create an in-memory SQLite database with all migrations applied
    pub async fn setup_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to connect to in-memory database");

        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        db
    }
}
