use anyhow::{Context, Result};
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};
use tracing::{debug, error, info, trace};

/// Connect to `database_url` and apply every pending migration.
pub async fn run_migrations(database_url: &str) -> Result<DatabaseConnection> {
    trace!("Attempting to connect to database");
    let db = match Database::connect(database_url).await {
        Ok(connection) => {
            info!("Successfully connected to database");
            connection
        }
        Err(e) => {
            error!("Failed to connect to database '{}': {}", database_url, e);
            return Err(e).context("Database connection failed");
        }
    };

    info!("Running database migrations");
    match Migrator::up(&db, None).await {
        Ok(_) => {
            info!("Database migrations completed successfully");
            debug!("All pending migrations have been applied");
        }
        Err(e) => {
            error!("Failed to run database migrations: {}", e);
            return Err(e).context("Migrations failed");
        }
    }
    Ok(db)
}

pub async fn init_database(database_url: &str) -> Result<()> {
    trace!("Entering init_database function");
    info!("Initializing database");
    debug!("Database URL: {}", database_url);

    let db = run_migrations(database_url).await?;
    db.close().await.context("Failed to close database connection")?;

    info!("Database initialization completed successfully!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::entities::user;
    use sea_orm::EntityTrait;

    #[tokio::test]
    async fn migrations_create_the_schema() {
        let db = run_migrations("sqlite::memory:").await.unwrap();
        assert!(user::Entity::find().all(&db).await.unwrap().is_empty());

        // Applying again is a no-op
        Migrator::up(&db, None).await.unwrap();
    }

    #[tokio::test]
    async fn init_creates_sqlite_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blog.db");
        let url = format!("sqlite://{}?mode=rwc", path.display());

        init_database(&url).await.unwrap();
        assert!(path.exists());
    }
}
