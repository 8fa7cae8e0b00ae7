use std::path::{Path, PathBuf};
use std::sync::Arc;

use accounts::{ImageProcessor, PasswordHasher, ProfileUpdater};
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use sea_orm::Database;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::schemas::AppState;
use crate::session_store::SeaOrmSessionStore;

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "quillblog";

/// Runtime settings. Every field has a default so an empty environment works.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub database_url: String,
    pub bind_address: String,
    /// Where profile pictures are stored and served from
    pub profile_pics_dir: PathBuf,
    /// Maximum width and height of stored pictures, in pixels
    pub thumbnail_size: u32,
    pub bcrypt_cost: u32,
    /// Inactivity lifetime of a "remember me" session
    pub remember_days: i64,
    pub secure_cookies: bool,
    pub max_upload_bytes: usize,
    pub request_timeout_secs: u64,
    /// How often expired sessions are deleted
    pub session_cleanup_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "sqlite://quillblog.db?mode=rwc".to_string(),
            bind_address: "0.0.0.0:3000".to_string(),
            profile_pics_dir: PathBuf::from("static/profile_pics"),
            thumbnail_size: accounts::images::DEFAULT_THUMBNAIL_SIZE,
            bcrypt_cost: accounts::credentials::DEFAULT_COST,
            remember_days: 365,
            secure_cookies: false,
            max_upload_bytes: 5 * 1024 * 1024,
            request_timeout_secs: 30,
            session_cleanup_secs: 3600,
        }
    }
}

impl Settings {
    /// Layer defaults, the config file and `QUILLBLOG_*` variables.
    ///
    /// An explicit `config_file` must exist; the default `quillblog.toml` is
    /// optional.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        trace!("Entering Settings::load function");
        dotenvy::dotenv().ok();

        let file = match config_file {
            Some(path) => {
                debug!("Using config file {}", path.display());
                File::from(path).required(true)
            }
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings: Settings = Config::builder()
            .add_source(Config::try_from(&Settings::default())?)
            .add_source(file)
            .add_source(Environment::with_prefix("QUILLBLOG").try_parsing(true))
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        debug!("Loaded settings: {:?}", settings);
        Ok(settings)
    }

    /// Apply command line overrides, which win over every other layer.
    pub fn with_overrides(mut self, database_url: Option<String>, bind_address: Option<String>) -> Self {
        if let Some(url) = database_url {
            self.database_url = url;
        }
        if let Some(address) = bind_address {
            self.bind_address = address;
        }
        self
    }
}

/// Connect to the database and build the shared application state.
pub async fn initialize_app_state(settings: Settings) -> Result<AppState> {
    info!("Connecting to database: {}", settings.database_url);
    let db = Database::connect(&settings.database_url)
        .await
        .with_context(|| format!("Failed to connect to {}", settings.database_url))?;

    let hasher = PasswordHasher::new(settings.bcrypt_cost).context("Invalid bcrypt cost")?;

    let images = ImageProcessor::new(&settings.profile_pics_dir, settings.thumbnail_size);
    images.ensure_dir().await.with_context(|| {
        format!(
            "Failed to create picture directory {}",
            settings.profile_pics_dir.display()
        )
    })?;
    images
        .ensure_placeholder(model::entities::user::DEFAULT_IMAGE_FILE)
        .await
        .context("Failed to create the default profile picture")?;

    Ok(AppState {
        sessions: SeaOrmSessionStore::new(db.clone()),
        db,
        hasher,
        profiles: ProfileUpdater::new(images),
        settings: Arc::new(settings),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_a_file() {
        let settings = Settings::default();
        assert_eq!(settings.thumbnail_size, 125);
        assert_eq!(settings.remember_days, 365);
        assert_eq!(settings.bind_address, "0.0.0.0:3000");
        assert!(!settings.secure_cookies);
        assert_eq!(settings.session_cleanup_secs, 3600);
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "thumbnail_size = 64\nsecure_cookies = true\nprofile_pics_dir = \"/srv/pics\"\n",
        )
        .unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.thumbnail_size, 64);
        assert!(settings.secure_cookies);
        assert_eq!(settings.profile_pics_dir, PathBuf::from("/srv/pics"));
        assert_eq!(settings.bcrypt_cost, Settings::default().bcrypt_cost);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Settings::load(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn command_line_wins() {
        let settings = Settings::default()
            .with_overrides(Some("sqlite::memory:".to_string()), None);
        assert_eq!(settings.database_url, "sqlite::memory:");
        assert_eq!(settings.bind_address, "0.0.0.0:3000");
    }
}
