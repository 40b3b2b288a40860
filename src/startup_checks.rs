use crate::Config;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum StartupCheckError {
    #[error("Photo directory does not exist: {0}")]
    PhotosDirectoryMissing(String),

    #[error("Photo directory is not accessible: {0}")]
    PhotosDirectoryUnreadable(String),

    #[error("Static files directory does not exist: {0}")]
    StaticDirectoryMissing(String),
}

/// None of these are fatal: the server degrades to an empty catalog or a
/// missing frontend and keeps running.
pub async fn perform_startup_checks(config: &Config) -> Result<(), Vec<StartupCheckError>> {
    let mut errors = Vec::new();

    info!("Performing startup checks...");

    let photos_dir = Path::new(&config.photos_dir);
    if !photos_dir.exists() {
        error!("Photo directory does not exist: {:?}", photos_dir);
        error!("Create it or update photosDir in the config file");
        errors.push(StartupCheckError::PhotosDirectoryMissing(
            photos_dir.display().to_string(),
        ));
    } else {
        match tokio::fs::read_dir(photos_dir).await {
            Ok(_) => info!("Photo directory is accessible: {:?}", photos_dir),
            Err(e) => {
                error!("Photo directory is not accessible: {}", e);
                errors.push(StartupCheckError::PhotosDirectoryUnreadable(
                    photos_dir.display().to_string(),
                ));
            }
        }
    }

    let static_dir = Path::new(&config.static_dir);
    if !static_dir.exists() {
        warn!("Static files directory does not exist: {:?}", static_dir);
        warn!("The kiosk frontend will not be served");
        errors.push(StartupCheckError::StaticDirectoryMissing(
            static_dir.display().to_string(),
        ));
    } else {
        info!("Static files directory exists: {:?}", static_dir);
    }

    if config.weather.enabled && !config.weather.is_configured() {
        warn!("Weather is enabled but no OpenWeatherMap API key is configured");
    }

    if errors.is_empty() {
        info!("All startup checks passed");
        Ok(())
    } else {
        warn!("Startup checks found {} problems", errors.len());
        Err(errors)
    }
}
