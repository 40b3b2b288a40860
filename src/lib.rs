use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info};

pub mod api;
pub mod catalog;
pub mod startup_checks;
pub mod static_files;
pub mod sync;
pub mod weather;

/// Everything the server and the kiosk frontend are configured with. Keys are
/// camelCase both in `config.toml` and in `/api/config`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub photos_dir: PathBuf,
    pub static_dir: PathBuf,
    /// Crossfade duration in milliseconds.
    pub transition_time: u64,
    /// How long each photo stays up, in milliseconds.
    pub image_display_time: u64,
    pub cropping_mode: CroppingMode,
    pub weather: WeatherConfig,
    pub clock: ClockConfig,
    pub albums: AlbumsConfig,
    pub google_photos: GooglePhotosConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CroppingMode {
    #[default]
    Attention,
    Entropy,
    None,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WeatherConfig {
    pub enabled: bool,
    pub api_key: String,
    pub lat: f64,
    pub lon: f64,
    /// `imperial` or `metric`
    pub units: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClockConfig {
    pub enabled: bool,
    pub format: String,
    pub show_date: bool,
    pub date_format: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AlbumsConfig {
    pub enabled: bool,
    pub show_album_name: bool,
    pub show_photo_date: bool,
    pub date_format: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GooglePhotosConfig {
    pub enabled: bool,
    pub client_id: String,
    pub client_secret: String,
    pub album_ids: Vec<String>,
    /// Milliseconds between syncs.
    pub sync_interval: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: std::env::var("PORT")
                .ok()
                .and_then(|port| port.parse().ok())
                .unwrap_or(3000),
            photos_dir: PathBuf::from("./photos"),
            static_dir: PathBuf::from("./public"),
            transition_time: 1500,
            image_display_time: 10000,
            cropping_mode: CroppingMode::Attention,
            weather: WeatherConfig::default(),
            clock: ClockConfig::default(),
            albums: AlbumsConfig::default(),
            google_photos: GooglePhotosConfig::default(),
        }
    }
}

/// Written into fresh config files; never a usable key.
pub const PLACEHOLDER_WEATHER_API_KEY: &str = "YOUR_OPENWEATHERMAP_API_KEY";

impl WeatherConfig {
    /// Switched on with a real API key: not blank and not the placeholder.
    pub fn is_configured(&self) -> bool {
        let key = self.api_key.trim();
        self.enabled && !key.is_empty() && key != PLACEHOLDER_WEATHER_API_KEY
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: PLACEHOLDER_WEATHER_API_KEY.to_string(),
            lat: 38.7521,
            lon: -121.2880,
            units: "imperial".to_string(),
        }
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            format: "h:mm A".to_string(),
            show_date: true,
            date_format: "cccc, MMMM d".to_string(),
        }
    }
}

impl Default for AlbumsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            show_album_name: true,
            show_photo_date: true,
            date_format: "MMMM d, yyyy".to_string(),
        }
    }
}

impl Default for GooglePhotosConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            client_id: "YOUR_GOOGLE_CLIENT_ID".to_string(),
            client_secret: "YOUR_GOOGLE_CLIENT_SECRET".to_string(),
            album_ids: Vec::new(),
            sync_interval: 3_600_000,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml_edit::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerError(#[from] toml_edit::ser::Error),
}

impl Config {
    /// Parse a config file. Keys it leaves out keep their defaults.
    pub async fn read(path: &Path) -> Result<Self, ConfigError> {
        let contents = tokio::fs::read_to_string(path).await?;
        Ok(toml_edit::de::from_str::<Config>(&contents)?)
    }

    pub async fn write(&self, path: &Path) -> Result<(), ConfigError> {
        let document = toml_edit::ser::to_document(self)?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, document.to_string()).await?;
        Ok(())
    }

    /// Load the config file, creating it with defaults when it does not exist.
    /// An unreadable or invalid file is logged and the defaults are used.
    pub async fn load_or_create(path: &Path) -> Self {
        match Self::read(path).await {
            Ok(config) => {
                info!("Configuration loaded from {:?}", path);
                config
            }
            Err(ConfigError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("{:?} not found. Creating a new one with default values.", path);
                let config = Config::default();
                match config.write(path).await {
                    Ok(()) => info!("Created {:?}. Edit it with your preferences.", path),
                    Err(e) => error!("Failed to write default config file: {}", e),
                }
                config
            }
            Err(e) => {
                error!("Failed to read config file {:?}: {}", path, e);
                Config::default()
            }
        }
    }
}

use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub catalog: catalog::SharedCatalog,
    pub weather: weather::SharedWeather,
    pub photos: static_files::StaticFileHandler,
    pub frontend: static_files::StaticFileHandler,
}

impl AppState {
    /// State backed by the real OpenWeatherMap client.
    pub fn new(config: Config) -> Result<Self, weather::WeatherError> {
        let provider = Arc::new(weather::OpenWeatherMap::new()?);
        Ok(Self::with_weather_provider(config, provider))
    }

    pub fn with_weather_provider(
        config: Config,
        provider: Arc<dyn weather::WeatherProvider>,
    ) -> Self {
        let catalog = Arc::new(catalog::Catalog::new(config.photos_dir.clone()));
        let weather = Arc::new(weather::WeatherService::new(
            config.weather.clone(),
            provider,
        ));

        Self {
            photos: static_files::StaticFileHandler::new(config.photos_dir.clone()),
            frontend: static_files::StaticFileHandler::new(config.static_dir.clone())
                .with_index("index.html"),
            config: Arc::new(config),
            catalog,
            weather,
        }
    }
}

pub fn create_app(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(api::frontend_index_handler))
        .route("/api/config", get(api::config_handler))
        .route("/api/images", get(api::images_handler))
        .route("/api/weather", get(api::weather_handler))
        .route("/photos/{*path}", get(api::photo_handler))
        .route("/{*path}", get(api::frontend_handler))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    let method = request.method();
                    let uri = request.uri();
                    let matched_path = request
                        .extensions()
                        .get::<axum::extract::MatchedPath>()
                        .map(|matched_path| matched_path.as_str());

                    tracing::info_span!(
                        "http_request",
                        method = %method,
                        uri = %uri,
                        matched_path,
                    )
                })
                .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
                    let user_agent = request
                        .headers()
                        .get("user-agent")
                        .and_then(|h| h.to_str().ok())
                        .unwrap_or("-");

                    tracing::debug!(
                        target: "access_log",
                        method = %request.method(),
                        path = %request.uri().path(),
                        user_agent = %user_agent,
                        "request"
                    );
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        let size = response
                            .headers()
                            .get("content-length")
                            .and_then(|h| h.to_str().ok())
                            .unwrap_or("-");

                        tracing::debug!(
                            target: "access_log",
                            status = %response.status(),
                            size = %size,
                            latency_ms = %latency.as_millis(),
                            "response"
                        );
                    },
                ),
        )
        .with_state(app_state)
}
