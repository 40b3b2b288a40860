// Weather module - cached current conditions for the kiosk overlay
mod error;
mod provider;
mod types;

pub use error::WeatherError;
pub use provider::{OpenWeatherMap, WeatherProvider};
pub use types::{WeatherReading, WeatherStatus};

use crate::WeatherConfig;
use chrono::Utc;
use std::{sync::Arc, time::Duration};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info};

/// How long a successful reading is served before the next remote call.
pub const WEATHER_TTL: Duration = Duration::from_secs(15 * 60);

pub type SharedWeather = Arc<WeatherService>;

pub struct WeatherService {
    config: WeatherConfig,
    provider: Arc<dyn WeatherProvider>,
    ttl: Duration,
    cached: RwLock<Option<WeatherReading>>,
    fetch_lock: Mutex<()>,
}

impl WeatherService {
    pub fn new(config: WeatherConfig, provider: Arc<dyn WeatherProvider>) -> Self {
        Self::with_ttl(config, provider, WEATHER_TTL)
    }

    pub fn with_ttl(config: WeatherConfig, provider: Arc<dyn WeatherProvider>, ttl: Duration) -> Self {
        Self {
            config,
            provider,
            ttl,
            cached: RwLock::new(None),
            fetch_lock: Mutex::new(()),
        }
    }

    /// Whether weather is switched on and has a real API key.
    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Current weather, from cache while it is fresh. A failed refresh is
    /// returned as an error; the stale reading is not served in its place.
    pub async fn get_weather(&self) -> Result<WeatherStatus, WeatherError> {
        if !self.is_configured() {
            return Ok(WeatherStatus::Unavailable);
        }

        if let Some(reading) = self.fresh_reading().await {
            return Ok(WeatherStatus::Available(reading));
        }

        // One fetch at a time; whoever waited may find the cache refilled.
        let _guard = self.fetch_lock.lock().await;
        if let Some(reading) = self.fresh_reading().await {
            return Ok(WeatherStatus::Available(reading));
        }

        match self.provider.fetch(&self.config).await {
            Ok(reading) => {
                info!(
                    "Fetched weather for {}: {} {}",
                    reading.location, reading.temperature, reading.description
                );
                *self.cached.write().await = Some(reading.clone());
                Ok(WeatherStatus::Available(reading))
            }
            Err(e) => {
                error!("Error fetching weather: {}", e);
                Err(e)
            }
        }
    }

    async fn fresh_reading(&self) -> Option<WeatherReading> {
        let cached = self.cached.read().await;
        let reading = cached.as_ref()?;

        // A reading stamped in the future (clock step) counts as fresh.
        let fresh = (Utc::now() - reading.fetched_at)
            .to_std()
            .map(|age| age < self.ttl)
            .unwrap_or(true);

        if fresh {
            debug!("Serving cached weather from {}", reading.fetched_at);
            Some(reading.clone())
        } else {
            None
        }
    }
}
