use super::{WeatherError, WeatherReading, types::OwmResponse};
use crate::WeatherConfig;
use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;
use tracing::debug;

const OPENWEATHERMAP_BASE_URL: &str = "https://api.openweathermap.org";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Source of current weather. One call is one remote request.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn fetch(&self, config: &WeatherConfig) -> Result<WeatherReading, WeatherError>;
}

pub struct OpenWeatherMap {
    client: reqwest::Client,
    base_url: String,
}

impl OpenWeatherMap {
    pub fn new() -> Result<Self, WeatherError> {
        Self::with_base_url(OPENWEATHERMAP_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, WeatherError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(WeatherError::Client)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherMap {
    async fn fetch(&self, config: &WeatherConfig) -> Result<WeatherReading, WeatherError> {
        let url = format!("{}/data/2.5/weather", self.base_url);
        debug!("Fetching weather for {}, {}", config.lat, config.lon);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("lat", config.lat.to_string()),
                ("lon", config.lon.to_string()),
                ("units", config.units.clone()),
                ("appid", config.api_key.clone()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(WeatherError::Status(status.as_u16()));
        }

        let body: OwmResponse = response.json().await?;
        let condition = body.weather.into_iter().next().ok_or_else(|| {
            WeatherError::MalformedResponse("no weather conditions in response".to_string())
        })?;

        Ok(WeatherReading {
            temperature: body.main.temp.round(),
            description: condition.description,
            icon_id: condition.icon,
            location: body.name,
            fetched_at: Utc::now(),
        })
    }
}
