use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReading {
    pub temperature: f64,
    pub description: String,
    pub icon_id: String,
    pub location: String,
    pub fetched_at: DateTime<Utc>,
}

/// `Unavailable` means weather is switched off or has no API key configured.
/// It is a normal outcome, not a failure.
#[derive(Debug, Clone, PartialEq)]
pub enum WeatherStatus {
    Available(WeatherReading),
    Unavailable,
}

// Subset of the OpenWeatherMap current-weather payload
#[derive(Debug, Deserialize)]
pub(crate) struct OwmResponse {
    pub main: OwmMain,
    #[serde(default)]
    pub weather: Vec<OwmCondition>,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OwmMain {
    pub temp: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OwmCondition {
    pub description: String,
    pub icon: String,
}
