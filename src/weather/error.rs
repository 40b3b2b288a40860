use thiserror::Error;

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Weather request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Weather API returned status {0}")]
    Status(u16),

    #[error("Malformed weather response: {0}")]
    MalformedResponse(String),
}
