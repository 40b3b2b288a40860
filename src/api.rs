use crate::{AppState, Config, catalog::ImageRecord, weather::WeatherStatus};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use rand::seq::SliceRandom;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    fn new(message: &str) -> Json<Self> {
        Json(Self {
            error: message.to_string(),
        })
    }
}

pub async fn config_handler(State(app_state): State<AppState>) -> Json<Config> {
    Json(app_state.config.as_ref().clone())
}

/// The current catalog in a fresh random order on every call.
pub async fn images_handler(State(app_state): State<AppState>) -> Json<Vec<ImageRecord>> {
    let snapshot = app_state.catalog.snapshot().await;
    let mut images = snapshot.images().to_vec();
    images.shuffle(&mut rand::rng());
    Json(images)
}

pub async fn weather_handler(State(app_state): State<AppState>) -> Response {
    match app_state.weather.get_weather().await {
        Ok(WeatherStatus::Available(reading)) => Json(reading).into_response(),
        Ok(WeatherStatus::Unavailable) => {
            ErrorResponse::new("Weather is disabled or API key is missing.").into_response()
        }
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorResponse::new("Failed to fetch weather data."),
        )
            .into_response(),
    }
}

pub async fn photo_handler(
    State(app_state): State<AppState>,
    Path(path): Path<String>,
) -> Response {
    app_state.photos.serve(&path).await
}

pub async fn frontend_index_handler(State(app_state): State<AppState>) -> Response {
    app_state.frontend.serve("").await
}

pub async fn frontend_handler(
    State(app_state): State<AppState>,
    Path(path): Path<String>,
) -> Response {
    app_state.frontend.serve(&path).await
}
