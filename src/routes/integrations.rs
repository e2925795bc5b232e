use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::{
    auth::CurrentUser,
    error::AppError,
    models::{place::Place, weather::WeatherReport},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/weather", get(weather_forecast))
        .route("/places/search", get(places_search))
        .route("/places/recommendations", get(places_recommendations))
}

#[derive(Deserialize)]
struct WeatherQuery {
    latitude: f64,
    longitude: f64,
    date: NaiveDate,
}

async fn weather_forecast(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(params): Query<WeatherQuery>,
) -> Result<Json<WeatherReport>, AppError> {
    current.require_user()?;
    validate_coordinates(params.latitude, params.longitude)?;
    let report = state
        .weather
        .daily_report(params.latitude, params.longitude, params.date)
        .await?;
    Ok(Json(report))
}

#[derive(Deserialize)]
struct PlacesSearchQuery {
    query: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

async fn places_search(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(params): Query<PlacesSearchQuery>,
) -> Result<Json<Vec<Place>>, AppError> {
    current.require_user()?;
    let query = params.query.trim();
    if query.is_empty() {
        return Err(AppError::BadRequest("query must not be empty".into()));
    }
    let near = match (params.latitude, params.longitude) {
        (Some(latitude), Some(longitude)) => {
            validate_coordinates(latitude, longitude)?;
            Some((latitude, longitude))
        }
        (None, None) => None,
        _ => {
            return Err(AppError::BadRequest(
                "latitude and longitude must be provided together".into(),
            ))
        }
    };
    let places = state.places.search(query, near).await?;
    Ok(Json(places))
}

#[derive(Deserialize)]
struct RecommendationsQuery {
    latitude: f64,
    longitude: f64,
    /// Comma-separated place categories.
    categories: Option<String>,
    min_rating: Option<f64>,
}

async fn places_recommendations(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(params): Query<RecommendationsQuery>,
) -> Result<Json<Vec<Place>>, AppError> {
    current.require_user()?;
    validate_coordinates(params.latitude, params.longitude)?;
    let categories: Vec<String> = params
        .categories
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    let places = state
        .places
        .recommend(
            params.latitude,
            params.longitude,
            &categories,
            params.min_rating,
        )
        .await?;
    Ok(Json(places))
}

fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), AppError> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(AppError::BadRequest(
            "latitude must be between -90 and 90".into(),
        ));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(AppError::BadRequest(
            "longitude must be between -180 and 180".into(),
        ));
    }
    Ok(())
}
