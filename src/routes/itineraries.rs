use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::types::Json as SqlJson;

use crate::{
    auth::CurrentUser,
    error::AppError,
    models::itinerary::{Itinerary, Transportation},
    state::AppState,
};

use super::trips::normalize_optional;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/trips/:trip_id/itineraries", post(add_itinerary))
        .route(
            "/itineraries/:itinerary_id",
            put(update_itinerary).delete(remove_itinerary),
        )
}

#[derive(Deserialize)]
struct AddItineraryRequest {
    location_id: String,
    #[serde(rename = "order")]
    position: Option<i64>,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    budget: Option<f64>,
    notes: Option<String>,
    transportation: Option<Transportation>,
}

async fn add_itinerary(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<String>,
    Json(form): Json<AddItineraryRequest>,
) -> Result<(StatusCode, Json<Itinerary>), AppError> {
    let user = current.require_user()?;
    state
        .store
        .fetch_trip(&trip_id)
        .await?
        .ok_or(AppError::NotFound)?;
    state.permissions.require_edit(&user.uuid, &trip_id).await?;

    let location = state
        .store
        .fetch_location(&form.location_id)
        .await?
        .ok_or_else(|| AppError::BadRequest("unknown location".into()))?;
    if location.trip_id != trip_id {
        return Err(AppError::BadRequest(
            "location does not belong to this trip".into(),
        ));
    }
    validate_times(form.start_time, form.end_time)?;
    validate_budget(form.budget)?;

    let position = match form.position {
        Some(position) => position,
        None => state.store.next_position(&trip_id).await?,
    };
    let mut entry = Itinerary::new(
        &trip_id,
        &form.location_id,
        position,
        form.start_time,
        form.end_time,
    );
    entry.budget = form.budget;
    entry.notes = normalize_optional(form.notes);
    entry.transportation = form.transportation.map(SqlJson);

    state.store.add_itinerary(&entry).await?;
    state.store.touch_trip(&trip_id).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

#[derive(Deserialize)]
struct UpdateItineraryRequest {
    location_id: Option<String>,
    #[serde(rename = "order")]
    position: Option<i64>,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    budget: Option<f64>,
    notes: Option<String>,
    photos: Option<Vec<String>>,
    transportation: Option<Transportation>,
}

async fn update_itinerary(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(itinerary_id): Path<String>,
    Json(form): Json<UpdateItineraryRequest>,
) -> Result<Json<Itinerary>, AppError> {
    let user = current.require_user()?;
    let mut entry = state
        .store
        .fetch_itinerary(&itinerary_id)
        .await?
        .ok_or(AppError::NotFound)?;
    state
        .permissions
        .require_edit(&user.uuid, &entry.trip_id)
        .await?;

    if let Some(location_id) = form.location_id {
        let location = state
            .store
            .fetch_location(&location_id)
            .await?
            .ok_or_else(|| AppError::BadRequest("unknown location".into()))?;
        if location.trip_id != entry.trip_id {
            return Err(AppError::BadRequest(
                "location does not belong to this trip".into(),
            ));
        }
        entry.location_id = location_id;
    }
    if let Some(position) = form.position {
        entry.position = position;
    }
    if let Some(start_time) = form.start_time {
        entry.start_time = start_time;
    }
    if let Some(end_time) = form.end_time {
        entry.end_time = end_time;
    }
    validate_times(entry.start_time, entry.end_time)?;
    if form.budget.is_some() {
        validate_budget(form.budget)?;
        entry.budget = form.budget;
    }
    if let Some(notes) = form.notes {
        entry.notes = normalize_optional(Some(notes));
    }
    if let Some(photos) = form.photos {
        entry.photos = SqlJson(photos);
    }
    if let Some(transportation) = form.transportation {
        entry.transportation = Some(SqlJson(transportation));
    }

    state.store.update_itinerary(&entry).await?;
    state.store.touch_trip(&entry.trip_id).await?;
    Ok(Json(entry))
}

async fn remove_itinerary(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(itinerary_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let user = current.require_user()?;
    let entry = state
        .store
        .fetch_itinerary(&itinerary_id)
        .await?
        .ok_or(AppError::NotFound)?;
    state
        .permissions
        .require_edit(&user.uuid, &entry.trip_id)
        .await?;

    state.store.remove_itinerary(&itinerary_id).await?;
    state.store.touch_trip(&entry.trip_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn validate_times(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), AppError> {
    if start > end {
        return Err(AppError::BadRequest(
            "start_time must not be after end_time".into(),
        ));
    }
    Ok(())
}

fn validate_budget(budget: Option<f64>) -> Result<(), AppError> {
    if let Some(budget) = budget {
        if !budget.is_finite() || budget < 0.0 {
            return Err(AppError::BadRequest(
                "budget must be a non-negative number".into(),
            ));
        }
    }
    Ok(())
}
