use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::{
    auth::CurrentUser,
    error::AppError,
    models::trip::{BudgetSummary, Trip, TripDetail},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/trips", post(create_trip).get(list_trips))
        .route(
            "/trips/:trip_id",
            get(trip_detail).put(update_trip).delete(delete_trip),
        )
        .route("/trips/:trip_id/budget", get(budget_summary))
}

#[derive(Deserialize)]
struct CreateTripRequest {
    title: String,
    description: Option<String>,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    #[serde(default)]
    total_budget: f64,
}

async fn create_trip(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(form): Json<CreateTripRequest>,
) -> Result<(StatusCode, Json<Trip>), AppError> {
    let user = current.require_user()?;
    let title = form.title.trim();
    if title.is_empty() {
        return Err(AppError::BadRequest("title must not be empty".into()));
    }
    if form.start_date > form.end_date {
        return Err(AppError::BadRequest(
            "start_date must not be after end_date".into(),
        ));
    }
    if !form.total_budget.is_finite() || form.total_budget < 0.0 {
        return Err(AppError::BadRequest(
            "total_budget must be a non-negative number".into(),
        ));
    }

    let mut trip = Trip::new(&user.uuid, title, form.start_date, form.end_date);
    trip.description = normalize_optional(form.description);
    trip.total_budget = form.total_budget;
    state.store.create_trip(&trip).await?;
    Ok((StatusCode::CREATED, Json(trip)))
}

async fn list_trips(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<Trip>>, AppError> {
    let user = current.require_user()?;
    let trips = state.store.list_trips_for(&user.uuid).await?;
    Ok(Json(trips))
}

async fn trip_detail(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<String>,
) -> Result<Json<TripDetail>, AppError> {
    let user = current.require_user()?;
    let trip = state
        .store
        .fetch_trip(&trip_id)
        .await?
        .ok_or(AppError::NotFound)?;
    state.permissions.require_access(&user.uuid, &trip_id).await?;
    let is_owner = trip.owner_uuid == user.uuid;
    let detail = compose_detail(&state, trip, is_owner).await?;
    Ok(Json(detail))
}

/// Assembles the full trip view. Share grants are only exposed to the owner.
pub(crate) async fn compose_detail(
    state: &AppState,
    trip: Trip,
    include_shares: bool,
) -> Result<TripDetail, AppError> {
    let locations = state.store.trip_locations(&trip.id).await?;
    let itineraries = state.store.trip_itineraries(&trip.id).await?;
    let spent_budget = state.store.spent_budget(&trip).await?;
    let shares = if include_shares {
        Some(state.store.trip_shares(&trip.id).await?)
    } else {
        None
    };
    Ok(TripDetail {
        trip,
        spent_budget,
        locations,
        itineraries,
        shares,
    })
}

#[derive(Deserialize)]
struct UpdateTripRequest {
    title: Option<String>,
    description: Option<String>,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    total_budget: Option<f64>,
}

async fn update_trip(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<String>,
    Json(form): Json<UpdateTripRequest>,
) -> Result<Json<Trip>, AppError> {
    let user = current.require_user()?;
    let mut trip = state
        .store
        .fetch_trip(&trip_id)
        .await?
        .ok_or(AppError::NotFound)?;
    state.permissions.require_edit(&user.uuid, &trip_id).await?;

    if let Some(title) = form.title {
        let title = title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::BadRequest("title must not be empty".into()));
        }
        trip.title = title;
    }
    if let Some(description) = form.description {
        trip.description = normalize_optional(Some(description));
    }
    if let Some(start_date) = form.start_date {
        trip.start_date = start_date;
    }
    if let Some(end_date) = form.end_date {
        trip.end_date = end_date;
    }
    if trip.start_date > trip.end_date {
        return Err(AppError::BadRequest(
            "start_date must not be after end_date".into(),
        ));
    }
    if let Some(total_budget) = form.total_budget {
        if !total_budget.is_finite() || total_budget < 0.0 {
            return Err(AppError::BadRequest(
                "total_budget must be a non-negative number".into(),
            ));
        }
        trip.total_budget = total_budget;
    }

    state.store.update_trip(&trip).await?;
    let updated = state
        .store
        .fetch_trip(&trip_id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(updated))
}

async fn delete_trip(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let user = current.require_user()?;
    state
        .store
        .fetch_trip(&trip_id)
        .await?
        .ok_or(AppError::NotFound)?;
    if !state.permissions.can_delete_trip(&user.uuid, &trip_id).await? {
        return Err(AppError::Forbidden);
    }
    state.store.delete_trip(&trip_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn budget_summary(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<String>,
) -> Result<Json<BudgetSummary>, AppError> {
    let user = current.require_user()?;
    let trip = state
        .store
        .fetch_trip(&trip_id)
        .await?
        .ok_or(AppError::NotFound)?;
    state.permissions.require_access(&user.uuid, &trip_id).await?;
    let summary = state.store.budget_summary(&trip).await?;
    Ok(Json(summary))
}

pub(crate) fn normalize_optional(input: Option<String>) -> Option<String> {
    input.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
