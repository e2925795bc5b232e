use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::CurrentUser,
    error::AppError,
    models::{location::Location, review::PlaceReview},
    state::AppState,
};

use super::trips::normalize_optional;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/trips/:trip_id/locations", post(add_location))
        .route(
            "/trips/:trip_id/locations/:location_id",
            delete(remove_location),
        )
        .route(
            "/locations/:location_id/reviews",
            post(add_review).get(list_reviews),
        )
}

#[derive(Deserialize)]
struct AddLocationRequest {
    name: String,
    latitude: f64,
    longitude: f64,
    address: String,
    place_id: Option<String>,
    rating: Option<f64>,
    photo_url: Option<String>,
}

async fn add_location(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<String>,
    Json(form): Json<AddLocationRequest>,
) -> Result<(StatusCode, Json<Location>), AppError> {
    let user = current.require_user()?;
    state
        .store
        .fetch_trip(&trip_id)
        .await?
        .ok_or(AppError::NotFound)?;
    state.permissions.require_edit(&user.uuid, &trip_id).await?;

    let name = form.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("name must not be empty".into()));
    }
    if !(-90.0..=90.0).contains(&form.latitude) {
        return Err(AppError::BadRequest(
            "latitude must be between -90 and 90".into(),
        ));
    }
    if !(-180.0..=180.0).contains(&form.longitude) {
        return Err(AppError::BadRequest(
            "longitude must be between -180 and 180".into(),
        ));
    }
    if let Some(rating) = form.rating {
        if !(0.0..=5.0).contains(&rating) {
            return Err(AppError::BadRequest(
                "rating must be between 0 and 5".into(),
            ));
        }
    }

    let mut location = Location::new(&trip_id, name, form.latitude, form.longitude, form.address);
    location.place_id = normalize_optional(form.place_id);
    location.rating = form.rating;
    location.photo_url = normalize_optional(form.photo_url);
    state.store.add_location(&location).await?;
    state.store.touch_trip(&trip_id).await?;
    Ok((StatusCode::CREATED, Json(location)))
}

async fn remove_location(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((trip_id, location_id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    let user = current.require_user()?;
    state
        .store
        .fetch_trip(&trip_id)
        .await?
        .ok_or(AppError::NotFound)?;
    state.permissions.require_edit(&user.uuid, &trip_id).await?;

    if !state.store.remove_location(&trip_id, &location_id).await? {
        return Err(AppError::NotFound);
    }
    state.store.touch_trip(&trip_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct AddReviewRequest {
    rating: i64,
    comment: String,
}

async fn add_review(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(location_id): Path<String>,
    Json(form): Json<AddReviewRequest>,
) -> Result<(StatusCode, Json<PlaceReview>), AppError> {
    let user = current.require_user()?;
    let location = state
        .store
        .fetch_location(&location_id)
        .await?
        .ok_or(AppError::NotFound)?;
    state
        .permissions
        .require_access(&user.uuid, &location.trip_id)
        .await?;

    if !(1..=5).contains(&form.rating) {
        return Err(AppError::BadRequest("rating must be between 1 and 5".into()));
    }
    let comment = form.comment.trim();
    if comment.is_empty() {
        return Err(AppError::BadRequest("comment must not be empty".into()));
    }

    let review = PlaceReview {
        id: Uuid::new_v4().to_string(),
        location_id,
        user_uuid: user.uuid.clone(),
        rating: form.rating,
        comment: comment.to_string(),
        created_at: Utc::now(),
    };
    state.store.add_review(&review).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

#[derive(Serialize)]
struct ReviewsResponse {
    location_id: String,
    reviews: Vec<PlaceReview>,
    average_rating: f64,
}

async fn list_reviews(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(location_id): Path<String>,
) -> Result<Json<ReviewsResponse>, AppError> {
    let user = current.require_user()?;
    let location = state
        .store
        .fetch_location(&location_id)
        .await?
        .ok_or(AppError::NotFound)?;
    state
        .permissions
        .require_access(&user.uuid, &location.trip_id)
        .await?;

    let (reviews, average_rating) = state.store.location_reviews(&location_id).await?;
    Ok(Json(ReviewsResponse {
        location_id,
        reviews,
        average_rating,
    }))
}
