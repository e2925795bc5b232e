use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::PrivateCookieJar;
use serde::Deserialize;

use crate::{
    auth,
    error::AppError,
    models::{trip::TripDetail, user::UserProfile},
    state::AppState,
};

use super::trips::compose_detail;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/shared/:trip_id", get(shared_trip))
}

#[derive(Deserialize)]
struct RegisterRequest {
    username: String,
    email: String,
    password: String,
}

async fn register(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Json(form): Json<RegisterRequest>,
) -> Result<(StatusCode, PrivateCookieJar, Json<UserProfile>), AppError> {
    let user = auth::register_user(&state, &form.username, &form.email, &form.password).await?;
    let session_id = auth::create_session(&state, user.id).await?;
    let profile = UserProfile {
        uuid: user.uuid,
        username: user.username,
        email: user.email,
    };
    Ok((
        StatusCode::CREATED,
        auth::apply_session_cookie(jar, &session_id),
        Json(profile),
    ))
}

#[derive(Deserialize)]
struct LoginRequest {
    identifier: String,
    password: String,
}

async fn login(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Json(form): Json<LoginRequest>,
) -> Result<(PrivateCookieJar, Json<UserProfile>), AppError> {
    let user = auth::authenticate_user(&state, &form.identifier, &form.password).await?;
    let session_id = auth::create_session(&state, user.id).await?;
    let profile = UserProfile {
        uuid: user.uuid,
        username: user.username,
        email: user.email,
    };
    Ok((auth::apply_session_cookie(jar, &session_id), Json(profile)))
}

async fn logout(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
) -> Result<(PrivateCookieJar, StatusCode), AppError> {
    if let Some(cookie) = jar.get(auth::SESSION_COOKIE) {
        auth::destroy_session(&state, cookie.value()).await?;
    }
    Ok((auth::clear_session_cookie(jar), StatusCode::NO_CONTENT))
}

#[derive(Deserialize)]
struct SharedQuery {
    token: String,
}

/// Read-only trip view reachable without a session, gated by a public link
/// token.
async fn shared_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<String>,
    Query(params): Query<SharedQuery>,
) -> Result<Json<TripDetail>, AppError> {
    let trip = state
        .sharing
        .resolve_public_link(&state.store, &trip_id, &params.token)
        .await?;
    let detail = compose_detail(&state, trip, false).await?;
    Ok(Json(detail))
}
