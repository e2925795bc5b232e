use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    auth::CurrentUser,
    error::AppError,
    models::share::{ShareInvitation, SharePermission, TripShare},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/trips/:trip_id/share", post(share_trip))
        .route("/trips/:trip_id/shares", get(list_shares))
        .route(
            "/trips/:trip_id/share/:user_uuid",
            put(update_share).delete(revoke_share),
        )
        .route("/trips/:trip_id/invitations", post(create_invitation))
        .route("/trips/:trip_id/public-link", post(create_public_link))
        .route("/invitations/accept", post(accept_invitation))
}

async fn require_owned_trip(
    state: &AppState,
    user_uuid: &str,
    trip_id: &str,
) -> Result<(), AppError> {
    state
        .store
        .fetch_trip(trip_id)
        .await?
        .ok_or(AppError::NotFound)?;
    state.permissions.require_owner(user_uuid, trip_id).await
}

#[derive(Deserialize)]
struct ShareRequest {
    user_uuid: String,
    #[serde(default)]
    permission: SharePermission,
}

async fn share_trip(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<String>,
    Json(form): Json<ShareRequest>,
) -> Result<(StatusCode, Json<TripShare>), AppError> {
    let user = current.require_user()?;
    require_owned_trip(&state, &user.uuid, &trip_id).await?;

    if form.user_uuid == user.uuid {
        return Err(AppError::BadRequest(
            "cannot share a trip with yourself".into(),
        ));
    }
    state
        .store
        .fetch_user_by_uuid(&form.user_uuid)
        .await?
        .ok_or_else(|| AppError::BadRequest("unknown user".into()))?;

    let share = state
        .store
        .upsert_share(&trip_id, &user.uuid, &form.user_uuid, form.permission.as_str())
        .await?;
    Ok((StatusCode::CREATED, Json(share)))
}

async fn list_shares(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<String>,
) -> Result<Json<Vec<TripShare>>, AppError> {
    let user = current.require_user()?;
    require_owned_trip(&state, &user.uuid, &trip_id).await?;
    let shares = state.store.trip_shares(&trip_id).await?;
    Ok(Json(shares))
}

#[derive(Deserialize)]
struct UpdateShareRequest {
    permission: SharePermission,
}

async fn update_share(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((trip_id, user_uuid)): Path<(String, String)>,
    Json(form): Json<UpdateShareRequest>,
) -> Result<Json<TripShare>, AppError> {
    let user = current.require_user()?;
    require_owned_trip(&state, &user.uuid, &trip_id).await?;
    let share = state
        .store
        .update_share_permission(&trip_id, &user_uuid, form.permission.as_str())
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(share))
}

async fn revoke_share(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((trip_id, user_uuid)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    let user = current.require_user()?;
    require_owned_trip(&state, &user.uuid, &trip_id).await?;
    if !state.store.remove_share(&trip_id, &user_uuid).await? {
        return Err(AppError::NotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct InvitationRequest {
    email: String,
    #[serde(default)]
    permission: SharePermission,
}

async fn create_invitation(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<String>,
    Json(form): Json<InvitationRequest>,
) -> Result<(StatusCode, Json<ShareInvitation>), AppError> {
    let user = current.require_user()?;
    require_owned_trip(&state, &user.uuid, &trip_id).await?;
    let invitation = state
        .sharing
        .create_invitation(&trip_id, &form.email, &user.uuid, form.permission)
        .await?;
    Ok((StatusCode::CREATED, Json(invitation)))
}

#[derive(Deserialize)]
struct AcceptInvitationRequest {
    token: String,
}

async fn accept_invitation(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(form): Json<AcceptInvitationRequest>,
) -> Result<(StatusCode, Json<TripShare>), AppError> {
    let user = current.require_user()?;
    let share = state
        .sharing
        .accept_invitation(&state.store, &form.token, &user.uuid)
        .await?;
    Ok((StatusCode::CREATED, Json(share)))
}

#[derive(Deserialize, Default)]
struct PublicLinkRequest {
    expires_in_days: Option<i64>,
}

#[derive(Serialize)]
struct PublicLinkResponse {
    link: String,
    token: String,
    expires_at: DateTime<Utc>,
    qr_code_url: String,
}

async fn create_public_link(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<String>,
    body: Option<Json<PublicLinkRequest>>,
) -> Result<(StatusCode, Json<PublicLinkResponse>), AppError> {
    let user = current.require_user()?;
    require_owned_trip(&state, &user.uuid, &trip_id).await?;

    let form = body.map(|Json(form)| form).unwrap_or_default();
    let link = state
        .sharing
        .issue_public_link(&state.store, &trip_id, form.expires_in_days)
        .await?;
    let url = state.sharing.share_link(&trip_id, &link.token)?;
    let qr_code_url = crate::services::sharing::SharingManager::qr_code_url(&url);
    Ok((
        StatusCode::CREATED,
        Json(PublicLinkResponse {
            link: url,
            token: link.token,
            expires_at: link.expires_at,
            qr_code_url,
        }),
    ))
}
