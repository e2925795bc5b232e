use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PlaceReview {
    pub id: String,
    pub location_id: String,
    pub user_uuid: String,
    pub rating: i64,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}
