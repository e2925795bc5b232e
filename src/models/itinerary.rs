use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use uuid::Uuid;

/// A scheduled visit to a location within a trip, ordered by `position`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Itinerary {
    pub id: String,
    pub trip_id: String,
    pub location_id: String,
    #[serde(rename = "order")]
    pub position: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub budget: Option<f64>,
    pub notes: Option<String>,
    pub photos: Json<Vec<String>>,
    pub transportation: Option<Json<Transportation>>,
}

impl Itinerary {
    pub fn new(
        trip_id: impl Into<String>,
        location_id: impl Into<String>,
        position: i64,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            trip_id: trip_id.into(),
            location_id: location_id.into(),
            position,
            start_time,
            end_time,
            budget: None,
            notes: None,
            photos: Json(Vec::new()),
            transportation: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    Walking,
    Driving,
    PublicTransit,
    Cycling,
}

/// How the traveller gets to this itinerary stop. Value object embedded in
/// the itinerary row as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transportation {
    #[serde(rename = "type")]
    pub mode: TransportMode,
    /// Minutes.
    pub duration: f64,
    /// Kilometers.
    pub distance: Option<f64>,
    pub cost: Option<f64>,
    pub notes: Option<String>,
}
