use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Location {
    pub id: String,
    pub trip_id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
    pub place_id: Option<String>,
    pub rating: Option<f64>,
    pub photo_url: Option<String>,
}

impl Location {
    pub fn new(
        trip_id: impl Into<String>,
        name: impl Into<String>,
        latitude: f64,
        longitude: f64,
        address: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            trip_id: trip_id.into(),
            name: name.into(),
            latitude,
            longitude,
            address: address.into(),
            place_id: None,
            rating: None,
            photo_url: None,
        }
    }
}
