use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{itinerary::Itinerary, location::Location, share::TripShare};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Trip {
    pub id: String,
    pub owner_uuid: String,
    pub title: String,
    pub description: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub total_budget: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Trip {
    pub fn new(
        owner_uuid: impl Into<String>,
        title: impl Into<String>,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            owner_uuid: owner_uuid.into(),
            title: title.into(),
            description: None,
            start_date,
            end_date,
            total_budget: 0.0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Full trip composition returned by the detail endpoints. `shares` is only
/// populated for the owner.
#[derive(Debug, Clone, Serialize)]
pub struct TripDetail {
    #[serde(flatten)]
    pub trip: Trip,
    pub spent_budget: f64,
    pub locations: Vec<Location>,
    pub itineraries: Vec<Itinerary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shares: Option<Vec<TripShare>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BudgetSummary {
    pub trip_id: String,
    pub total_budget: f64,
    pub spent_budget: f64,
    pub remaining: f64,
    pub by_category: BudgetByCategory,
}

#[derive(Debug, Clone, Serialize)]
pub struct BudgetByCategory {
    pub activities: f64,
    pub transportation: f64,
}
