use serde::{Deserialize, Serialize};

/// A place candidate returned by the places integration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Place {
    pub place_id: String,
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub rating: Option<f64>,
    pub photo_url: Option<String>,
}
