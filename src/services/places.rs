use std::cmp::Ordering;
use std::sync::Arc;

use crate::{error::AppError, models::place::Place};

/// Text-search client against a Google-Places-shaped API. Base URL and key
/// come from configuration; tests point the base at a mock server.
#[derive(Clone)]
pub struct PlacesService {
    client: reqwest::Client,
    base_url: Arc<String>,
    api_key: Arc<String>,
}

impl PlacesService {
    pub fn new(client: reqwest::Client, base_url: String, api_key: String) -> Self {
        Self {
            client,
            base_url: Arc::new(base_url),
            api_key: Arc::new(api_key),
        }
    }

    pub async fn search(
        &self,
        query: &str,
        near: Option<(f64, f64)>,
    ) -> Result<Vec<Place>, AppError> {
        let url = format!("{}/place/textsearch/json", self.base_url);
        let mut params = vec![
            ("query", query.to_string()),
            ("key", self.api_key.to_string()),
        ];
        if let Some((latitude, longitude)) = near {
            params.push(("location", format!("{latitude},{longitude}")));
            // 50 km bias radius, same as the mobile clients use.
            params.push(("radius", "50000".to_string()));
        }

        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|err| AppError::Upstream(format!("places request failed: {err}")))?
            .error_for_status()
            .map_err(|err| AppError::Upstream(format!("places provider returned {err}")))?;
        let body: google::SearchResponse = response
            .json()
            .await
            .map_err(|err| AppError::Upstream(format!("invalid places response: {err}")))?;

        Ok(body.results.into_iter().map(Place::from).collect())
    }

    /// Searches each category around the coordinate, drops places under the
    /// rating floor and returns the rest best-rated first.
    pub async fn recommend(
        &self,
        latitude: f64,
        longitude: f64,
        categories: &[String],
        min_rating: Option<f64>,
    ) -> Result<Vec<Place>, AppError> {
        let default_categories = [String::from("tourist_attraction")];
        let categories: &[String] = if categories.is_empty() {
            &default_categories
        } else {
            categories
        };

        let mut recommendations = Vec::new();
        for category in categories {
            let results = self.search(category, Some((latitude, longitude))).await?;
            recommendations.extend(results);
        }

        if let Some(floor) = min_rating {
            recommendations.retain(|place| place.rating.unwrap_or(0.0) >= floor);
        }
        recommendations.sort_by(|a, b| {
            b.rating
                .unwrap_or(0.0)
                .partial_cmp(&a.rating.unwrap_or(0.0))
                .unwrap_or(Ordering::Equal)
        });
        Ok(recommendations)
    }
}

impl From<google::SearchResult> for Place {
    fn from(result: google::SearchResult) -> Self {
        Self {
            place_id: result.place_id,
            name: result.name,
            address: result.formatted_address,
            latitude: result.geometry.location.lat,
            longitude: result.geometry.location.lng,
            rating: result.rating,
            photo_url: result
                .photos
                .and_then(|photos| photos.into_iter().next())
                .map(|photo| photo.photo_reference),
        }
    }
}

/// Google Places text-search response structures.
mod google {
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    pub struct SearchResponse {
        #[serde(default)]
        pub results: Vec<SearchResult>,
    }

    #[derive(Debug, Deserialize)]
    pub struct SearchResult {
        pub place_id: String,
        pub name: String,
        pub formatted_address: String,
        pub geometry: Geometry,
        pub rating: Option<f64>,
        pub photos: Option<Vec<Photo>>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Geometry {
        pub location: LatLng,
    }

    #[derive(Debug, Deserialize)]
    pub struct LatLng {
        pub lat: f64,
        pub lng: f64,
    }

    #[derive(Debug, Deserialize)]
    pub struct Photo {
        pub photo_reference: String,
    }
}
