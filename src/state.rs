use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use sha2::{Digest, Sha512};

use crate::{
    config::AppConfig,
    db::DbPool,
    services::{
        permissions::PermissionValidator, places::PlacesService, sharing::SharingManager,
        store::TripStore, weather::WeatherService,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: DbPool,
    pub store: TripStore,
    pub sharing: SharingManager,
    pub permissions: PermissionValidator,
    pub weather: WeatherService,
    pub places: PlacesService,
    pub cookie_key: Key,
}

impl AppState {
    pub fn new(config: AppConfig, db: DbPool) -> Self {
        let digest = Sha512::digest(config.cookie_secret.as_bytes());
        let cookie_key = Key::from(&digest[..]);
        let client = reqwest::Client::new();
        Self {
            store: TripStore::new(db.clone()),
            sharing: SharingManager::new(db.clone(), config.public_base_url.clone()),
            permissions: PermissionValidator::new(db.clone()),
            weather: WeatherService::new(client.clone(), config.weather_api_base.clone()),
            places: PlacesService::new(
                client,
                config.places_api_base.clone(),
                config.places_api_key.clone(),
            ),
            config,
            db,
            cookie_key,
        }
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Key {
        state.cookie_key.clone()
    }
}
