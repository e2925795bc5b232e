use std::{env, net::SocketAddr};

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub listen_addr: SocketAddr,
    pub cookie_secret: String,
    /// Base URL used when building share links handed out to users.
    pub public_base_url: String,
    pub weather_api_base: String,
    pub places_api_base: String,
    pub places_api_key: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://tripplanner.db".to_string());
        let listen_addr: SocketAddr = env::var("APP_LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse()
            .map_err(|err| AppError::Config(format!("invalid APP_LISTEN_ADDR: {err}")))?;

        let cookie_secret = env::var("COOKIE_SECRET")
            .unwrap_or_else(|_| "change-me-super-secret-trip-cookie".to_string());

        let public_base_url =
            env::var("PUBLIC_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

        let weather_api_base = env::var("WEATHER_API_BASE")
            .unwrap_or_else(|_| "https://api.open-meteo.com".to_string());

        let places_api_base = env::var("PLACES_API_BASE")
            .unwrap_or_else(|_| "https://maps.googleapis.com/maps/api".to_string());
        let places_api_key = env::var("PLACES_API_KEY").unwrap_or_default();

        Ok(Self {
            database_url,
            listen_addr,
            cookie_secret,
            public_base_url,
            weather_api_base,
            places_api_base,
            places_api_key,
        })
    }
}
