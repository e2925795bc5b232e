pub mod integrations;
pub mod itineraries;
pub mod locations;
pub mod public;
pub mod sharing;
pub mod trips;

use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(public::router())
        .merge(trips::router())
        .merge(locations::router())
        .merge(itineraries::router())
        .merge(sharing::router())
        .merge(integrations::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
