use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::AppState;

pub mod health;
pub mod space_registry;

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(health::router(&state))
        .merge(space_registry::router(&state))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
