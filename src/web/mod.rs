use axum::{
    http::Method,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::AppConfig;
use crate::geocoding::GeocoderTrait;
use crate::scrapers::ScraperTrait;
use crate::service::ApartmentService;

pub mod auth;
pub mod error;
pub mod routes;

pub use error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub service: ApartmentService,
    pub scraper: Arc<dyn ScraperTrait>,
    pub geocoder: Arc<dyn GeocoderTrait>,
    pub config: Arc<AppConfig>,
}

async fn health_check_handler() -> &'static str {
    "OK"
}

pub fn create_axum_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    let protected = Router::new()
        .route("/api/auth/me", get(auth::me))
        .nest(
            "/api/apartments",
            routes::apartments::create_apartments_router(),
        )
        .merge(routes::lookup::create_lookup_router())
        .route_layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth::require_session,
        ));

    Router::new()
        .route("/api/health", get(health_check_handler))
        .route("/api/auth/signin", post(auth::sign_in))
        .merge(protected)
        .with_state(app_state)
        .layer(cors)
}
