use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Extension, Path, Query, State,
    },
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::models::{ApartmentPatch, ApartmentRecord, GeoPoint, NewApartment, Status};
use crate::views::{self, FilterOptions, KanbanBoard, ListingQuery, MapMarker, Summary};
use crate::web::auth::AuthenticatedUser;
use crate::web::{AppError, AppState};

// --- Request/Response Structs ---

#[derive(Serialize)]
pub struct CreateResponse {
    success: bool,
    apartment: ApartmentRecord,
    /// The url was already tracked; `apartment` is the existing record
    duplicate: bool,
}

#[derive(Serialize)]
pub struct UpdateResponse {
    success: bool,
    /// Persisted state after the change, `null` when the id is unknown
    apartment: Option<ApartmentRecord>,
}

#[derive(Serialize)]
pub struct DeleteResponse {
    success: bool,
    removed: bool,
}

#[derive(Deserialize)]
pub struct IdQuery {
    id: Option<String>,
}

#[derive(Deserialize)]
pub struct StatusChangeRequest {
    id: Option<String>,
    status: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapQuery {
    work_lat: Option<f64>,
    work_lng: Option<f64>,
    /// Place records without a location near the configured centre
    #[serde(default)]
    include_missing: bool,
}

// --- Route Handlers ---

async fn list_apartments_handler(
    Extension(user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    query: Result<Query<ListingQuery>, QueryRejection>,
) -> Result<Json<Vec<ApartmentRecord>>, AppError> {
    let Query(query) = query?;
    let records = app_state.service.list(&user.id).await?;
    Ok(Json(query.apply(&records)))
}

async fn get_apartment_handler(
    Extension(user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApartmentRecord>, AppError> {
    app_state
        .service
        .get(&user.id, &id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Apartment {id} not found")))
}

async fn create_apartment_handler(
    Extension(user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<NewApartment>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateResponse>), AppError> {
    let Json(payload) = payload?;
    let submitted = app_state.service.submit(&user.id, payload).await?;
    let status = if submitted.duplicate {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((
        status,
        Json(CreateResponse {
            success: true,
            apartment: submitted.apartment,
            duplicate: submitted.duplicate,
        }),
    ))
}

async fn update_apartment_handler(
    Extension(user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<ApartmentPatch>, JsonRejection>,
) -> Result<Json<UpdateResponse>, AppError> {
    let Json(patch) = payload?;
    let apartment = app_state.service.edit(&user.id, patch).await?;
    Ok(Json(UpdateResponse {
        success: true,
        apartment,
    }))
}

async fn change_status_handler(
    Extension(user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<StatusChangeRequest>, JsonRejection>,
) -> Result<Json<UpdateResponse>, AppError> {
    let Json(payload) = payload?;
    let status: Status = payload
        .status
        .parse()
        .map_err(|e: crate::models::UnknownStatus| AppError::InvalidInput(e.to_string()))?;
    let apartment = app_state
        .service
        .change_status(&user.id, payload.id.as_deref(), status)
        .await?;
    Ok(Json(UpdateResponse {
        success: true,
        apartment,
    }))
}

async fn delete_apartment_handler(
    Extension(user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    query: Result<Query<IdQuery>, QueryRejection>,
) -> Result<Json<DeleteResponse>, AppError> {
    let Query(query) = query?;
    let removed = app_state
        .service
        .remove(&user.id, query.id.as_deref())
        .await?;
    Ok(Json(DeleteResponse {
        success: true,
        removed,
    }))
}

async fn filter_options_handler(
    Extension(user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<FilterOptions>, AppError> {
    let records = app_state.service.list(&user.id).await?;
    Ok(Json(views::filter_options(&records)))
}

async fn kanban_handler(
    Extension(user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<KanbanBoard>, AppError> {
    let records = app_state.service.list(&user.id).await?;
    Ok(Json(views::group_by_status(&records)))
}

async fn map_handler(
    Extension(user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    query: Result<Query<MapQuery>, QueryRejection>,
) -> Result<Json<Vec<MapMarker>>, AppError> {
    let Query(query) = query?;
    let reference = match (query.work_lat, query.work_lng) {
        (Some(lat), Some(lng)) => Some(GeoPoint::new(lat, lng)),
        (None, None) => None,
        _ => {
            return Err(AppError::InvalidInput(
                "workLat and workLng must be given together".to_string(),
            ))
        }
    };
    let fallback_center = query.include_missing.then_some(app_state.config.map_center);

    let records = app_state.service.list(&user.id).await?;
    Ok(Json(views::project_markers(&records, reference, fallback_center)))
}

async fn stats_handler(
    Extension(user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Summary>, AppError> {
    let records = app_state.service.list(&user.id).await?;
    Ok(Json(views::summarize(&records, Utc::now().date_naive())))
}

pub fn create_apartments_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/",
            get(list_apartments_handler)
                .post(create_apartment_handler)
                .patch(update_apartment_handler)
                .delete(delete_apartment_handler),
        )
        .route("/status", patch(change_status_handler))
        .route("/filters", get(filter_options_handler))
        .route("/kanban", get(kanban_handler))
        .route("/map", get(map_handler))
        .route("/stats", get(stats_handler))
        .route("/{id}", get(get_apartment_handler))
}
