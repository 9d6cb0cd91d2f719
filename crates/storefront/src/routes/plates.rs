//! Plate catalog and availability handlers.

use axum::{Json, extract::State, http::StatusCode};

use plateshop_core::{CatalogEntryId, PriceQuote};

use crate::error::Result;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::RequireOperator;
use crate::models::{
    Availability, Caller, CatalogEntry, CatalogQuery, CreateCatalogEntryRequest,
};
use crate::services::catalog::CatalogService;
use crate::state::AppState;

/// `GET /api/plates?type=`
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<CatalogQuery>,
) -> Result<Json<Vec<CatalogEntry>>> {
    Ok(Json(state.catalog().list(query.tier.as_deref()).await?))
}

/// `GET /api/plates/{id}`
pub async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CatalogEntryId>,
) -> Result<Json<CatalogEntry>> {
    Ok(Json(state.catalog().get(id).await?))
}

/// `POST /api/plates`
pub async fn create(
    State(state): State<AppState>,
    RequireOperator(user): RequireOperator,
    ApiJson(req): ApiJson<CreateCatalogEntryRequest>,
) -> Result<(StatusCode, Json<CatalogEntry>)> {
    let entry = state.catalog().create(Caller::user(&user), &req).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// `DELETE /api/plates/{id}`
pub async fn delete(
    State(state): State<AppState>,
    RequireOperator(user): RequireOperator,
    ApiPath(id): ApiPath<CatalogEntryId>,
) -> Result<StatusCode> {
    state.catalog().delete(Caller::user(&user), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/plates/price/{tier}`
pub async fn price(ApiPath(code): ApiPath<String>) -> Json<PriceQuote> {
    Json(CatalogService::quote(&code))
}

/// `GET /api/plates/check-availability/{text}`
pub async fn check_availability(
    State(state): State<AppState>,
    ApiPath(text): ApiPath<String>,
) -> Result<Json<Availability>> {
    let (text, available) = state.orders().check_availability(&text).await?;
    Ok(Json(Availability::new(text, available)))
}
