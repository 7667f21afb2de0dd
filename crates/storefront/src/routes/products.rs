//! Catalog read handlers.

use axum::{
    Json,
    extract::State,
};
use serde::Deserialize;

use atelier_core::catalog::{Collection, Product};
use atelier_core::{CollectionId, ProductId};

use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::extract::{ApiPath, ApiQuery};
use crate::state::AppState;

/// Query parameters for the product list.
#[derive(Debug, Default, Deserialize)]
pub struct ProductListQuery {
    pub collection: Option<CollectionId>,
}

/// `GET /products`
pub async fn index(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ProductListQuery>,
) -> Result<Json<Vec<Product>>> {
    let products = ProductRepository::new(state.pool())
        .list(query.collection)
        .await?;
    Ok(Json(products))
}

/// `GET /products/{id}`
pub async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<Json<Product>> {
    ProductRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))
}

/// `GET /collections`
pub async fn collections(State(state): State<AppState>) -> Result<Json<Vec<Collection>>> {
    let collections = ProductRepository::new(state.pool())
        .list_collections()
        .await?;
    Ok(Json(collections))
}
