//! 产品处理器

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use tracing::warn;

use super::model::{Product, ProductInput};
use crate::app::AppState;
use crate::core::{error::CoreError, extract::JsonBody};

pub const PRODUCT_NOT_FOUND: &str = "Product not found";

pub async fn create_product(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<ProductInput>,
) -> Result<(StatusCode, Json<Product>), CoreError> {
    let product = state.product_service.create_product(input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn list_products(
    State(state): State<AppState>,
) -> Result<Json<Vec<Product>>, CoreError> {
    let products = state.product_service.list_products().await?;
    Ok(Json(products))
}

/// 查询失败（包括存储错误）一律视为不存在
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Product>, CoreError> {
    match state.product_service.find_product(&id).await {
        Ok(Some(product)) => Ok(Json(product)),
        Ok(None) => Err(CoreError::NotFound(PRODUCT_NOT_FOUND.to_string())),
        Err(err) => {
            warn!("Lookup of product {} failed: {}", id, err);
            Err(CoreError::NotFound(PRODUCT_NOT_FOUND.to_string()))
        }
    }
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<ProductInput>,
) -> Result<Json<Product>, CoreError> {
    let product = state.product_service.update_product(&id, input).await?;
    Ok(Json(product))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, CoreError> {
    state.product_service.delete_product(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
