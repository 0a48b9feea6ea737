//! 产品资源

pub mod handler;
pub mod model;
pub mod service;

use axum::{routing::get, Router};

use crate::app::AppState;

pub use model::{Product, ProductInput};
pub use service::ProductService;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/products",
            get(handler::list_products).post(handler::create_product),
        )
        .route(
            "/products/:id",
            get(handler::get_product)
                .put(handler::update_product)
                .delete(handler::delete_product),
        )
}
