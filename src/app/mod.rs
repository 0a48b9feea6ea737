//! 应用层

pub mod product;

use sqlx::sqlite::SqlitePool;

use product::ProductService;

#[derive(Clone)]
pub struct AppState {
    pub product_service: ProductService,
}

impl AppState {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            product_service: ProductService::new(pool),
        }
    }
}
