//! 产品业务服务
//!
//! 每个操作只执行一条 SQL 语句，不开启事务。路径中的 id 原样绑定，
//! SQLite 对整型列的比较会让非数字的 id 匹配不到任何行。

use sqlx::sqlite::SqlitePool;
use tracing::debug;

use super::model::{Product, ProductInput};
use crate::core::error::CoreError;

#[derive(Clone)]
pub struct ProductService {
    pool: SqlitePool,
}

impl ProductService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create_product(&self, input: ProductInput) -> Result<Product, CoreError> {
        let result = sqlx::query("INSERT INTO product (name, price) VALUES (?, ?)")
            .bind(&input.name)
            .bind(input.price)
            .execute(&self.pool)
            .await?;

        let product = input.into_product(result.last_insert_rowid());
        debug!("Created product {}", product.id);
        Ok(product)
    }

    /// 不排序，顺序由存储决定
    pub async fn list_products(&self) -> Result<Vec<Product>, CoreError> {
        let products = sqlx::query_as::<_, Product>("SELECT id, name, price FROM product")
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    pub async fn find_product(&self, id: &str) -> Result<Option<Product>, CoreError> {
        let product =
            sqlx::query_as::<_, Product>("SELECT id, name, price FROM product WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(product)
    }

    /// 不检查是否存在；返回的 id 取自路径，无法解析时为 0
    pub async fn update_product(&self, id: &str, input: ProductInput) -> Result<Product, CoreError> {
        let result = sqlx::query("UPDATE product SET name = ?, price = ? WHERE id = ?")
            .bind(&input.name)
            .bind(input.price)
            .bind(id)
            .execute(&self.pool)
            .await?;

        debug!("Updated product {} ({} rows)", id, result.rows_affected());
        Ok(input.into_product(parse_id(id)))
    }

    /// 不检查是否存在，返回受影响行数
    pub async fn delete_product(&self, id: &str) -> Result<u64, CoreError> {
        let result = sqlx::query("DELETE FROM product WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        debug!("Deleted product {} ({} rows)", id, result.rows_affected());
        Ok(result.rows_affected())
    }
}

fn parse_id(id: &str) -> i64 {
    id.parse().unwrap_or(0)
}
