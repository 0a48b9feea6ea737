//! 数据库基础设施

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Error;
use std::str::FromStr;
use tracing::info;

use crate::config::DatabaseConfig;

const CREATE_PRODUCT_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS product (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT,
        price INTEGER
    )
"#;

/// 首次启动时写入的示例数据
pub const SEED_PRODUCTS: [(&str, i64); 2] = [("Apple", 100), ("Banana", 50)];

pub struct DatabaseManager {
    pool: SqlitePool,
}

impl DatabaseManager {
    pub async fn new(config: &DatabaseConfig) -> Result<Self, Error> {
        let options = SqliteConnectOptions::from_str(&config.url)?.create_if_missing(true);

        // 内存库每个连接都是独立的库，只能保留单个常驻连接
        let pool_options = if is_in_memory(&config.url) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(config.max_connections)
        };

        let pool = pool_options.connect_with(options).await?;
        info!("Opened database {}", config.url);

        Ok(Self { pool })
    }

    /// 建表（幂等）
    pub async fn init_schema(&self) -> Result<(), Error> {
        sqlx::query(CREATE_PRODUCT_TABLE).execute(&self.pool).await?;
        Ok(())
    }

    /// 空表时写入示例数据，返回是否写入
    pub async fn seed(&self) -> Result<bool, Error> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM product")
            .fetch_one(&self.pool)
            .await?;

        if count.0 > 0 {
            info!("Database already contains {} products, skipping seed", count.0);
            return Ok(false);
        }

        let [(first_name, first_price), (second_name, second_price)] = SEED_PRODUCTS;
        sqlx::query("INSERT INTO product (name, price) VALUES (?, ?), (?, ?)")
            .bind(first_name)
            .bind(first_price)
            .bind(second_name)
            .bind(second_price)
            .execute(&self.pool)
            .await?;

        info!("Seeded database with {} products", SEED_PRODUCTS.len());
        Ok(true)
    }

    pub fn get_pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database closed");
    }
}

fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}
