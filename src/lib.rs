//! # 产品 CRUD 服务
//!
//! 基于 Axum + SQLite 的最小产品资源服务：
//! - `POST/GET /products`、`GET/PUT/DELETE /products/:id`
//! - `X-API-Key` 请求头认证，环回地址免认证（不安全，见 [`crate::core::auth`]）
//! - 首次启动建表并写入两条示例数据

pub mod app;
pub mod config;
pub mod core;
pub mod infrastructure;
pub mod server;

pub use server::{bootstrap_database, build_router, run};
