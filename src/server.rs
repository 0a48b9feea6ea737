//! 服务组装与启动

use axum::{
    middleware,
    response::{IntoResponse, Response},
    Router,
};
use std::{any::Any, net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::app::{self, AppState};
use crate::config::{AppConfig, DatabaseConfig};
use crate::core::{
    auth::{inject_trusted_key, require_api_key, LoopbackBypassPolicy, SharedPolicy},
    error::{BootstrapError, CoreError},
    middleware::request_logging_middleware,
};
use crate::infrastructure::database::DatabaseManager;

/// 组装路由
///
/// 中间件由外到内：panic 恢复、追踪、请求日志、密钥注入、密钥校验。
pub fn build_router(state: AppState, policy: SharedPolicy) -> Router {
    Router::new()
        .merge(app::product::routes())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(CatchPanicLayer::custom(handle_panic))
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(request_logging_middleware))
                .layer(middleware::from_fn_with_state(
                    policy.clone(),
                    inject_trusted_key,
                ))
                .layer(middleware::from_fn_with_state(policy, require_api_key)),
        )
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    error!("Handler panicked: {}", detail);

    CoreError::InternalServerError("Internal server error".to_string()).into_response()
}

/// 打开数据库、建表、按需写入示例数据
pub async fn bootstrap_database(config: &DatabaseConfig) -> Result<DatabaseManager, BootstrapError> {
    let database = DatabaseManager::new(config).await?;
    database.init_schema().await?;
    database.seed().await?;
    Ok(database)
}

/// 启动服务，直到收到退出信号
pub async fn run(config: AppConfig) -> Result<(), BootstrapError> {
    let policy: SharedPolicy = Arc::new(LoopbackBypassPolicy::from_config(&config.auth)?);
    let database = bootstrap_database(&config.database).await?;

    let state = AppState::new(database.get_pool().clone());
    let app = build_router(state, policy);

    let listener = TcpListener::bind(config.http.socket_addr()?).await?;
    info!("🚀 Product API running on http://{}", listener.local_addr()?);
    info!("   POST   /products      - Create product");
    info!("   GET    /products      - List products");
    info!("   GET    /products/:id  - Get product");
    info!("   PUT    /products/:id  - Update product");
    info!("   DELETE /products/:id  - Delete product");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    database.close().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", err);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!("Failed to listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
