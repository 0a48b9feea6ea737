//! 核心错误处理模块

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::error;

use crate::config::ConfigError;

/// 核心错误类型
///
/// 所有错误都以 `{"error": "<message>"}` 的形式返回给调用方。
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{0}")]
    BadRequest(String),
    #[error("Invalid API key")]
    Unauthorized,
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    InternalServerError(String),
}

impl CoreError {
    pub fn status(&self) -> StatusCode {
        match self {
            CoreError::BadRequest(_) => StatusCode::BAD_REQUEST,
            CoreError::Unauthorized => StatusCode::UNAUTHORIZED,
            CoreError::NotFound(_) => StatusCode::NOT_FOUND,
            CoreError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        CoreError::InternalServerError(err.to_string())
    }
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let CoreError::InternalServerError(msg) = &self {
            error!("Internal error: {}", msg);
        }

        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

/// 启动错误，出现即终止进程
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    ConfigFile(#[from] ConfigError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<std::net::AddrParseError> for BootstrapError {
    fn from(err: std::net::AddrParseError) -> Self {
        BootstrapError::Config(format!("invalid listen address: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            CoreError::BadRequest("bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(CoreError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            CoreError::NotFound("Product not found".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            CoreError::InternalServerError("disk I/O error".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_messages() {
        assert_eq!(CoreError::Unauthorized.to_string(), "Invalid API key");
        assert_eq!(
            CoreError::NotFound("Product not found".into()).to_string(),
            "Product not found"
        );
    }

    #[test]
    fn test_sqlx_error_is_internal() {
        let err: CoreError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_bootstrap_error_sources() {
        use std::error::Error as _;

        let err: BootstrapError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, BootstrapError::Database(_)));
        assert!(err.source().is_some());
        assert!(err.to_string().starts_with("database error: "));

        let err: BootstrapError = "0.0.0.0:http"
            .parse::<std::net::SocketAddr>()
            .unwrap_err()
            .into();
        assert!(matches!(err, BootstrapError::Config(_)));
        assert!(err.source().is_none());

        let err: BootstrapError = ConfigError::Parse("expected `=`".to_string()).into();
        assert_eq!(err.to_string(), "config parse error: expected `=`");
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let response = CoreError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, serde_json::json!({ "error": "Invalid API key" }));
    }
}
