//! 服务配置
//!
//! 默认值与原服务保持一致：监听 `0.0.0.0:8080`（可被 `PORT` 覆盖），
//! 数据库文件为工作目录下的 `products.db`。存在 `config.toml` 或
//! `config/config.toml` 时从文件加载，缺省字段取默认值。

use serde::Deserialize;
use std::fs;
use std::net::{AddrParseError, IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;

/// 按顺序查找的配置文件
pub const CONFIG_PATHS: [&str; 2] = ["config.toml", "./config/config.toml"];

/// 服务配置结构
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP 服务配置
    pub http: HttpConfig,
    /// 数据库配置
    pub database: DatabaseConfig,
    /// 访问控制配置
    pub auth: AuthConfig,
    /// 日志配置
    pub logging: LoggingConfig,
}

/// HTTP 服务配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// 绑定地址
    pub bind_address: String,
    /// HTTP 服务端口
    pub port: u16,
}

/// 数据库配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite 连接串
    pub url: String,
    /// 连接池上限
    pub max_connections: u32,
}

/// 访问控制配置
///
/// 注意：默认值复刻了原服务的行为，来自环回地址的请求会绕过认证，
/// 密钥也是硬编码的。不要在真实部署中使用默认值。
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// 免认证的调用方地址
    pub allowed_ip: IpAddr,
    /// 携带密钥的请求头
    pub header_name: String,
    /// 唯一有效的密钥
    pub api_key: String,
    /// 是否信任 `X-Forwarded-For` / `X-Real-IP`
    pub trust_forwarded_headers: bool,
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 未设置 `RUST_LOG` 时使用的级别
    pub level: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://products.db".to_string(),
            max_connections: 5,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            allowed_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            header_name: "X-API-Key".to_string(),
            api_key: "supersecretkey".to_string(),
            trust_forwarded_headers: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// 配置错误类型
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file read error: {0}")]
    FileRead(String),
    #[error("config parse error: {0}")]
    Parse(String),
}

impl AppConfig {
    /// 从配置文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::FileRead(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// 配置文件（如有）+ `PORT` 环境变量
    pub fn load() -> Result<Self, ConfigError> {
        let config = match CONFIG_PATHS.iter().find(|path| Path::new(path).exists()) {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };

        Ok(config.with_port_override(std::env::var("PORT").ok()))
    }

    /// 应用端口覆盖，无法解析的值会被忽略
    pub fn with_port_override(mut self, port: Option<String>) -> Self {
        if let Some(port) = port.and_then(|p| p.trim().parse::<u16>().ok()) {
            self.http.port = port;
        }
        self
    }
}

impl HttpConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.bind_address, self.port).parse()
    }
}
