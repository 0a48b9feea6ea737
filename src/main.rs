use product_api::config::AppConfig;
use product_api::core::error::BootstrapError;
use product_api::infrastructure::logger::Logger;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(err) => {
            Logger::init("info");
            error!("Failed to load configuration: {}", BootstrapError::from(err));
            std::process::exit(1);
        }
    };

    // 初始化日志
    Logger::init(&config.logging.level);

    info!("Starting product API...");

    // 启动失败直接退出
    if let Err(err) = product_api::run(config).await {
        error!("Failed to start product API: {}", err);
        std::process::exit(1);
    }
}
