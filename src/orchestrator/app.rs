//! 应用生命周期 - 编排层
//!
//! 流程顺序：
//! 1. 按配置连接存储（MongoDB 或内存）
//! 2. 创建出题服务
//! 3. 没有能力测试时写入种子数据
//! 4. 组装路由并监听端口

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::api::{self, AppState};
use crate::config::{Config, StorageBackend};
use crate::error::{AppError, AppResult};
use crate::infrastructure::{MemoryStore, MongoStore, Store};
use crate::services::QuestionGenerator;
use crate::utils::logging;
use crate::workflow::AptitudeFlow;

/// 应用主结构
pub struct App {
    config: Config,
    state: AppState,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> AppResult<Self> {
        logging::log_startup(&config);

        let store = connect_store(&config).await?;
        let generator = Arc::new(QuestionGenerator::new(&config)?);

        let seeded = AptitudeFlow::new(store.clone()).seed_if_empty().await?;
        if seeded > 0 {
            info!("🌱 已写入 {} 套能力测试", seeded);
        }

        let state = AppState::new(config.clone(), store, generator);
        Ok(Self { config, state })
    }

    /// 监听端口直到进程退出
    pub async fn run(self) -> AppResult<()> {
        let addr = self.config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| AppError::Other(format!("无法监听 {}: {}", addr, e)))?;
        info!("✅ 服务已启动: http://{}", addr);

        axum::serve(listener, api::router(self.state))
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| AppError::Other(format!("HTTP 服务异常退出: {}", e)))?;

        info!("👋 服务已停止");
        Ok(())
    }
}

async fn connect_store(config: &Config) -> AppResult<Arc<dyn Store>> {
    match config.storage {
        StorageBackend::Mongo => Ok(Arc::new(MongoStore::connect(&config.mongodb_uri).await?)),
        StorageBackend::Memory => {
            warn!("⚠️ 使用内存存储，重启后数据会丢失");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("无法监听退出信号: {}", e);
        std::future::pending::<()>().await;
    }
    info!("🛑 收到退出信号，正在停止服务...");
}
