//! # Adaptive Assessment
//!
//! 自适应测评服务：IRT 选题、AI 出题、能力测试和成绩统计
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 文档存储，只暴露读写能力
//! - `Store` - 存储接口，`MongoStore` 用于生产，`MemoryStore` 用于本地和测试
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `AdaptiveEngine` - 4PL IRT 能力估计、选题和终止判定
//! - `QuestionGenerator` / `LlmService` - AI 出题与兜底模板
//! - `AuthService` - 密码哈希与 JWT
//! - `analytics_service` - 成绩统计
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义每类请求的完整流程
//! - `AuthFlow` / `AssessmentFlow` / `AptitudeFlow` / `QuestionBankFlow` / `ReportFlow`
//!
//! ### ④ 接口与编排层
//! - `api/` - axum 路由、提取器和响应体
//! - `orchestrator/` - 应用生命周期

pub mod api;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use api::{router, AppState};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{MemoryStore, MongoStore, Store};
pub use orchestrator::App;
