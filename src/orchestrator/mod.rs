//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 管理服务的生命周期：选择存储后端、准备种子数据、组装依赖、启动 HTTP 服务。
//!
//! ## 层次关系
//!
//! ```text
//! orchestrator::App (生命周期)
//!     ↓
//! api (路由、提取器、响应体)
//!     ↓
//! workflow (auth / assessment / aptitude / question_bank / report)
//!     ↓
//! services (自适应引擎、出题、认证、统计)
//!     ↓
//! infrastructure (Store：MongoDB / 内存)
//! ```

pub mod app;

pub use app::App;
