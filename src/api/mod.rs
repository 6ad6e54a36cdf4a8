//! HTTP 接口层
//!
//! 只做请求解析、权限校验和响应组装，业务全部交给 workflow

pub mod dto;
pub mod extract;
pub mod realtime;
pub mod routes;

use axum::http::{header, HeaderValue, Method, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::config::Config;
use crate::infrastructure::Store;
use crate::services::{AuthService, QuestionGenerator};
use crate::workflow::{AptitudeFlow, AssessmentFlow, AuthFlow, QuestionBankFlow, ReportFlow};

/// 实时通道的缓冲条数
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// 各路由共享的状态
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub auth: Arc<AuthFlow>,
    pub assessments: Arc<AssessmentFlow>,
    pub aptitude: Arc<AptitudeFlow>,
    pub questions: Arc<QuestionBankFlow>,
    pub reports: Arc<ReportFlow>,
    /// WebSocket 广播
    pub events: broadcast::Sender<realtime::Outbound>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn Store>, generator: Arc<QuestionGenerator>) -> Self {
        let auth_service = Arc::new(AuthService::new(&config));
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            auth: Arc::new(AuthFlow::new(store.clone(), auth_service)),
            assessments: Arc::new(AssessmentFlow::new(
                store.clone(),
                generator.clone(),
                config.stale_assessment_hours,
            )),
            aptitude: Arc::new(AptitudeFlow::new(store.clone())),
            questions: Arc::new(QuestionBankFlow::new(store.clone(), generator)),
            reports: Arc::new(ReportFlow::new(store)),
            config: Arc::new(config),
            events,
        }
    }
}

/// 组装完整路由
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest("/api/auth", routes::auth::router())
        .nest("/api/users", routes::users::router())
        .nest("/api/assessments", routes::assessments::router())
        .nest("/api/aptitude", routes::aptitude::router())
        .nest("/api/questions", routes::questions::router())
        .nest("/api/analytics", routes::analytics::router())
        .nest("/api/admin", routes::admin::router())
        .nest("/api/assignments", routes::assignments::router())
        .route("/socket.io/", get(realtime::websocket_handler))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// 只放行配置中的来源
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("⚠️ 忽略无效的 CORS 来源: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

async fn root() -> impl IntoResponse {
    Json(json!({
        "message": "Adaptive Assessment API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
    }))
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

async fn not_found(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "message": "Route not found",
            "path": uri.path(),
        })),
    )
}
