use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 认证与权限错误
    #[error("认证错误: {0}")]
    Auth(#[from] AuthError),
    /// 存储层错误
    #[error("存储错误: {0}")]
    Store(#[from] StoreError),
    /// LLM 服务错误
    #[error("LLM错误: {0}")]
    Llm(#[from] LlmError),
    /// 业务逻辑错误
    #[error("业务错误: {0}")]
    Business(#[from] BusinessError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

/// 认证与权限错误
#[derive(Debug, Error)]
pub enum AuthError {
    /// 凭证无效（token 缺失、过期、签名错误或用户不存在）
    #[error("Could not validate credentials")]
    InvalidCredentials,
    /// 邮箱或密码错误
    #[error("Invalid email or password")]
    WrongPassword,
    /// 账号已停用
    #[error("Account is deactivated")]
    Deactivated,
    /// 无权访问
    #[error("{0}")]
    Forbidden(String),
    /// 密码哈希失败
    #[error("密码哈希失败: {0}")]
    Hashing(#[from] bcrypt::BcryptError),
    /// token 签发失败
    #[error("token 签发失败: {0}")]
    TokenEncoding(#[from] jsonwebtoken::errors::Error),
}

/// 存储层错误
#[derive(Debug, Error)]
pub enum StoreError {
    /// MongoDB 驱动错误
    #[error("MongoDB 操作失败 ({collection}): {source}")]
    Mongo {
        collection: &'static str,
        #[source]
        source: mongodb::error::Error,
    },
    /// 唯一键冲突
    #[error("唯一键冲突 ({collection}.{field})")]
    Duplicate {
        collection: &'static str,
        field: &'static str,
    },
    /// 文档序列化失败
    #[error("文档序列化失败: {0}")]
    Serialization(String),
}

/// LLM 服务错误
#[derive(Debug, Error)]
pub enum LlmError {
    /// API 调用失败
    #[error("LLM API调用失败 (模型: {model}): {message}")]
    ApiCallFailed { model: String, message: String },
    /// 返回内容为空
    #[error("LLM返回内容为空 (模型: {model})")]
    EmptyContent { model: String },
    /// 返回内容无法解析为题目
    #[error("无法解析LLM返回的题目: {reason}")]
    UnparseableQuestion { reason: String },
}

/// 业务逻辑错误
#[derive(Debug, Error)]
pub enum BusinessError {
    /// 请求参数校验失败
    #[error("{0}")]
    Validation(String),
    /// 不合法的请求
    #[error("{0}")]
    BadRequest(String),
    /// 资源不存在
    #[error("{0}")]
    NotFound(String),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 种子数据解析失败
    #[error("种子数据解析失败 ({name}): {source}")]
    SeedParseFailed {
        name: String,
        #[source]
        source: toml::de::Error,
    },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 参数校验失败 (422)
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Business(BusinessError::Validation(message.into()))
    }

    /// 业务上不合法的请求 (400)
    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::Business(BusinessError::BadRequest(message.into()))
    }

    /// 资源不存在 (404)
    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::Business(BusinessError::NotFound(message.into()))
    }

    /// 无权访问 (403)
    pub fn forbidden(message: impl Into<String>) -> Self {
        AppError::Auth(AuthError::Forbidden(message.into()))
    }

    /// 凭证无效 (401)
    pub fn unauthorized() -> Self {
        AppError::Auth(AuthError::InvalidCredentials)
    }

    /// 对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Auth(AuthError::InvalidCredentials | AuthError::WrongPassword) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Auth(AuthError::Deactivated | AuthError::Forbidden(_)) => {
                StatusCode::FORBIDDEN
            }
            AppError::Business(BusinessError::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Business(BusinessError::BadRequest(_)) => StatusCode::BAD_REQUEST,
            AppError::Business(BusinessError::NotFound(_)) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 返回给客户端的 detail 文本
    ///
    /// 客户端错误直接返回原始信息，服务端错误包装一层前缀
    fn detail(&self) -> String {
        match self {
            AppError::Auth(
                e @ (AuthError::InvalidCredentials
                | AuthError::WrongPassword
                | AuthError::Deactivated
                | AuthError::Forbidden(_)),
            ) => e.to_string(),
            AppError::Business(e) => e.to_string(),
            other => format!("Internal server error: {}", other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("❌ 请求处理失败: {}", self);
        }

        let body = axum::Json(json!({ "detail": self.detail() }));
        if status == StatusCode::UNAUTHORIZED {
            (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response()
        } else {
            (status, body).into_response()
        }
    }
}

impl From<axum::extract::rejection::JsonRejection> for AppError {
    fn from(rejection: axum::extract::rejection::JsonRejection) -> Self {
        AppError::validation(rejection.body_text())
    }
}

impl From<axum::extract::rejection::QueryRejection> for AppError {
    fn from(rejection: axum::extract::rejection::QueryRejection) -> Self {
        AppError::validation(rejection.body_text())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Store(StoreError::Serialization(err.to_string()))
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::unauthorized().status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::forbidden("x").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::bad_request("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::validation("x").status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::Other("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_client_errors_keep_detail() {
        assert_eq!(
            AppError::not_found("Assessment not found").detail(),
            "Assessment not found"
        );
        assert_eq!(
            AppError::Auth(AuthError::WrongPassword).detail(),
            "Invalid email or password"
        );
    }
}
