//! 请求提取器：当前用户、角色校验、带 422 的 JSON / Query

use async_trait::async_trait;
use axum::extract::{FromRequest, FromRequestParts, Query};
use axum::http::header;
use axum::http::request::Parts;
use axum::Json;
use serde::Deserialize;

use super::AppState;
use crate::error::{AppError, AuthError};
use crate::models::user::User;

/// 由 `Authorization: Bearer <token>` 得到的当前用户
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// 管理员
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

/// 教师或管理员
#[derive(Debug, Clone)]
pub struct StaffUser(pub User);

/// WebSocket 连接的身份，来自 `?token=` 或 Bearer 头；未带令牌为匿名，令牌无效时拒绝
#[derive(Debug, Clone)]
pub struct SocketUser(pub Option<User>);

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// 请求体解析失败时返回 422
#[derive(Debug, Clone, FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct ValidJson<T>(pub T);

/// 查询参数解析失败时返回 422
#[derive(Debug, Clone, FromRequestParts)]
#[from_request(via(Query), rejection(AppError))]
pub struct ValidQuery<T>(pub T);

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    scheme.eq_ignore_ascii_case("bearer").then_some(token)
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(AppError::unauthorized)?;
        let user = state.auth.authenticate(token).await?;
        if !user.is_active {
            return Err(AuthError::Deactivated.into());
        }
        Ok(CurrentUser(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(AppError::forbidden("Admin access required"));
        }
        Ok(AdminUser(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for StaffUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_staff() {
            return Err(AppError::forbidden("Instructor or admin access required"));
        }
        Ok(StaffUser(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for SocketUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let ValidQuery(TokenQuery { token }) = ValidQuery::<TokenQuery>::from_request_parts(parts, state).await?;
        let Some(token) = token.or_else(|| bearer_token(parts).map(str::to_string)) else {
            return Ok(SocketUser(None));
        };
        let user = state.auth.authenticate(&token).await?;
        if !user.is_active {
            return Err(AuthError::Deactivated.into());
        }
        Ok(SocketUser(Some(user)))
    }
}
