//! `/api/auth`

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::api::dto::{AuthResponse, CurrentUserResponse, LoginRequest, RegisterRequest, UserInfo};
use crate::api::extract::{CurrentUser, ValidJson};
use crate::api::AppState;
use crate::error::{AppError, AppResult};
use crate::models::user::UserRole;
use crate::workflow::Registration;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
        .route("/profile", get(profile))
        .route("/logout", post(logout))
}

async fn register(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<RegisterRequest>,
) -> AppResult<Json<AuthResponse>> {
    let role = match req.role.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
        Some(role) => UserRole::parse(&role.to_ascii_lowercase())
            .ok_or_else(|| AppError::validation(format!("Invalid role '{}'", role)))?,
        None => UserRole::Student,
    };

    let (user, token) = state
        .auth
        .register(Registration {
            email: req.email,
            password: req.password,
            first_name: req.first_name,
            last_name: req.last_name,
            institution: req.institution,
            department: req.department,
            year: req.year,
            roll_number: req.roll_number,
            role,
        })
        .await?;
    Ok(Json(AuthResponse::new(&user, token)))
}

async fn login(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let (user, token) = state.auth.login(&req.email, &req.password).await?;
    Ok(Json(AuthResponse::new(&user, token)))
}

async fn me(CurrentUser(user): CurrentUser) -> Json<CurrentUserResponse> {
    Json(CurrentUserResponse::from(&user))
}

async fn profile(CurrentUser(user): CurrentUser) -> Json<Value> {
    Json(json!({ "user": UserInfo::from(&user) }))
}

/// 令牌是无状态的，由客户端丢弃即可
async fn logout(CurrentUser(_): CurrentUser) -> Json<Value> {
    Json(json!({ "message": "Successfully logged out" }))
}
