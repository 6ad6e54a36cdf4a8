//! 认证流程 - 流程层
//!
//! 注册、登录，以及由访问令牌找到当前用户

use chrono::Utc;
use regex::Regex;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult, AuthError, StoreError};
use crate::infrastructure::Store;
use crate::models::user::{NewUser, User, UserRole};
use crate::services::AuthService;

/// 密码最短长度
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// 注册信息
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub institution: String,
    pub department: Option<String>,
    pub year: Option<String>,
    pub roll_number: Option<String>,
    pub role: UserRole,
}

fn email_pattern() -> Option<&'static Regex> {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL
        .get_or_init(|| Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$").ok())
        .as_ref()
}

/// 邮箱格式是否合法
pub fn is_valid_email(email: &str) -> bool {
    email_pattern().is_some_and(|re| re.is_match(email.trim()))
}

impl Registration {
    /// 校验注册信息 (422)
    pub fn validate(&self) -> AppResult<()> {
        if !is_valid_email(&self.email) {
            return Err(AppError::validation("value is not a valid email address"));
        }
        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AppError::validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }
        if self.first_name.trim().is_empty() || self.last_name.trim().is_empty() {
            return Err(AppError::validation("First name and last name are required"));
        }
        if self.institution.trim().is_empty() {
            return Err(AppError::validation("Institution is required"));
        }
        Ok(())
    }
}

/// 认证流程
pub struct AuthFlow {
    store: Arc<dyn Store>,
    auth: Arc<AuthService>,
}

impl AuthFlow {
    pub fn new(store: Arc<dyn Store>, auth: Arc<AuthService>) -> Self {
        Self { store, auth }
    }

    /// 注册新用户并签发令牌
    pub async fn register(&self, registration: Registration) -> AppResult<(User, String)> {
        registration.validate()?;

        let email = registration.email.trim().to_lowercase();
        if self.store.find_user_by_email(&email).await?.is_some() {
            debug!("邮箱已注册: {}", email);
            return Err(AppError::bad_request("Email already registered"));
        }

        let roll_number = registration
            .roll_number
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        if let Some(roll) = &roll_number {
            if self.store.find_user_by_roll_number(roll).await?.is_some() {
                debug!("学号已注册: {}", roll);
                return Err(AppError::bad_request("Roll number already registered"));
            }
        }

        let password_hash = self.auth.hash_password(&registration.password).await?;
        let user = User::new(NewUser {
            email,
            password_hash,
            first_name: registration.first_name.trim().to_string(),
            last_name: registration.last_name.trim().to_string(),
            role: registration.role,
            institution: registration.institution.trim().to_string(),
            department: registration.department,
            year: registration.year,
            roll_number,
        });

        // 并发注册时由唯一索引兜底
        self.store.insert_user(&user).await.map_err(|e| match e {
            AppError::Store(StoreError::Duplicate { field: "roll_number", .. }) => {
                AppError::bad_request("Roll number already registered")
            }
            AppError::Store(StoreError::Duplicate { .. }) => {
                AppError::bad_request("Email already registered")
            }
            other => other,
        })?;

        info!("👤 新用户注册: {} ({})", user.email, user.role.as_str());
        let token = self.auth.create_access_token(&user.id)?;
        Ok((user, token))
    }

    /// 登录，成功后更新最近登录时间
    pub async fn login(&self, email: &str, password: &str) -> AppResult<(User, String)> {
        let email = email.trim().to_lowercase();
        let Some(mut user) = self.store.find_user_by_email(&email).await? else {
            debug!("登录失败，用户不存在: {}", email);
            return Err(AuthError::WrongPassword.into());
        };

        if !self.auth.verify_password(password, &user.password).await? {
            debug!("登录失败，密码错误: {}", email);
            return Err(AuthError::WrongPassword.into());
        }

        if !user.is_active {
            warn!("⚠️ 已停用账号尝试登录: {}", email);
            return Err(AuthError::Deactivated.into());
        }

        user.last_login = Some(Utc::now());
        self.store.update_user(&user).await?;

        info!("🔑 用户登录: {}", user.email);
        let token = self.auth.create_access_token(&user.id)?;
        Ok((user, token))
    }

    /// 由 Bearer 令牌找到当前用户
    pub async fn authenticate(&self, token: &str) -> AppResult<User> {
        let token = token.trim();
        if token.is_empty() || token == "undefined" || token == "null" {
            return Err(AppError::unauthorized());
        }

        let claims = self.auth.decode_token(token)?;
        if claims.sub.is_empty() {
            return Err(AppError::unauthorized());
        }

        self.store
            .find_user(&claims.sub)
            .await?
            .ok_or_else(|| {
                debug!("令牌对应的用户不存在: {}", claims.sub);
                AppError::unauthorized()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::infrastructure::MemoryStore;

    fn flow() -> AuthFlow {
        let config = Config {
            bcrypt_cost: 4,
            ..Config::default()
        };
        AuthFlow::new(Arc::new(MemoryStore::new()), Arc::new(AuthService::new(&config)))
    }

    fn registration(email: &str, roll: Option<&str>) -> Registration {
        Registration {
            email: email.to_string(),
            password: "secret123".to_string(),
            first_name: "Ana".to_string(),
            last_name: "Lima".to_string(),
            institution: "Inst".to_string(),
            department: None,
            year: None,
            roll_number: roll.map(str::to_string),
            role: UserRole::Student,
        }
    }

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("ana@example.com"));
        assert!(is_valid_email("a.b+c@sub.example.org"));
        assert!(!is_valid_email("ana@"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a@b"));
    }

    #[test]
    fn test_registration_validation() {
        let mut reg = registration("ana@example.com", None);
        assert!(reg.validate().is_ok());

        reg.password = "12345".to_string();
        assert!(matches!(
            reg.validate(),
            Err(AppError::Business(crate::error::BusinessError::Validation(_)))
        ));

        let mut reg = registration("ana@example.com", None);
        reg.first_name = "  ".to_string();
        assert!(reg.validate().is_err());
    }

    #[tokio::test]
    async fn test_register_login_authenticate() {
        let flow = flow();
        let (user, token) = flow
            .register(registration("Ana@Example.com", Some("R1")))
            .await
            .unwrap();
        assert_eq!(user.email, "ana@example.com");

        let me = flow.authenticate(&token).await.unwrap();
        assert_eq!(me.id, user.id);

        let (logged_in, _) = flow.login("ana@example.com", "secret123").await.unwrap();
        assert!(logged_in.last_login.is_some());

        let err = flow.login("ana@example.com", "wrong").await.unwrap_err();
        assert_eq!(err.to_string(), "认证错误: Invalid email or password");
    }

    #[tokio::test]
    async fn test_register_duplicates() {
        let flow = flow();
        flow.register(registration("ana@example.com", Some("R1"))).await.unwrap();

        let err = flow
            .register(registration("ana@example.com", None))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "业务错误: Email already registered");

        let err = flow
            .register(registration("bob@example.com", Some("R1")))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "业务错误: Roll number already registered");
    }

    #[tokio::test]
    async fn test_authenticate_rejects_placeholders() {
        let flow = flow();
        for token in ["", "undefined", "null", "garbage"] {
            assert!(matches!(
                flow.authenticate(token).await,
                Err(AppError::Auth(AuthError::InvalidCredentials))
            ));
        }
    }
}
