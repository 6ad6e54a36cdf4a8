//! 认证服务 - 业务能力层
//!
//! 密码哈希（bcrypt）和访问令牌（JWT HS256）

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{Config, DEFAULT_JWT_SECRET};
use crate::error::{AppError, AppResult, AuthError};

/// 令牌载荷
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// 用户 ID
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
}

pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_ttl: Duration,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(config: &Config) -> Self {
        if config.jwt_secret == DEFAULT_JWT_SECRET {
            warn!("⚠️ JWT_SECRET 使用默认值，生产环境请务必修改");
        }
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            token_ttl: Duration::minutes(config.access_token_expire_minutes),
            bcrypt_cost: config.bcrypt_cost,
        }
    }

    /// 令牌有效期（秒）
    pub fn token_ttl_seconds(&self) -> i64 {
        self.token_ttl.num_seconds()
    }

    /// 计算密码哈希（在阻塞线程池中执行）
    pub async fn hash_password(&self, password: &str) -> AppResult<String> {
        let password = password.to_string();
        let cost = self.bcrypt_cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| AppError::Other(format!("密码哈希任务失败: {}", e)))?
            .map_err(|e| AuthError::Hashing(e).into())
    }

    /// 校验密码；哈希格式错误视为不匹配
    pub async fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool> {
        let password = password.to_string();
        let hash = hash.to_string();
        let result = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| AppError::Other(format!("密码校验任务失败: {}", e)))?;

        match result {
            Ok(ok) => Ok(ok),
            Err(e) => {
                warn!("密码哈希格式无效: {}", e);
                Ok(false)
            }
        }
    }

    /// 签发访问令牌
    pub fn create_access_token(&self, user_id: &str) -> AppResult<String> {
        self.create_token(user_id, self.token_ttl)
    }

    fn create_token(&self, user_id: &str, ttl: Duration) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(AuthError::TokenEncoding)?;
        Ok(token)
    }

    /// 解析并校验令牌，任何失败都返回凭证无效
    pub fn decode_token(&self, token: &str) -> AppResult<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!("令牌校验失败: {}", e);
                AppError::unauthorized()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> AuthService {
        AuthService::new(&Config {
            jwt_secret: "test-secret".to_string(),
            bcrypt_cost: 4,
            ..Config::default()
        })
    }

    #[tokio::test]
    async fn test_password_round_trip() {
        let auth = service();
        let hash = auth.hash_password("secret123").await.unwrap();
        assert_ne!(hash, "secret123");
        assert!(auth.verify_password("secret123", &hash).await.unwrap());
        assert!(!auth.verify_password("wrong", &hash).await.unwrap());
    }

    #[test]
    fn test_malformed_hash_does_not_match() {
        let auth = service();
        let matched = tokio_test::block_on(auth.verify_password("x", "not-a-hash")).unwrap();
        assert!(!matched);
    }

    #[test]
    fn test_token_round_trip() {
        let auth = service();
        let token = auth.create_access_token("user-1").unwrap();
        let claims = auth.decode_token(&token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_expired_token_rejected() {
        let auth = service();
        let token = auth.create_token("user-1", Duration::minutes(-10)).unwrap();
        let err = auth.decode_token(&token).unwrap_err();
        assert!(matches!(err, AppError::Auth(AuthError::InvalidCredentials)));
    }

    #[test]
    fn test_token_from_other_secret_rejected() {
        let other = AuthService::new(&Config {
            jwt_secret: "another-secret".to_string(),
            ..Config::default()
        });
        let token = other.create_access_token("user-1").unwrap();
        assert!(service().decode_token(&token).is_err());
        assert!(service().decode_token("garbage").is_err());
    }
}
