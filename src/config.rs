use crate::error::{AppResult, ConfigError};
use std::str::FromStr;

/// 存储后端
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    /// MongoDB（生产）
    Mongo,
    /// 进程内存（本地调试、测试）
    Memory,
}

impl FromStr for StorageBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(StorageBackend::Mongo),
            "memory" | "mem" => Ok(StorageBackend::Memory),
            _ => Err(()),
        }
    }
}

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    // --- 存储 ---
    pub mongodb_uri: String,
    pub storage: StorageBackend,
    // --- 认证 ---
    pub jwt_secret: String,
    /// token 有效期（分钟）
    pub access_token_expire_minutes: i64,
    pub bcrypt_cost: u32,
    // --- LLM 配置 ---
    pub gemini_api_key: String,
    pub gemini_api_base_url: String,
    pub gemini_model_name: String,
    /// 同时进行的题目生成请求数
    pub max_concurrent_generations: usize,
    // --- HTTP 服务 ---
    pub host: String,
    pub port: u16,
    pub debug: bool,
    pub cors_origins: Vec<String>,
    /// 超过该小时数未访问的未完成测评会被自动提交
    pub stale_assessment_hours: i64,
}

pub const DEFAULT_JWT_SECRET: &str = "your-secret-key-here";

impl Default for Config {
    fn default() -> Self {
        Self {
            mongodb_uri: "mongodb://localhost:27017/adaptive_assessment".to_string(),
            storage: StorageBackend::Mongo,
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            access_token_expire_minutes: 60,
            bcrypt_cost: 12,
            gemini_api_key: String::new(),
            gemini_api_base_url: "https://generativelanguage.googleapis.com/v1beta/openai"
                .to_string(),
            gemini_model_name: "gemini-1.5-flash".to_string(),
            max_concurrent_generations: 4,
            host: "0.0.0.0".to_string(),
            port: 8001,
            debug: false,
            cors_origins: vec!["http://localhost:3000".to_string()],
            stale_assessment_hours: 24,
        }
    }
}

impl Config {
    /// 从环境变量读取配置
    ///
    /// 会先尝试加载 `config.env` 和 `.env`，已存在的环境变量不会被覆盖
    pub fn from_env() -> AppResult<Self> {
        let _ = dotenvy::from_filename("config.env");
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 使用自定义查找函数构建配置，便于测试
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = Self::default();
        let storage = match lookup("STORAGE_BACKEND") {
            Some(v) => v.parse().map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: "STORAGE_BACKEND".to_string(),
                value: v.clone(),
                expected_type: "mongo | memory".to_string(),
            })?,
            None => default.storage,
        };

        Ok(Self {
            mongodb_uri: lookup("MONGODB_URI").unwrap_or(default.mongodb_uri),
            storage,
            jwt_secret: lookup("JWT_SECRET").unwrap_or(default.jwt_secret),
            access_token_expire_minutes: parse_var(
                &lookup,
                "ACCESS_TOKEN_EXPIRE_MINUTES",
                default.access_token_expire_minutes,
            )?,
            bcrypt_cost: parse_var(&lookup, "BCRYPT_COST", default.bcrypt_cost)?,
            gemini_api_key: lookup("GEMINI_API_KEY").unwrap_or(default.gemini_api_key),
            gemini_api_base_url: lookup("GEMINI_API_BASE_URL")
                .unwrap_or(default.gemini_api_base_url),
            gemini_model_name: lookup("GEMINI_MODEL_NAME").unwrap_or(default.gemini_model_name),
            max_concurrent_generations: parse_var(
                &lookup,
                "MAX_CONCURRENT_GENERATIONS",
                default.max_concurrent_generations,
            )?
            .max(1),
            host: lookup("HOST").unwrap_or(default.host),
            port: parse_var(&lookup, "PORT", default.port)?,
            debug: parse_var(&lookup, "DEBUG", default.debug)?,
            cors_origins: lookup("CORS_ORIGINS")
                .map(|v| split_origins(&v))
                .unwrap_or(default.cors_origins),
            stale_assessment_hours: parse_var(
                &lookup,
                "STALE_ASSESSMENT_HOURS",
                default.stale_assessment_hours,
            )?,
        })
    }

    /// 监听地址
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// 是否启用 AI 生成（否则使用兜底模板）
    pub fn ai_enabled(&self) -> bool {
        !self.gemini_api_key.trim().is_empty()
    }
}

fn parse_var<T, F>(lookup: &F, var_name: &str, default: T) -> AppResult<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var_name) {
        None => Ok(default),
        Some(value) => value.trim().parse::<T>().map_err(|_| {
            ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: std::any::type_name::<T>().to_string(),
            }
            .into()
        }),
    }
}

fn split_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_env_empty() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config.port, 8001);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.storage, StorageBackend::Mongo);
        assert_eq!(config.cors_origins, vec!["http://localhost:3000".to_string()]);
        assert!(!config.ai_enabled());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("PORT", "9000"),
            ("DEBUG", "true"),
            ("CORS_ORIGINS", "http://a.test, http://b.test,"),
            ("GEMINI_API_KEY", "k"),
            ("STORAGE_BACKEND", "memory"),
        ]))
        .unwrap();
        assert_eq!(config.port, 9000);
        assert!(config.debug);
        assert_eq!(config.cors_origins, vec!["http://a.test", "http://b.test"]);
        assert!(config.ai_enabled());
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.bind_addr(), "0.0.0.0:9000");
    }

    #[test]
    fn test_bad_number_names_the_variable() {
        let err = Config::from_lookup(lookup_from(&[("PORT", "eighty")])).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("PORT"));
        assert!(msg.contains("eighty"));
    }

    #[test]
    fn test_concurrency_never_zero() {
        let config =
            Config::from_lookup(lookup_from(&[("MAX_CONCURRENT_GENERATIONS", "0")])).unwrap();
        assert_eq!(config.max_concurrent_generations, 1);
    }
}
