/// 日志工具模块
///
/// 提供日志初始化和启动信息输出的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// 初始化全局日志
///
/// 优先使用 `RUST_LOG`，否则按 `debug` 开关选择 `debug` 或 `info`
pub fn init(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{default_level},tower_http=info")));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录服务启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 自适应测评服务启动");
    info!("🔗 监听地址: http://{}", config.bind_addr());
    info!("🗄️ 存储后端: {:?}", config.storage);
    if config.ai_enabled() {
        info!("🤖 AI 出题: 已启用 (模型: {})", config.gemini_model_name);
    } else {
        info!("⚠️ 未配置 GEMINI_API_KEY，使用兜底题目模板");
    }
    info!("🌐 CORS: {}", config.cors_origins.join(", "));
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("abc", 5), "abc");
        assert_eq!(truncate_text("abcdef", 3), "abc...");
        assert_eq!(truncate_text("题目内容很长", 2), "题目...");
    }
}
