use adaptive_assessment::utils::logging;
use adaptive_assessment::{App, Config};
use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::from_env()?;

    // 初始化日志
    logging::init(config.debug);

    // 初始化并运行应用
    App::initialize(config).await?.run().await?;

    Ok(())
}
