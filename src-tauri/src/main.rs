use backoffice_observability::services::ConfigService;
use backoffice_observability::utils::logger;
use backoffice_observability::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // guard 必须存活到进程退出
    let _guard = logger::init(&logger::default_log_dir())?;

    let config = ConfigService::load()?;
    let state = AppState::new(&config)?;

    state.error_logger.capture_panics();
    state.start().await;

    tracing::info!("可观测性服务已启动, Ctrl+C 退出");
    tokio::signal::ctrl_c().await?;

    tracing::info!("收到退出信号, 正在关闭");
    state.shutdown().await;

    Ok(())
}
