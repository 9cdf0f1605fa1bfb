use std::io;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const APP_DIR_NAME: &str = "backoffice-observability";
const LOG_FILE_PREFIX: &str = "observability";

/// 默认日志目录
///
/// - Windows: `C:\Users\<user>\AppData\Roaming\backoffice-observability\logs\`
/// - macOS: `~/Library/Application Support/backoffice-observability/logs/`
/// - Linux: `~/.local/share/backoffice-observability/logs/`
///
/// 无法确定系统数据目录时回退到 `./logs`。
pub fn default_log_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR_NAME).join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

/// 初始化日志系统
///
/// - 文件层: JSON格式, 按天轮转, non_blocking写入
/// - 控制台层: 人类可读格式
/// - 环境变量控制: RUST_LOG=debug 可调整级别, 默认info
///
/// # 重要提示
/// 返回的guard必须被调用者保存,直到应用退出。
/// 如果guard被drop,日志写入器将被关闭。
pub fn init(log_dir: &Path) -> Result<WorkerGuard, io::Error> {
    std::fs::create_dir_all(log_dir)?;

    // 文件命名格式: observability.2025-10-05.log
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .build(log_dir)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false);

    let console_layer = fmt::layer()
        .with_writer(io::stdout)
        .with_target(true)
        .with_level(true)
        .with_ansi(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::AlreadyExists, e))?;

    tracing::info!(log_dir = %log_dir.display(), "日志系统已初始化");
    Ok(guard)
}
