/// Tauri命令模块
///
/// 包含所有前端可调用的命令:
/// - log_commands: 前端日志转发、指标记录、统计与健康状态查询

pub mod log_commands;
