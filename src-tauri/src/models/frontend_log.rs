//! 前端日志模型
//!
//! 前端通过IPC发送的诊断事件,由日志器统一分级、去重与上报。

use serde::{Deserialize, Serialize};

use super::error_report::{ErrorContext, Failure, LogLevel};

/// 前端日志数据结构
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrontendLog {
    /// 日志级别
    pub level: LogLevel,
    /// 日志消息
    pub message: String,
    /// 前端错误对象的堆栈
    #[serde(default)]
    pub stack: Option<String>,
    /// 上下文信息
    #[serde(default)]
    pub context: Option<ErrorContext>,
}

impl FrontendLog {
    /// 拆分为日志器入参
    pub fn into_parts(self) -> (LogLevel, Failure, Option<ErrorContext>) {
        let failure = Failure {
            message: self.message,
            stack: self.stack,
        };
        (self.level, failure, self.context)
    }
}
