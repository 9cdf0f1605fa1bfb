//! 平台事件总线
//!
//! 宿主通过 `emit` 推送事件,日志器与监控器在 `start` 时订阅、
//! 在关闭时随取消令牌退订。

use tokio::sync::broadcast;

use crate::models::PlatformEvent;

const DEFAULT_CAPACITY: usize = 256;

/// 平台事件总线
#[derive(Clone)]
pub struct PlatformEvents {
    sender: broadcast::Sender<PlatformEvent>,
}

impl PlatformEvents {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// 推送事件, 返回接收到事件的订阅者数量
    pub fn emit(&self, event: PlatformEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlatformEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for PlatformEvents {
    fn default() -> Self {
        Self::new()
    }
}

/// 从订阅中接收下一个事件
///
/// 订阅者落后时跳过丢失的事件继续接收,总线关闭时返回 `None`。
pub(crate) async fn next_event(
    receiver: &mut broadcast::Receiver<PlatformEvent>,
    subscriber: &'static str,
) -> Option<PlatformEvent> {
    loop {
        match receiver.recv().await {
            Ok(event) => return Some(event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(subscriber, skipped, "平台事件订阅落后,已跳过部分事件");
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}
