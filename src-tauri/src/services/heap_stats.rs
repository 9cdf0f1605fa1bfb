//! 内存统计
//!
//! 运行时不提供统计时返回 `None`,内存压力检查随之跳过。

use std::sync::Mutex;
use sysinfo::{MemoryRefreshKind, RefreshKind, System};

/// 内存用量快照(字节)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeapStats {
    pub used: u64,
    pub total: u64,
}

impl HeapStats {
    /// 已用/总量百分比, 总量为0时返回 `None`
    pub fn usage_percent(&self) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        Some(self.used as f64 / self.total as f64 * 100.0)
    }
}

pub trait HeapStatsSource: Send + Sync {
    fn heap_stats(&self) -> Option<HeapStats>;
}

/// 基于sysinfo的实现
///
/// used = 系统已用内存, total = 系统物理内存。
pub struct SysinfoHeapStats {
    system: Mutex<System>,
}

impl SysinfoHeapStats {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new_with_specifics(
                RefreshKind::nothing().with_memory(MemoryRefreshKind::nothing().with_ram()),
            )),
        }
    }
}

impl Default for SysinfoHeapStats {
    fn default() -> Self {
        Self::new()
    }
}

impl HeapStatsSource for SysinfoHeapStats {
    fn heap_stats(&self) -> Option<HeapStats> {
        let mut system = self.system.lock().ok()?;
        system.refresh_memory();

        let total = system.total_memory();
        if total == 0 {
            return None;
        }
        Some(HeapStats {
            used: system.used_memory(),
            total,
        })
    }
}
