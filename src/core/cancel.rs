//! 协作式取消 - 仅在阶段边界轮询，进行中的阶段总会跑完

use log::debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// 可克隆的取消令牌，克隆体共享同一个标志
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        debug!("cancellation requested");
    }

    /// 重新允许运行；`SubtitleExtractor::start` 和批处理队列每轮开始时调用
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// 阶段结果：要么完整跑完，要么在开始前就被取消
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome<T> {
    Completed(T),
    Cancelled,
}

impl<T> StageOutcome<T> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, StageOutcome::Cancelled)
    }
}
