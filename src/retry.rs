/// 重连诊断状态
///
/// 进程级共享的 "connection refused" 诊断开关，多条隧道同时
/// 重连同一个不可达中继时避免日志刷屏
use std::sync::atomic::{AtomicBool, Ordering};

/// 进程级重试诊断状态
///
/// 由调用方创建并在所有 TunnelConnection 实例之间共享，
/// 生命周期随进程，重启后自然复位
#[derive(Debug, Default)]
pub struct RetryState {
    refused_reported: AtomicBool,
}

impl RetryState {
    /// 创建新的重试状态
    pub fn new() -> Self {
        Self::default()
    }

    /// 判断本次 "connection refused" 是否应该输出诊断
    ///
    /// 开关语义：第一次出现输出并置位，紧随其后的一次被抑制并复位，
    /// 再之后的出现重新输出。不是"终身只报一次"的单向闩锁
    pub fn should_report_refused(&self) -> bool {
        !self.refused_reported.fetch_xor(true, Ordering::SeqCst)
    }
}
