/// 隧道生命周期事件
///
/// 事件通道是组件对外的唯一错误/状态出口：所有失败都以事件形式
/// 送达，不会以异常越过组件边界
use crate::error::TunnelError;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// 隧道事件
#[derive(Debug)]
pub enum TunnelEvent {
    /// 远端链路建立，携带远端句柄
    Open(RemoteHandle),
    /// 在远端数据流中观察到的 HTTP 请求行
    Request { method: String, path: String },
    /// 不可恢复的失败
    Error(TunnelError),
    /// 隧道终结（整个生命周期内至多一次）
    Dead,
}

/// 远端链路句柄
///
/// close() 等价于销毁远端链路，是外部终止隧道的唯一途径：
/// 远端关闭 → 本地链路终结 → dead 事件
#[derive(Debug, Clone)]
pub struct RemoteHandle {
    peer_addr: Option<SocketAddr>,
    closed: Arc<watch::Sender<bool>>,
}

impl RemoteHandle {
    pub(crate) fn new(peer_addr: Option<SocketAddr>) -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            peer_addr,
            closed: Arc::new(tx),
        }
    }

    /// 中继服务器对端地址
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    /// 销毁远端链路，触发隧道终结
    pub fn close(&self) {
        self.closed.send_replace(true);
    }

    /// 句柄是否已被关闭
    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// 等待句柄被关闭；已关闭时立即返回
    pub(crate) async fn closed(&self) {
        let mut rx = self.closed.subscribe();
        // 发送端由句柄自身持有，wait_for 不会因发送端消失而出错
        let _ = rx.wait_for(|closed| *closed).await;
    }
}

/// 事件发送端
///
/// dead 事件的"整个生命周期内恰好一次"约束集中在这里保证
#[derive(Debug, Clone)]
pub(crate) struct EventSender {
    tx: mpsc::UnboundedSender<TunnelEvent>,
    dead_sent: Arc<AtomicBool>,
}

impl EventSender {
    pub fn open(&self, handle: RemoteHandle) {
        let _ = self.tx.send(TunnelEvent::Open(handle));
    }

    pub fn request(&self, method: String, path: String) {
        let _ = self.tx.send(TunnelEvent::Request { method, path });
    }

    pub fn error(&self, err: TunnelError) {
        let _ = self.tx.send(TunnelEvent::Error(err));
    }

    pub fn dead(&self) {
        if !self.dead_sent.swap(true, Ordering::SeqCst) {
            let _ = self.tx.send(TunnelEvent::Dead);
        }
    }
}

/// 事件接收端
#[derive(Debug)]
pub struct EventStream {
    rx: mpsc::UnboundedReceiver<TunnelEvent>,
}

impl EventStream {
    /// 接收下一个事件；连接任务结束且事件耗尽后返回 None
    pub async fn recv(&mut self) -> Option<TunnelEvent> {
        self.rx.recv().await
    }
}

pub(crate) fn channel() -> (EventSender, EventStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        EventSender {
            tx,
            dead_sent: Arc::new(AtomicBool::new(false)),
        },
        EventStream { rx },
    )
}
