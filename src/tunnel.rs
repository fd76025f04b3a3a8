/// 隧道连接生命周期管理
///
/// 单条隧道的核心状态机：建立远端链路，按需建立/重建本地链路，
/// 在两者之间双向中继字节，并通过事件通道对外汇报。整个生命周期
/// 运行在一个任务里，回调之间天然串行
use crate::config::TunnelConfig;
use crate::error::TunnelError;
use crate::event::{self, EventSender, EventStream, RemoteHandle, TunnelEvent};
use crate::host_header::HostRewriter;
use crate::io_util::{copy_until_end, enable_keepalive, CopyEnd};
use crate::request_line::RequestSniffer;
use crate::retry::RetryState;
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info, warn};

/// 环境变量前缀
const ENV_PREFIX: &str = "RELAY_TUNNEL_";

/// 重连延迟（秒）- 可通过环境变量 RELAY_TUNNEL_RECONNECT_DELAY_SECS 覆盖
const RECONNECT_DELAY_SECS: u64 = 5;

/// 本地服务拒绝连接后的固定重试间隔，重试次数不设上限
const LOCAL_RETRY_DELAY: Duration = Duration::from_millis(1000);

fn get_reconnect_delay() -> u64 {
    std::env::var(format!("{}RECONNECT_DELAY_SECS", ENV_PREFIX))
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(RECONNECT_DELAY_SECS)
}

/// 隧道连接
///
/// 一个实例管理一条 远端↔本地 配对的完整生命周期。
/// 多个实例可以并发运行，彼此只共享进程级的 RetryState
pub struct TunnelConnection {
    config: TunnelConfig,
    retry: Arc<RetryState>,
}

impl TunnelConnection {
    pub fn new(config: TunnelConfig, retry: Arc<RetryState>) -> Self {
        Self { config, retry }
    }

    /// 打开隧道，返回事件流
    ///
    /// 连接任务在后台运行；所有失败都通过事件流送达，不会抛出
    pub fn open(self) -> EventStream {
        let (events, stream) = event::channel();
        tokio::spawn(run_connection(self.config, self.retry, events));
        stream
    }
}

/// 单条隧道连接的主任务
async fn run_connection(config: TunnelConfig, retry: Arc<RetryState>, events: EventSender) {
    let remote_addr = config.remote_addr();
    debug!(
        "establishing tunnel {} <> {}",
        config.local_addr(),
        remote_addr
    );

    let remote = match TcpStream::connect(&remote_addr).await {
        Ok(stream) => stream,
        Err(err) => {
            debug!("error on remote: {}", err);
            if err.kind() == io::ErrorKind::ConnectionRefused && retry.should_report_refused() {
                warn!(
                    "connection refused: {} (check your firewall settings)",
                    remote_addr
                );
            }
            events.error(TunnelError::remote_dial(remote_addr, err));
            return;
        }
    };

    enable_keepalive(&remote);

    // 远端连通即视为隧道打开
    let handle = RemoteHandle::new(remote.peer_addr().ok());
    events.open(handle.clone());

    drive(remote, config, handle, events).await;
}

/// 本地连接过程：可重入，首次连接与每次重试都会经过这里
async fn drive(
    mut remote: TcpStream,
    config: TunnelConfig,
    handle: RemoteHandle,
    events: EventSender,
) {
    let local_addr = config.local_addr();

    loop {
        if handle.is_closed() {
            debug!("remote destroyed");
            events.dead();
            return;
        }

        // 远端保持暂停：本地链路就绪前不读取任何远端字节
        debug!("connecting locally to {}", local_addr);

        let local = tokio::select! {
            result = TcpStream::connect(&local_addr) => match result {
                Ok(local) => local,
                Err(err) if err.kind() == io::ErrorKind::ConnectionRefused => {
                    debug!(
                        "local service refused connection, retrying in {:?}",
                        LOCAL_RETRY_DELAY
                    );
                    tokio::select! {
                        _ = sleep(LOCAL_RETRY_DELAY) => continue,
                        _ = handle.closed() => {
                            debug!("remote destroyed");
                            events.dead();
                            return;
                        }
                        _ = remote_closed(&remote) => {
                            debug!("remote close");
                            events.dead();
                            return;
                        }
                    }
                }
                Err(err) => {
                    // 重试解决不了的本地失败（DNS、权限等），拆掉隧道
                    error!("local error: {}", err);
                    events.error(TunnelError::local_dial(local_addr, err));
                    return;
                }
            },
            _ = handle.closed() => {
                debug!("remote destroyed");
                events.dead();
                return;
            }
            _ = remote_closed(&remote) => {
                debug!("remote close");
                events.dead();
                return;
            }
        };

        debug!("connected locally");

        match splice(&mut remote, local, &config, &handle, &events).await {
            SpliceEnd::RemoteClosed => {
                debug!("remote close");
                events.dead();
                return;
            }
            SpliceEnd::RemoteError(err) => {
                debug!("error on remote: {}", err);
                events.error(err);
                events.dead();
                return;
            }
            SpliceEnd::LocalClosed(reason) => {
                // 本地链路单独终结不拆隧道，回到本地连接过程再试一次
                debug!("local connection closed [{}]", reason);
            }
        }
    }
}

/// 在远端链路暂停（无人读取）期间监视其是否关闭
///
/// peek 不消费字节，暂停窗口内到达的数据不会丢失或乱序；
/// 若数据先于关闭到达，监视停摆，关闭交由中继阶段处理
async fn remote_closed(remote: &TcpStream) {
    let mut buf = [0u8; 1];
    match remote.peek(&mut buf).await {
        Ok(0) | Err(_) => {}
        Ok(_) => std::future::pending::<()>().await,
    }
}

/// 中继阶段的终结方式
enum SpliceEnd {
    RemoteClosed,
    RemoteError(TunnelError),
    LocalClosed(&'static str),
}

/// 恢复远端读取并在 远端↔本地 间双向中继
///
/// 远端到本地方向先经过请求行嗅探，配置了 rewrite_host 时再插入
/// Host 头改写；本地到远端方向原样透传
async fn splice(
    remote: &mut TcpStream,
    mut local: TcpStream,
    config: &TunnelConfig,
    handle: &RemoteHandle,
    events: &EventSender,
) -> SpliceEnd {
    let (remote_read, mut remote_write) = remote.split();
    let (mut local_read, mut local_write) = local.split();

    let sniffer = RequestSniffer::new(remote_read, events.clone());
    let mut inbound: Box<dyn AsyncRead + Unpin + Send + '_> = match config.rewrite_host {
        Some(ref host) => {
            debug!("transform Host header to {}", host);
            Box::new(HostRewriter::new(sniffer, host.clone()))
        }
        None => Box::new(sniffer),
    };

    tokio::select! {
        end = copy_until_end(&mut inbound, &mut local_write) => match end {
            CopyEnd::Eof(n) => {
                debug!("remote reached EOF after {} bytes", n);
                let _ = local_write.shutdown().await;
                SpliceEnd::RemoteClosed
            }
            CopyEnd::ReadError(err) => SpliceEnd::RemoteError(TunnelError::Relay(err)),
            CopyEnd::WriteError(err) => {
                debug!("local write failed: {}", err);
                SpliceEnd::LocalClosed("write error")
            }
        },
        end = copy_until_end(&mut local_read, &mut remote_write) => match end {
            CopyEnd::Eof(n) => {
                debug!("local reached EOF after {} bytes", n);
                SpliceEnd::LocalClosed("eof")
            }
            CopyEnd::ReadError(err) => {
                debug!("local read failed: {}", err);
                SpliceEnd::LocalClosed("read error")
            }
            CopyEnd::WriteError(err) => SpliceEnd::RemoteError(TunnelError::Relay(err)),
        },
        _ = handle.closed() => SpliceEnd::RemoteClosed,
    }
}

/// 运行隧道客户端（带自动重连）
///
/// 每次隧道终结后按固定延迟重建连接；进程级的 RetryState
/// 在所有连接尝试之间共享
pub async fn run_tunnel(config: TunnelConfig) -> anyhow::Result<()> {
    let retry = Arc::new(RetryState::new());

    loop {
        info!("Starting relay tunnel client...");

        let mut events = TunnelConnection::new(config.clone(), retry.clone()).open();

        while let Some(event) = events.recv().await {
            match event {
                TunnelEvent::Open(handle) => match handle.peer_addr() {
                    Some(addr) => info!("Tunnel open, relay peer {}", addr),
                    None => info!("Tunnel open"),
                },
                TunnelEvent::Request { method, path } => info!("{} {}", method, path),
                TunnelEvent::Error(err) => error!("Tunnel error: {}", err),
                TunnelEvent::Dead => {
                    info!("Tunnel closed");
                    break;
                }
            }
        }

        let delay = get_reconnect_delay();
        warn!("Connection lost, reconnecting in {} seconds...", delay);
        sleep(Duration::from_secs(delay)).await;
    }
}
