/// 中继 I/O 辅助模块
///
/// 手工复制循环区分 EOF、读侧错误与写侧错误，生命周期管理
/// 依赖这一区分来决定重试还是终结
use socket2::{SockRef, TcpKeepalive};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::warn;

/// 数据复制缓冲区大小（64KB 适合高吞吐）
pub const COPY_BUFFER_SIZE: usize = 65536;

/// 复制循环的终结方式
#[derive(Debug)]
pub enum CopyEnd {
    /// 读侧到达 EOF，携带累计复制字节数
    Eof(u64),
    /// 读侧出错
    ReadError(io::Error),
    /// 写侧出错
    WriteError(io::Error),
}

/// 单向复制直至一侧终结
///
/// 读到的每个数据块立即写出，背压由 write_all 的挂起自然传导，
/// 除复制缓冲区外不做额外缓冲
pub async fn copy_until_end<R, W>(reader: &mut R, writer: &mut W) -> CopyEnd
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; COPY_BUFFER_SIZE];
    let mut total = 0u64;

    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => return CopyEnd::Eof(total),
            Ok(n) => n,
            Err(e) => return CopyEnd::ReadError(e),
        };

        if let Err(e) = writer.write_all(&buf[..n]).await {
            return CopyEnd::WriteError(e);
        }
        total += n as u64;
    }
}

/// 为远端链路开启 TCP keep-alive
///
/// 失败只记录告警，不影响连接建立
pub fn enable_keepalive(stream: &TcpStream) {
    let keepalive = TcpKeepalive::new();
    let sock_ref = SockRef::from(stream);
    if let Err(e) = sock_ref.set_tcp_keepalive(&keepalive) {
        warn!(
            "Failed to set TCP keepalive on {}: {}",
            stream
                .peer_addr()
                .map(|a| a.to_string())
                .unwrap_or_else(|_| "unknown".into()),
            e
        );
    }
}
