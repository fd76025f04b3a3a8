/// Host 头改写流变换
///
/// 在远端到本地方向的字节流中，把第一个 HTTP Host 头的值替换为
/// 配置值，其余字节原样透传。作为可插拔的 AsyncRead 适配器插在
/// 两个端点之间，不改变分帧，除单个在途数据块外不做缓冲，
/// 背压照常传导
use bytes::BytesMut;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};

/// 单次读取的暂存区大小
const SCRATCH_SIZE: usize = 8 * 1024;

/// Host 头改写器
///
/// 替换在整条连接内只发生一次；完成后退化为纯透传
pub struct HostRewriter<R> {
    inner: R,
    host: String,
    replaced: bool,
    pending: BytesMut,
    scratch: Box<[u8]>,
}

impl<R> HostRewriter<R> {
    /// 创建改写器，host 为替换后的 Host 头取值
    pub fn new(inner: R, host: impl Into<String>) -> Self {
        Self {
            inner,
            host: host.into(),
            replaced: false,
            pending: BytesMut::new(),
            scratch: vec![0u8; SCRATCH_SIZE].into_boxed_slice(),
        }
    }

    /// 是否已经完成替换
    pub fn replaced(&self) -> bool {
        self.replaced
    }

    /// 消费改写器，返回内部读取器
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for HostRewriter<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();

        loop {
            // 先吐出上一个数据块的剩余部分
            if !this.pending.is_empty() {
                let n = this.pending.len().min(buf.remaining());
                buf.put_slice(&this.pending.split_to(n));
                return Poll::Ready(Ok(()));
            }

            let mut scratch_buf = ReadBuf::new(&mut this.scratch);
            match Pin::new(&mut this.inner).poll_read(cx, &mut scratch_buf) {
                Poll::Ready(Ok(())) => {
                    let filled = scratch_buf.filled();
                    if filled.is_empty() {
                        return Poll::Ready(Ok(()));
                    }
                    if this.replaced {
                        this.pending.extend_from_slice(filled);
                    } else if let Some(rewritten) = rewrite_host_once(filled, &this.host) {
                        this.replaced = true;
                        this.pending.extend_from_slice(&rewritten);
                    } else {
                        this.pending.extend_from_slice(filled);
                    }
                }
                other => return other,
            }
        }
    }
}

/// 在单个数据块内查找第一个 `\r\n[Hh]ost: ` 头并替换其值
///
/// 值是紧随其后的一段非空白字符；块内无匹配返回 None。
/// 跨数据块分裂的头不做处理
fn rewrite_host_once(chunk: &[u8], host: &str) -> Option<Vec<u8>> {
    // "\r\nHost: " 共 8 字节，其后至少要有 1 字节的值
    const PREFIX_LEN: usize = 8;
    if chunk.len() <= PREFIX_LEN {
        return None;
    }

    for i in 0..=chunk.len() - PREFIX_LEN - 1 {
        if &chunk[i..i + 2] == b"\r\n"
            && (chunk[i + 2] == b'H' || chunk[i + 2] == b'h')
            && &chunk[i + 3..i + 7] == b"ost:"
            && chunk[i + 7] == b' '
        {
            let value_start = i + PREFIX_LEN;
            let value_end = chunk[value_start..]
                .iter()
                .position(|b| b.is_ascii_whitespace())
                .map(|n| value_start + n)
                .unwrap_or(chunk.len());
            if value_end == value_start {
                continue;
            }

            let mut out =
                Vec::with_capacity(chunk.len() - (value_end - value_start) + host.len());
            out.extend_from_slice(&chunk[..value_start]);
            out.extend_from_slice(host.as_bytes());
            out.extend_from_slice(&chunk[value_end..]);
            return Some(out);
        }
    }

    None
}
