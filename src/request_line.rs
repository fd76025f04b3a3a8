/// HTTP 请求行嗅探
///
/// 对远端到本地方向的每个数据块做尽力而为的请求行识别，
/// 匹配失败不是错误（并非每个数据块都以请求行开头）
use crate::event::EventSender;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};

/// 解析出的请求行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: String,
    pub path: String,
}

/// 尝试从数据块开头解析 `METHOD SP TARGET`
///
/// 方法为一段字母/数字/下划线，目标为其后一段非空白字符，
/// 两者之间恰好一个空格
pub fn parse_request_line(chunk: &[u8]) -> Option<RequestLine> {
    let method_end = chunk
        .iter()
        .position(|b| !(b.is_ascii_alphanumeric() || *b == b'_'))
        .unwrap_or(chunk.len());
    if method_end == 0 {
        return None;
    }
    if chunk.get(method_end) != Some(&b' ') {
        return None;
    }

    let path_start = method_end + 1;
    let path_end = chunk[path_start..]
        .iter()
        .position(|b| b.is_ascii_whitespace())
        .map(|n| path_start + n)
        .unwrap_or(chunk.len());
    if path_end == path_start {
        return None;
    }

    Some(RequestLine {
        method: String::from_utf8_lossy(&chunk[..method_end]).into_owned(),
        path: String::from_utf8_lossy(&chunk[path_start..path_end]).into_owned(),
    })
}

/// 在 AsyncRead 之上嗅探请求行并发出 request 事件
///
/// 只观察数据，不改变字节流本身
pub(crate) struct RequestSniffer<R> {
    inner: R,
    events: EventSender,
}

impl<R> RequestSniffer<R> {
    pub fn new(inner: R, events: EventSender) -> Self {
        Self { inner, events }
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for RequestSniffer<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        let result = Pin::new(&mut this.inner).poll_read(cx, buf);

        if let Poll::Ready(Ok(())) = &result {
            let chunk = &buf.filled()[before..];
            if !chunk.is_empty() {
                if let Some(line) = parse_request_line(chunk) {
                    this.events.request(line.method, line.path);
                }
            }
        }

        result
    }
}
