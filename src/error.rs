/// 自定义错误类型
///
/// 使用 thiserror 定义精确的错误类型，由事件通道携带给调用方
/// 调用方可以据此区分可恢复与不可恢复的失败
use std::io;
use thiserror::Error;

/// Relay Tunnel 的主要错误类型
#[derive(Error, Debug)]
pub enum TunnelError {
    /// 连接中继服务器失败
    #[error("Failed to connect to relay {addr}: {source}")]
    RemoteDial {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// 连接本地服务失败
    #[error("Failed to connect to local service {addr}: {source}")]
    LocalDial {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// 中继数据流错误
    #[error("Relay stream error: {0}")]
    Relay(#[source] io::Error),

    /// 配置错误
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O 错误
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// 其他错误（保留与 anyhow 的兼容性）
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, TunnelError>;

impl TunnelError {
    /// 创建中继连接失败错误
    pub fn remote_dial(addr: impl Into<String>, source: io::Error) -> Self {
        Self::RemoteDial {
            addr: addr.into(),
            source,
        }
    }

    /// 创建本地连接失败错误
    pub fn local_dial(addr: impl Into<String>, source: io::Error) -> Self {
        Self::LocalDial {
            addr: addr.into(),
            source,
        }
    }

    /// 创建配置错误
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// 检查底层原因是否为 "connection refused"
    pub fn is_connection_refused(&self) -> bool {
        match self {
            Self::RemoteDial { source, .. } | Self::LocalDial { source, .. } => {
                source.kind() == io::ErrorKind::ConnectionRefused
            }
            Self::Relay(source) | Self::Io(source) => {
                source.kind() == io::ErrorKind::ConnectionRefused
            }
            _ => false,
        }
    }

    /// 检查是否为配置错误
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_dial_error() {
        let io_err = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        let err = TunnelError::remote_dial("127.0.0.1:7070", io_err);
        assert!(err.to_string().contains("Failed to connect to relay"));
        assert!(err.to_string().contains("127.0.0.1:7070"));
        assert!(err.is_connection_refused());
    }

    #[test]
    fn test_local_dial_error() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let err = TunnelError::local_dial("localhost:8080", io_err);
        assert!(err.to_string().contains("local service"));
        assert!(!err.is_connection_refused());
    }

    #[test]
    fn test_config_error() {
        let err = TunnelError::config_error("remote_port cannot be 0");
        assert!(err.is_config_error());
        assert_eq!(
            err.to_string(),
            "Configuration error: remote_port cannot be 0"
        );
    }

    #[test]
    fn test_refused_detection_through_variants() {
        let refused = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        assert!(TunnelError::Relay(refused).is_connection_refused());

        let reset = io::Error::new(io::ErrorKind::ConnectionReset, "reset");
        assert!(!TunnelError::Relay(reset).is_connection_refused());

        assert!(!TunnelError::config_error("x").is_connection_refused());
    }
}
