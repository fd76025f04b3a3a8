use anyhow::{Context, Result};

use super::{validator::ConfigValidator, TunnelConfig};

/// TunnelConfig Builder
#[derive(Debug, Default)]
pub struct TunnelConfigBuilder {
    remote_host: Option<String>,
    remote_port: Option<u16>,
    local_host: String,
    local_port: Option<u16>,
    rewrite_host: Option<String>,
}

impl TunnelConfigBuilder {
    /// 创建新的 Builder
    pub fn new() -> Self {
        Self {
            local_host: "localhost".to_string(),
            ..Default::default()
        }
    }

    /// 设置中继服务器地址
    pub fn remote_host(mut self, host: impl Into<String>) -> Self {
        self.remote_host = Some(host.into());
        self
    }

    /// 设置中继服务器端口
    pub fn remote_port(mut self, port: u16) -> Self {
        self.remote_port = Some(port);
        self
    }

    /// 设置本地服务主机
    pub fn local_host(mut self, host: impl Into<String>) -> Self {
        self.local_host = host.into();
        self
    }

    /// 设置本地服务端口
    pub fn local_port(mut self, port: u16) -> Self {
        self.local_port = Some(port);
        self
    }

    /// 设置 Host 头改写值
    pub fn rewrite_host(mut self, host: impl Into<String>) -> Self {
        self.rewrite_host = Some(host.into());
        self
    }

    /// 构建 TunnelConfig 并验证
    pub fn build(self) -> Result<TunnelConfig> {
        let config = TunnelConfig {
            remote_host: self.remote_host.context("remote_host is required")?,
            remote_port: self.remote_port.context("remote_port is required")?,
            local_host: self.local_host,
            local_port: self.local_port.context("local_port is required")?,
            rewrite_host: self.rewrite_host,
        };

        // 验证配置
        ConfigValidator::validate_tunnel_config(&config)?;

        Ok(config)
    }
}
