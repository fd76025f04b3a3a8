// 配置管理模块 - 使用模块化设计

mod builder;
mod validator;

// 重新导出 builder 和 validator
pub use builder::TunnelConfigBuilder;
pub use validator::ConfigValidator;

use anyhow::Context;
use serde::{Deserialize, Serialize};

fn default_local_host() -> String {
    "localhost".to_string()
}

/// 隧道配置
///
/// 一条 远端↔本地 配对在单个连接周期内的不可变配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TunnelConfig {
    /// 中继服务器地址
    pub remote_host: String,
    /// 中继服务器端口
    pub remote_port: u16,
    /// 本地服务主机（默认 localhost）
    #[serde(default = "default_local_host")]
    pub local_host: String,
    /// 本地服务端口
    pub local_port: u16,
    /// 若设置，远端到本地方向的 HTTP Host 头会被改写为该值
    #[serde(default)]
    pub rewrite_host: Option<String>,
}

impl TunnelConfig {
    /// 创建 Builder
    pub fn builder() -> TunnelConfigBuilder {
        TunnelConfigBuilder::new()
    }

    /// 中继服务器 host:port
    pub fn remote_addr(&self) -> String {
        format!("{}:{}", self.remote_host, self.remote_port)
    }

    /// 本地服务 host:port
    pub fn local_addr(&self) -> String {
        format!("{}:{}", self.local_host, self.local_port)
    }

    /// 验证配置
    pub fn validate(&self) -> anyhow::Result<()> {
        ConfigValidator::validate_tunnel_config(self)
    }
}

/// 应用配置加载入口
pub struct AppConfig;

impl AppConfig {
    /// 从文件加载隧道配置
    pub fn load_tunnel_config(path: &str) -> anyhow::Result<TunnelConfig> {
        #[derive(Deserialize)]
        struct TunnelConfigWrapper {
            tunnel: TunnelConfig,
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path))?;
        let wrapper: TunnelConfigWrapper =
            toml::from_str(&content).context("Failed to parse tunnel configuration")?;
        wrapper
            .tunnel
            .validate()
            .context("Configuration validation failed")?;
        Ok(wrapper.tunnel)
    }
}
