use anyhow::{bail, Result};

use super::TunnelConfig;

/// 配置验证器 - 负责所有配置验证逻辑
pub struct ConfigValidator;

impl ConfigValidator {
    /// 验证端口号
    pub fn validate_port(port: u16, context: &str) -> Result<()> {
        if port == 0 {
            bail!("{}: port cannot be 0", context);
        }
        Ok(())
    }

    /// 验证地址不为空
    pub fn validate_address(addr: &str, context: &str) -> Result<()> {
        if addr.trim().is_empty() {
            bail!("{}: address cannot be empty", context);
        }
        Ok(())
    }

    /// 验证隧道配置
    pub fn validate_tunnel_config(config: &TunnelConfig) -> Result<()> {
        // 验证地址
        Self::validate_address(&config.remote_host, "Tunnel remote_host")?;
        Self::validate_address(&config.local_host, "Tunnel local_host")?;

        // 验证端口
        Self::validate_port(config.remote_port, "Tunnel remote_port")?;
        Self::validate_port(config.local_port, "Tunnel local_port")?;

        // 验证 Host 头改写值（如果配置了）
        if let Some(ref host) = config.rewrite_host {
            Self::validate_address(host, "Tunnel rewrite_host")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> TunnelConfig {
        TunnelConfig {
            remote_host: "relay.example.com".to_string(),
            remote_port: 7070,
            local_host: "localhost".to_string(),
            local_port: 8080,
            rewrite_host: None,
        }
    }

    #[test]
    fn test_validate_port() {
        // 端口 0 应该失败
        assert!(ConfigValidator::validate_port(0, "test").is_err());

        // 有效端口应该成功
        assert!(ConfigValidator::validate_port(80, "test").is_ok());
        assert!(ConfigValidator::validate_port(65535, "test").is_ok());
    }

    #[test]
    fn test_validate_address() {
        // 空地址应该失败
        assert!(ConfigValidator::validate_address("", "test").is_err());
        assert!(ConfigValidator::validate_address("   ", "test").is_err());

        // 有效地址应该成功
        assert!(ConfigValidator::validate_address("127.0.0.1", "test").is_ok());
        assert!(ConfigValidator::validate_address("relay.example.com", "test").is_ok());
    }

    #[test]
    fn test_validate_tunnel_config() {
        assert!(ConfigValidator::validate_tunnel_config(&base_config()).is_ok());

        let mut config = base_config();
        config.remote_host = "".to_string();
        assert!(ConfigValidator::validate_tunnel_config(&config).is_err());

        let mut config = base_config();
        config.local_port = 0;
        assert!(ConfigValidator::validate_tunnel_config(&config).is_err());

        // 空的 rewrite_host 应该失败，未设置则通过
        let mut config = base_config();
        config.rewrite_host = Some("  ".to_string());
        assert!(ConfigValidator::validate_tunnel_config(&config).is_err());

        let mut config = base_config();
        config.rewrite_host = Some("myapp.internal".to_string());
        assert!(ConfigValidator::validate_tunnel_config(&config).is_ok());
    }
}
