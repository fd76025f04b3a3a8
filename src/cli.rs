use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "relay-tunnel")]
#[command(author, version, about = "Reverse tunnel client for exposing local services through a public relay", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 日志级别 (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 运行隧道客户端
    Run {
        /// 配置文件路径
        #[arg(short, long, default_value = "tunnel.toml")]
        config: String,
    },
    /// 检查配置文件
    Check {
        /// 配置文件路径
        #[arg(short, long, default_value = "tunnel.toml")]
        config: String,
    },
    /// 生成配置模板
    Template {
        /// 输出文件路径（缺省打印到标准输出）
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_command_defaults() {
        let cli = Cli::try_parse_from(["relay-tunnel", "run"]).unwrap();
        match cli.command {
            Commands::Run { config } => assert_eq!(config, "tunnel.toml"),
            other => panic!("expected run command, got {:?}", other),
        }
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn test_global_log_level() {
        let cli = Cli::try_parse_from(["relay-tunnel", "run", "--log-level", "debug"]).unwrap();
        assert_eq!(cli.log_level, "debug");
    }

    #[test]
    fn test_template_output() {
        let cli =
            Cli::try_parse_from(["relay-tunnel", "template", "--output", "out.toml"]).unwrap();
        match cli.command {
            Commands::Template { output } => assert_eq!(output.as_deref(), Some("out.toml")),
            other => panic!("expected template command, got {:?}", other),
        }
    }
}
