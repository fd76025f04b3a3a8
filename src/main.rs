use anyhow::{Context, Result};
use clap::Parser;
use relay_tunnel::cli::{Cli, Commands};
use relay_tunnel::config::AppConfig;
use relay_tunnel::tunnel;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(cli.log_level.as_str())
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    // Display version information
    info!("Relay Tunnel v{}", env!("CARGO_PKG_VERSION"));

    match &cli.command {
        Commands::Run { config } => {
            info!("Loading tunnel configuration from: {}", config);
            let tunnel_config = AppConfig::load_tunnel_config(config)?;
            tunnel::run_tunnel(tunnel_config).await?;
        }
        Commands::Check { config } => {
            check_config(config)?;
        }
        Commands::Template { output } => {
            generate_config_template(output.as_deref())?;
        }
    }

    Ok(())
}

/// Generate configuration template
fn generate_config_template(output: Option<&str>) -> Result<()> {
    let content = include_str!("../templates/client.toml");

    if let Some(path) = output {
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config template to {}", path))?;
        println!("Generated tunnel configuration template: {}", path);
    } else {
        println!("{}", content);
    }

    Ok(())
}

/// Check configuration file format
fn check_config(config_path: &str) -> Result<()> {
    let path = std::path::Path::new(config_path);

    // 检查文件是否存在
    if !path.exists() {
        anyhow::bail!("Configuration file not found: {}", config_path);
    }

    println!("Checking configuration file: {}\n", config_path);

    match AppConfig::load_tunnel_config(config_path) {
        Ok(config) => {
            println!("✓ Remote host: {}", config.remote_host);
            println!("✓ Remote port: {}", config.remote_port);
            println!("✓ Local host: {}", config.local_host);
            println!("✓ Local port: {}", config.local_port);
            match &config.rewrite_host {
                Some(host) => println!("✓ Host header rewrite: {}", host),
                None => println!("✓ Host header rewrite: disabled"),
            }

            println!("\n✓ Tunnel configuration is valid!");
            Ok(())
        }
        Err(e) => {
            println!("✗ Configuration validation failed!");
            println!("\nError details:");
            println!("{:#}", e);

            // 提供一些常见问题的提示
            println!("\nCommon issues:");
            println!("  1. Check TOML syntax (brackets, quotes, commas)");
            println!("  2. Ensure all required fields are present");
            println!("  3. Ensure port numbers are valid (1-65535)");
            println!("  4. Tunnel config needs a [tunnel] section with remote_host, remote_port and local_port");

            Err(e)
        }
    }
}
