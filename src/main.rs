//! Deployment Agent - compose 项目控制面
//!
//! Usage:
//! - Normal mode: `deployment-agent`
//! - With custom port: `deployment-agent --port 19999`

use deployment_agent::RuntimeConfig;
use tracing_subscriber::EnvFilter;

/// 解析命令行参数
fn parse_args() -> RuntimeConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut config = RuntimeConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" if i + 1 < args.len() => {
                config.port_override = args[i + 1].parse().ok();
                i += 2;
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            _ => {
                i += 1;
            }
        }
    }

    config
}

fn print_help() {
    println!("Deployment Agent - compose 项目控制面");
    println!();
    println!("USAGE:");
    println!("    deployment-agent [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --port <PORT>    Override the listening port");
    println!("    -h, --help       Print help information");
    println!();
    println!("ENVIRONMENT:");
    println!("    PROJECTS_ROOT_PATH       Directory containing compose projects (required)");
    println!("    PORT                     Listening port (default 5000)");
    println!("    DEPLOY_AGENT_API_KEY     API key for x-api-key auth (optional)");
    println!("    DOCKER_BIN               Docker CLI binary (default docker)");
    println!("    DOCKER_TIMEOUT_SECS      Per-call docker CLI timeout (default 30)");
    println!("    COMPOSE_UP_TIMEOUT_SECS  docker compose up timeout (default 300)");
    println!("    RUST_LOG                 Log filter (default info)");
}

fn main() {
    let config = parse_args();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = rt.block_on(deployment_agent::run_agent(config)) {
        tracing::error!(error = ?e, "Deployment agent failed");
        std::process::exit(1);
    }
}
