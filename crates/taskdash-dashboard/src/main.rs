//! taskdash - Standalone dashboard server
//!
//! Run with: cargo run -p taskdash-dashboard -- server --help

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use taskdash_core::DashConfig;
use taskdash_dashboard::DashboardApi;
use taskdash_telemetry::{init_logging, LoggingConfig};

/// taskdash - Web dashboard for machinery tasks stored in DynamoDB
#[derive(Parser, Debug)]
#[command(name = "taskdash")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true, env = "TASKDASH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the dashboard HTTP server
    Server {
        /// Host to bind to
        #[arg(short = 'H', long, env = "TASKDASH_SERVER_HOST")]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long, env = "TASKDASH_SERVER_PORT")]
        port: Option<u16>,

        /// Log level (trace, debug, info, warn, error)
        #[arg(short, long, env = "TASKDASH_LOG_LEVEL")]
        log_level: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = DashConfig::load(cli.config.as_ref())?;

    match cli.command {
        Command::Server {
            host,
            port,
            log_level,
        } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(level) = log_level {
                config.logging.level = level;
            }

            init_logging(LoggingConfig::from_dash_config(&config)?)?;

            println!(
                r#"
╔════════════════════════════════════════════════════════════════╗
║                          TASKDASH                              ║
║                  Machinery Task Monitoring                     ║
╠════════════════════════════════════════════════════════════════╣
║  Version: {}                                               ║
║  Host:    {}:{}                                       ║
║  Table:   {}                                          ║
╚════════════════════════════════════════════════════════════════╝
"#,
                env!("CARGO_PKG_VERSION"),
                config.server.host,
                config.server.port,
                config.dynamodb.task_states_table
            );

            let dashboard = DashboardApi::new(config).await?;

            println!("Available API endpoints:");
            for endpoint in taskdash_dashboard::api::api_endpoints() {
                println!("  {} {} - {}", endpoint.method, endpoint.path, endpoint.description);
            }
            println!();

            dashboard.run().await?;
        }
    }

    Ok(())
}
