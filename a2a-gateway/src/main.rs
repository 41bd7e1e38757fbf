//! `a2a-gateway`: a runnable HTTP server hosting a toolset of sub-agents.

mod config;
mod error;
mod server;
mod summarizer;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use config::GatewayConfig;
use error::{GatewayProcessError, Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "a2a-gateway", version, about = "Agent-to-agent orchestration gateway")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, env = "A2A_GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity; repeat for more detail (-v, -vv, -vvv).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Start the HTTP server.
    Serve {
        /// Override the bind address from the config file.
        #[arg(long)]
        bind: Option<String>,
    },
    /// Validate the configuration file and print any issues.
    Validate,
}

fn init_tracing(verbosity: u8) {
    let default_directive = match verbosity {
        0 => "a2a_gateway=info,a2a_core=info",
        1 => "a2a_gateway=debug,a2a_core=debug",
        _ => "a2a_gateway=trace,a2a_core=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(err) => {
            error!(error = %err, "failed to start tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    match rt.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "a2a-gateway exited with an error");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.unwrap_or_else(GatewayConfig::default_path);
    let config = GatewayConfig::load(&config_path).await?;

    let issues = config.validate();
    for issue in &issues {
        match issue.level {
            config::IssueLevel::Error => error!(message = %issue.message, "configuration error"),
            config::IssueLevel::Warning => tracing::warn!(message = %issue.message, "configuration warning"),
        }
    }
    let has_hard_errors = issues.iter().any(|i| i.level == config::IssueLevel::Error);

    match cli.command {
        Commands::Validate => {
            if has_hard_errors {
                return Err(GatewayProcessError::ConfigInvalid(format!(
                    "{} issue(s) found",
                    issues.len()
                )));
            }
            info!("configuration is valid");
            Ok(())
        }
        Commands::Serve { bind } => {
            if has_hard_errors {
                return Err(GatewayProcessError::ConfigInvalid(
                    "refusing to start with invalid configuration".to_string(),
                ));
            }
            let mut config = config;
            if let Some(bind) = bind {
                config.bind_address = bind;
            }
            server::serve(Arc::new(config)).await
        }
    }
}
