//! wsexec CLI
//!
//! Single binary for both ends of a websocket exec connection:
//! - `serve` accepts connections and runs a shell on a PTY for each
//! - `connect` attaches the local terminal to a server

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wsexec::commands;

#[derive(Parser)]
#[command(name = "wsexec")]
#[command(author, version, about = "Interactive terminal sessions over a websocket")]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, env = "WSEXEC_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output (repeat for more)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Accept websocket connections and run a shell for each
    Serve {
        /// Bind address (overrides config)
        #[arg(short, long)]
        bind: Option<String>,
        /// Shell to run (overrides config)
        #[arg(short, long)]
        shell: Option<String>,
        /// Seconds between keepalive pings (overrides config)
        #[arg(long)]
        ping_interval: Option<u64>,
        /// Record inbound keystrokes to this file
        #[arg(long)]
        debug_input: Option<PathBuf>,
        /// Record shell output to this file
        #[arg(long)]
        debug_output: Option<PathBuf>,
    },

    /// Attach this terminal to a wsexec server
    Connect {
        /// Websocket URL, e.g. ws://host:8080/ (overrides config)
        url: Option<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the configuration file path
    Path,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match (cli.log_level.as_deref(), cli.quiet, cli.verbose) {
        (Some(level), _, _) => level,
        (None, true, _) => "error",
        (None, false, 0) => "warn",
        (None, false, 1) => "info",
        (None, false, 2) => "debug",
        (None, false, _) => "trace",
    };

    // stdout belongs to the session, so logs go to stderr
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Serve {
            bind,
            shell,
            ping_interval,
            debug_input,
            debug_output,
        } => {
            let mut config = commands::load_effective_config(config_path)?.serve;
            if let Some(bind) = bind {
                config.bind = bind;
            }
            if shell.is_some() {
                config.shell = shell;
            }
            if let Some(secs) = ping_interval {
                config.adapter.ping_interval = Duration::from_secs(secs);
            }
            if debug_input.is_some() {
                config.debug_input = debug_input;
            }
            if debug_output.is_some() {
                config.debug_output = debug_output;
            }

            let cancel = CancellationToken::new();
            tokio::spawn({
                let cancel = cancel.clone();
                async move {
                    match tokio::signal::ctrl_c().await {
                        Ok(()) => {
                            tracing::info!("Received Ctrl-C");
                            cancel.cancel();
                        }
                        Err(e) => tracing::warn!("Cannot listen for Ctrl-C: {}", e),
                    }
                }
            });

            commands::serve_command(config, cancel).await
        }

        Commands::Connect { url } => {
            let config = commands::load_effective_config(config_path)?.client;
            let url = url.or(config.url).context(
                "No server URL given; pass one or set client.url in the config file",
            )?;

            let result = commands::connect_command(&url).await;
            // tokio's stdin reader sits on a blocking thread that the
            // runtime would wait on until the next keypress
            let code = match result {
                Ok(()) => 0,
                Err(e) => {
                    eprintln!("Error: {:?}", e);
                    1
                }
            };
            std::process::exit(code)
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let config = commands::load_effective_config(config_path)?;
                commands::config_show(&config)
            }
            ConfigAction::Path => {
                commands::config_path(config_path);
                Ok(())
            }
            ConfigAction::Init { force } => commands::config_init(config_path, force),
        },
    }
}
