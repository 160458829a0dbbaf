//! Docshare CLI - operator tools for the docshare backend.
//!
//! Generates signing secrets, mints and inspects capability tokens offline
//! with the configured key, and shows where each configuration value came
//! from.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use docshare_capabilities::TokenPurpose;
use docshare_config::Config;

mod commands;
mod config_bridge;
mod theme;

use commands::{config, keys, tokens};

/// Docshare - secure document sharing backend tools
#[derive(Parser)]
#[command(name = "docshare")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Pretty)]
    format: OutputFormat,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "DOCSHARE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// How command results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable.
    Pretty,
    /// JSON for scripts.
    Json,
}

/// Token purpose as named on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PurposeArg {
    /// Email verification link
    Verification,
    /// File download link
    Download,
    /// Login session bearer
    Session,
}

impl From<PurposeArg> for TokenPurpose {
    fn from(arg: PurposeArg) -> Self {
        match arg {
            PurposeArg::Verification => Self::EmailVerification,
            PurposeArg::Download => Self::Download,
            PurposeArg::Session => Self::Session,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a token signing secret
    Keygen {
        /// Write the raw secret to this file instead of printing it
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Replace an existing key file
        #[arg(long)]
        force: bool,
    },

    /// Mint a capability token with the configured key
    Issue {
        /// What the token is for
        #[arg(value_enum)]
        purpose: PurposeArg,

        /// User id the token is granted to
        subject: u64,

        /// File id the token covers (0 for none)
        #[arg(default_value_t = 0)]
        resource: u64,
    },

    /// Check a token against the configured key
    Verify {
        /// What the token should be for
        #[arg(value_enum)]
        purpose: PurposeArg,

        /// The token
        token: String,

        /// Also require the token to be issued to this user id
        #[arg(long = "as")]
        caller: Option<u64>,
    },

    /// View and check configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the resolved configuration with the layer each value came from
    Show {
        /// Output format: toml (default) or json
        #[arg(long = "as", default_value = "toml")]
        format: String,

        /// Only this section (e.g. `tokens`)
        section: Option<String>,
    },
    /// Load and validate configuration, including the signing key
    Validate,
    /// List the files and environment variables that are consulted
    Paths,
}

fn init_logging(cli: &Cli, cfg: Option<&Config>) {
    let mut log_config = match cfg {
        Some(cfg) => config_bridge::to_log_config(cfg),
        None => docshare_telemetry::LogConfig::new("warn"),
    };
    if cli.verbose {
        "debug".clone_into(&mut log_config.level);
    }
    if let Err(e) = docshare_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    Config::load(cli.config.as_deref())
        .map(|resolved| resolved.config)
        .context("loading configuration")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging follows the config when it loads; commands report their own
    // config errors.
    let loaded = load_config(&cli).ok();
    init_logging(&cli, loaded.as_ref());
    tracing::debug!(config = ?cli.config, "docshare cli starting");

    match &cli.command {
        Commands::Keygen { output, force } => {
            keys::generate_key(output.as_deref(), *force, cli.format)?;
        },
        Commands::Issue {
            purpose,
            subject,
            resource,
        } => {
            let cfg = load_config(&cli)?;
            tokens::issue_token(&cfg, (*purpose).into(), *subject, *resource, cli.format)?;
        },
        Commands::Verify {
            purpose,
            token,
            caller,
        } => {
            let cfg = load_config(&cli)?;
            let accepted =
                tokens::verify_token(&cfg, (*purpose).into(), token, *caller, cli.format)?;
            if !accepted {
                std::process::exit(1);
            }
        },
        Commands::Config { command } => handle_config(&cli, command)?,
    }

    Ok(())
}

fn handle_config(cli: &Cli, command: &ConfigCommands) -> Result<()> {
    let explicit = cli.config.as_deref();
    match command {
        ConfigCommands::Show { format, section } => {
            config::show_config(explicit, format, section.as_deref())
        },
        ConfigCommands::Validate => {
            if !config::validate_config(explicit)? {
                std::process::exit(1);
            }
            Ok(())
        },
        ConfigCommands::Paths => config::show_paths(explicit),
    }
}
