//! attrgate CLI.
//!
//! Streaming attribute-based access control: one JSON request per line on
//! stdin, one `authorized` / `unauthorized` line per request on stdout.
//! Diagnostics go to stderr only.
//!
//! # Quick Start
//!
//! ```bash
//! # Decide a stream with the built-in policy
//! printf '{"azure.authenticated":"true","azure.role":"admin"}\n' | attrgate
//!
//! # Use a policy file
//! attrgate eval --policy policies/default.toml --input requests.jsonl
//!
//! # See why a request was decided the way it was
//! attrgate explain '{"azure.authenticated":"true","azure.role":"user"}'
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use attrgate_config::{AttrgateConfig, ConfigLoader};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::eval::{EvalArgs, FlushArg};
use commands::policy::PolicyFormat;

/// attrgate - streaming attribute-based access control decisions.
#[derive(Parser)]
#[command(name = "attrgate")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Project directory to read attrgate.toml and attrgate.local.toml from.
    #[arg(long, global = true, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    /// Load exactly this config file instead of the layered sources.
    #[arg(long, global = true, value_name = "FILE", conflicts_with = "config_dir")]
    config: Option<PathBuf>,

    /// Diagnostics filter (overrides RUST_LOG and the configured level).
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Defaults to `eval` when omitted.
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version information.
    Version,

    /// Decide a stream of requests (stdin to stdout by default).
    Eval {
        /// Policy file (.toml or .json). Defaults to the configured or built-in policy.
        #[arg(short, long, value_name = "FILE")]
        policy: Option<PathBuf>,

        /// Read requests from a file instead of stdin.
        #[arg(short, long, value_name = "FILE")]
        input: Option<PathBuf>,

        /// When to flush decisions.
        #[arg(long, value_enum)]
        flush: Option<FlushArg>,

        /// Deny and skip records longer than this many bytes.
        #[arg(long, value_name = "BYTES")]
        max_record_bytes: Option<usize>,
    },

    /// Decide one request and show which rule decided it.
    Explain {
        /// The request record (a JSON object of string values).
        record: String,

        /// Policy file (.toml or .json).
        #[arg(short, long, value_name = "FILE")]
        policy: Option<PathBuf>,

        /// Print the explanation as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Policy management commands.
    #[command(subcommand)]
    Policy(PolicyCommands),
}

#[derive(Subcommand)]
enum PolicyCommands {
    /// Print the effective policy.
    Show {
        /// Policy file (.toml or .json).
        #[arg(short, long, value_name = "FILE")]
        policy: Option<PathBuf>,

        /// Output format.
        #[arg(short, long, value_enum, default_value_t = PolicyFormat::Toml)]
        format: PolicyFormat,
    },

    /// Load and validate a policy file.
    Check {
        /// Policy file (.toml or .json).
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let command = cli.command.unwrap_or(Commands::Eval {
        policy: None,
        input: None,
        flush: None,
        max_record_bytes: None,
    });

    if let Commands::Version = command {
        commands::version::run();
        return Ok(());
    }

    let config = load_config(cli.config, cli.config_dir)?;
    init_logging(cli.log_level.as_deref(), &config.logging.level)?;

    match command {
        Commands::Version => Ok(()),
        Commands::Eval {
            policy,
            input,
            flush,
            max_record_bytes,
        } => commands::eval::run(
            &config,
            EvalArgs {
                policy,
                input,
                flush,
                max_record_bytes,
            },
        ),
        Commands::Explain {
            record,
            policy,
            json,
        } => commands::explain::run(&config, &record, policy.as_deref(), json),
        Commands::Policy(cmd) => match cmd {
            PolicyCommands::Show { policy, format } => {
                commands::policy::show(&config, policy.as_deref(), format)
            }
            PolicyCommands::Check { path } => commands::policy::check(&path),
        },
    }
}

fn load_config(file: Option<PathBuf>, dir: Option<PathBuf>) -> Result<AttrgateConfig> {
    if let Some(file) = file {
        return AttrgateConfig::from_file(&file)
            .with_context(|| format!("Failed to load config file {}", file.display()));
    }

    let mut loader = ConfigLoader::new();
    if let Some(dir) = dir {
        loader = loader.with_project_dir(dir);
    }
    loader.load().context("Failed to load configuration")
}

/// Installs the stderr subscriber. Stdout is reserved for decisions.
fn init_logging(flag: Option<&str>, configured: &str) -> Result<()> {
    let filter = match flag {
        Some(level) => {
            EnvFilter::try_new(level).with_context(|| format!("Invalid log level '{level}'"))?
        }
        None => match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new(configured)
                .with_context(|| format!("Invalid configured log level '{configured}'"))?,
        },
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}
