//! Eval command - runs the decision pipeline.

use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use attrgate_abac::{Evaluator, FlushMode, Pipeline, PipelineOptions, PipelineStats};
use attrgate_config::{self as config, AttrgateConfig};
use clap::ValueEnum;
use tracing::info;

use super::policy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FlushArg {
    /// Flush after every decision.
    EveryRecord,
    /// Flush once at end of input.
    OnExit,
}

impl From<FlushArg> for FlushMode {
    fn from(arg: FlushArg) -> Self {
        match arg {
            FlushArg::EveryRecord => FlushMode::EveryRecord,
            FlushArg::OnExit => FlushMode::OnExit,
        }
    }
}

fn configured_flush(mode: config::FlushMode) -> FlushMode {
    match mode {
        config::FlushMode::EveryRecord => FlushMode::EveryRecord,
        config::FlushMode::OnExit => FlushMode::OnExit,
    }
}

/// Flags that override the loaded configuration.
#[derive(Debug, Default)]
pub struct EvalArgs {
    pub policy: Option<PathBuf>,
    pub input: Option<PathBuf>,
    pub flush: Option<FlushArg>,
    pub max_record_bytes: Option<usize>,
}

pub fn run(config: &AttrgateConfig, args: EvalArgs) -> Result<()> {
    let policy = policy::resolve(config, args.policy.as_deref())?;

    let options = PipelineOptions {
        flush: args
            .flush
            .map_or_else(|| configured_flush(config.pipeline.flush), FlushMode::from),
        max_record_bytes: args
            .max_record_bytes
            .unwrap_or(config.pipeline.max_record_bytes),
    };
    if options.max_record_bytes == 0 {
        bail!("--max-record-bytes must be greater than zero");
    }

    let pipeline = Pipeline::new(Evaluator::new(policy), options);
    let output = BufWriter::new(io::stdout().lock());

    let stats = match &args.input {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open input {}", path.display()))?;
            pipeline.run(BufReader::new(file), output)?
        }
        None => pipeline.run(io::stdin().lock(), output)?,
    };

    log_summary(&stats);
    Ok(())
}

fn log_summary(stats: &PipelineStats) {
    info!(
        records = stats.records,
        blank = stats.blank,
        malformed = stats.malformed,
        authorized = stats.authorized,
        unauthorized = stats.unauthorized,
        "Decision stream complete"
    );
}
