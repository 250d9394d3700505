//! Policy commands - resolve, show, and validate policies.

use std::path::Path;

use anyhow::{Context, Result};
use attrgate_abac::{Evaluator, Policy};
use attrgate_config::AttrgateConfig;
use clap::ValueEnum;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyFormat {
    Toml,
    Json,
}

/// Picks the policy for a command: the explicit flag, then the configured
/// path, then the built-in standard policy.
pub fn resolve(config: &AttrgateConfig, flag: Option<&Path>) -> Result<Policy> {
    match flag.or(config.policy.path.as_deref()) {
        Some(path) => {
            let policy = Policy::load(path)
                .with_context(|| format!("Failed to load policy from {}", path.display()))?;
            info!(
                path = %path.display(),
                rules = policy.rules.len(),
                "Loaded policy"
            );
            Ok(policy)
        }
        None => {
            debug!("No policy file configured, using the standard policy");
            Ok(Policy::standard())
        }
    }
}

pub fn show(config: &AttrgateConfig, flag: Option<&Path>, format: PolicyFormat) -> Result<()> {
    let policy = resolve(config, flag)?;

    let text = match format {
        PolicyFormat::Toml => policy
            .to_toml_string()
            .context("Failed to render policy as TOML")?,
        PolicyFormat::Json => {
            serde_json::to_string_pretty(&policy).context("Failed to render policy as JSON")?
        }
    };
    println!("{}", text.trim_end());
    Ok(())
}

pub fn check(path: &Path) -> Result<()> {
    let policy = Policy::load(path)
        .with_context(|| format!("Policy {} is invalid", path.display()))?;
    let evaluator = Evaluator::new(policy);

    println!("Policy OK: {}", path.display());
    println!();
    println!("Evaluation order:");
    for (position, rule) in evaluator.rules().iter().enumerate() {
        println!(
            "  {:>2}. {:<32} {:<5} (priority {})",
            position + 1,
            rule.name,
            rule.effect.as_str(),
            rule.priority
        );
    }
    println!("  default: {}", evaluator.default_effect().as_str());
    Ok(())
}
