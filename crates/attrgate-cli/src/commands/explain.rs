//! Explain command - decides one record and reports why.
//!
//! This is an operator tool. The decision stream produced by `eval` never
//! carries reasons, so a probe cannot tell a malformed record from a denial.

use std::path::Path;

use anyhow::{Context, Result};
use attrgate_abac::decoder::{self, DecodeError};
use attrgate_abac::{Attribute, AttributeSet, Evaluator, RequestAttributes};
use attrgate_config::AttrgateConfig;
use serde_json::json;

use super::policy;

pub fn run(
    config: &AttrgateConfig,
    record: &str,
    policy_path: Option<&Path>,
    json: bool,
) -> Result<()> {
    let evaluator = Evaluator::new(policy::resolve(config, policy_path)?);

    let report = match decoder::decode_str(record) {
        Ok(None) => json!({
            "decision": null,
            "matched_rule": null,
            "reason": "Blank record; no decision is emitted",
        }),
        Ok(Some(set)) => explain_request(&evaluator, &set),
        Err(err) => malformed(&err),
    };

    if json {
        let text = serde_json::to_string_pretty(&report).context("Failed to render report")?;
        println!("{text}");
        return Ok(());
    }

    let field = |name: &str| match &report[name] {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => "-".to_string(),
        other => other.to_string(),
    };
    println!("decision: {}", field("decision"));
    println!("rule:     {}", field("matched_rule"));
    println!("reason:   {}", field("reason"));
    if let Some(ignored) = report["ignored_keys"].as_array() {
        if !ignored.is_empty() {
            let keys: Vec<&str> = ignored.iter().filter_map(|k| k.as_str()).collect();
            println!("ignored:  {}", keys.join(", "));
        }
    }
    Ok(())
}

fn explain_request(evaluator: &Evaluator, set: &AttributeSet) -> serde_json::Value {
    let evaluation = evaluator.explain(&RequestAttributes::from(set));
    let ignored: Vec<&str> = set
        .iter()
        .map(|(key, _)| key)
        .filter(|key| Attribute::from_key(key).is_none())
        .collect();

    json!({
        "decision": evaluation.decision(),
        "matched_rule": evaluation.matched_rule,
        "reason": evaluation.reason,
        "ignored_keys": ignored,
    })
}

fn malformed(err: &DecodeError) -> serde_json::Value {
    json!({
        "decision": err.decision(),
        "matched_rule": null,
        "reason": format!("Malformed record ({}): {err}", err.kind()),
    })
}
