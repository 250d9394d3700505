//! ABAC policy definitions.
//!
//! Policies consist of ordered rules, each with conditions that must all match
//! for the rule to apply. Rules are evaluated by priority (highest first,
//! declaration order among equals), and the first matching rule determines the
//! outcome. Policies are plain data and can be loaded from TOML or JSON files.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::attributes::Attribute;

/// Maximum nesting depth of logical combinators accepted by `validate`.
pub const MAX_CONDITION_DEPTH: usize = 16;

// ============================================================================
// Errors
// ============================================================================

/// Error type for policy loading and validation.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("failed to read policy file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML policy: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to parse JSON policy: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to serialize policy: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("unsupported policy file extension for {path} (expected .toml or .json)")]
    UnsupportedFormat { path: PathBuf },

    #[error("rule #{index} has an empty name")]
    EmptyRuleName { index: usize },

    #[error("duplicate rule name '{name}'")]
    DuplicateRule { name: String },

    #[error("rule '{rule}' has an empty {operator} pattern for {attribute}")]
    EmptyPattern {
        rule: String,
        operator: &'static str,
        attribute: Attribute,
    },

    #[error("rule '{rule}' nests conditions deeper than {limit} levels")]
    TooDeep { rule: String, limit: usize },
}

/// Result type for policy operations.
pub type Result<T> = std::result::Result<T, PolicyError>;

// ============================================================================
// Effect
// ============================================================================

/// The effect of a policy rule: allow or deny access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    /// Grant access.
    Allow,
    /// Deny access.
    #[default]
    Deny,
}

impl Effect {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
        }
    }
}

// ============================================================================
// Condition
// ============================================================================

/// A predicate over request attributes.
///
/// All string tests are exact and case-sensitive; values are never trimmed
/// or case-folded. `Equals` is false when the attribute is absent, while
/// `Contains` and `EndsWith` test an absent attribute as the empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub enum Condition {
    /// The attribute is present and equals `value`.
    Equals { attribute: Attribute, value: String },
    /// The attribute contains `value` as a substring.
    Contains { attribute: Attribute, value: String },
    /// The attribute ends with `value`.
    EndsWith { attribute: Attribute, value: String },

    // -- Logical combinators --
    /// All sub-conditions must be true.
    And(Vec<Condition>),
    /// At least one sub-condition must be true.
    Or(Vec<Condition>),
    /// The sub-condition must be false.
    Not(Box<Condition>),
}

impl Condition {
    pub fn equals(attribute: Attribute, value: impl Into<String>) -> Self {
        Self::Equals {
            attribute,
            value: value.into(),
        }
    }

    pub fn contains(attribute: Attribute, value: impl Into<String>) -> Self {
        Self::Contains {
            attribute,
            value: value.into(),
        }
    }

    pub fn ends_with(attribute: Attribute, value: impl Into<String>) -> Self {
        Self::EndsWith {
            attribute,
            value: value.into(),
        }
    }

    pub fn not(condition: Condition) -> Self {
        Self::Not(Box::new(condition))
    }

    /// Nesting depth of this condition (a leaf has depth 1).
    fn depth(&self) -> usize {
        match self {
            Self::Equals { .. } | Self::Contains { .. } | Self::EndsWith { .. } => 1,
            Self::And(sub) | Self::Or(sub) => 1 + sub.iter().map(Self::depth).max().unwrap_or(0),
            Self::Not(sub) => 1 + sub.depth(),
        }
    }

    fn check_patterns(&self, rule: &str) -> Result<()> {
        match self {
            Self::Contains { attribute, value } if value.is_empty() => {
                Err(PolicyError::EmptyPattern {
                    rule: rule.to_string(),
                    operator: "contains",
                    attribute: *attribute,
                })
            }
            Self::EndsWith { attribute, value } if value.is_empty() => {
                Err(PolicyError::EmptyPattern {
                    rule: rule.to_string(),
                    operator: "ends_with",
                    attribute: *attribute,
                })
            }
            Self::And(sub) | Self::Or(sub) => sub.iter().try_for_each(|c| c.check_patterns(rule)),
            Self::Not(sub) => sub.check_patterns(rule),
            _ => Ok(()),
        }
    }
}

// ============================================================================
// Rule
// ============================================================================

/// A single access control rule within a policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rule {
    /// Human-readable name for audit logging.
    pub name: String,
    /// The effect when this rule matches.
    pub effect: Effect,
    /// All conditions must be true for this rule to match. An empty list
    /// matches every request.
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Evaluation priority. Higher values are evaluated first.
    #[serde(default)]
    pub priority: u32,
}

impl Rule {
    pub fn new(name: impl Into<String>, effect: Effect, priority: u32) -> Self {
        Self {
            name: name.into(),
            effect,
            conditions: Vec::new(),
            priority,
        }
    }

    /// Adds a condition (builder pattern).
    pub fn when(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }
}

// ============================================================================
// Policy
// ============================================================================

/// An Attribute-Based Access Control policy.
///
/// Contains a set of rules evaluated against request attributes.
/// When no rule matches, the `default_effect` is applied (defaults to `Deny`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Policy {
    /// Effect applied when no rule matches.
    #[serde(default)]
    pub default_effect: Effect,
    /// The rules in this policy.
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl Policy {
    /// Creates a new policy with the specified default effect.
    pub fn new(default_effect: Effect) -> Self {
        Self {
            default_effect,
            rules: Vec::new(),
        }
    }

    /// Adds a rule to the policy (builder pattern).
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Returns the standard gateway policy.
    ///
    /// Rules:
    /// 1. Deny unless `azure.authenticated` is exactly `"true"`
    /// 2. Allow `azure.role == "admin"`
    /// 3. Allow `azure.department == "Engineering"` when `azure.groups`
    ///    contains `"developers"` (substring, not set membership)
    /// 4. Allow `azure.role == "user"` when `azure.email` ends with
    ///    `"@example.com"`
    /// 5. Otherwise deny
    pub fn standard() -> Self {
        Self::new(Effect::Deny)
            .with_rule(
                Rule::new("authentication-gate", Effect::Deny, 400).when(Condition::not(
                    Condition::equals(Attribute::Authenticated, "true"),
                )),
            )
            .with_rule(
                Rule::new("admin-override", Effect::Allow, 300)
                    .when(Condition::equals(Attribute::Role, "admin")),
            )
            .with_rule(
                Rule::new("engineering-developers", Effect::Allow, 200)
                    .when(Condition::equals(Attribute::Department, "Engineering"))
                    .when(Condition::contains(Attribute::Groups, "developers")),
            )
            .with_rule(
                Rule::new("example-domain-users", Effect::Allow, 100)
                    .when(Condition::equals(Attribute::Role, "user"))
                    .when(Condition::ends_with(Attribute::Email, "@example.com")),
            )
    }

    /// Parses and validates a policy from TOML.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let policy: Self = toml::from_str(text)?;
        policy.validate()?;
        Ok(policy)
    }

    /// Parses and validates a policy from JSON.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let policy: Self = serde_json::from_str(text)?;
        policy.validate()?;
        Ok(policy)
    }

    /// Loads and validates a policy file. The format is chosen by extension
    /// (`.toml` or `.json`).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let is_json = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => false,
            Some("json") => true,
            _ => {
                return Err(PolicyError::UnsupportedFormat {
                    path: path.to_path_buf(),
                });
            }
        };

        let text = fs::read_to_string(path).map_err(|source| PolicyError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        if is_json {
            Self::from_json_str(&text)
        } else {
            Self::from_toml_str(&text)
        }
    }

    /// Serializes the policy as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Checks structural invariants: non-empty unique rule names, non-empty
    /// substring and suffix patterns, and bounded condition nesting.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for (index, rule) in self.rules.iter().enumerate() {
            if rule.name.trim().is_empty() {
                return Err(PolicyError::EmptyRuleName { index });
            }
            if !seen.insert(rule.name.as_str()) {
                return Err(PolicyError::DuplicateRule {
                    name: rule.name.clone(),
                });
            }
            for condition in &rule.conditions {
                if condition.depth() > MAX_CONDITION_DEPTH {
                    return Err(PolicyError::TooDeep {
                        rule: rule.name.clone(),
                        limit: MAX_CONDITION_DEPTH,
                    });
                }
                condition.check_patterns(&rule.name)?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
