//! ABAC policy evaluation engine.
//!
//! Evaluates access requests against a policy by checking rules in priority order.
//! The first matching rule wins. If no rule matches, the policy's default effect applies.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::attributes::RequestAttributes;
use crate::policy::{Condition, Effect, Policy, Rule};

// ============================================================================
// Decision
// ============================================================================

/// The binary outcome emitted for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Authorized,
    Unauthorized,
}

impl Decision {
    /// The wire form written to the decision stream.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Authorized => "authorized",
            Self::Unauthorized => "unauthorized",
        }
    }

    pub const fn is_authorized(self) -> bool {
        matches!(self, Self::Authorized)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Effect> for Decision {
    fn from(effect: Effect) -> Self {
        match effect {
            Effect::Allow => Self::Authorized,
            Effect::Deny => Self::Unauthorized,
        }
    }
}

// ============================================================================
// Evaluation
// ============================================================================

/// A decision together with the rule that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    /// Whether access is allowed or denied.
    pub effect: Effect,
    /// The name of the rule that matched, or `None` if the default was applied.
    pub matched_rule: Option<String>,
    /// Human-readable explanation of why this decision was made.
    pub reason: String,
}

impl Evaluation {
    pub fn decision(&self) -> Decision {
        self.effect.into()
    }
}

// ============================================================================
// Evaluator
// ============================================================================

/// A policy with its rules fixed in evaluation order.
///
/// Ordering happens once at construction, so per-request evaluation does not
/// allocate. Rules are ordered by priority (highest first); rules of equal
/// priority keep their declaration order.
#[derive(Debug, Clone)]
pub struct Evaluator {
    rules: Vec<Rule>,
    default_effect: Effect,
}

impl Evaluator {
    pub fn new(policy: Policy) -> Self {
        let Policy {
            mut rules,
            default_effect,
        } = policy;
        // `sort_by` is stable: equal priorities stay in declaration order.
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        Self {
            rules,
            default_effect,
        }
    }

    /// Rules in the order they are evaluated.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn default_effect(&self) -> Effect {
        self.default_effect
    }

    /// Returns the decision for a request.
    ///
    /// # Postcondition
    ///
    /// Always returns a `Decision` -- there is no error path, and an empty
    /// request is evaluated like any other.
    pub fn decide(&self, request: &RequestAttributes) -> Decision {
        self.first_match(request)
            .map_or(self.default_effect, |rule| rule.effect)
            .into()
    }

    /// Like [`Evaluator::decide`], but reports which rule decided and why.
    pub fn explain(&self, request: &RequestAttributes) -> Evaluation {
        match self.first_match(request) {
            Some(rule) => Evaluation {
                effect: rule.effect,
                matched_rule: Some(rule.name.clone()),
                reason: format!("Matched rule '{}' (priority {})", rule.name, rule.priority),
            },
            None => Evaluation {
                effect: self.default_effect,
                matched_rule: None,
                reason: format!(
                    "No rule matched; applying default effect: {}",
                    self.default_effect.as_str()
                ),
            },
        }
    }

    fn first_match(&self, request: &RequestAttributes) -> Option<&Rule> {
        self.rules.iter().find(|rule| {
            rule.conditions
                .iter()
                .all(|cond| evaluate_condition(cond, request))
        })
    }
}

impl From<Policy> for Evaluator {
    fn from(policy: Policy) -> Self {
        Self::new(policy)
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Evaluates a single request against a policy.
///
/// Convenience for one-off checks; callers evaluating many requests should
/// build an [`Evaluator`] once and reuse it.
pub fn evaluate(policy: &Policy, request: &RequestAttributes) -> Evaluation {
    Evaluator::new(policy.clone()).explain(request)
}

// ============================================================================
// Condition Evaluation
// ============================================================================

/// Recursively evaluates a single condition against the request attributes.
fn evaluate_condition(condition: &Condition, request: &RequestAttributes) -> bool {
    match condition {
        Condition::Equals { attribute, value } => request.get(*attribute) == Some(value.as_str()),
        // Absent attributes read as "" for substring and suffix tests.
        Condition::Contains { attribute, value } => request
            .get(*attribute)
            .unwrap_or_default()
            .contains(value.as_str()),
        Condition::EndsWith { attribute, value } => request
            .get(*attribute)
            .unwrap_or_default()
            .ends_with(value.as_str()),

        // -- Logical combinators --
        Condition::And(sub) => sub.iter().all(|c| evaluate_condition(c, request)),
        Condition::Or(sub) => sub.iter().any(|c| evaluate_condition(c, request)),
        Condition::Not(sub) => !evaluate_condition(sub, request),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::Attribute;
    use test_case::test_case;

    fn standard() -> Evaluator {
        Evaluator::new(Policy::standard())
    }

    /// Helper: an authenticated request with the given extra attributes.
    fn authenticated(extra: &[(Attribute, &str)]) -> RequestAttributes {
        extra.iter().fold(
            RequestAttributes::new().with(Attribute::Authenticated, "true"),
            |req, (attr, value)| req.with(*attr, *value),
        )
    }

    #[test]
    fn test_decision_wire_form() {
        assert_eq!(Decision::Authorized.to_string(), "authorized");
        assert_eq!(Decision::Unauthorized.to_string(), "unauthorized");
        assert_eq!(Decision::from(Effect::Allow), Decision::Authorized);
        assert_eq!(Decision::from(Effect::Deny), Decision::Unauthorized);
        assert!(Decision::Authorized.is_authorized());
        assert!(!Decision::Unauthorized.is_authorized());
    }

    #[test]
    fn test_empty_request_denied() {
        let evaluation = standard().explain(&RequestAttributes::new());
        assert_eq!(evaluation.decision(), Decision::Unauthorized);
        assert_eq!(
            evaluation.matched_rule.as_deref(),
            Some("authentication-gate")
        );
    }

    #[test_case(None; "absent")]
    #[test_case(Some("false"); "false")]
    #[test_case(Some("True"); "capitalized")]
    #[test_case(Some("true "); "trailing space")]
    #[test_case(Some(""); "empty")]
    #[test_case(Some("1"); "numeric")]
    fn test_authentication_gate_blocks_admin(authenticated: Option<&str>) {
        let mut request = RequestAttributes::new()
            .with(Attribute::Role, "admin")
            .with(Attribute::Department, "Engineering")
            .with(Attribute::Groups, "developers")
            .with(Attribute::Email, "root@example.com");
        request.authenticated = authenticated.map(str::to_string);

        assert_eq!(standard().decide(&request), Decision::Unauthorized);
    }

    #[test]
    fn test_admin_override() {
        let evaluation = standard().explain(&authenticated(&[
            (Attribute::Role, "admin"),
            (Attribute::Department, "Sales"),
            (Attribute::Email, "boss@elsewhere.org"),
        ]));
        assert_eq!(evaluation.decision(), Decision::Authorized);
        assert_eq!(evaluation.matched_rule.as_deref(), Some("admin-override"));
    }

    #[test_case("developers", Decision::Authorized; "exact group")]
    #[test_case("frontend-developers-team", Decision::Authorized; "embedded group")]
    #[test_case("nondevelopers", Decision::Authorized; "prefixed substring")]
    #[test_case("developers-emeritus", Decision::Authorized; "suffixed substring")]
    #[test_case("Developers", Decision::Unauthorized; "case mismatch")]
    #[test_case("devs", Decision::Unauthorized; "no substring")]
    fn test_engineering_rule_substring(groups: &str, expected: Decision) {
        let request = authenticated(&[
            (Attribute::Role, "contractor"),
            (Attribute::Department, "Engineering"),
            (Attribute::Groups, groups),
        ]);
        assert_eq!(standard().decide(&request), expected);
    }

    #[test_case("engineering"; "lowercase")]
    #[test_case("Engineering "; "trailing space")]
    #[test_case("Platform Engineering"; "superstring")]
    fn test_engineering_rule_requires_exact_department(department: &str) {
        let request = authenticated(&[
            (Attribute::Department, department),
            (Attribute::Groups, "developers"),
        ]);
        assert_eq!(standard().decide(&request), Decision::Unauthorized);
    }

    #[test]
    fn test_engineering_rule_absent_groups() {
        let request = authenticated(&[(Attribute::Department, "Engineering")]);
        assert_eq!(standard().decide(&request), Decision::Unauthorized);
    }

    #[test_case("alice@example.com", Decision::Authorized; "plain")]
    #[test_case("eviluser@example.com", Decision::Authorized; "any local part")]
    #[test_case("alice@example.com.attacker.io", Decision::Unauthorized; "suffix spoof")]
    #[test_case("alice@EXAMPLE.com", Decision::Unauthorized; "case mismatch")]
    #[test_case("alice@sub.example.com", Decision::Unauthorized; "subdomain")]
    #[test_case("@example.com", Decision::Authorized; "bare suffix")]
    fn test_domain_rule_suffix(email: &str, expected: Decision) {
        let request = authenticated(&[(Attribute::Role, "user"), (Attribute::Email, email)]);
        assert_eq!(standard().decide(&request), expected);
    }

    #[test]
    fn test_domain_rule_requires_user_role() {
        let request = authenticated(&[
            (Attribute::Role, "guest"),
            (Attribute::Email, "alice@example.com"),
        ]);
        assert_eq!(standard().decide(&request), Decision::Unauthorized);

        let request = authenticated(&[(Attribute::Email, "alice@example.com")]);
        assert_eq!(standard().decide(&request), Decision::Unauthorized);
    }

    #[test]
    fn test_default_deny_for_authenticated_nobody() {
        let evaluation = standard().explain(&authenticated(&[(Attribute::Role, "user")]));
        assert_eq!(evaluation.decision(), Decision::Unauthorized);
        assert!(
            evaluation.matched_rule.is_none(),
            "should fall through to default"
        );
    }

    #[test]
    fn test_equals_absent_differs_from_empty() {
        let policy = Policy::new(Effect::Deny).with_rule(
            Rule::new("empty-role", Effect::Allow, 1).when(Condition::equals(Attribute::Role, "")),
        );
        let evaluator = Evaluator::new(policy);

        assert_eq!(
            evaluator.decide(&RequestAttributes::new()),
            Decision::Unauthorized
        );
        assert_eq!(
            evaluator.decide(&RequestAttributes::new().with(Attribute::Role, "")),
            Decision::Authorized
        );
    }

    #[test]
    fn test_priority_ordering() {
        // Two rules: low-priority Allow and high-priority Deny.
        // High-priority should win regardless of declaration order.
        let policy = Policy::new(Effect::Allow)
            .with_rule(Rule::new("low-allow", Effect::Allow, 1))
            .with_rule(Rule::new("high-deny", Effect::Deny, 100));

        let evaluation = evaluate(&policy, &RequestAttributes::new());
        assert_eq!(evaluation.effect, Effect::Deny);
        assert_eq!(evaluation.matched_rule.as_deref(), Some("high-deny"));
    }

    #[test]
    fn test_equal_priority_keeps_declaration_order() {
        let policy = Policy::new(Effect::Deny)
            .with_rule(Rule::new("first", Effect::Allow, 5))
            .with_rule(Rule::new("second", Effect::Deny, 5))
            .with_rule(Rule::new("third", Effect::Deny, 5));

        let evaluator = Evaluator::new(policy);
        let names: Vec<&str> = evaluator.rules().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["first", "second", "third"]);
        assert_eq!(
            evaluator.explain(&RequestAttributes::new()).matched_rule.as_deref(),
            Some("first")
        );
    }

    #[test]
    fn test_default_effect() {
        let policy = Policy::new(Effect::Allow);
        let evaluation = evaluate(&policy, &RequestAttributes::new());

        assert_eq!(evaluation.effect, Effect::Allow);
        assert!(evaluation.matched_rule.is_none());
        assert!(evaluation.reason.contains("default effect"));
    }

    #[test]
    fn test_or_condition() {
        let policy = Policy::new(Effect::Deny).with_rule(
            Rule::new("or-rule", Effect::Allow, 10).when(Condition::Or(vec![
                Condition::equals(Attribute::Role, "admin"),
                Condition::equals(Attribute::Role, "auditor"),
            ])),
        );
        let evaluator = Evaluator::new(policy);

        for (role, expected) in [
            ("admin", Decision::Authorized),
            ("auditor", Decision::Authorized),
            ("user", Decision::Unauthorized),
        ] {
            let request = RequestAttributes::new().with(Attribute::Role, role);
            assert_eq!(evaluator.decide(&request), expected, "role {role}");
        }
    }

    #[test]
    fn test_and_condition() {
        let policy = Policy::new(Effect::Deny).with_rule(
            Rule::new("and-rule", Effect::Allow, 10).when(Condition::And(vec![
                Condition::equals(Attribute::Role, "admin"),
                Condition::contains(Attribute::Groups, "ops"),
            ])),
        );
        let evaluator = Evaluator::new(policy);

        let both = RequestAttributes::new()
            .with(Attribute::Role, "admin")
            .with(Attribute::Groups, "devops");
        assert_eq!(evaluator.decide(&both), Decision::Authorized);

        let role_only = RequestAttributes::new().with(Attribute::Role, "admin");
        assert_eq!(evaluator.decide(&role_only), Decision::Unauthorized);
    }

    #[test]
    fn test_not_condition() {
        let policy = Policy::new(Effect::Deny).with_rule(
            Rule::new("not-contractor", Effect::Allow, 10).when(Condition::not(
                Condition::ends_with(Attribute::Email, "@contractor.io"),
            )),
        );
        let evaluator = Evaluator::new(policy);

        let staff = RequestAttributes::new().with(Attribute::Email, "a@example.com");
        assert_eq!(evaluator.decide(&staff), Decision::Authorized);

        let contractor = RequestAttributes::new().with(Attribute::Email, "b@contractor.io");
        assert_eq!(evaluator.decide(&contractor), Decision::Unauthorized);
    }

    #[test]
    fn test_decide_agrees_with_explain() {
        let evaluator = standard();
        let requests = [
            RequestAttributes::new(),
            authenticated(&[(Attribute::Role, "admin")]),
            authenticated(&[(Attribute::Role, "user"), (Attribute::Email, "x@example.com")]),
            authenticated(&[(Attribute::Role, "user")]),
        ];
        for request in &requests {
            assert_eq!(evaluator.decide(request), evaluator.explain(request).decision());
        }
    }

    #[test]
    fn test_evaluator_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Evaluator>();
    }
}
