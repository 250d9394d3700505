#![no_main]

use arbitrary::Arbitrary;
use attrgate_abac::{
    Attribute, Condition, Decision, Effect, Evaluation, Evaluator, Policy, RequestAttributes, Rule,
    evaluate,
};
use libfuzzer_sys::fuzz_target;

// ============================================================================
// Arbitrary Implementations
// ============================================================================

#[derive(Debug, Clone, Copy, Arbitrary)]
enum FuzzEffect {
    Allow,
    Deny,
}

impl From<FuzzEffect> for Effect {
    fn from(f: FuzzEffect) -> Self {
        match f {
            FuzzEffect::Allow => Effect::Allow,
            FuzzEffect::Deny => Effect::Deny,
        }
    }
}

#[derive(Debug, Clone, Copy, Arbitrary)]
enum FuzzAttribute {
    Authenticated,
    Role,
    Department,
    Groups,
    Email,
}

impl From<FuzzAttribute> for Attribute {
    fn from(f: FuzzAttribute) -> Self {
        match f {
            FuzzAttribute::Authenticated => Attribute::Authenticated,
            FuzzAttribute::Role => Attribute::Role,
            FuzzAttribute::Department => Attribute::Department,
            FuzzAttribute::Groups => Attribute::Groups,
            FuzzAttribute::Email => Attribute::Email,
        }
    }
}

/// Fuzzer-friendly Condition. Patterns may be empty here; the evaluator
/// must not panic on policies that were never validated.
#[derive(Debug, Clone, Arbitrary)]
enum FuzzCondition {
    Equals(FuzzAttribute, String),
    Contains(FuzzAttribute, String),
    EndsWith(FuzzAttribute, String),
    And(Vec<FuzzCondition>),
    Or(Vec<FuzzCondition>),
    Not(Box<FuzzCondition>),
}

impl FuzzCondition {
    /// Combinators past depth 4 collapse to a leaf to bound recursion.
    fn to_condition(&self, depth: u8) -> Condition {
        if depth > 4 {
            return Condition::equals(Attribute::Role, "admin");
        }

        match self {
            Self::Equals(a, v) => Condition::equals((*a).into(), v.clone()),
            Self::Contains(a, v) => Condition::contains((*a).into(), v.clone()),
            Self::EndsWith(a, v) => Condition::ends_with((*a).into(), v.clone()),
            Self::And(sub) => Condition::And(sub.iter().map(|c| c.to_condition(depth + 1)).collect()),
            Self::Or(sub) => Condition::Or(sub.iter().map(|c| c.to_condition(depth + 1)).collect()),
            Self::Not(c) => Condition::not(c.to_condition(depth + 1)),
        }
    }
}

#[derive(Debug, Clone, Arbitrary)]
struct FuzzRule {
    name: String,
    effect: FuzzEffect,
    conditions: Vec<FuzzCondition>,
    priority: u32,
}

impl FuzzRule {
    fn to_rule(&self) -> Rule {
        Rule {
            name: self.name.clone(),
            effect: self.effect.into(),
            conditions: self.conditions.iter().map(|c| c.to_condition(0)).collect(),
            priority: self.priority,
        }
    }
}

#[derive(Debug, Clone, Arbitrary)]
struct FuzzPolicy {
    rules: Vec<FuzzRule>,
    default_effect: FuzzEffect,
}

impl FuzzPolicy {
    fn to_policy(&self) -> Policy {
        self.rules
            .iter()
            .fold(Policy::new(self.default_effect.into()), |policy, rule| {
                policy.with_rule(rule.to_rule())
            })
    }
}

#[derive(Debug, Clone, Arbitrary)]
struct FuzzRequest {
    authenticated: Option<String>,
    role: Option<String>,
    department: Option<String>,
    groups: Option<String>,
    email: Option<String>,
}

impl FuzzRequest {
    fn to_request(&self) -> RequestAttributes {
        RequestAttributes {
            authenticated: self.authenticated.clone(),
            role: self.role.clone(),
            department: self.department.clone(),
            groups: self.groups.clone(),
            email: self.email.clone(),
        }
    }
}

fuzz_target!(|input: (FuzzPolicy, FuzzRequest)| {
    let (fuzz_policy, fuzz_request) = input;

    let policy = fuzz_policy.to_policy();
    let request = fuzz_request.to_request();

    // Should never panic
    let evaluation = evaluate(&policy, &request);
    let evaluator = Evaluator::new(policy.clone());
    let decision = evaluator.decide(&request);

    validate_invariants(&policy, &request, &evaluation, decision);
});

/// Checks evaluator invariants.
///
/// 1. `decide` and `explain` agree
/// 2. Every evaluation carries a reason
/// 3. A matched rule exists and its effect is the decision
/// 4. No match means the default effect
/// 5. Unauthenticated requests are denied under the standard policy
fn validate_invariants(
    policy: &Policy,
    request: &RequestAttributes,
    evaluation: &Evaluation,
    decision: Decision,
) {
    assert_eq!(
        evaluation.decision(),
        decision,
        "decide and explain must agree"
    );

    assert!(
        !evaluation.reason.is_empty(),
        "evaluation must carry a reason"
    );

    match &evaluation.matched_rule {
        Some(matched) => {
            let rule = policy
                .rules
                .iter()
                .find(|r| &r.name == matched)
                .unwrap_or_else(|| panic!("matched rule '{matched}' must exist in policy"));
            // Duplicate names are possible in unvalidated policies; only
            // check the effect when the name is unique.
            if policy.rules.iter().filter(|r| &r.name == matched).count() == 1 {
                assert_eq!(evaluation.effect, rule.effect);
            }
        }
        None => assert_eq!(evaluation.effect, policy.default_effect),
    }

    if request.authenticated.as_deref() != Some("true") {
        assert_eq!(
            Evaluator::new(Policy::standard()).decide(request),
            Decision::Unauthorized,
            "standard policy must deny unauthenticated requests"
        );
    }
}
