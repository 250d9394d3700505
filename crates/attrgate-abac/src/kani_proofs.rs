//! Kani proofs for ABAC policy evaluation
//!
//! These proofs verify correctness properties of the standard gateway policy
//! using bounded model checking.
//!
//! Run with: `cargo kani --harness verify_*`

#[cfg(kani)]
use crate::attributes::{Attribute, RequestAttributes};
#[cfg(kani)]
use crate::evaluator::{Decision, Evaluator};
#[cfg(kani)]
use crate::policy::{Effect, Policy};

/// Returns one of a small set of interesting values, or absent.
#[cfg(kani)]
fn any_value(candidates: &[&str]) -> Option<String> {
    let index: usize = kani::any();
    kani::assume(index <= candidates.len());
    candidates.get(index).map(|v| (*v).to_string())
}

#[cfg(kani)]
fn any_request() -> RequestAttributes {
    RequestAttributes {
        authenticated: any_value(&["true", "false", "", "TRUE"]),
        role: any_value(&["admin", "user", "", "Admin"]),
        department: any_value(&["Engineering", "engineering", ""]),
        groups: any_value(&["developers", "frontend-developers-team", "ops"]),
        email: any_value(&["a@example.com", "a@example.com.evil.io", ""]),
    }
}

/// Proof: Evaluation determinism
///
/// **Property**: Same request always produces the same decision
#[cfg(kani)]
#[kani::proof]
#[kani::unwind(8)]
fn verify_evaluation_determinism() {
    let evaluator = Evaluator::new(Policy::standard());
    let request = any_request();

    let first = evaluator.decide(&request);
    let second = evaluator.decide(&request);

    assert_eq!(first, second);
}

/// Proof: Authentication gate dominates
///
/// **Property**: Without `azure.authenticated == "true"` the decision is
/// always `Unauthorized`, whatever the other attributes say
#[cfg(kani)]
#[kani::proof]
#[kani::unwind(8)]
fn verify_unauthenticated_always_denied() {
    let evaluator = Evaluator::new(Policy::standard());
    let request = any_request();
    kani::assume(request.get(Attribute::Authenticated) != Some("true"));

    assert_eq!(evaluator.decide(&request), Decision::Unauthorized);
}

/// Proof: Admin override
///
/// **Property**: An authenticated admin is authorized regardless of
/// department, groups, or email
#[cfg(kani)]
#[kani::proof]
#[kani::unwind(8)]
fn verify_admin_always_authorized() {
    let evaluator = Evaluator::new(Policy::standard());
    let request = any_request()
        .with(Attribute::Authenticated, "true")
        .with(Attribute::Role, "admin");

    assert_eq!(evaluator.decide(&request), Decision::Authorized);
}

/// Proof: Deny-by-default
///
/// **Property**: A policy with no rules and default Deny denies everything
#[cfg(kani)]
#[kani::proof]
#[kani::unwind(8)]
fn verify_empty_policy_denies() {
    let evaluator = Evaluator::new(Policy::new(Effect::Deny));
    let request = any_request();

    assert_eq!(evaluator.decide(&request), Decision::Unauthorized);
}
