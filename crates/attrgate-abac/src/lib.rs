//! # attrgate-abac: Streaming Attribute-Based Access Control
//!
//! Decides `authorized` / `unauthorized` for a stream of requests, each a flat
//! mapping of attribute names to string values, against a small ordered
//! policy. Sits behind an authentication gateway that has already verified
//! credentials and attached identity attributes.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Input Record (one JSON object per line)     │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  Decoder                                     │
//! │  ├─ Skip blank records                       │
//! │  ├─ Require an object of string values       │
//! │  └─ Malformed → unauthorized                 │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  Evaluator                                   │
//! │  ├─ Evaluate rules by priority               │
//! │  ├─ First match wins                         │
//! │  └─ Default deny                             │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  Decision line, in input order               │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Standard Policy
//!
//! 1. Deny unless `azure.authenticated` is exactly `"true"`
//! 2. Allow `azure.role == "admin"`
//! 3. Allow `azure.department == "Engineering"` whose `azure.groups` contains `"developers"`
//! 4. Allow `azure.role == "user"` whose `azure.email` ends with `"@example.com"`
//! 5. Deny everything else
//!
//! ## Examples
//!
//! ```
//! use attrgate_abac::{Decision, Evaluator, Pipeline, PipelineOptions, Policy};
//!
//! let pipeline = Pipeline::new(Evaluator::new(Policy::standard()), PipelineOptions::default());
//!
//! let input = "{\"azure.authenticated\":\"true\",\"azure.role\":\"admin\"}\n\nnot json\n";
//! let mut output = Vec::new();
//! let stats = pipeline.run(input.as_bytes(), &mut output).unwrap();
//!
//! assert_eq!(output, b"authorized\nunauthorized\n");
//! assert_eq!(stats.malformed, 1);
//! ```

pub mod attributes;
pub mod decoder;
pub mod evaluator;
pub mod pipeline;
pub mod policy;

// Kani proofs for bounded model checking
#[cfg(any(test, kani))]
mod kani_proofs;


pub use attributes::{Attribute, AttributeSet, RequestAttributes};
pub use decoder::{DecodeError, decode_record};
pub use evaluator::{Decision, Evaluation, Evaluator, evaluate};
pub use pipeline::{FlushMode, Pipeline, PipelineError, PipelineOptions, PipelineStats};
pub use policy::{Condition, Effect, Policy, PolicyError, Rule};
