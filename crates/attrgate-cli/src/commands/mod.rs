//! CLI command implementations.

pub mod eval;
pub mod explain;
pub mod policy;
pub mod version;
