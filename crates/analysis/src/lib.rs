//! Codesmith static analysis adapter.
//!
//! Implements the [`pipeline::SyntaxValidator`] and [`pipeline::ReferenceVerifier`]
//! ports locally, without a model in the loop:
//!
//! - [`SyntaxChecker`] parses candidate code with tree-sitter-python, locates
//!   the first syntax error, suggests a fix, and returns a repaired variant
//!   when a single appended character makes the code parse.
//! - [`ReferenceChecker`] walks every import and flags modules that are not in
//!   the standard library, a known third-party package, or the configured
//!   allow-list.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Parsing and module tables live here. The [`pipeline`]
//! crate sees only the two port traits and the report types they return.

mod config;
mod error;
mod modules;
mod python;
mod references;
mod selftest;
mod syntax;

pub use config::AnalysisConfig;
pub use error::AnalysisError;
pub use references::ReferenceChecker;
pub use selftest::{self_test, AgentHealth, HealthStatus, SelfTestReport};
pub use syntax::{BatchReport, BatchStatus, SyntaxChecker};
