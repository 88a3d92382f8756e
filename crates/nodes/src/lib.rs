//! Codesmith pipeline executor, stage runners, and LLM-backed agents.
//!
//! This crate drives a request through generation, syntax validation,
//! reference verification, and the optional review, owning the per-run
//! [`pipeline::RequestState`] for the whole run. It also supplies the two
//! collaborators that are thin prompts over an [`pipeline::LlmProvider`]:
//! [`LlmCodeGenerator`] and [`LlmCodeReviewer`].
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** The executor sequences calls between the domain
//! types in the [`pipeline`] crate and the collaborator ports. It contains no
//! parsing or code analysis of its own.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`executor`] | `PipelineExecutor`, its builder, and `RunOptions` |
//! | [`registry`] | Bounded store of request snapshots for lookup |
//! | `stages` | One runner per stage, each owning its retry loop |
//! | [`agents`] | LLM-backed `CodeGenerator` and `CodeReviewer` |

pub mod agents;
mod error;
pub mod executor;
pub mod registry;
mod stages;

pub use agents::{AgentSettings, LlmCodeGenerator, LlmCodeReviewer};
pub use error::AgentError;
pub use executor::{PipelineExecutor, PipelineExecutorBuilder, RunOptions};
pub use registry::StateRegistry;
