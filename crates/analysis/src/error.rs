use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AnalysisError {
    /// The bundled grammar could not be loaded into the parser.
    #[error("Python grammar unavailable: {0}")]
    Grammar(String),

    /// tree-sitter returned no tree (cancelled or timed out).
    #[error("parser produced no syntax tree")]
    NoTree,
}
