use miette::Diagnostic;
use thiserror::Error;

use crate::ident::ContId;

/// §7's error taxonomy for the GIR generator. Every variant here indicates
/// a defect in an upstream collaborator (a checked, zonked module that
/// still fails to lower/generate is a bug in the checker, the lowering
/// classifier, or this crate) rather than a condition a well-formed
/// program can trigger; the driver treats any `GirError` as fatal for the
/// whole compilation rather than attempting to recover per-definition, the
/// way `LoweringError` does.
#[derive(Debug, Clone, Error, Diagnostic)]
pub enum GirError {
    /// An invariant this crate itself is responsible for maintaining (a
    /// decision-tree leaf references a binding slot absent from its clause,
    /// a continuation was read before its terminator was set, ...) did not
    /// hold.
    #[error("internal error: {message}")]
    Bug { message: String },
    /// The pattern matrix compiler reached [`crate::pattern_matrix::DecisionTree::Fail`]
    /// at generation time: no clause matches some reachable scrutinee
    /// shape. Exhaustiveness is supposed to be guaranteed by the elaborator
    /// before generation ever runs, so this is reported as a bug in that
    /// guarantee rather than as a normal compile error.
    #[error("no clause matches; exhaustiveness check did not hold")]
    NonExhaustive,
    /// A continuation was referenced (as a successor, an entry point) that
    /// was never defined with a terminator.
    #[error("continuation {cont} has no terminator")]
    MissingTerminator { cont: ContId },
    /// The lowering classifier could not produce a type for some
    /// definition this crate needed to generate code for.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Lowering(#[from] lowering::LoweringError),
}

impl GirError {
    pub fn bug(message: impl Into<String>) -> Self {
        GirError::Bug { message: message.into() }
    }
}
