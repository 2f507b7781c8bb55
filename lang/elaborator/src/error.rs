use ast::Span;
use miette::Diagnostic;
use thiserror::Error;

/// §7's error taxonomy, restricted to the two categories this crate can
/// itself raise (structural bugs and pattern-match failures). Unification
/// failure and unsolved-metas are not exceptions here: per §7's propagation
/// policy the solver never raises, it reports a residue — see
/// [`crate::solver::Solver::run`].
#[derive(Debug, Clone, Error, Diagnostic)]
pub enum CheckError {
    /// The input violates an invariant the frontend is expected to
    /// guarantee. Indicates a bug in a collaborator, not in the program
    /// being compiled; aborts the current compilation immediately.
    #[error("internal error: {message}")]
    Structural { message: String },
    /// An absurd pattern would match some valid constructor, or a clause's
    /// pattern does not line up with its parent data declaration.
    #[error("pattern-match failure: {message}")]
    PatternMatch {
        message: String,
        #[label("in this clause")]
        span: Option<miette::SourceSpan>,
        notes: Vec<String>,
    },
}

impl CheckError {
    pub fn structural(message: impl Into<String>) -> Self {
        CheckError::Structural { message: message.into() }
    }

    pub fn pattern_match(message: impl Into<String>, span: Option<Span>, notes: Vec<String>) -> Self {
        use miette_util::ToMiette;
        CheckError::PatternMatch { message: message.into(), span: span.to_miette(), notes }
    }
}
