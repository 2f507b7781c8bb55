use miette::Diagnostic;
use thiserror::Error;

use crate::ident::Idx;
use crate::span::Span;

/// Raised when a substitution's `Strengthen` primitive is asked to drop a
/// variable that is still referenced. Every non-solver call site treats this
/// as a structural bug (the frontend/elaborator built an ill-scoped term);
/// the solver's inversion (§4.4.2) is the one legitimate catcher, which
/// turns it into "variable escapes the pattern".
#[derive(Debug, Clone, Error)]
#[error("variable {idx} is no longer in scope after strengthening")]
pub struct StrengthenError {
    pub idx: Idx,
}

/// Errors raised by the [`crate::signature::Signature`]. Every variant here
/// is, per the data model's invariants, a structural bug in a caller: the
/// signature's contract promises these situations cannot arise from valid
/// input, so a caller observing one indicates a defect in the checker
/// itself rather than in the program being compiled.
#[derive(Debug, Clone, Error, Diagnostic)]
pub enum SignatureError {
    #[error("duplicate top-level name `{name}`")]
    DuplicateName { name: String },
    #[error("`{name}` is not a data type or record, and cannot take a constructor")]
    NotDataOrRecord { name: String },
    #[error("`{name}` is not a record, and cannot take a projection")]
    NotRecord { name: String },
    #[error("attempted to replace a non-open function body for `{name}`")]
    ReplacingClosedFunction { name: String },
    #[error("unbound metavariable {meta}")]
    UnboundMeta { meta: crate::ident::MetaVar },
    #[error("metavariable {meta} is already bound")]
    MetaAlreadyBound { meta: crate::ident::MetaVar },
    #[error("unbound top-level name `{name}`")]
    UnboundName { name: String },
}

/// An unsolved metavariable surviving to the end of a solver run. Legal
/// output per §7; carried alongside the signature rather than raised, but
/// given a `Diagnostic` impl so the driver can hand it to a diagnostics
/// collaborator without translating it first.
#[derive(Debug, Clone, Error, Diagnostic)]
#[error("unsolved metavariable {meta}")]
pub struct UnsolvedMeta {
    pub meta: crate::ident::MetaVar,
    pub origin: Option<Span>,
}
