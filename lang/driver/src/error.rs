use miette::Diagnostic;
use thiserror::Error;

/// Composes every sub-crate's fatal error into one type the pipeline can
/// return, the way the teacher's own driver composes its phase errors
/// (parser/lowering/type/xfunc) into a single `Error`. Per §7, unification
/// failure and unsolved metas are not fatal — they surface as
/// `elaborator::surface::Diagnostic`s on `CompileOutput::diagnostics`
/// instead of as an `Err` here.
#[derive(Debug, Clone, Error, Diagnostic)]
#[error(transparent)]
#[diagnostic(transparent)]
pub enum Error {
    Check(#[from] elaborator::error::CheckError),
    Gir(#[from] gir::error::GirError),
}
