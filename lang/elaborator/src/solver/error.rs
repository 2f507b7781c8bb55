use std::rc::Rc;

use ast::Term;

/// A genuine (rigid-rigid, or spine-length) mismatch: the two sides cannot
/// possibly be made equal, regardless of how any remaining meta is solved.
/// Carries the two offending terms; the source range travels with the
/// surrounding `Environment`/AST at the call site, not inside this value.
#[derive(Debug, Clone)]
pub struct UnifyError {
    pub lhs: Rc<Term>,
    pub rhs: Rc<Term>,
    pub reason: String,
}

impl UnifyError {
    pub fn new(lhs: Rc<Term>, rhs: Rc<Term>, reason: impl Into<String>) -> Self {
        UnifyError { lhs, rhs, reason: reason.into() }
    }
}
