//! Zonking: substituting final metavariable solutions back into a term
//! once the solver has reached fixpoint. This is the concrete mechanism by
//! which "unsolved metas are legal output" (§7) coexists with GIR lowering
//! never being handed a term with a hole in it: a term zonks cleanly, or it
//! names the first metavariable still blocking it and the caller (the
//! driver, per the GIR phase's "must not run on the affected function")
//! skips lowering for the enclosing definition instead of descending into
//! it.

use std::rc::Rc;

use thiserror::Error;

use crate::clause::{Clause, FunctionBody};
use crate::ident::MetaVar;
use crate::signature::Signature;
use crate::span::Span;
use crate::subst::eliminate;
use crate::term::{Elim, Head, Opened, Term};

/// Raised when a zonk walk reaches a metavariable with no recorded
/// binding. Carries the meta's origin (if any) so the caller can hand it
/// straight to a diagnostics sink without re-deriving it.
#[derive(Debug, Clone, Error)]
#[error("unbound metavariable {meta} encountered while zonking")]
pub struct ZonkError {
    pub meta: MetaVar,
    pub origin: Option<Span>,
}

/// Replaces every solved metavariable occurrence in `t` with its (in turn
/// fully zonked) solution. Fails on the first metavariable still unbound.
pub fn zonk(sig: &Signature, t: &Rc<Term>) -> Result<Rc<Term>, ZonkError> {
    Ok(Rc::new(match &**t {
        Term::Type { span } => Term::Type { span: *span },
        Term::Refl { span } => Term::Refl { span: *span },
        Term::Pi { span, name, dom, cod } => Term::Pi {
            span: *span,
            name: name.clone(),
            dom: zonk(sig, dom)?,
            cod: zonk(sig, cod)?,
        },
        Term::Lambda { span, name, body } => {
            Term::Lambda { span: *span, name: name.clone(), body: zonk(sig, body)? }
        }
        Term::Equal { span, ty, lhs, rhs } => Term::Equal {
            span: *span,
            ty: zonk(sig, ty)?,
            lhs: zonk(sig, lhs)?,
            rhs: zonk(sig, rhs)?,
        },
        Term::Constructor { span, ctor, args } => Term::Constructor {
            span: *span,
            ctor: zonk_opened(sig, ctor)?,
            args: args.iter().map(|a| zonk(sig, a)).collect::<Result<_, _>>()?,
        },
        Term::Apply { span, head, elims } => match head {
            Head::Meta(m) => {
                let binding = sig.lookup_meta_binding(*m).cloned().ok_or(ZonkError {
                    meta: *m,
                    origin: sig.lookup_meta_origin(*m),
                })?;
                let internalized = binding.internalize();
                let zonked_elims = zonk_elims(sig, elims)?;
                let applied = Rc::new(eliminate(internalized, zonked_elims));
                return zonk(sig, &applied);
            }
            Head::Var(v) => {
                Term::Apply { span: *span, head: Head::Var(v.clone()), elims: zonk_elims(sig, elims)? }
            }
            Head::Def(opened) => Term::Apply {
                span: *span,
                head: Head::Def(zonk_opened(sig, opened)?),
                elims: zonk_elims(sig, elims)?,
            },
        },
    }))
}

fn zonk_opened(sig: &Signature, o: &Opened) -> Result<Opened, ZonkError> {
    Ok(Opened {
        name: o.name.clone(),
        args: o.args.iter().map(|a| zonk(sig, a)).collect::<Result<_, _>>()?,
    })
}

fn zonk_elims(sig: &Signature, elims: &[Elim]) -> Result<Vec<Elim>, ZonkError> {
    elims
        .iter()
        .map(|e| match e {
            Elim::ApplyArg(a) => Ok(Elim::ApplyArg(zonk(sig, a)?)),
            Elim::Project(o, idx) => Ok(Elim::Project(zonk_opened(sig, o)?, *idx)),
        })
        .collect()
}

/// Zonks every clause body of a checked function, leaving patterns
/// untouched (patterns carry no metavariables — §4.5's pattern checking
/// only ever introduces fresh metas for absurd-pattern placeholders, which
/// are never read back out of the clause).
pub fn zonk_clauses(sig: &Signature, clauses: &[Clause]) -> Result<Vec<Clause>, ZonkError> {
    clauses
        .iter()
        .map(|c| {
            Ok(Clause {
                patterns: c.patterns.clone(),
                body: c.body.as_ref().map(|b| zonk(sig, b)).transpose()?,
            })
        })
        .collect()
}

/// Zonks a whole function body, passing `Open` bodies through unchanged
/// (nothing to zonk on a function that was never checked).
pub fn zonk_function_body(sig: &Signature, body: &FunctionBody) -> Result<FunctionBody, ZonkError> {
    match body {
        FunctionBody::Open => Ok(FunctionBody::Open),
        FunctionBody::Checked { invertibility, clauses } => {
            Ok(FunctionBody::Checked { invertibility: *invertibility, clauses: zonk_clauses(sig, clauses)? })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::MetaBinding;

    #[test]
    fn solved_meta_is_replaced_by_its_binding() {
        let mut sig = Signature::new();
        let ty = Rc::new(Term::Type { span: None });
        let m = sig.add_meta(ty, None);
        sig.instantiate_meta(m, MetaBinding { arity: 0, body: Rc::new(Term::Type { span: None }) }).unwrap();
        let t = Rc::new(Term::meta(m));
        let zonked = zonk(&sig, &t).unwrap();
        assert_eq!(*zonked, Term::Type { span: None });
    }

    #[test]
    fn unbound_meta_is_an_error() {
        let mut sig = Signature::new();
        let ty = Rc::new(Term::Type { span: None });
        let m = sig.add_meta(ty, None);
        let t = Rc::new(Term::meta(m));
        assert!(zonk(&sig, &t).is_err());
    }
}
