//! The substitution calculus of §4.1: a composable closure built from five
//! primitives. Modeled as a free monoid whose smart constructors fold
//! adjacent redundancy at construction time, so applying a long chain of
//! weakenings never re-traverses a term more than once per "real" shift.

use std::rc::Rc;

use crate::error::StrengthenError;
use crate::ident::Idx;
use crate::term::{Elim, Head, Opened, Term};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subst {
    Id,
    /// `Weaken(n, σ)`: apply `σ`, then shift the result up by `n`.
    Weaken(usize, Rc<Subst>),
    /// `Strengthen(n, σ)`: the inverse of `Weaken`; fails if the looked-up
    /// index falls inside the `n` variables being dropped.
    Strengthen(usize, Rc<Subst>),
    /// `Instantiate(t, σ)`: consume one binder, mapping index `0` to `t`
    /// and falling through to `σ` (shifted down by one) otherwise.
    Instantiate(Rc<Term>, Rc<Subst>),
    /// `Lift(n, σ)`: descend under `n` binders, leaving the first `n`
    /// indices as themselves and applying `σ` (shifted by `n`) beyond that.
    Lift(usize, Rc<Subst>),
}

impl Subst {
    pub fn weaken(n: usize, inner: Subst) -> Subst {
        if n == 0 {
            return inner;
        }
        match inner {
            // (Weaken n) ∘ (Weaken m) = Weaken (n+m)
            Subst::Weaken(m, innermost) => Subst::Weaken(n + m, innermost),
            // (Weaken n) ∘ (Strengthen m) = Weaken (n-m) or Strengthen (m-n)
            Subst::Strengthen(m, innermost) => {
                if n == m {
                    (*innermost).clone()
                } else if n > m {
                    Subst::Weaken(n - m, innermost)
                } else {
                    Subst::Strengthen(m - n, innermost)
                }
            }
            other => Subst::Weaken(n, Rc::new(other)),
        }
    }

    pub fn strengthen(n: usize, inner: Subst) -> Subst {
        if n == 0 {
            return inner;
        }
        match inner {
            Subst::Weaken(m, innermost) => {
                if n == m {
                    (*innermost).clone()
                } else if n < m {
                    Subst::Weaken(m - n, innermost)
                } else {
                    Subst::Strengthen(n - m, innermost)
                }
            }
            other => Subst::Strengthen(n, Rc::new(other)),
        }
    }

    pub fn instantiate(t: Rc<Term>, inner: Subst) -> Subst {
        // Instantiate t ∘ Lift 1 σ = σ, when t is the variable at the hole.
        if t.as_bare_var() == Some(Idx(0)) {
            if let Subst::Lift(m, innermost) = &inner {
                return if *m == 1 { (**innermost).clone() } else { Subst::Lift(m - 1, innermost.clone()) };
            }
        }
        Subst::Instantiate(t, Rc::new(inner))
    }

    pub fn lift(n: usize, inner: Subst) -> Subst {
        if n == 0 {
            return inner;
        }
        match inner {
            Subst::Id => Subst::Id,
            Subst::Lift(m, innermost) => Subst::Lift(n + m, innermost),
            other => Subst::Lift(n, Rc::new(other)),
        }
    }

    /// `[t]`: the substitution that replaces variable `0` by `t` and leaves
    /// every other (shifted down by one) variable as is. The common case
    /// used for beta-reduction.
    pub fn singleton(t: Rc<Term>) -> Subst {
        Subst::instantiate(t, Subst::Id)
    }
}

/// Looks up index `idx` against `sigma`, returning the term it denotes
/// (already shifted to the caller's context) or the strengthening error
/// naming the offending variable.
pub fn lookup(sigma: &Subst, idx: Idx) -> Result<Rc<Term>, StrengthenError> {
    match sigma {
        Subst::Id => Ok(Rc::new(Term::var(idx))),
        Subst::Weaken(n, inner) => {
            let t = lookup(inner, idx)?;
            Ok(weaken_term(&t, *n))
        }
        Subst::Lift(n, inner) => {
            if idx.0 < *n {
                Ok(Rc::new(Term::var(idx)))
            } else {
                let t = lookup(inner, Idx(idx.0 - n))?;
                Ok(weaken_term(&t, *n))
            }
        }
        Subst::Instantiate(t, inner) => {
            if idx.0 == 0 {
                Ok(t.clone())
            } else {
                lookup(inner, Idx(idx.0 - 1))
            }
        }
        Subst::Strengthen(n, inner) => {
            if idx.0 < *n {
                Err(StrengthenError { idx })
            } else {
                lookup(inner, Idx(idx.0 - n))
            }
        }
    }
}

/// Applies `sigma` to `t`, descending under each binder via `Lift 1`. The
/// only failure mode is a strengthening stepping below zero, surfaced as
/// `StrengthenError`; every call site except the solver's inversion (which
/// catches it to mean "variable escapes") treats this as a bug.
pub fn apply_subst(t: &Term, sigma: &Subst) -> Result<Term, StrengthenError> {
    Ok(match t {
        Term::Type { span } => Term::Type { span: *span },
        Term::Pi { span, name, dom, cod } => Term::Pi {
            span: *span,
            name: name.clone(),
            dom: Rc::new(apply_subst(dom, sigma)?),
            cod: Rc::new(apply_subst(cod, &Subst::lift(1, sigma.clone()))?),
        },
        Term::Lambda { span, name, body } => Term::Lambda {
            span: *span,
            name: name.clone(),
            body: Rc::new(apply_subst(body, &Subst::lift(1, sigma.clone()))?),
        },
        Term::Equal { span, ty, lhs, rhs } => Term::Equal {
            span: *span,
            ty: Rc::new(apply_subst(ty, sigma)?),
            lhs: Rc::new(apply_subst(lhs, sigma)?),
            rhs: Rc::new(apply_subst(rhs, sigma)?),
        },
        Term::Refl { span } => Term::Refl { span: *span },
        Term::Constructor { span, ctor, args } => Term::Constructor {
            span: *span,
            ctor: subst_opened(ctor, sigma)?,
            args: args.iter().map(|a| apply_subst(a, sigma).map(Rc::new)).collect::<Result<_, _>>()?,
        },
        Term::Apply { span, head, elims } => {
            let elims = elims.iter().map(|e| subst_elim(e, sigma)).collect::<Result<Vec<_>, _>>()?;
            match head {
                Head::Var(v) => {
                    let new_head = lookup(sigma, v.idx)?;
                    let new_head = if let Some(s) = span {
                        with_span(&new_head, *s)
                    } else {
                        (*new_head).clone()
                    };
                    eliminate(Rc::new(new_head), elims)
                }
                Head::Def(opened) => {
                    Term::Apply { span: *span, head: Head::Def(subst_opened(opened, sigma)?), elims }
                }
                Head::Meta(m) => Term::Apply { span: *span, head: Head::Meta(*m), elims },
            }
        }
    })
}

fn subst_opened(o: &Opened, sigma: &Subst) -> Result<Opened, StrengthenError> {
    Ok(Opened {
        name: o.name.clone(),
        args: o.args.iter().map(|a| apply_subst(a, sigma).map(Rc::new)).collect::<Result<_, _>>()?,
    })
}

fn subst_elim(e: &Elim, sigma: &Subst) -> Result<Elim, StrengthenError> {
    Ok(match e {
        Elim::ApplyArg(t) => Elim::ApplyArg(Rc::new(apply_subst(t, sigma)?)),
        Elim::Project(o, idx) => Elim::Project(subst_opened(o, sigma)?, *idx),
    })
}

fn with_span(t: &Term, span: crate::span::Span) -> Term {
    let mut t = t.clone();
    match &mut t {
        Term::Type { span: s }
        | Term::Pi { span: s, .. }
        | Term::Lambda { span: s, .. }
        | Term::Equal { span: s, .. }
        | Term::Refl { span: s }
        | Term::Constructor { span: s, .. }
        | Term::Apply { span: s, .. } => *s = Some(span),
    }
    t
}

/// Infallible weakening by `n`, used internally by `lookup`. Never fails:
/// weakening only ever shifts indices up.
pub fn weaken_term(t: &Rc<Term>, n: usize) -> Rc<Term> {
    if n == 0 {
        return t.clone();
    }
    Rc::new(apply_subst(t, &Subst::weaken(n, Subst::Id)).expect("weakening cannot fail"))
}

/// Applies one elimination spine to a term, performing beta/projection
/// reduction whenever the head shape allows it and building a stuck neutral
/// spine otherwise.
pub fn eliminate(t: Rc<Term>, elims: Vec<Elim>) -> Term {
    let mut acc = t;
    for elim in elims {
        acc = Rc::new(eliminate_one(acc, elim));
    }
    Rc::unwrap_or_clone(acc)
}

fn eliminate_one(t: Rc<Term>, elim: Elim) -> Term {
    match elim {
        Elim::ApplyArg(arg) => match &*t {
            Term::Lambda { body, .. } => {
                apply_subst(body, &Subst::singleton(arg)).expect("beta-redex under closed binder")
            }
            Term::Apply { span, head, elims } => {
                let mut elims = elims.clone();
                elims.push(Elim::ApplyArg(arg));
                Term::Apply { span: *span, head: head.clone(), elims }
            }
            _ => unreachable!("ApplyArg eliminator applied to a non-function, non-neutral term"),
        },
        Elim::Project(field, idx) => match &*t {
            Term::Constructor { args, .. } => (*args[idx]).clone(),
            Term::Apply { span, head, elims } => {
                let mut elims = elims.clone();
                elims.push(Elim::Project(field, idx));
                Term::Apply { span: *span, head: head.clone(), elims }
            }
            _ => unreachable!("Project eliminator applied to a non-record, non-neutral term"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(i: usize) -> Rc<Term> {
        Rc::new(Term::var(Idx(i)))
    }

    #[test]
    fn id_law() {
        let t = v(3);
        assert_eq!(apply_subst(&t, &Subst::Id).unwrap(), (*t).clone());
    }

    #[test]
    fn weaken_then_strengthen_is_id() {
        let t = v(1);
        let weakened = apply_subst(&t, &Subst::weaken(1, Subst::Id)).unwrap();
        let back = apply_subst(&weakened, &Subst::strengthen(1, Subst::Id)).unwrap();
        assert_eq!(back, (*t).clone());
    }

    #[test]
    fn instantiate_zero_returns_the_term() {
        let u = v(9);
        assert_eq!(lookup(&Subst::singleton(u.clone()), Idx(0)).unwrap(), u);
    }

    #[test]
    fn strengthen_below_zero_fails() {
        let t = v(0);
        assert!(apply_subst(&t, &Subst::strengthen(1, Subst::Id)).is_err());
    }
}
