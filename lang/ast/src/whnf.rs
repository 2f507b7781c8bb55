//! §4.1's weak head normal form engine. Every algorithm downstream of the
//! elaborator (the solver, the checker, lowering) consults terms only
//! through this module — never by matching on `Term` directly — so that
//! "blocked on a meta" is always explicit rather than silently treated as
//! stuck.

use std::rc::Rc;

use fxhash::FxHashSet;
use log::trace;

use crate::clause::{Clause, FunctionBody, Invertibility, Pattern};
use crate::ident::MetaVar;
use crate::signature::{Definition, Signature};
use crate::subst::{eliminate, Subst};
use crate::term::{Elim, Head, Term};

/// The outcome of reducing a term to its outer layer.
#[derive(Debug, Clone)]
pub enum Blocked {
    /// The outer constructor is exposed; no meta stands in the way.
    NotBlocked(Rc<Term>),
    /// Progress is blocked on a single unresolved meta applied to `elims`.
    OnHead(MetaVar, Vec<Elim>),
    /// Progress is blocked on one of several metas appearing deeper in the
    /// spine (e.g. a meta-headed scrutinee of a would-be clause match).
    OnMetas(FxHashSet<MetaVar>, Head, Vec<Elim>),
}

impl Blocked {
    pub fn into_term(self) -> Rc<Term> {
        match self {
            Blocked::NotBlocked(t) => t,
            Blocked::OnHead(m, elims) => Rc::new(Term::Apply { span: None, head: Head::Meta(m), elims }),
            Blocked::OnMetas(_, head, elims) => Rc::new(Term::Apply { span: None, head, elims }),
        }
    }

    pub fn is_blocked(&self) -> bool {
        !matches!(self, Blocked::NotBlocked(_))
    }
}

/// Reduces `t` to weak head normal form under `sig`.
pub fn whnf(sig: &Signature, t: &Rc<Term>) -> Blocked {
    match &**t {
        Term::Type { .. }
        | Term::Pi { .. }
        | Term::Lambda { .. }
        | Term::Equal { .. }
        | Term::Refl { .. }
        | Term::Constructor { .. } => Blocked::NotBlocked(t.clone()),
        Term::Apply { head, elims, .. } => match head {
            Head::Var(_) => Blocked::NotBlocked(t.clone()),
            Head::Meta(m) => match sig.lookup_meta_binding(*m) {
                Some(binding) => {
                    trace!("whnf: unfolding solved meta {m}");
                    let body = binding.internalize();
                    let reduced = Rc::new(eliminate(body, elims.clone()));
                    whnf(sig, &reduced)
                }
                None => Blocked::OnHead(*m, elims.clone()),
            },
            Head::Def(opened) => match sig.lookup_definition(&opened.name) {
                Some(Definition::Function {
                    body: FunctionBody::Checked { invertibility: Invertibility::Invertible, clauses },
                    ..
                }) => match try_match_clauses(sig, clauses, elims) {
                    ClauseMatch::Matched(reduced) => {
                        trace!("whnf: unfolding invertible function {}", opened.name);
                        whnf(sig, &reduced)
                    }
                    ClauseMatch::NoMatch => Blocked::NotBlocked(t.clone()),
                    ClauseMatch::BlockedOn(metas) => Blocked::OnMetas(metas, head.clone(), elims.clone()),
                },
                _ => Blocked::NotBlocked(t.clone()),
            },
        },
    }
}

enum ClauseMatch {
    Matched(Rc<Term>),
    NoMatch,
    BlockedOn(FxHashSet<MetaVar>),
}

/// Tries every clause in source order against the elimination spine,
/// matching each clause's pattern vector one `ApplyArg` at a time.
fn try_match_clauses(sig: &Signature, clauses: &[Clause], elims: &[Elim]) -> ClauseMatch {
    let mut blockers = FxHashSet::default();
    for clause in clauses {
        if clause.patterns.len() > elims.len() {
            continue;
        }
        let mut subst_args = Vec::new();
        match match_patterns(sig, &clause.patterns, elims, &mut subst_args, &mut blockers) {
            Some(true) => {
                if let Some(body) = &clause.body {
                    let mut sigma = Subst::Id;
                    for arg in subst_args.into_iter() {
                        sigma = Subst::instantiate(arg, sigma);
                    }
                    let reduced = crate::subst::apply_subst(body, &sigma)
                        .expect("clause body is closed under its own pattern telescope");
                    let remaining: Vec<Elim> = elims[clause.patterns.len()..].to_vec();
                    return ClauseMatch::Matched(Rc::new(eliminate(Rc::new(reduced), remaining)));
                }
                // an absurd clause matching is itself a structural
                // impossibility the checker is responsible for ruling out.
                unreachable!("absurd clause matched a concrete spine");
            }
            Some(false) => continue,
            None => {}
        }
    }
    if blockers.is_empty() {
        ClauseMatch::NoMatch
    } else {
        ClauseMatch::BlockedOn(blockers)
    }
}

/// Returns `Some(true)` on a full match (pushing substitution args),
/// `Some(false)` on a definite mismatch, `None` when blocked on a meta.
fn match_patterns(
    sig: &Signature,
    patterns: &[Pattern],
    elims: &[Elim],
    out_args: &mut Vec<Rc<Term>>,
    blockers: &mut FxHashSet<MetaVar>,
) -> Option<bool> {
    let mut any_blocked = false;
    for (pat, elim) in patterns.iter().zip(elims) {
        let arg = match elim {
            Elim::ApplyArg(a) => a.clone(),
            Elim::Project(..) => return Some(false),
        };
        match pat {
            Pattern::Var(_) => out_args.push(arg),
            Pattern::Absurd => return Some(false),
            Pattern::Constructor { name, args: subpats } => match whnf(sig, &arg) {
                Blocked::NotBlocked(t) => match &*t {
                    Term::Constructor { ctor, args, .. } if &ctor.name == name => {
                        let elims: Vec<Elim> = args.iter().cloned().map(Elim::ApplyArg).collect();
                        match match_patterns(sig, subpats, &elims, out_args, blockers) {
                            Some(true) => {}
                            Some(false) => return Some(false),
                            None => any_blocked = true,
                        }
                    }
                    _ => return Some(false),
                },
                Blocked::OnHead(m, _) => {
                    blockers.insert(m);
                    any_blocked = true;
                }
                Blocked::OnMetas(ms, _, _) => {
                    blockers.extend(ms);
                    any_blocked = true;
                }
            },
        }
    }
    if any_blocked {
        None
    } else {
        Some(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Contextual, Telescope};
    use crate::ident::QualName;
    use crate::term::Opened;

    fn qn(s: &str) -> QualName {
        QualName(s.to_owned())
    }

    /// Regression test for an invertible function binding two pattern
    /// variables at different argument positions: `mkBoth x y = mkPair x
    /// y`. `bind_pattern` gives the first pattern variable (`x`) the
    /// highest de Bruijn index, so the clause body is `mkPair(Idx(1),
    /// Idx(0))`. Unfolding `mkBoth(a, b)` must reduce to `mkPair(a, b)`,
    /// never the swapped `mkPair(b, a)`.
    #[test]
    fn unfolds_a_two_variable_invertible_function_without_swapping_its_arguments() {
        let mut sig = Signature::new();

        let clause = Clause {
            patterns: vec![Pattern::Var("x".to_owned()), Pattern::Var("y".to_owned())],
            body: Some(Rc::new(Term::Constructor {
                span: None,
                ctor: Opened::new(qn("mkPair"), vec![]),
                args: vec![Rc::new(Term::var(crate::ident::Idx(1))), Rc::new(Term::var(crate::ident::Idx(0)))],
            })),
        };

        let ty = Contextual::new(Telescope::default(), Rc::new(Term::Type { span: None }));
        sig.add_ascription(qn("mkBoth"), ty).unwrap();
        sig.add_function_clauses(
            &qn("mkBoth"),
            FunctionBody::Checked { invertibility: Invertibility::Invertible, clauses: vec![clause] },
        )
        .unwrap();

        let a = Rc::new(Term::Type { span: None });
        let b = Rc::new(Term::Refl { span: None });
        let applied = Rc::new(Term::Apply {
            span: None,
            head: Head::Def(Opened::new(qn("mkBoth"), vec![])),
            elims: vec![Elim::ApplyArg(a.clone()), Elim::ApplyArg(b.clone())],
        });

        let reduced = whnf(&sig, &applied).into_term();
        match &*reduced {
            Term::Constructor { ctor, args, .. } => {
                assert_eq!(ctor.name, qn("mkPair"));
                assert_eq!(args.as_slice(), &[a, b]);
            }
            other => panic!("expected mkPair(a, b), got {other:?}"),
        }
    }
}
