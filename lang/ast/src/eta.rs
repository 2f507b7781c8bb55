//! §4.1 eta expansion/contraction. Scope is deliberately narrow — records
//! and Π types only (open question #3, §9): no deeper contraction (e.g.
//! through constructor arguments) is attempted.

use std::rc::Rc;

use crate::ident::Idx;
use crate::signature::{Definition, Signature};
use crate::subst::{eliminate, weaken_term};
use crate::term::{Elim, Head, Opened, Term};
use crate::whnf::{whnf, Blocked};

/// Expands `t : ty` one layer if `ty`'s WHNF is a record type or a Π type;
/// returns `t` unchanged for every other type shape.
pub fn eta_expand(sig: &Signature, ty: &Rc<Term>, t: &Rc<Term>) -> Rc<Term> {
    match whnf(sig, ty) {
        Blocked::NotBlocked(ty) => match &*ty {
            Term::Apply { head: Head::Def(opened), .. } => {
                if let Some(Definition::Record { con_name, projections, .. }) =
                    sig.lookup_definition(&opened.name)
                {
                    if is_eta_expandable_record(t) {
                        let args = projections
                            .iter()
                            .enumerate()
                            .map(|(idx, proj_name)| {
                                let field = Opened::new(proj_name.clone(), opened.args.clone());
                                Rc::new(eliminate(t.clone(), vec![Elim::Project(field, idx)]))
                            })
                            .collect();
                        return Rc::new(Term::Constructor {
                            span: None,
                            ctor: Opened::new(con_name.clone(), opened.args.clone()),
                            args,
                        });
                    }
                }
                t.clone()
            }
            Term::Pi { name, .. } => {
                if is_eta_expandable_function(t) {
                    let weakened = weaken_term(t, 1);
                    let applied =
                        eliminate(weakened, vec![Elim::ApplyArg(Rc::new(Term::var(Idx(0))))]);
                    Rc::new(Term::Lambda { span: None, name: name.clone(), body: Rc::new(applied) })
                } else {
                    t.clone()
                }
            }
            _ => t.clone(),
        },
        _ => t.clone(),
    }
}

fn is_eta_expandable_record(t: &Term) -> bool {
    !matches!(t, Term::Constructor { .. })
}

fn is_eta_expandable_function(t: &Term) -> bool {
    !matches!(t, Term::Lambda { .. })
}

/// Contracts obviously-redundant eta redexes: `λ.(f 0)` with `f` not
/// mentioning the bound variable collapses to `f`; a record constructor
/// applying every projection back to the same head collapses to that head.
pub fn eta_contract(t: &Rc<Term>) -> Rc<Term> {
    match &**t {
        Term::Lambda { body, .. } => {
            if let Term::Apply { head, elims, span } = &**body {
                if let Some((init, Elim::ApplyArg(last))) = elims.split_last().map(|(l, i)| (i, l)) {
                    if last.as_bare_var() == Some(Idx(0)) && !mentions_idx0(head, init) {
                        let shifted_head = shift_head_down(head);
                        let shifted_elims: Option<Vec<Elim>> =
                            init.iter().map(shift_elim_down).collect();
                        if let (Some(head), Some(elims)) = (shifted_head, shifted_elims) {
                            return eta_contract(&Rc::new(Term::Apply { span: *span, head, elims }));
                        }
                    }
                }
            }
            t.clone()
        }
        Term::Constructor { args, .. } => {
            if let Some(common) = all_projections_of_same_head(args) {
                return eta_contract(&common);
            }
            t.clone()
        }
        _ => t.clone(),
    }
}

fn mentions_idx0(head: &Head, elims: &[Elim]) -> bool {
    matches!(head, Head::Var(v) if v.idx == Idx(0)) || elims.iter().any(|e| matches!(e, Elim::ApplyArg(a) if a.as_bare_var() == Some(Idx(0))))
}

fn shift_head_down(head: &Head) -> Option<Head> {
    match head {
        Head::Var(v) if v.idx.0 > 0 => Some(Head::Var(crate::term::Var { idx: Idx(v.idx.0 - 1), ..v.clone() })),
        Head::Var(_) => None,
        other => Some(other.clone()),
    }
}

fn shift_elim_down(e: &Elim) -> Option<Elim> {
    match e {
        Elim::ApplyArg(a) => {
            let idx = a.as_bare_var()?;
            if idx.0 == 0 {
                None
            } else {
                Some(Elim::ApplyArg(Rc::new(Term::var(Idx(idx.0 - 1)))))
            }
        }
        Elim::Project(o, idx) => Some(Elim::Project(o.clone(), *idx)),
    }
}

fn all_projections_of_same_head(args: &[Rc<Term>]) -> Option<Rc<Term>> {
    let mut common: Option<Rc<Term>> = None;
    for (expected_idx, arg) in args.iter().enumerate() {
        let (subject, idx) = match &**arg {
            Term::Apply { head, elims, span } => match elims.last() {
                Some(Elim::Project(field, idx)) => {
                    let init = &elims[..elims.len() - 1];
                    (Rc::new(Term::Apply { span: *span, head: head.clone(), elims: init.to_vec() }), *idx)
                }
                _ => return None,
            },
            _ => return None,
        };
        if idx != expected_idx {
            return None;
        }
        match &common {
            None => common = Some(subject),
            Some(c) if *c == subject => {}
            Some(_) => return None,
        }
    }
    common
}
