//! Inversion: given a flex-rigid constraint `$m[es] ≐ rhs`, check whether
//! `es` is a Miller pattern spine and, if so, rewrite `rhs` into the
//! smaller context that spine describes.
//!
//! Restricted, by a deliberate and documented choice (see `DESIGN.md`), to
//! the literal Miller pattern fragment: every spine element must already be
//! (after WHNF and eta-contraction) a bare variable, and the resulting
//! variable list must be linear. `MetaBinding` has no way to express a
//! solution guarded by a pattern match, so a constructor-headed spine
//! position fails inversion outright rather than attempting the recursive
//! constructor extension — conservative, never unsound, just incomplete.

use std::rc::Rc;

use fxhash::{FxHashMap, FxHashSet};

use ast::{eta_contract, weaken_term, whnf, Blocked, Elim, Head, Idx, MetaVar, Opened, Signature, Term};

pub enum InversionFailure {
    /// The spine isn't in the pattern fragment (non-variable arg, or a
    /// repeated variable).
    NotAPattern,
}

/// Builds the substitution from outer-context variable index to its
/// position among the `es.len()` fresh pattern variables, or fails if `es`
/// is not a linear list of bare variables.
pub fn invert_spine(sig: &Signature, es: &[Elim]) -> Result<FxHashMap<Idx, Idx>, InversionFailure> {
    let arity = es.len();
    let mut map = FxHashMap::default();
    for (i, e) in es.iter().enumerate() {
        let Elim::ApplyArg(arg) = e else { return Err(InversionFailure::NotAPattern) };
        let reduced = eta_contract(&whnf(sig, arg).into_term());
        let Some(v) = reduced.as_bare_var() else { return Err(InversionFailure::NotAPattern) };
        let fresh = Idx(arity - 1 - i);
        if map.insert(v, fresh).is_some() {
            return Err(InversionFailure::NotAPattern);
        }
    }
    Ok(map)
}

/// The outcome of rewriting a term through an inversion substitution.
pub enum ApplyResult {
    Ok(Rc<Term>),
    BlockedOn(FxHashSet<MetaVar>),
    /// A free variable in `rhs` isn't among the spine's pattern variables —
    /// the occurs-free-but-unreachable case that sends the caller on to
    /// pruning.
    Escapes(Idx),
}

/// Rewrites `t` (given in the outer context) into the fresh pattern
/// context described by `subst`, tracking `depth` binders crossed so far.
pub fn apply_inversion(sig: &Signature, subst: &FxHashMap<Idx, Idx>, t: &Rc<Term>) -> ApplyResult {
    go(sig, subst, t, 0)
}

fn go(sig: &Signature, subst: &FxHashMap<Idx, Idx>, t: &Rc<Term>, depth: usize) -> ApplyResult {
    match whnf(sig, t) {
        Blocked::OnHead(m, _) => {
            let mut s = FxHashSet::default();
            s.insert(m);
            ApplyResult::BlockedOn(s)
        }
        Blocked::OnMetas(ms, _, _) => ApplyResult::BlockedOn(ms),
        Blocked::NotBlocked(reduced) => go_term(sig, subst, &reduced, depth),
    }
}

fn go_opened(sig: &Signature, subst: &FxHashMap<Idx, Idx>, o: &Opened, depth: usize) -> Result<Opened, ApplyResult> {
    let mut args = Vec::with_capacity(o.args.len());
    for a in &o.args {
        match go(sig, subst, a, depth) {
            ApplyResult::Ok(a) => args.push(a),
            other => return Err(other),
        }
    }
    Ok(Opened { name: o.name.clone(), args })
}

fn go_term(sig: &Signature, subst: &FxHashMap<Idx, Idx>, t: &Term, depth: usize) -> ApplyResult {
    match t {
        Term::Type { span } => ApplyResult::Ok(Rc::new(Term::Type { span: *span })),
        Term::Refl { span } => ApplyResult::Ok(Rc::new(Term::Refl { span: *span })),
        Term::Pi { span, name, dom, cod } => {
            let dom2 = match go(sig, subst, dom, depth) {
                ApplyResult::Ok(t) => t,
                other => return other,
            };
            let cod2 = match go(sig, subst, cod, depth + 1) {
                ApplyResult::Ok(t) => t,
                other => return other,
            };
            ApplyResult::Ok(Rc::new(Term::Pi { span: *span, name: name.clone(), dom: dom2, cod: cod2 }))
        }
        Term::Lambda { span, name, body } => {
            let body2 = match go(sig, subst, body, depth + 1) {
                ApplyResult::Ok(t) => t,
                other => return other,
            };
            ApplyResult::Ok(Rc::new(Term::Lambda { span: *span, name: name.clone(), body: body2 }))
        }
        Term::Equal { span, ty, lhs, rhs } => {
            let ty2 = match go(sig, subst, ty, depth) {
                ApplyResult::Ok(t) => t,
                other => return other,
            };
            let lhs2 = match go(sig, subst, lhs, depth) {
                ApplyResult::Ok(t) => t,
                other => return other,
            };
            let rhs2 = match go(sig, subst, rhs, depth) {
                ApplyResult::Ok(t) => t,
                other => return other,
            };
            ApplyResult::Ok(Rc::new(Term::Equal { span: *span, ty: ty2, lhs: lhs2, rhs: rhs2 }))
        }
        Term::Constructor { span, ctor, args } => {
            let ctor2 = match go_opened(sig, subst, ctor, depth) {
                Ok(o) => o,
                Err(other) => return other,
            };
            let mut args2 = Vec::with_capacity(args.len());
            for a in args {
                match go(sig, subst, a, depth) {
                    ApplyResult::Ok(a) => args2.push(a),
                    other => return other,
                }
            }
            ApplyResult::Ok(Rc::new(Term::Constructor { span: *span, ctor: ctor2, args: args2 }))
        }
        Term::Apply { span, head, elims } => {
            let mut elims2 = Vec::with_capacity(elims.len());
            for e in elims {
                match e {
                    Elim::ApplyArg(a) => match go(sig, subst, a, depth) {
                        ApplyResult::Ok(a) => elims2.push(Elim::ApplyArg(a)),
                        other => return other,
                    },
                    Elim::Project(o, idx) => match go_opened(sig, subst, o, depth) {
                        Ok(o2) => elims2.push(Elim::Project(o2, *idx)),
                        Err(other) => return other,
                    },
                }
            }
            match head {
                Head::Var(v) => {
                    if v.idx.0 < depth {
                        let head2 = Head::Var(ast::Var { span: v.span, name: v.name.clone(), idx: v.idx });
                        ApplyResult::Ok(Rc::new(Term::Apply { span: *span, head: head2, elims: elims2 }))
                    } else {
                        let outer = Idx(v.idx.0 - depth);
                        match subst.get(&outer) {
                            Some(fresh) => {
                                let base = weaken_term(&Rc::new(Term::var(*fresh)), depth);
                                ApplyResult::Ok(Rc::new(ast::eliminate(base, elims2)))
                            }
                            None => ApplyResult::Escapes(outer),
                        }
                    }
                }
                Head::Def(o) => match go_opened(sig, subst, o, depth) {
                    Ok(o2) => {
                        ApplyResult::Ok(Rc::new(Term::Apply { span: *span, head: Head::Def(o2), elims: elims2 }))
                    }
                    Err(other) => other,
                },
                Head::Meta(m) => {
                    // A bound meta would already have been unfolded by the
                    // `whnf` call in `go`; an unbound one reaching here
                    // means this whole node was meta-headed, not one of
                    // its subterms, which `go` already reports as blocked.
                    let mut s = FxHashSet::default();
                    s.insert(*m);
                    ApplyResult::BlockedOn(s)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ast::Signature;

    fn var(idx: usize) -> Rc<Term> {
        Rc::new(Term::var(Idx(idx)))
    }

    /// Under Γ = (x, y), `$m[x, y] ≐ x` (idx 1) is a two-variable Miller
    /// spine. Inverting must keep `x` and `y` distinguishable: `x` sits at
    /// spine position 0, so it gets the *highest* fresh index (1), not
    /// position 0's own index.
    #[test]
    fn inverts_a_two_variable_spine_without_conflating_the_variables() {
        let es = vec![Elim::ApplyArg(var(1)), Elim::ApplyArg(var(0))];
        let subst = invert_spine(&Signature::new(), &es).expect("x, y is a linear variable spine");
        assert_eq!(subst.len(), 2);
        assert_eq!(subst.get(&Idx(1)), Some(&Idx(1)));
        assert_eq!(subst.get(&Idx(0)), Some(&Idx(0)));

        let sig = Signature::new();
        match apply_inversion(&sig, &subst, &var(1)) {
            ApplyResult::Ok(t) => assert_eq!(t, var(1)),
            _ => panic!("expected x to rewrite to the fresh variable at index 1"),
        }
        match apply_inversion(&sig, &subst, &var(0)) {
            ApplyResult::Ok(t) => assert_eq!(t, var(0)),
            _ => panic!("expected y to rewrite to the fresh variable at index 0"),
        }
    }

    /// A non-linear spine (the same variable used twice) isn't a Miller
    /// pattern and must fail inversion outright.
    #[test]
    fn rejects_a_non_linear_spine() {
        let es = vec![Elim::ApplyArg(var(0)), Elim::ApplyArg(var(0))];
        assert!(matches!(invert_spine(&Signature::new(), &es), Err(InversionFailure::NotAPattern)));
    }

    /// A free variable in `rhs` that the spine never bound must be reported
    /// as escaping, so the caller falls back to pruning rather than
    /// producing an ill-scoped solution.
    #[test]
    fn reports_an_out_of_scope_variable_as_escaping() {
        let es = vec![Elim::ApplyArg(var(0))];
        let sig = Signature::new();
        let subst = invert_spine(&sig, &es).expect("single-variable spine is linear");
        match apply_inversion(&sig, &subst, &var(1)) {
            ApplyResult::Escapes(Idx(1)) => {}
            _ => panic!("expected index 1 to be reported as escaping"),
        }
    }
}
