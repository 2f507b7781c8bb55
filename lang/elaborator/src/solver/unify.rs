//! The per-frame reduction strategies of §4.4: syntactic equality, eta,
//! meta interaction (intersection / inversion / pruning), and structural
//! comparison (including spine comparison with its dependent-codomain
//! bookkeeping).

use std::rc::Rc;

use fxhash::FxHashSet;

use ast::{
    apply_subst, eliminate, eta_expand, whnf, Blocked, Elim, Environment, Head, MetaBinding, MetaVar,
    Signature, Subst, Term,
};

use super::error::UnifyError;
use super::{intersection, inversion, pruning, Constraint, Outcome};
use crate::options::ElabOptions;

/// The outcome of classifying a WHNF term for the purposes of meta
/// interaction: either it is headed by an as-yet-unbound meta (flexible),
/// genuinely stuck on a set of metas deeper in the term (treated the same
/// as "blocked" by the caller), or fully rigid.
enum Shape {
    Flex(MetaVar, Vec<Elim>),
    StuckOnMetas(FxHashSet<MetaVar>),
    Rigid(Rc<Term>),
}

fn classify(sig: &Signature, t: &Rc<Term>) -> Shape {
    match whnf(sig, t) {
        Blocked::NotBlocked(t) => Shape::Rigid(t),
        Blocked::OnHead(m, es) => Shape::Flex(m, es),
        Blocked::OnMetas(ms, ..) => Shape::StuckOnMetas(ms),
    }
}

pub(super) fn reduce(sig: &mut Signature, opts: &ElabOptions, c: Constraint) -> Result<Outcome, UnifyError> {
    match c {
        Constraint::Conjoin(cs) => Ok(Outcome::Decomposed(cs)),
        Constraint::Suppose(c1, c2) => reduce_suppose(sig, opts, *c1, *c2),
        Constraint::Unify { ctx, ty, lhs, rhs } => unify_frame(sig, opts, ctx, ty, lhs, rhs),
        Constraint::UnifySpines { ctx, ty, head, lhs, rhs } => unify_spines(sig, opts, ctx, ty, head, lhs, rhs),
    }
}

/// `c2` is enqueued iff `c1` reduces to nothing. If `c1` itself decomposes
/// into a nonempty residue, the whole `Suppose` is re-queued gating on that
/// residue rather than discarding `c2` — `c1` must still fully discharge
/// before `c2` becomes relevant (this is how the heterogeneous `Equal`
/// decomposition keeps a term equation from being attempted before its
/// type equation has gone through).
fn reduce_suppose(sig: &mut Signature, opts: &ElabOptions, c1: Constraint, c2: Constraint) -> Result<Outcome, UnifyError> {
    match reduce(sig, opts, c1)? {
        Outcome::Solved => Ok(Outcome::Decomposed(vec![c2])),
        Outcome::Decomposed(residue) if residue.is_empty() => Ok(Outcome::Decomposed(vec![c2])),
        Outcome::Decomposed(residue) => {
            let gate = if residue.len() == 1 { residue.into_iter().next().unwrap() } else { Constraint::Conjoin(residue) };
            Ok(Outcome::Decomposed(vec![Constraint::Suppose(Box::new(gate), Box::new(c2))]))
        }
        Outcome::Blocked(metas) => Ok(Outcome::Blocked(metas)),
    }
}

fn unify_frame(
    sig: &mut Signature,
    opts: &ElabOptions,
    ctx: Environment,
    ty: Rc<Term>,
    lhs: Rc<Term>,
    rhs: Rc<Term>,
) -> Result<Outcome, UnifyError> {
    let lhs_whnf = whnf(sig, &lhs).into_term();
    let rhs_whnf = whnf(sig, &rhs).into_term();
    if lhs_whnf == rhs_whnf {
        return Ok(Outcome::Decomposed(Vec::new()));
    }

    // Eta expansion (§4.1): retry syntactic equality once both sides have
    // been expanded one layer at the (WHNF'd) expected type.
    let ty_whnf = whnf(sig, &ty).into_term();
    let lhs_eta = eta_expand(sig, &ty_whnf, &lhs_whnf);
    let rhs_eta = eta_expand(sig, &ty_whnf, &rhs_whnf);
    if lhs_eta == rhs_eta {
        return Ok(Outcome::Decomposed(Vec::new()));
    }

    match (classify(sig, &lhs_eta), classify(sig, &rhs_eta)) {
        (Shape::StuckOnMetas(ms), _) | (_, Shape::StuckOnMetas(ms)) => Ok(Outcome::Blocked(ms)),
        (Shape::Flex(m1, es1), Shape::Flex(m2, es2)) if m1 == m2 => flex_flex_same_head(sig, m1, &es1, &es2),
        (Shape::Flex(m1, _), Shape::Flex(m2, _)) => {
            // Two distinct unresolved metas: neither side can drive the
            // other yet. Park on both; some other constraint must solve
            // one of them first.
            let mut blocking = FxHashSet::default();
            blocking.insert(m1);
            blocking.insert(m2);
            Ok(Outcome::Blocked(blocking))
        }
        (Shape::Flex(m, es), Shape::Rigid(t)) | (Shape::Rigid(t), Shape::Flex(m, es)) => {
            flex_rigid(sig, m, &es, &t)
        }
        (Shape::Rigid(l), Shape::Rigid(r)) => structural(sig, opts, ctx, &ty_whnf, &l, &r),
    }
}

/// §4.4.1: `$m[es1] ≐ $m[es2]`.
fn flex_flex_same_head(sig: &mut Signature, m: MetaVar, es1: &[Elim], es2: &[Elim]) -> Result<Outcome, UnifyError> {
    if intersection::try_intersect(sig, m, es1, es2) {
        return Ok(Outcome::Decomposed(Vec::new()));
    }
    // try_intersect returns false both when nothing needed dropping
    // (the spines already agree positionally) and when the spines aren't
    // both flat variable spines of equal length. Only the former is safe
    // to treat as solved; distinguish by re-checking the flat-variable
    // shape directly.
    let flat: Option<Vec<_>> = es1
        .iter()
        .zip(es2)
        .map(|(a, b)| match (a, b) {
            (Elim::ApplyArg(x), Elim::ApplyArg(y)) => Some((x.as_bare_var()?, y.as_bare_var()?)),
            _ => None,
        })
        .collect();
    match flat {
        Some(pairs) if es1.len() == es2.len() && pairs.iter().all(|(a, b)| a == b) => {
            Ok(Outcome::Decomposed(Vec::new()))
        }
        _ => {
            let mut blocking = FxHashSet::default();
            blocking.insert(m);
            Ok(Outcome::Blocked(blocking))
        }
    }
}

/// §4.4.2/§4.4.3: `$m[es] ≐ rhs` (or the symmetric `rhs ≐ $m[es]`).
fn flex_rigid(sig: &mut Signature, m: MetaVar, es: &[Elim], rhs: &Rc<Term>) -> Result<Outcome, UnifyError> {
    let subst = match inversion::invert_spine(sig, es) {
        Ok(subst) => subst,
        Err(inversion::InversionFailure::NotAPattern) => {
            // Outside the literal pattern fragment this solver implements;
            // park rather than fail (§9, open question 1's spirit: be
            // conservative, never unsound).
            let mut blocking = FxHashSet::default();
            blocking.insert(m);
            return Ok(Outcome::Blocked(blocking));
        }
    };
    match inversion::apply_inversion(sig, &subst, rhs) {
        inversion::ApplyResult::Ok(body) => {
            bind_meta(sig, m, es.len(), body)?;
            Ok(Outcome::Decomposed(Vec::new()))
        }
        inversion::ApplyResult::BlockedOn(metas) => Ok(Outcome::Blocked(metas)),
        inversion::ApplyResult::Escapes(_) => {
            let allowed: FxHashSet<ast::Idx> = subst.keys().copied().collect();
            if prune_escaping_metas(sig, &allowed, rhs) {
                match inversion::apply_inversion(sig, &subst, rhs) {
                    inversion::ApplyResult::Ok(body) => {
                        bind_meta(sig, m, es.len(), body)?;
                        return Ok(Outcome::Decomposed(Vec::new()));
                    }
                    inversion::ApplyResult::BlockedOn(metas) => return Ok(Outcome::Blocked(metas)),
                    inversion::ApplyResult::Escapes(_) => {}
                }
            }
            let mut blocking = FxHashSet::default();
            blocking.insert(m);
            Ok(Outcome::Blocked(blocking))
        }
    }
}

fn bind_meta(sig: &mut Signature, m: MetaVar, arity: usize, body: Rc<Term>) -> Result<(), UnifyError> {
    sig.instantiate_meta(m, MetaBinding { arity, body })
        .map_err(|_| UnifyError::new(Rc::new(Term::meta(m)), Rc::new(Term::meta(m)), "meta already bound"))
}

/// Walks `t`, pruning every meta application found inside it against
/// `allowed`, used to try to make an escaping variable occurrence in an
/// inversion's RHS disappear before giving up on that inversion.
fn prune_escaping_metas(sig: &mut Signature, allowed: &FxHashSet<ast::Idx>, t: &Rc<Term>) -> bool {
    let reduced = whnf(sig, t).into_term();
    let mut changed = false;
    match &*reduced {
        Term::Apply { head: Head::Meta(m), elims, .. } => {
            changed |= pruning::try_prune(sig, allowed, *m, elims);
            for e in elims {
                if let Elim::ApplyArg(a) = e {
                    changed |= prune_escaping_metas(sig, allowed, a);
                }
            }
        }
        Term::Apply { elims, .. } => {
            for e in elims {
                if let Elim::ApplyArg(a) = e {
                    changed |= prune_escaping_metas(sig, allowed, a);
                }
            }
        }
        Term::Pi { dom, cod, .. } => {
            changed |= prune_escaping_metas(sig, allowed, dom);
            changed |= prune_escaping_metas(sig, allowed, cod);
        }
        Term::Lambda { body, .. } => changed |= prune_escaping_metas(sig, allowed, body),
        Term::Equal { ty, lhs, rhs, .. } => {
            changed |= prune_escaping_metas(sig, allowed, ty);
            changed |= prune_escaping_metas(sig, allowed, lhs);
            changed |= prune_escaping_metas(sig, allowed, rhs);
        }
        Term::Constructor { args, .. } => {
            for a in args {
                changed |= prune_escaping_metas(sig, allowed, a);
            }
        }
        Term::Type { .. } | Term::Refl { .. } => {}
    }
    changed
}

/// Structural comparison of two rigid WHNFs at (rigid) type `ty`.
fn structural(
    sig: &mut Signature,
    opts: &ElabOptions,
    ctx: Environment,
    ty: &Rc<Term>,
    lhs: &Rc<Term>,
    rhs: &Rc<Term>,
) -> Result<Outcome, UnifyError> {
    match (&**lhs, &**rhs) {
        (Term::Type { .. }, Term::Type { .. }) => Ok(Outcome::Decomposed(Vec::new())),
        (Term::Refl { .. }, Term::Refl { .. }) => Ok(Outcome::Decomposed(Vec::new())),
        (
            Term::Pi { dom: dom1, cod: cod1, name, .. },
            Term::Pi { dom: dom2, cod: cod2, .. },
        ) => {
            let type_univ = Rc::new(Term::Type { span: None });
            let dom_eq = Constraint::Unify { ctx: ctx.clone(), ty: type_univ.clone(), lhs: dom1.clone(), rhs: dom2.clone() };
            let mut cod_ctx = ctx;
            cod_ctx.push_binder(name.clone(), dom1.clone());
            let cod_eq = Constraint::Unify { ctx: cod_ctx, ty: type_univ, lhs: cod1.clone(), rhs: cod2.clone() };
            Ok(Outcome::Decomposed(vec![Constraint::Suppose(Box::new(dom_eq), Box::new(cod_eq))]))
        }
        (Term::Lambda { body: body1, name, .. }, Term::Lambda { body: body2, .. }) => {
            let Term::Pi { dom, cod, .. } = &**ty else {
                return Err(UnifyError::new(lhs.clone(), rhs.clone(), "lambda compared at a non-Π type"));
            };
            let mut body_ctx = ctx;
            body_ctx.push_binder(name.clone(), dom.clone());
            Ok(Outcome::Decomposed(vec![Constraint::Unify {
                ctx: body_ctx,
                ty: cod.clone(),
                lhs: body1.clone(),
                rhs: body2.clone(),
            }]))
        }
        (Term::Equal { ty: ty1, lhs: l1, rhs: r1, .. }, Term::Equal { ty: ty2, lhs: l2, rhs: r2, .. }) => {
            let type_univ = Rc::new(Term::Type { span: None });
            Ok(Outcome::Decomposed(vec![
                Constraint::Unify { ctx: ctx.clone(), ty: type_univ, lhs: ty1.clone(), rhs: ty2.clone() },
                Constraint::Unify { ctx: ctx.clone(), ty: ty1.clone(), lhs: l1.clone(), rhs: l2.clone() },
                Constraint::Unify { ctx, ty: ty1.clone(), lhs: r1.clone(), rhs: r2.clone() },
            ]))
        }
        (Term::Constructor { ctor: c1, args: a1, .. }, Term::Constructor { ctor: c2, args: a2, .. }) => {
            if c1.name != c2.name {
                return Err(UnifyError::new(lhs.clone(), rhs.clone(), "mismatched constructors"));
            }
            if a1.len() != a2.len() {
                return Err(UnifyError::new(lhs.clone(), rhs.clone(), "constructor arity mismatch"));
            }
            let Some(full_ty) = sig.opened_type(&c1.name) else {
                return Err(UnifyError::new(lhs.clone(), rhs.clone(), "unknown constructor"));
            };
            let payload_ty = Rc::new(eliminate(full_ty, c1.args.iter().cloned().map(Elim::ApplyArg).collect()));
            let lhs_elims: Vec<Elim> = a1.iter().cloned().map(Elim::ApplyArg).collect();
            let rhs_elims: Vec<Elim> = a2.iter().cloned().map(Elim::ApplyArg).collect();
            Ok(Outcome::Decomposed(vec![Constraint::UnifySpines {
                ctx,
                ty: payload_ty,
                head: None,
                lhs: lhs_elims,
                rhs: rhs_elims,
            }]))
        }
        (Term::Apply { head: h1, elims: e1, .. }, Term::Apply { head: h2, elims: e2, .. }) => {
            apply_vs_apply(sig, opts, ctx, h1, e1, h2, e2, lhs, rhs)
        }
        _ => Err(UnifyError::new(lhs.clone(), rhs.clone(), "rigid-rigid mismatch")),
    }
}

fn apply_vs_apply(
    sig: &mut Signature,
    _opts: &ElabOptions,
    ctx: Environment,
    h1: &Head,
    e1: &[Elim],
    h2: &Head,
    e2: &[Elim],
    lhs: &Rc<Term>,
    rhs: &Rc<Term>,
) -> Result<Outcome, UnifyError> {
    match (h1, h2) {
        (Head::Var(v1), Head::Var(v2)) => {
            if v1.idx != v2.idx {
                return Err(UnifyError::new(lhs.clone(), rhs.clone(), "distinct rigid variables"));
            }
            let Some(head_ty) = ctx.lookup(v1.idx) else {
                return Err(UnifyError::new(lhs.clone(), rhs.clone(), "unbound variable in context"));
            };
            Ok(Outcome::Decomposed(vec![Constraint::UnifySpines {
                ctx,
                ty: head_ty,
                head: Some(h1.clone()),
                lhs: e1.to_vec(),
                rhs: e2.to_vec(),
            }]))
        }
        (Head::Def(o1), Head::Def(o2)) => {
            if o1.name != o2.name {
                return Err(UnifyError::new(lhs.clone(), rhs.clone(), "distinct global heads"));
            }
            if o1.args.len() != o2.args.len() {
                return Err(UnifyError::new(lhs.clone(), rhs.clone(), "opened-argument arity mismatch"));
            }
            let Some(full_ty) = sig.opened_type(&o1.name) else {
                return Err(UnifyError::new(lhs.clone(), rhs.clone(), "unknown definition"));
            };
            let mut out = Vec::with_capacity(o1.args.len() + 1);
            let type_univ_ty = full_ty.clone();
            let mut cur_ty = type_univ_ty;
            for (a1, a2) in o1.args.iter().zip(&o2.args) {
                let Term::Pi { dom, cod, .. } = &*whnf(sig, &cur_ty).into_term() else {
                    break;
                };
                out.push(Constraint::Unify { ctx: ctx.clone(), ty: dom.clone(), lhs: a1.clone(), rhs: a2.clone() });
                cur_ty = Rc::new(apply_subst(cod, &Subst::singleton(a1.clone())).unwrap_or((**cod).clone()));
            }
            let payload_ty = Rc::new(eliminate(full_ty, o1.args.iter().cloned().map(Elim::ApplyArg).collect()));
            out.push(Constraint::UnifySpines {
                ctx,
                ty: payload_ty,
                head: Some(h1.clone()),
                lhs: e1.to_vec(),
                rhs: e2.to_vec(),
            });
            Ok(Outcome::Decomposed(out))
        }
        _ => Err(UnifyError::new(lhs.clone(), rhs.clone(), "mismatched head shapes")),
    }
}

/// Collects every metavariable that blocks WHNF-reduction of some
/// `ApplyArg` in `elims` — used by `unify_spines` to tell "this side just
/// hasn't finished computing yet" (§9 open question 1's meta-blocked case)
/// apart from "this side is a genuine arity mismatch".
fn blocked_metas_in_spine(sig: &Signature, elims: &[Elim]) -> FxHashSet<MetaVar> {
    let mut blocking = FxHashSet::default();
    for e in elims {
        if let Elim::ApplyArg(a) = e {
            match whnf(sig, a) {
                Blocked::OnHead(m, _) => {
                    blocking.insert(m);
                }
                Blocked::OnMetas(ms, ..) => blocking.extend(ms),
                Blocked::NotBlocked(_) => {}
            }
        }
    }
    blocking
}

/// §4.4's spine comparison: walks two equal-length spines against an
/// evolving Π type, one position at a time, deferring the remainder as a
/// fresh `UnifySpines` constraint rather than recursing directly so the
/// work loop stays in control of scheduling.
fn unify_spines(
    sig: &mut Signature,
    opts: &ElabOptions,
    ctx: Environment,
    ty: Rc<Term>,
    head: Option<Head>,
    lhs: Vec<Elim>,
    rhs: Vec<Elim>,
) -> Result<Outcome, UnifyError> {
    if lhs.is_empty() && rhs.is_empty() {
        return Ok(Outcome::Decomposed(Vec::new()));
    }
    if lhs.len() != rhs.len() {
        if opts.postpone_on_blocked_spine_mismatch {
            let mut blocking = blocked_metas_in_spine(sig, &lhs);
            blocking.extend(blocked_metas_in_spine(sig, &rhs));
            if !blocking.is_empty() {
                return Ok(Outcome::Blocked(blocking));
            }
        }
        return Err(UnifyError::new(
            Rc::new(Term::Type { span: None }),
            Rc::new(Term::Type { span: None }),
            "spine length mismatch",
        ));
    }
    let (l0, l_rest) = lhs.split_first().unwrap();
    let (r0, r_rest) = rhs.split_first().unwrap();
    match (l0, r0) {
        (Elim::ApplyArg(a1), Elim::ApplyArg(a2)) => {
            let ty_whnf = whnf(sig, &ty).into_term();
            let Term::Pi { dom, cod, .. } = &*ty_whnf else {
                return Err(UnifyError::new(a1.clone(), a2.clone(), "spine applied beyond a Π type"));
            };
            let arg_eq = Constraint::Unify { ctx: ctx.clone(), ty: dom.clone(), lhs: a1.clone(), rhs: a2.clone() };
            let continuation_ty = match apply_subst(cod, &Subst::strengthen(1, Subst::Id)) {
                Ok(independent) => Rc::new(independent),
                Err(_) => Rc::new(apply_subst(cod, &Subst::singleton(a1.clone())).expect("cod under one binder")),
            };
            let rest = Constraint::UnifySpines {
                ctx,
                ty: continuation_ty,
                head: head.clone(),
                lhs: l_rest.to_vec(),
                rhs: r_rest.to_vec(),
            };
            Ok(Outcome::Decomposed(vec![arg_eq, rest]))
        }
        (Elim::Project(f1, idx1), Elim::Project(f2, idx2)) => {
            if f1.name != f2.name || idx1 != idx2 {
                return Err(UnifyError::new(
                    Rc::new(Term::Type { span: None }),
                    Rc::new(Term::Type { span: None }),
                    "mismatched record projections",
                ));
            }
            let Some(field_ty) = sig.opened_type(&f1.name) else {
                return Err(UnifyError::new(
                    Rc::new(Term::Type { span: None }),
                    Rc::new(Term::Type { span: None }),
                    "unknown projection",
                ));
            };
            let payload_ty = Rc::new(eliminate(field_ty, f1.args.iter().cloned().map(Elim::ApplyArg).collect()));
            Ok(Outcome::Decomposed(vec![Constraint::UnifySpines {
                ctx,
                ty: payload_ty,
                head,
                lhs: l_rest.to_vec(),
                rhs: r_rest.to_vec(),
            }]))
        }
        _ => Err(UnifyError::new(
            Rc::new(Term::Type { span: None }),
            Rc::new(Term::Type { span: None }),
            "mismatched eliminator shapes",
        )),
    }
}

#[cfg(test)]
mod tests {
    use ast::Environment;

    use super::*;
    use crate::options::ElabOptions;

    fn type_univ() -> Rc<Term> {
        Rc::new(Term::Type { span: None })
    }

    /// A spine-length mismatch where one side's only elim is headed by an
    /// unbound meta must postpone (§9 open question 1), not fail, when
    /// `postpone_on_blocked_spine_mismatch` is set (the default).
    #[test]
    fn postpones_a_spine_length_mismatch_blocked_on_a_meta() {
        let mut sig = Signature::new();
        let m = sig.add_meta(type_univ(), None);
        let opts = ElabOptions::default();
        let lhs = vec![Elim::ApplyArg(Rc::new(Term::meta(m)))];
        let rhs = Vec::new();
        let outcome = unify_spines(&mut sig, &opts, Environment::default(), type_univ(), None, lhs, rhs)
            .expect("a meta-blocked mismatch must postpone, not error");
        match outcome {
            Outcome::Blocked(blocking) => assert!(blocking.contains(&m)),
            _ => panic!("expected Blocked"),
        }
    }

    /// The same spine-length mismatch with no meta involved anywhere must
    /// still fail outright — postponement only applies when something
    /// could plausibly still resolve the mismatch.
    #[test]
    fn fails_a_spine_length_mismatch_with_no_blocking_meta() {
        let mut sig = Signature::new();
        let opts = ElabOptions::default();
        let lhs = vec![Elim::ApplyArg(type_univ())];
        let rhs = Vec::new();
        let result = unify_spines(&mut sig, &opts, Environment::default(), type_univ(), None, lhs, rhs);
        assert!(result.is_err());
    }

    /// With the flag turned off, even a meta-blocked mismatch must fail
    /// immediately rather than postpone.
    #[test]
    fn fails_a_blocked_mismatch_when_postponement_is_disabled() {
        let mut sig = Signature::new();
        let m = sig.add_meta(type_univ(), None);
        let opts = ElabOptions { postpone_on_blocked_spine_mismatch: false, ..ElabOptions::default() };
        let lhs = vec![Elim::ApplyArg(Rc::new(Term::meta(m)))];
        let rhs = Vec::new();
        let result = unify_spines(&mut sig, &opts, Environment::default(), type_univ(), None, lhs, rhs);
        assert!(result.is_err());
    }
}
