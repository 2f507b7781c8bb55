//! §4.4.3: given an allowed variable set `V` (typically the pattern
//! variables of the other side of a stuck flex-rigid constraint), prune a
//! meta's spine of any position that rigidly mentions a variable outside
//! `V` — such a position can never contribute to a legal solution.

use fxhash::FxHashSet;

use ast::{eta_contract, whnf, Elim, Head, Idx, MetaVar, Signature, Term};

use super::prune_common;

/// Attempts to prune `$m[es]` against `allowed`. Returns `false` if no
/// position needed pruning or the meta's type isn't known structurally.
pub fn try_prune(sig: &mut Signature, allowed: &FxHashSet<Idx>, m: MetaVar, es: &[Elim]) -> bool {
    let n = es.len();
    let mut prunable = Vec::with_capacity(n);
    for e in es {
        let should_prune = match e {
            Elim::ApplyArg(a) => {
                let reduced = eta_contract(&whnf(sig, a).into_term());
                match reduced.as_bare_var() {
                    Some(v) => !allowed.contains(&v),
                    None => rigidly_outside(sig, allowed, &reduced),
                }
            }
            Elim::Project(..) => false,
        };
        prunable.push(should_prune);
    }
    if !prunable.iter().any(|p| *p) {
        return false;
    }
    let Some(ty) = sig.lookup_meta_type(m) else { return false };
    let origin = sig.lookup_meta_origin(m);
    let Some((doms, result)) = prune_common::split_pi_chain(sig, &ty, n) else { return false };
    prune_common::prune_meta(sig, m, &doms, &result, &prunable, origin)
}

/// True if `t` contains only rigid variable occurrences and every one of
/// them lies outside `allowed` — this spine position may as well be
/// dropped, since no legal solution could ever make essential use of it.
/// Meta- or definition-headed subterms are conservatively treated as *not*
/// prunable: we don't yet know what they'll reduce to.
fn rigidly_outside(sig: &Signature, allowed: &FxHashSet<Idx>, t: &Term) -> bool {
    match t {
        Term::Apply { head: Head::Var(v), elims, .. } => {
            !allowed.contains(&v.idx)
                && elims.iter().all(|e| match e {
                    Elim::ApplyArg(a) => rigidly_outside(sig, allowed, &whnf(sig, a).into_term()),
                    Elim::Project(..) => true,
                })
        }
        Term::Constructor { args, .. } => {
            args.iter().all(|a| rigidly_outside(sig, allowed, &whnf(sig, a).into_term()))
        }
        Term::Pi { dom, cod, .. } => {
            rigidly_outside(sig, allowed, &whnf(sig, dom).into_term())
                && rigidly_outside(sig, allowed, &whnf(sig, cod).into_term())
        }
        Term::Type { .. } | Term::Refl { .. } => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use ast::{whnf, Head, MetaVar, Term};

    use super::*;

    fn var(idx: usize) -> Rc<Term> {
        Rc::new(Term::var(Idx(idx)))
    }

    /// Under Γ = (x, y), `$0[x, y]` pruned against `allowed = {x}` must drop
    /// the `y` position: `y` is rigid and outside the allowed set, so no
    /// legal solution could ever depend on it.
    #[test]
    fn prunes_a_rigid_argument_outside_the_allowed_set() {
        let mut sig = Signature::new();
        let ty = Rc::new(Term::Pi {
            span: None,
            name: "_".to_owned(),
            dom: Rc::new(Term::Type { span: None }),
            cod: Rc::new(Term::Pi {
                span: None,
                name: "_".to_owned(),
                dom: Rc::new(Term::Type { span: None }),
                cod: Rc::new(Term::Type { span: None }),
            }),
        });
        let m = sig.add_meta(ty, None);

        let mut allowed = FxHashSet::default();
        allowed.insert(Idx(1));

        let es = vec![Elim::ApplyArg(var(1)), Elim::ApplyArg(var(0))];
        assert!(try_prune(&mut sig, &allowed, m, &es));

        let binding = sig.lookup_meta_binding(m).expect("pruning binds $0");
        assert_eq!(binding.arity, 2);
        let new_meta = MetaVar(1);
        assert!(sig.lookup_meta_type(new_meta).is_some());

        // whnf($0[x, y]) == $1[x] from the outer context's perspective: only
        // the kept (allowed) position survives.
        let applied = Rc::new(Term::Apply { span: None, head: Head::Meta(m), elims: es });
        let reduced = whnf(&sig, &applied).into_term();
        let expected =
            Rc::new(Term::Apply { span: None, head: Head::Meta(new_meta), elims: vec![Elim::ApplyArg(var(1))] });
        assert_eq!(reduced, expected);
    }

    /// Nothing disagrees with `allowed`, so pruning must report no progress
    /// rather than rebind the meta pointlessly.
    #[test]
    fn reports_no_progress_when_every_position_is_allowed() {
        let mut sig = Signature::new();
        let ty = Rc::new(Term::Pi {
            span: None,
            name: "_".to_owned(),
            dom: Rc::new(Term::Type { span: None }),
            cod: Rc::new(Term::Type { span: None }),
        });
        let m = sig.add_meta(ty, None);
        let mut allowed = FxHashSet::default();
        allowed.insert(Idx(0));
        let es = vec![Elim::ApplyArg(var(0))];
        assert!(!try_prune(&mut sig, &allowed, m, &es));
        assert!(sig.lookup_meta_binding(m).is_none());
    }
}
