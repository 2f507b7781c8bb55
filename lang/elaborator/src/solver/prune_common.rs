//! Shared machinery behind §4.4.1 (intersection) and §4.4.3 (pruning):
//! both reduce to "given a meta's Π-chain type and a per-position prunable
//! mask, drop what can be strengthened away and rebind the meta to a
//! smaller one reapplied to the kept positions."

use std::rc::Rc;

use ast::{apply_subst, whnf, Elim, Head, Idx, MetaVar, Signature, Span, Subst, Term};

/// Splits `ty` into its leading `n` Π-domains and final codomain, reducing
/// to WHNF at each step. Returns `None` if `ty` doesn't structurally expose
/// `n` Π layers (e.g. still blocked on an unrelated meta) — callers treat
/// that as "no progress" rather than an error.
pub fn split_pi_chain(sig: &Signature, ty: &Rc<Term>, n: usize) -> Option<(Vec<Rc<Term>>, Rc<Term>)> {
    let mut doms = Vec::with_capacity(n);
    let mut cur = ty.clone();
    for _ in 0..n {
        let reduced = whnf(sig, &cur).into_term();
        match &*reduced {
            Term::Pi { dom, cod, .. } => {
                doms.push(dom.clone());
                cur = cod.clone();
            }
            _ => return None,
        }
    }
    Some((doms, cur))
}

/// Given a meta `m` of known arity-`n` Π-chain type (`doms` and `result`,
/// as split by [`split_pi_chain`]), drops every position marked in
/// `prunable` that can be strengthened away, processing innermost-first so
/// each candidate's droppability is tested against the already-adjusted
/// suffix — this is exactly "drop positions via strengthening; skip a drop
/// when strengthening fails" (§4.4.1/§4.4.3), generalized to an arbitrary
/// (not necessarily contiguous) subset of positions via `Subst::lift`.
/// Binds `m` to a fresh, smaller meta reapplied to the kept positions in
/// their original order; returns whether anything was actually dropped.
pub fn prune_meta(
    sig: &mut Signature,
    m: MetaVar,
    doms: &[Rc<Term>],
    result: &Rc<Term>,
    prunable: &[bool],
    origin: Option<Span>,
) -> bool {
    let n = doms.len();
    let mut suffix = result.clone();
    let mut above_kept = 0usize;
    let mut dropped = vec![false; n];
    for k in (0..n).rev() {
        if prunable[k] {
            if let Ok(reduced) =
                apply_subst(&suffix, &Subst::lift(above_kept, Subst::strengthen(1, Subst::Id)))
            {
                suffix = Rc::new(reduced);
                dropped[k] = true;
                continue;
            }
        }
        suffix = Rc::new(Term::Pi { span: None, name: "_".to_owned(), dom: doms[k].clone(), cod: suffix });
        above_kept += 1;
    }
    if !dropped.iter().any(|d| *d) {
        return false;
    }
    let new_meta = sig.add_meta(suffix, origin);
    let elims: Vec<Elim> = (0..n)
        .filter(|k| !dropped[*k])
        .map(|k| Elim::ApplyArg(Rc::new(Term::var(Idx(n - 1 - k)))))
        .collect();
    let body = Rc::new(Term::Apply { span: None, head: Head::Meta(new_meta), elims });
    sig.instantiate_meta(m, ast::MetaBinding { arity: n, body })
        .expect("a meta selected for pruning is, by construction, unbound until this call");
    true
}

/// Builds the substitution `[picks[0], picks[1], ...]` that maps de Bruijn
/// index `0` to the last pick (innermost) and so on, matching how a
/// telescope's later entries see earlier ones.
pub fn subst_from_picks(picks: &[Rc<Term>]) -> Subst {
    let mut sigma = Subst::Id;
    for pick in picks {
        sigma = Subst::instantiate(pick.clone(), sigma);
    }
    sigma
}
