//! §4.4.1: flex-flex, same meta on both sides. `$m[es1] ≐ $m[es2]` can
//! always be solved by dropping every spine position where the two sides
//! disagree, since no matter how `$m` is eventually solved those positions
//! can't be relied upon anyway.

use std::rc::Rc;

use ast::{Elim, MetaVar, Signature};

use super::prune_common;

/// Attempts the intersection step for `$m[es1] ≐ $m[es2]`. Returns `false`
/// (no progress) if the spines aren't both flat variable spines of equal
/// length, or if they don't actually disagree anywhere.
pub fn try_intersect(sig: &mut Signature, m: MetaVar, es1: &[Elim], es2: &[Elim]) -> bool {
    if es1.len() != es2.len() {
        return false;
    }
    let n = es1.len();
    let mut vars1 = Vec::with_capacity(n);
    let mut vars2 = Vec::with_capacity(n);
    for (e1, e2) in es1.iter().zip(es2) {
        let (Elim::ApplyArg(a1), Elim::ApplyArg(a2)) = (e1, e2) else { return false };
        let (Some(v1), Some(v2)) = (a1.as_bare_var(), a2.as_bare_var()) else { return false };
        vars1.push(v1);
        vars2.push(v2);
    }
    let prunable: Vec<bool> = vars1.iter().zip(&vars2).map(|(a, b)| a != b).collect();
    if !prunable.iter().any(|p| *p) {
        return false;
    }
    let Some(ty) = sig.lookup_meta_type(m) else { return false };
    let origin = sig.lookup_meta_origin(m);
    let Some((doms, result)) = prune_common::split_pi_chain(sig, &ty, n) else { return false };
    prune_common::prune_meta(sig, m, &doms, &result, &prunable, origin)
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use ast::{whnf, Elim, Head, Idx, MetaVar, Term};

    use super::*;

    fn var(idx: usize) -> Rc<Term> {
        Rc::new(Term::var(Idx(idx)))
    }

    /// §8.6: under Γ = (x, y, z, w), `$0[x, y, z] ≐ $0[x, w, z]`. `y` (idx 2)
    /// and `w` (idx 0) disagree while `x` (idx 3) and `z` (idx 1) agree on
    /// both sides, so only the middle position is prunable.
    #[test]
    fn intersection_prunes_the_one_disagreeing_position() {
        let mut sig = Signature::new();
        let ty = Rc::new(Term::Pi {
            span: None,
            name: "_".to_owned(),
            dom: Rc::new(Term::Type { span: None }),
            cod: Rc::new(Term::Pi {
                span: None,
                name: "_".to_owned(),
                dom: Rc::new(Term::Type { span: None }),
                cod: Rc::new(Term::Pi {
                    span: None,
                    name: "_".to_owned(),
                    dom: Rc::new(Term::Type { span: None }),
                    cod: Rc::new(Term::Type { span: None }),
                }),
            }),
        });
        let m = sig.add_meta(ty, None);

        let es1 = vec![Elim::ApplyArg(var(3)), Elim::ApplyArg(var(2)), Elim::ApplyArg(var(1))];
        let es2 = vec![Elim::ApplyArg(var(3)), Elim::ApplyArg(var(0)), Elim::ApplyArg(var(1))];
        assert!(try_intersect(&mut sig, m, &es1, &es2));

        let binding = sig.lookup_meta_binding(m).expect("intersection binds $0");
        assert_eq!(binding.arity, 3);
        let new_meta = MetaVar(1);
        assert!(sig.lookup_meta_type(new_meta).is_some());

        // whnf($0[x, y, z]) == $1[x, z] from the outer context's perspective.
        let applied = Rc::new(Term::Apply { span: None, head: Head::Meta(m), elims: es1 });
        let reduced = whnf(&sig, &applied).into_term();
        let expected = Rc::new(Term::Apply {
            span: None,
            head: Head::Meta(new_meta),
            elims: vec![Elim::ApplyArg(var(3)), Elim::ApplyArg(var(1))],
        });
        assert_eq!(reduced, expected);
    }
}
