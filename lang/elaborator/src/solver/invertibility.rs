//! §4.4.4: classifies a fully-checked function's invertibility once, after
//! all its clauses are checked, so WHNF can safely unfold it eagerly
//! without risking a match on an unsolved or still-growing scrutinee.

use ast::{Clause, Definition, Head, Invertibility, QualName, Signature, Term};

/// The head shape a clause's body reduces its scrutinee-dependent output
/// to, at a glance, without actually running WHNF — good enough to decide
/// whether two clauses could ever be confused with each other.
#[derive(Debug, Clone, PartialEq, Eq)]
enum HeadClass {
    Data(QualName),
    Record(QualName),
    Postulate(QualName),
    Pi,
    /// Functions, lambdas, equalities, absurd clauses and bare
    /// metavariables are never invertible: unfolding them aggressively
    /// could loop, or expose a reduct that isn't actually canonical.
    NonInvertible,
}

fn classify(sig: &Signature, t: &Term) -> HeadClass {
    match t {
        Term::Pi { .. } => HeadClass::Pi,
        Term::Lambda { .. } | Term::Equal { .. } => HeadClass::NonInvertible,
        Term::Type { .. } | Term::Refl { .. } => HeadClass::NonInvertible,
        Term::Constructor { ctor, .. } => match sig.lookup_definition(&ctor.name) {
            Some(Definition::DataConstructor { parent, .. }) => HeadClass::Data(parent.clone()),
            _ => HeadClass::NonInvertible,
        },
        Term::Apply { head, .. } => match head {
            Head::Def(opened) => match sig.lookup_definition(&opened.name) {
                Some(Definition::Data { .. }) => HeadClass::Data(opened.name.clone()),
                Some(Definition::Record { .. }) => HeadClass::Record(opened.name.clone()),
                Some(Definition::Postulate { .. }) => HeadClass::Postulate(opened.name.clone()),
                _ => HeadClass::NonInvertible,
            },
            _ => HeadClass::NonInvertible,
        },
    }
}

/// Infers invertibility for a function given its already type-checked
/// clause list: invertible iff every clause has a body (no absurd
/// patterns mid-function) whose head classifies, and no two clauses
/// classify to the same head.
pub fn infer_invertibility(sig: &Signature, clauses: &[Clause]) -> Invertibility {
    let mut classes = Vec::with_capacity(clauses.len());
    for clause in clauses {
        let Some(body) = &clause.body else { return Invertibility::NotInvertible };
        let class = classify(sig, body);
        if class == HeadClass::NonInvertible {
            return Invertibility::NotInvertible;
        }
        classes.push(class);
    }
    for i in 0..classes.len() {
        for j in (i + 1)..classes.len() {
            if classes[i] == classes[j] {
                return Invertibility::NotInvertible;
            }
        }
    }
    Invertibility::Invertible
}
