use std::rc::Rc;

use ast::{Elim, Environment, Head, Term};

/// The solver's homogeneous internal constraint forms (§4.4). Heterogeneous
/// `Equal` constraints from the elaborator are decomposed into these before
/// ever reaching the work loop.
#[derive(Debug, Clone)]
pub enum Constraint {
    /// One equation between two terms of one type.
    Unify { ctx: Environment, ty: Rc<Term>, lhs: Rc<Term>, rhs: Rc<Term> },
    /// Compare two spines left to right against an evolving Π type.
    UnifySpines {
        ctx: Environment,
        ty: Rc<Term>,
        head: Option<Head>,
        lhs: Vec<Elim>,
        rhs: Vec<Elim>,
    },
    Conjoin(Vec<Constraint>),
    /// `rhs` is enqueued iff `lhs` reduces to nothing (i.e. is fully
    /// discharged with no residue).
    Suppose(Box<Constraint>, Box<Constraint>),
}

impl Constraint {
    /// Heterogeneous `Equal(ctx, T1, t1, T2, t2)` decomposes into
    /// `Suppose(Unify(ctx, Type, T1, T2), Unify(ctx, T1, t1, t2))`.
    pub fn equal(ctx: Environment, ty1: Rc<Term>, t1: Rc<Term>, ty2: Rc<Term>, t2: Rc<Term>) -> Constraint {
        let type_univ = Rc::new(Term::Type { span: None });
        Constraint::Suppose(
            Box::new(Constraint::Unify { ctx: ctx.clone(), ty: type_univ, lhs: ty1.clone(), rhs: ty2 }),
            Box::new(Constraint::Unify { ctx, ty: ty1, lhs: t1, rhs: t2 }),
        )
    }
}
