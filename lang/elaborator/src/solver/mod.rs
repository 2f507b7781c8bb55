//! §4.4: the work-list solver. Heterogeneous constraints from the
//! elaborator are decomposed into the homogeneous forms of
//! [`constraints::Constraint`] and reduced to fixpoint.

pub mod constraints;
pub mod error;
pub mod intersection;
pub mod invertibility;
pub mod inversion;
pub mod prune_common;
pub mod pruning;
mod unify;

use ast::{MetaVar, Signature, Span};
use fxhash::FxHashSet;
use log::trace;

use crate::options::ElabOptions;
pub use constraints::Constraint;
pub use error::UnifyError;

/// A constraint still unsolved at the end of a solver run, paired with the
/// metas it was last found to be blocked on — exactly what §7's "unsolved
/// metas" report needs to point diagnostics at an origin.
#[derive(Debug, Clone)]
pub struct Residue {
    pub constraint: Constraint,
    pub blocking: FxHashSet<MetaVar>,
}

/// The outcome of reducing one constraint one step, per §4.4's work loop.
enum Outcome {
    /// Fully discharged; nothing further to do. `Suppose`'s "reduces to
    /// nothing" condition is exactly this variant.
    Solved,
    /// Replaced by zero or more (usually smaller) constraints, enqueued for
    /// further reduction in the same pass.
    Decomposed(Vec<Constraint>),
    /// No progress is currently possible; the constraint is blocked on the
    /// given metas and should only be retried once one of them is bound.
    Blocked(FxHashSet<MetaVar>),
}

struct Queued {
    constraint: Constraint,
    blocking: FxHashSet<MetaVar>,
}

/// Owns one compilation job's work-list. Constraints are emitted by the
/// elaborator in source order; §5 calls the resulting discipline "FIFO
/// order initially and LIFO during re-queue (pop from the back of the
/// list)" — modeled here as a stack that is loaded in reverse so the first
/// pass still pops the elaborator's constraints in source order, while
/// every constraint produced mid-run (by decomposition) is pushed and
/// popped in plain LIFO order.
pub struct Solver {
    queue: Vec<Queued>,
    parked: Vec<Queued>,
}

impl Solver {
    pub fn new(constraints: Vec<Constraint>) -> Self {
        let mut queue: Vec<Queued> =
            constraints.into_iter().map(|c| Queued { constraint: c, blocking: FxHashSet::default() }).collect();
        queue.reverse();
        Solver { queue, parked: Vec::new() }
    }

    pub fn push(&mut self, c: Constraint) {
        self.queue.push(Queued { constraint: c, blocking: FxHashSet::default() });
    }

    /// Runs the work loop to fixpoint: repeatedly drains the queue,
    /// promoting the parked queue after every full pass that made
    /// progress, until either nothing remains or a full pass makes no
    /// progress at all (§4.4's "terminate when a full pass produces no
    /// progress"). `opts.max_unify_passes` is a safety fuse against inputs
    /// outside the pattern fragment that would otherwise oscillate
    /// forever between queue and parked queue without ever converging.
    pub fn run(&mut self, sig: &mut Signature, opts: &ElabOptions) -> Result<Vec<Residue>, UnifyError> {
        let mut passes = 0usize;
        loop {
            let mut progressed = false;
            while let Some(q) = self.queue.pop() {
                let ready = q.blocking.is_empty() || q.blocking.iter().any(|m| sig.lookup_meta_binding(*m).is_some());
                if !ready {
                    self.parked.push(q);
                    continue;
                }
                match unify::reduce(sig, opts, q.constraint.clone())? {
                    Outcome::Solved => {
                        trace!("solver: constraint solved");
                        progressed = true;
                    }
                    Outcome::Decomposed(cs) => {
                        trace!("solver: constraint decomposed into {} sub-constraint(s)", cs.len());
                        progressed = true;
                        for c in cs.into_iter().rev() {
                            self.queue.push(Queued { constraint: c, blocking: FxHashSet::default() });
                        }
                    }
                    Outcome::Blocked(blocking) => {
                        trace!("solver: constraint blocked on {} meta(s)", blocking.len());
                        self.parked.push(Queued { constraint: q.constraint, blocking });
                    }
                }
            }
            if self.parked.is_empty() {
                return Ok(Vec::new());
            }
            passes += 1;
            if !progressed || passes >= opts.max_unify_passes {
                trace!("solver: stopping after {passes} pass(es), {} residue(s) left", self.parked.len());
                return Ok(self
                    .parked
                    .drain(..)
                    .map(|q| Residue { constraint: q.constraint, blocking: q.blocking })
                    .collect());
            }
            std::mem::swap(&mut self.queue, &mut self.parked);
        }
    }
}

/// Builds the `Unify(Γ, Type, T1, T2) ⊃ Unify(Γ, T1, t1, t2)` decomposition
/// of a heterogeneous constraint, as a convenience for the elaborator,
/// which only ever emits heterogeneous `Equal`s (§4.3's `expect`).
pub fn equal_constraint(
    ctx: ast::Environment,
    ty1: std::rc::Rc<ast::Term>,
    t1: std::rc::Rc<ast::Term>,
    ty2: std::rc::Rc<ast::Term>,
    t2: std::rc::Rc<ast::Term>,
) -> Constraint {
    Constraint::equal(ctx, ty1, t1, ty2, t2)
}

/// Converts a solver residue into the diagnostic shape §7 asks for: the
/// set of blocking metas together with their origins.
pub fn residue_origins(sig: &Signature, residues: &[Residue]) -> Vec<(MetaVar, Option<Span>)> {
    let mut seen = FxHashSet::default();
    let mut out = Vec::new();
    for r in residues {
        for m in &r.blocking {
            if seen.insert(*m) {
                out.push((*m, sig.lookup_meta_origin(*m)));
            }
        }
    }
    out
}
