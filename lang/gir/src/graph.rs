//! §4.9's graph utilities: traversal views over a [`Module`] that don't
//! belong on `Module` itself. Kept separate so `module.rs` stays a plain
//! arena + bookkeeping owner and the traversal policy (order, revisits)
//! lives in one place.

use fxhash::FxHashSet;

use crate::ident::ContId;
use crate::module::Module;

/// Reverse postorder over the continuations reachable from `entry`,
/// following `apply`/`switch_constr` successor edges. This is the order
/// the textual printer (§6) and any future analysis want: a continuation
/// is listed only after every continuation that can reach it on a
/// forward edge already has been, as far as the cyclic graph allows.
pub fn reverse_postorder(module: &Module, entry: ContId) -> Vec<ContId> {
    let mut visited = FxHashSet::default();
    let mut postorder = Vec::new();
    let mut stack = vec![(entry, false)];
    while let Some((id, expanded)) = stack.pop() {
        if expanded {
            postorder.push(id);
            continue;
        }
        if !visited.insert(id) {
            continue;
        }
        stack.push((id, true));
        for &succ in successors(module, id).iter().rev() {
            if !visited.contains(&succ) {
                stack.push((succ, false));
            }
        }
    }
    postorder.reverse();
    postorder
}

/// All continuations reachable from `entry`, in no particular order.
/// §8's "dead continuation" property is checked by comparing this set
/// against every continuation id the module owns.
pub fn reachable(module: &Module, entry: ContId) -> FxHashSet<ContId> {
    let mut visited = FxHashSet::default();
    let mut stack = vec![entry];
    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        stack.extend(successors(module, id));
    }
    visited
}

fn successors(module: &Module, id: ContId) -> Vec<ContId> {
    let Some(terminator) = &module.continuation(id).terminator else {
        return Vec::new();
    };
    match terminator {
        crate::terminator::Terminator::Apply { callee, .. } => {
            module.as_function_ref(*callee).into_iter().collect()
        }
        crate::terminator::Terminator::SwitchConstr { arms, default, .. } => arms
            .iter()
            .filter_map(|(_, v)| module.as_function_ref(*v))
            .chain(default.iter().filter_map(|v| module.as_function_ref(*v)))
            .collect(),
        crate::terminator::Terminator::Unreachable => Vec::new(),
    }
}
