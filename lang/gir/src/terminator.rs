use std::rc::Rc;

use ast::QualName;
use lowering::GirType;

use crate::ident::ValueId;

/// §6's three terminator productions. Exactly one terminator ends every
/// continuation (§8's GIR well-formedness property); successors are
/// discoverable purely by inspecting it (no separate successor list is
/// stored on the terminator itself — [`crate::module::Module`] derives
/// successors from the `function_ref`-producing primops feeding an
/// `apply`/`switch_constr`'s continuation-typed operands).
#[derive(Debug, Clone)]
pub enum Terminator {
    /// Invokes `callee` (a value of function type, almost always a
    /// `function_ref`/`thicken` result) with `args`.
    Apply { callee: ValueId, args: Vec<ValueId>, result_ty: Rc<GirType> },
    /// Dispatches on `scrutinee`'s outer constructor. `arms` are tried in
    /// the order constructors first appeared in the source pattern matrix
    /// (§4.8's "tie-breaking and determinism"); `default` is the fallback
    /// continuation reference for any constructor not named.
    SwitchConstr {
        scrutinee: ValueId,
        scrutinee_ty: Rc<GirType>,
        arms: Vec<(QualName, ValueId)>,
        default: Option<ValueId>,
    },
    /// An absurd leaf (§4.8): control can provably never reach here.
    Unreachable,
}
