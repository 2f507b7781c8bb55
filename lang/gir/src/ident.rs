use std::fmt;

/// An index into [`crate::module::Module`]'s continuation arena. §9's
/// "cyclic graphs → arena + indices" translation: the GIR's use-def graph
/// is cyclic (a recursive function's body applies back to its own entry
/// continuation), so nodes are owned by one arena and referenced by a
/// small `Copy` handle rather than by `Rc`/pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContId(pub usize);

/// An index into the primop arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrimOpId(pub usize);

/// An index into the value arena. Every GIR value — a continuation
/// parameter or a primop's result — has one of these as its identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueId(pub usize);

impl fmt::Display for ContId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}
