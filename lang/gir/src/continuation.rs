use crate::ident::{ContId, PrimOpId, ValueId};
use crate::terminator::Terminator;

/// A CPS basic block (§3): ordered parameters, a straight-line body of
/// primops, and exactly one terminator — `None` only transiently, while
/// the generator is still building this block.
#[derive(Debug, Clone)]
pub struct Continuation {
    pub id: ContId,
    /// A human-readable label (mangled function name for an entry
    /// continuation, `"{owner}.bbN"` for an internal one); cosmetic only,
    /// not consulted for any graph algorithm.
    pub name: String,
    pub params: Vec<ValueId>,
    pub body: Vec<PrimOpId>,
    pub terminator: Option<Terminator>,
}

impl Continuation {
    pub fn new(id: ContId, name: impl Into<String>) -> Self {
        Continuation { id, name: name.into(), params: Vec::new(), body: Vec::new(), terminator: None }
    }
}
