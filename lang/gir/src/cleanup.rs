//! Managed values and the cleanup stack (§4.7's "ownership-correct
//! emission"). The generator never emits a `destroy_value`/`destroy_address`
//! by hand; it pushes a [`Cleanup`] when it produces an owned value and lets
//! [`Builder::unwind_to`] emit the matching destroys in reverse order,
//! mirroring the teacher's scope-exit drop ordering.

use crate::ident::ValueId;

/// A pending obligation to release one value on scope exit.
#[derive(Debug, Clone, Copy)]
pub enum Cleanup {
    /// An object-category value owed a `destroy_value`.
    Value(ValueId),
    /// An address-category local owed a `destroy_address` followed by a
    /// `dealloca` of its backing storage.
    Address(ValueId),
    /// A heap box owed a `dealloc_box` (its payload is destroyed first via
    /// a nested `Cleanup::Address`/`Cleanup::Value` pushed alongside it).
    Box(ValueId),
}

/// An opaque bookmark into the cleanup stack, taken before entering a
/// sub-scope (a clause body, a switch arm) and passed back to
/// [`CleanupStack::unwind_to`] to release exactly what that sub-scope
/// introduced, in reverse order, the way the teacher's checker scopes
/// pattern bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark(pub usize);

#[derive(Debug, Default)]
pub struct CleanupStack {
    stack: Vec<Cleanup>,
}

impl CleanupStack {
    pub fn mark(&self) -> Mark {
        Mark(self.stack.len())
    }

    pub fn push(&mut self, cleanup: Cleanup) {
        self.stack.push(cleanup);
    }

    /// Pops every cleanup pushed since `mark`, in reverse (last-in,
    /// first-destroyed) order, for the caller to turn into `destroy_*`
    /// primops.
    pub fn drain_to(&mut self, mark: Mark) -> Vec<Cleanup> {
        let mut drained = self.stack.split_off(mark.0);
        drained.reverse();
        drained
    }

    pub fn is_empty_from(&self, mark: Mark) -> bool {
        self.stack.len() == mark.0
    }
}
