//! A thin emission layer over [`Module`], pairing primop construction with
//! [`CleanupStack`] bookkeeping. The GIR generator (§4.7) talks to the
//! module exclusively through a `Builder`; nothing else is allowed to call
//! `Module::push_primop` directly, so cleanup obligations can never be
//! forgotten.

use std::rc::Rc;

use ast::QualName;
use lowering::GirType;

use crate::cleanup::{Cleanup, CleanupStack, Mark};
use crate::ident::{ContId, ValueId};
use crate::module::Module;
use crate::primop::Opcode;
use crate::terminator::Terminator;

pub struct Builder<'m> {
    pub module: &'m mut Module,
    pub cleanups: CleanupStack,
    current: ContId,
}

impl<'m> Builder<'m> {
    pub fn new(module: &'m mut Module, entry: ContId) -> Self {
        Builder { module, cleanups: CleanupStack::default(), current: entry }
    }

    pub fn current(&self) -> ContId {
        self.current
    }

    /// Switches the continuation subsequent `emit_*` calls target, e.g.
    /// when the generator starts filling in a freshly allocated switch arm.
    pub fn switch_to(&mut self, cont: ContId) {
        self.current = cont;
    }

    fn emit(&mut self, opcode: Opcode, operands: Vec<ValueId>, result_ty: Option<Rc<GirType>>) -> Option<ValueId> {
        self.module.push_primop(self.current, opcode, operands, result_ty)
    }

    pub fn alloca(&mut self, ty: Rc<GirType>) -> ValueId {
        let v = self.emit(Opcode::Alloca, Vec::new(), Some(ty)).expect("alloca has a result");
        self.cleanups.push(Cleanup::Address(v));
        v
    }

    pub fn alloc_box(&mut self, ty: Rc<GirType>) -> ValueId {
        let v = self.emit(Opcode::AllocBox, Vec::new(), Some(ty)).expect("alloc_box has a result");
        self.cleanups.push(Cleanup::Box(v));
        v
    }

    pub fn project_box(&mut self, boxed: ValueId, inner_ty: Rc<GirType>) -> ValueId {
        self.emit(Opcode::ProjectBox, vec![boxed], Some(inner_ty)).expect("project_box has a result")
    }

    pub fn load(&mut self, addr: ValueId, ty: Rc<GirType>, take: bool) -> ValueId {
        self.emit(Opcode::Load { take }, vec![addr], Some(ty)).expect("load has a result")
    }

    pub fn store(&mut self, value: ValueId, addr: ValueId) {
        self.emit(Opcode::Store, vec![value, addr], None);
    }

    /// Retains an object-category value, registering a matching
    /// `destroy_value` cleanup for the new owning reference — the GIR
    /// analogue of a clone in the teacher's ownership-tracked checker.
    pub fn copy_value(&mut self, value: ValueId, ty: Rc<GirType>) -> ValueId {
        let v = self.emit(Opcode::CopyValue, vec![value], Some(ty)).expect("copy_value has a result");
        self.cleanups.push(Cleanup::Value(v));
        v
    }

    pub fn destroy_value(&mut self, value: ValueId) {
        self.emit(Opcode::DestroyValue, vec![value], None);
    }

    pub fn copy_address(&mut self, src: ValueId, dst: ValueId) {
        self.emit(Opcode::CopyAddress, vec![src, dst], None);
    }

    pub fn destroy_address(&mut self, addr: ValueId) {
        self.emit(Opcode::DestroyAddress, vec![addr], None);
    }

    pub fn function_ref(&mut self, target: ContId, ty: Rc<GirType>) -> ValueId {
        self.emit(Opcode::FunctionRef(target), Vec::new(), Some(ty)).expect("function_ref has a result")
    }

    pub fn data_init(&mut self, ctor: QualName, payload: ValueId, ty: Rc<GirType>) -> ValueId {
        let v = self.emit(Opcode::DataInit(ctor), vec![payload], Some(ty)).expect("data_init has a result");
        self.cleanups.push(Cleanup::Value(v));
        v
    }

    pub fn tuple(&mut self, elements: Vec<ValueId>, ty: Rc<GirType>) -> ValueId {
        self.emit(Opcode::Tuple, elements, Some(ty)).expect("tuple has a result")
    }

    pub fn tuple_element_address(&mut self, tuple_addr: ValueId, index: usize, ty: Rc<GirType>) -> ValueId {
        self.emit(Opcode::TupleElementAddress(index), vec![tuple_addr], Some(ty))
            .expect("tuple_element_address has a result")
    }

    /// Closes a `function_ref` over its captured payload, producing a
    /// first-class function value — the generator's translation of a TT
    /// `Lambda` (§4.7).
    pub fn thicken(&mut self, func_ref: ValueId, ty: Rc<GirType>) -> ValueId {
        let v = self.emit(Opcode::Thicken, vec![func_ref], Some(ty)).expect("thicken has a result");
        self.cleanups.push(Cleanup::Value(v));
        v
    }

    pub fn force_effects(&mut self, value: ValueId, ty: Rc<GirType>) -> ValueId {
        self.emit(Opcode::ForceEffects, vec![value], Some(ty)).expect("force_effects has a result")
    }

    /// Marks the cleanup stack before entering a sub-scope.
    pub fn mark(&self) -> Mark {
        self.cleanups.mark()
    }

    /// Releases everything pushed since `mark`, in reverse order, each as
    /// its matching destroy primop emitted on the current continuation.
    /// `skip` names a value that is being *returned* out of the scope and
    /// so must survive unwinding (its own cleanup, if it has one in the
    /// drained set, is dropped rather than emitted) — the forward-not-copy
    /// case (§4.7) of a clause body whose result is its own last binding.
    pub fn unwind_to(&mut self, mark: Mark, skip: Option<ValueId>) {
        for cleanup in self.cleanups.drain_to(mark) {
            match cleanup {
                Cleanup::Value(v) if Some(v) == skip => {}
                Cleanup::Value(v) => self.destroy_value(v),
                Cleanup::Address(a) if Some(a) == skip => {
                    self.emit(Opcode::Dealloca, vec![a], None);
                }
                Cleanup::Address(a) => {
                    self.destroy_address(a);
                    self.emit(Opcode::Dealloca, vec![a], None);
                }
                Cleanup::Box(b) if Some(b) == skip => {}
                Cleanup::Box(b) => {
                    self.emit(Opcode::DeallocBox, vec![b], None);
                }
            }
        }
    }

    pub fn apply(&mut self, callee: ValueId, args: Vec<ValueId>, result_ty: Rc<GirType>) {
        self.module.set_terminator(self.current, Terminator::Apply { callee, args, result_ty });
    }

    pub fn switch_constr(
        &mut self,
        scrutinee: ValueId,
        scrutinee_ty: Rc<GirType>,
        arms: Vec<(QualName, ValueId)>,
        default: Option<ValueId>,
    ) {
        self.module
            .set_terminator(self.current, Terminator::SwitchConstr { scrutinee, scrutinee_ty, arms, default });
    }

    pub fn unreachable(&mut self) {
        self.module.set_terminator(self.current, Terminator::Unreachable);
    }
}
