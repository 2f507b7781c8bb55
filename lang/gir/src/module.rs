//! §4.9: the GIR module. Owns every continuation and primop (the arena +
//! index translation of §9's "cyclic graphs"), the type unique-table
//! inherited from `lowering`, and the successor/predecessor bookkeeping
//! that backs the graph views in [`crate::graph`].

use std::rc::Rc;

use ast::QualName;
use fxhash::FxHashMap;
use lowering::{GirType, TypeTable};

use crate::continuation::Continuation;
use crate::ident::{ContId, PrimOpId, ValueId};
use crate::primop::{Opcode, PrimOp};
use crate::terminator::Terminator;
use crate::value::{UseSite, Value, ValueKind};

#[derive(Debug, Default)]
pub struct Module {
    pub name: QualName,
    pub types: TypeTable,
    continuations: Vec<Continuation>,
    primops: Vec<PrimOp>,
    values: Vec<Value>,
    /// Named entry points: one per function definition lowered into this
    /// module (§6's "declared ... `@` qualname ... `{` continuation+ `}`").
    pub entries: FxHashMap<QualName, ContId>,
    /// `cont -> [continuations whose terminator names cont as a successor]`.
    /// The index-based analogue of the intrusive predecessor list threaded
    /// through each successor slot (§3, §4.9, §9's arena translation).
    predecessors: FxHashMap<ContId, Vec<ContId>>,
}

impl Module {
    pub fn new(name: QualName) -> Self {
        Module { name, ..Default::default() }
    }

    // Continuations
    //
    //

    pub fn new_continuation(&mut self, name: impl Into<String>) -> ContId {
        let id = ContId(self.continuations.len());
        self.continuations.push(Continuation::new(id, name));
        id
    }

    pub fn continuation(&self, id: ContId) -> &Continuation {
        &self.continuations[id.0]
    }

    pub fn continuation_mut(&mut self, id: ContId) -> &mut Continuation {
        &mut self.continuations[id.0]
    }

    pub fn iter_continuations(&self) -> impl Iterator<Item = &Continuation> {
        self.continuations.iter()
    }

    pub fn predecessors(&self, id: ContId) -> &[ContId] {
        self.predecessors.get(&id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// The continuation a value denotes, if it is the result of a
    /// `function_ref` primop — the only way a `ContId` is ever threaded
    /// through as a value (§4.7's "build a function-ref to `f`").
    pub fn as_function_ref(&self, value: ValueId) -> Option<ContId> {
        match self.values[value.0].kind {
            ValueKind::Result { primop } => match self.primops[primop.0].opcode {
                Opcode::FunctionRef(target) => Some(target),
                _ => None,
            },
            ValueKind::Parameter { .. } => None,
        }
    }

    fn successors_of(&self, terminator: &Terminator) -> Vec<ContId> {
        match terminator {
            Terminator::Apply { callee, .. } => self.as_function_ref(*callee).into_iter().collect(),
            Terminator::SwitchConstr { arms, default, .. } => arms
                .iter()
                .filter_map(|(_, v)| self.as_function_ref(*v))
                .chain(default.iter().filter_map(|v| self.as_function_ref(*v)))
                .collect(),
            Terminator::Unreachable => Vec::new(),
        }
    }

    /// Sets `cont`'s terminator, maintaining the predecessor index: detaches
    /// `cont` from its previous successors' predecessor lists (if any) and
    /// re-threads it onto the new terminator's successors. §8's "every
    /// successor edge is threaded into its target's predecessor list
    /// exactly once" holds as an invariant of always going through this
    /// method rather than mutating `continuation.terminator` directly.
    pub fn set_terminator(&mut self, cont: ContId, terminator: Terminator) {
        if let Some(old) = self.continuations[cont.0].terminator.take() {
            for succ in self.successors_of(&old) {
                if let Some(preds) = self.predecessors.get_mut(&succ) {
                    preds.retain(|&p| p != cont);
                }
            }
        }
        for succ in self.successors_of(&terminator) {
            self.predecessors.entry(succ).or_default().push(cont);
        }
        self.record_uses_in_terminator(cont, &terminator);
        self.continuations[cont.0].terminator = Some(terminator);
    }

    fn record_uses_in_terminator(&mut self, cont: ContId, terminator: &Terminator) {
        match terminator {
            Terminator::Apply { callee, args, .. } => {
                self.add_use(*callee, UseSite::ApplyCallee { cont });
                for (i, a) in args.iter().enumerate() {
                    self.add_use(*a, UseSite::ApplyArg { cont, arg_index: i });
                }
            }
            Terminator::SwitchConstr { scrutinee, arms, default, .. } => {
                self.add_use(*scrutinee, UseSite::SwitchScrutinee { cont });
                for (i, (_, v)) in arms.iter().enumerate() {
                    self.add_use(*v, UseSite::SwitchArm { cont, arm_index: i });
                }
                if let Some(d) = default {
                    self.add_use(*d, UseSite::SwitchArm { cont, arm_index: arms.len() });
                }
            }
            Terminator::Unreachable => {}
        }
    }

    // Values
    //
    //

    pub fn new_parameter(&mut self, cont: ContId, ty: Rc<GirType>) -> ValueId {
        let id = ValueId(self.values.len());
        let index = self.continuations[cont.0].params.len();
        self.values.push(Value::new(id, ty, ValueKind::Parameter { cont, index }));
        self.continuations[cont.0].params.push(id);
        id
    }

    pub fn value(&self, id: ValueId) -> &Value {
        &self.values[id.0]
    }

    fn add_use(&mut self, value: ValueId, site: UseSite) {
        self.values[value.0].uses.push(site);
    }

    /// Rewrites every recorded use of `old` to refer to `new` instead,
    /// splicing `old`'s use list onto `new`'s (§9's translation of
    /// `replaceAllUsesWith`). Used by the recursive-apply optimization
    /// (§3's "continuations can be removed") when a synthesized return
    /// continuation for a self-call is dropped in favor of the function's
    /// own.
    pub fn replace_all_uses_with(&mut self, old: ValueId, new: ValueId) {
        let uses = std::mem::take(&mut self.values[old.0].uses);
        for site in &uses {
            match *site {
                UseSite::PrimOpOperand { primop, operand_index } => {
                    self.primops[primop.0].operands[operand_index] = new;
                }
                UseSite::ApplyCallee { cont } => {
                    if let Some(Terminator::Apply { callee, .. }) = &mut self.continuations[cont.0].terminator {
                        *callee = new;
                    }
                }
                UseSite::ApplyArg { cont, arg_index } => {
                    if let Some(Terminator::Apply { args, .. }) = &mut self.continuations[cont.0].terminator {
                        args[arg_index] = new;
                    }
                }
                UseSite::SwitchScrutinee { cont } => {
                    if let Some(Terminator::SwitchConstr { scrutinee, .. }) = &mut self.continuations[cont.0].terminator {
                        *scrutinee = new;
                    }
                }
                UseSite::SwitchArm { cont, arm_index } => {
                    if let Some(Terminator::SwitchConstr { arms, default, .. }) = &mut self.continuations[cont.0].terminator {
                        if arm_index < arms.len() {
                            arms[arm_index].1 = new;
                        } else if let Some(d) = default {
                            *d = new;
                        }
                    }
                }
            }
        }
        self.values[new.0].uses.extend(uses);
    }

    /// Detaches and discards a continuation that turned out to be
    /// unreachable after an optimization (the recursive-apply case, §3).
    /// Leaves a hole in the arena (indices are never reused) rather than
    /// shifting every later id.
    pub fn remove_continuation(&mut self, id: ContId) {
        if let Some(old) = self.continuations[id.0].terminator.take() {
            for succ in self.successors_of(&old) {
                if let Some(preds) = self.predecessors.get_mut(&succ) {
                    preds.retain(|&p| p != id);
                }
            }
        }
        self.predecessors.remove(&id);
    }

    // PrimOps
    //
    //

    pub fn push_primop(&mut self, cont: ContId, opcode: Opcode, operands: Vec<ValueId>, result_ty: Option<Rc<GirType>>) -> Option<ValueId> {
        let id = PrimOpId(self.primops.len());
        for (i, op) in operands.iter().enumerate() {
            self.add_use(*op, UseSite::PrimOpOperand { primop: id, operand_index: i });
        }
        let result = if opcode.has_result() {
            let ty = result_ty.clone().expect("primop with a result must carry a result type");
            let vid = ValueId(self.values.len());
            self.values.push(Value::new(vid, ty, ValueKind::Result { primop: id }));
            Some(vid)
        } else {
            None
        };
        self.primops.push(PrimOp { id, cont, opcode, operands, result, result_ty });
        self.continuations[cont.0].body.push(id);
        result
    }

    pub fn primop(&self, id: PrimOpId) -> &PrimOp {
        &self.primops[id.0]
    }
}
