use std::rc::Rc;

use ast::QualName;
use lowering::GirType;

use crate::ident::{ContId, PrimOpId, ValueId};

/// §6's grammar `opcode` production. Each variant carries exactly the
/// non-value data the primop needs beyond its operand list; the operand
/// list itself lives on [`PrimOp::operands`], not here, so
/// `replace_all_uses_with` has one place to rewrite regardless of opcode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Opcode {
    /// Stack-allocates a local of the result type; operands: none.
    Alloca,
    /// Deallocates an `alloca`'d address; operands: `[address]`; no result.
    Dealloca,
    /// Heap-allocates a box for the result's underlying type; operands: none.
    AllocBox,
    /// Releases a box's allocation; operands: `[box]`; no result.
    DeallocBox,
    /// Projects the address inside a box; operands: `[box]`.
    ProjectBox,
    /// Reads from an address. `take == true` consumes the address's value
    /// (no copy emitted by the caller); `take == false` is a borrowing load.
    Load { take: bool },
    /// Writes a value into an address; operands: `[value, address]`; no result.
    Store,
    /// Retains/copies an object-category value; operands: `[value]`.
    CopyValue,
    /// Releases an object-category value; operands: `[value]`; no result.
    DestroyValue,
    /// Copies the contents of one address into another; operands:
    /// `[src_address, dst_address]`; no result.
    CopyAddress,
    /// Destroys the value stored at an address in place; operands:
    /// `[address]`; no result.
    DestroyAddress,
    /// A reference to a continuation, usable as an `apply`/`switch_constr`
    /// operand or as a closure payload under `thicken`. Operands: none.
    FunctionRef(ContId),
    /// Builds a constructor value from its (already lowered, possibly
    /// boxed) payload tuple operand. Operands: `[payload_tuple]`.
    DataInit(QualName),
    /// Assembles a tuple from its element operands.
    Tuple,
    /// Projects the address of tuple element `index`. Operands: `[tuple_address]`.
    TupleElementAddress(usize),
    /// Wraps a function-typed value so it closes over its free variables;
    /// the GIR generator's translation of a TT `Lambda` (§4.7). Operands:
    /// `[function_ref]`.
    Thicken,
    /// A no-op ordering barrier pinning the effects of its operand before
    /// whatever follows (§4.7's "force_effects wrapper when ordering must
    /// be pinned relative to stores"). Operands: `[value]`.
    ForceEffects,
}

impl Opcode {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Opcode::Alloca => "alloca",
            Opcode::Dealloca => "dealloca",
            Opcode::AllocBox => "alloc_box",
            Opcode::DeallocBox => "dealloc_box",
            Opcode::ProjectBox => "project_box",
            Opcode::Load { take: true } => "load[take]",
            Opcode::Load { take: false } => "load[copy]",
            Opcode::Store => "store",
            Opcode::CopyValue => "copy_value",
            Opcode::DestroyValue => "destroy_value",
            Opcode::CopyAddress => "copy_address",
            Opcode::DestroyAddress => "destroy_address",
            Opcode::FunctionRef(_) => "function_ref",
            Opcode::DataInit(_) => "data_init",
            Opcode::Tuple => "tuple",
            Opcode::TupleElementAddress(_) => "tuple_element_address",
            Opcode::Thicken => "thicken",
            Opcode::ForceEffects => "force_effects",
        }
    }

    /// Whether this opcode produces a value. The handful of effecting-only
    /// ops (`store`, `dealloca`, `dealloc_box`, `destroy_value`,
    /// `destroy_address`) return `false`.
    pub fn has_result(&self) -> bool {
        !matches!(
            self,
            Opcode::Dealloca
                | Opcode::DeallocBox
                | Opcode::Store
                | Opcode::DestroyValue
                | Opcode::DestroyAddress
        )
    }
}

#[derive(Debug, Clone)]
pub struct PrimOp {
    pub id: PrimOpId,
    pub cont: ContId,
    pub opcode: Opcode,
    pub operands: Vec<ValueId>,
    pub result: Option<ValueId>,
    pub result_ty: Option<Rc<GirType>>,
}
