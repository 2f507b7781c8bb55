//! The graph IR (GIR): §3's CPS-based intermediate representation between
//! the checker's TT terms and a backend. A [`Module`] owns every
//! continuation, primop, and value in arenas addressed by small `Copy`
//! handles (§9's cyclic-graph translation); `generator::generate_module`
//! builds one from a checked, zonked [`ast::Signature`] by compiling each
//! function's clauses with `pattern_matrix` and emitting its body through
//! `builder::Builder`.

pub mod builder;
pub mod cleanup;
pub mod continuation;
pub mod error;
pub mod generator;
pub mod graph;
pub mod ident;
pub mod module;
pub mod pattern_matrix;
pub mod primop;
pub mod print;
pub mod terminator;
pub mod value;

pub use builder::Builder;
pub use cleanup::{Cleanup, CleanupStack, Mark};
pub use continuation::Continuation;
pub use error::GirError;
pub use generator::generate_module;
pub use ident::{ContId, PrimOpId, ValueId};
pub use module::Module;
pub use pattern_matrix::{BindingSlot, CompiledMatrix, DecisionTree, Occurrence};
pub use primop::{Opcode, PrimOp};
pub use terminator::Terminator;
pub use value::{UseSite, Value, ValueKind};
