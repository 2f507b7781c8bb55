//! §4.6: classifies every TT type the checker produced into a lowered GIR
//! type, with the three boolean facets (complete / trivial / address-only)
//! the GIR generator (the sibling `gir` crate) needs to decide how a value
//! of that type must be passed, copied, and destroyed.
//!
//! This crate owns the GIR *type* vocabulary (`GirType` and friends) rather
//! than the `gir` crate itself, specifically to avoid a dependency cycle:
//! the GIR generator needs lowered types to build continuation parameters,
//! so `gir` depends on `lowering`, not the reverse. `gir::Module` embeds
//! this crate's [`TypeTable`] as its type unique-table (§4.9's "the module
//! owns ... the type unique-tables"); see `DESIGN.md` for this crate-split
//! call, which is not one of spec.md's named open questions.

pub mod classify;
pub mod error;
pub mod print;
pub mod types;

pub use classify::{classify, classify_with, lower_function_type, ArchetypeEnv, LowerCtx};
pub use error::LoweringError;
pub use types::{BoxType, Category, GirType, Lowered, Parameterized, TypeTable};
