//! §4.3/§4.4/§4.5: bidirectional elaboration of surface syntax into TT,
//! the work-list unifier, and the module check phase that drives both
//! over a whole [`surface::Module`].

pub mod check;
pub mod elaborate;
pub mod error;
pub mod options;
pub mod solver;
pub mod surface;

pub use check::check_module;
pub use error::CheckError;
pub use options::{CheckOptions, ElabOptions};
pub use solver::{residue_origins, Constraint, Residue, Solver, UnifyError};
pub use surface::{CollectingSink, Decl, Diagnostic, DiagnosticKind, DiagnosticsSink, Expr, Module};
