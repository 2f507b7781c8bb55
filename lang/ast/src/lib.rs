//! The core type theory (TT): locally-nameless terms, the five-primitive
//! substitution calculus, weak head normal form, eta, and the global
//! signature that every later phase of the pipeline reads and mutates.

pub mod clause;
pub mod context;
pub mod error;
pub mod eta;
pub mod ident;
pub mod signature;
pub mod span;
pub mod subst;
pub mod term;
pub mod whnf;
pub mod zonk;

pub use clause::{Clause, FunctionBody, Invertibility, Pattern};
pub use context::{Contextual, Environment, Scope, Telescope, TelescopeEntry};
pub use error::{SignatureError, StrengthenError, UnsolvedMeta};
pub use eta::{eta_contract, eta_expand};
pub use ident::{Idx, MetaVar, QualName};
pub use signature::{Definition, MetaBinding, Signature};
pub use span::{HasSpan, Span};
pub use subst::{apply_subst, eliminate, lookup, weaken_term, Subst};
pub use term::{Elim, Head, Opened, Term, Var};
pub use whnf::{whnf, Blocked};
pub use zonk::{zonk, zonk_clauses, zonk_function_body, ZonkError};
