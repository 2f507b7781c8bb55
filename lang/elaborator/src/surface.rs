//! §6's "input to the core": the Declared Module tree a scope-checking
//! frontend is assumed to have already produced. No lexer, parser, or
//! layout algorithm lives in this crate — those are the frontend's job.

use ast::{QualName, Span};

/// A surface-level telescope entry: `(x : A)` in source form, not yet
/// elaborated to TT.
#[derive(Debug, Clone)]
pub struct SurfaceParam {
    pub name: String,
    pub ty: Expr,
}

#[derive(Debug, Clone, Default)]
pub struct SurfaceTelescope {
    pub params: Vec<SurfaceParam>,
}

/// A surface eliminator, mirroring TT's `Elim` before name resolution has
/// turned a field reference into an opened projection.
#[derive(Debug, Clone)]
pub enum Elim {
    ApplyArg(Expr),
    Project(String),
}

#[derive(Debug, Clone)]
pub enum Expr {
    Type { span: Option<Span> },
    Meta { span: Option<Span> },
    Pi { span: Option<Span>, name: String, dom: Box<Expr>, cod: Box<Expr> },
    Arrow { span: Option<Span>, dom: Box<Expr>, cod: Box<Expr> },
    Lambda { span: Option<Span>, name: String, body: Box<Expr> },
    Equal { span: Option<Span>, ty: Option<Box<Expr>>, lhs: Box<Expr>, rhs: Box<Expr> },
    Refl { span: Option<Span> },
    Constructor { span: Option<Span>, name: QualName, args: Vec<Expr> },
    Apply { span: Option<Span>, head: String, elims: Vec<Elim> },
    Let { span: Option<Span>, name: String, bound: Box<Expr>, body: Box<Expr> },
}

impl Expr {
    pub fn span(&self) -> Option<Span> {
        match self {
            Expr::Type { span }
            | Expr::Meta { span }
            | Expr::Pi { span, .. }
            | Expr::Arrow { span, .. }
            | Expr::Lambda { span, .. }
            | Expr::Equal { span, .. }
            | Expr::Refl { span }
            | Expr::Constructor { span, .. }
            | Expr::Apply { span, .. }
            | Expr::Let { span, .. } => *span,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SurfaceClause {
    pub patterns: Vec<ast::Pattern>,
    pub body: Option<Expr>,
}

#[derive(Debug, Clone)]
pub enum Decl {
    DataSig { name: QualName, params: SurfaceTelescope },
    DataBody { name: QualName, constructors: Vec<(QualName, SurfaceTelescope, Expr)> },
    RecordSig { name: QualName, params: SurfaceTelescope },
    RecordBody { name: QualName, con_name: QualName, fields: Vec<(String, Expr)> },
    Postulate { name: QualName, ty: Expr },
    Ascription { name: QualName, ty: Expr },
    Function { name: QualName, clauses: Vec<SurfaceClause> },
    Module(Module),
}

#[derive(Debug, Clone)]
pub struct Module {
    pub name: QualName,
    pub params: SurfaceTelescope,
    pub decls: Vec<Decl>,
}

/// The kind of a structured diagnostic, matching §7's error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    Structural,
    UnificationFailure,
    UnsolvedMeta,
    PatternMatchFailure,
    LoweringFailure,
}

/// A structured message: kind, primary range, optional notes. The core
/// never renders a diagnostic itself — it only ever produces these and
/// hands them to whatever sink the driver wires up (§6).
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub primary: Option<Span>,
    pub message: String,
    pub notes: Vec<String>,
}

/// The collaborator interface §6 calls "a diagnostics sink that accepts
/// structured messages". The core depends only on this trait, never on a
/// concrete renderer.
pub trait DiagnosticsSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

/// A sink that just remembers every diagnostic it was given, for tests and
/// for callers that want to inspect the whole batch at the end of a run.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub diagnostics: Vec<Diagnostic>,
}

impl DiagnosticsSink for CollectingSink {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }
}
