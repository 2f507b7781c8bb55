use std::rc::Rc;

use derivative::Derivative;
use pretty::DocAllocator;
use printer::theme::ThemeExt;
use printer::tokens::*;
use printer::util::print_comma_separated;
use printer::{Alloc, Builder, Print, PrintCfg};

use crate::ident::{Idx, MetaVar, QualName};
use crate::span::{HasSpan, Span};

/// A global reference instantiated at its use site: the telescope of
/// parameters of the referenced definition filled in by explicit arguments.
/// Invariant: `args.len()` equals the arity of `name`'s parameter telescope
/// at every occurrence (checked once, at construction, never re-verified).
#[derive(Debug, Clone, Derivative)]
#[derivative(PartialEq, Eq, Hash)]
pub struct Opened {
    pub name: QualName,
    pub args: Vec<Rc<Term>>,
}

impl Opened {
    pub fn new(name: impl Into<QualName>, args: Vec<Rc<Term>>) -> Self {
        Opened { name: name.into(), args }
    }
}

/// A local variable occurrence. `name` is purely cosmetic; `idx` is what
/// equality and substitution actually look at.
#[derive(Debug, Clone, Derivative)]
#[derivative(PartialEq, Eq, Hash)]
pub struct Var {
    #[derivative(PartialEq = "ignore", Hash = "ignore")]
    pub span: Option<Span>,
    #[derivative(PartialEq = "ignore", Hash = "ignore")]
    pub name: String,
    pub idx: Idx,
}

/// The head of an application spine.
#[derive(Debug, Clone, Derivative)]
#[derivative(PartialEq, Eq, Hash)]
pub enum Head {
    Var(Var),
    Def(Opened),
    Meta(MetaVar),
}

/// One step of an elimination spine.
#[derive(Debug, Clone, Derivative)]
#[derivative(PartialEq, Eq, Hash)]
pub enum Elim {
    ApplyArg(Rc<Term>),
    /// A record projection: the opened reference to the projection
    /// definition (its parent record type's parameters as args) together
    /// with the projection's field index within the record's constructor.
    Project(Opened, usize),
}

impl Elim {
    pub fn span(&self) -> Option<Span> {
        match self {
            Elim::ApplyArg(t) => t.span(),
            Elim::Project(..) => None,
        }
    }
}

/// The core type theory. Locally nameless: binders carry a cosmetic name
/// only for printing, de Bruijn indices are authoritative.
///
/// Deep syntactic equality is structural `PartialEq`/`Eq` with spans and
/// cosmetic variable names excluded (see the `Derivative` attributes on the
/// leaves). Two terms differing only in how a hole or a binder is named
/// still compare equal, matching alpha-equivalence via index equality.
#[derive(Debug, Clone, Derivative)]
#[derivative(PartialEq, Eq, Hash)]
pub enum Term {
    Type {
        #[derivative(PartialEq = "ignore", Hash = "ignore")]
        span: Option<Span>,
    },
    Pi {
        #[derivative(PartialEq = "ignore", Hash = "ignore")]
        span: Option<Span>,
        #[derivative(PartialEq = "ignore", Hash = "ignore")]
        name: String,
        dom: Rc<Term>,
        cod: Rc<Term>,
    },
    Lambda {
        #[derivative(PartialEq = "ignore", Hash = "ignore")]
        span: Option<Span>,
        #[derivative(PartialEq = "ignore", Hash = "ignore")]
        name: String,
        body: Rc<Term>,
    },
    Equal {
        #[derivative(PartialEq = "ignore", Hash = "ignore")]
        span: Option<Span>,
        ty: Rc<Term>,
        lhs: Rc<Term>,
        rhs: Rc<Term>,
    },
    Refl {
        #[derivative(PartialEq = "ignore", Hash = "ignore")]
        span: Option<Span>,
    },
    Constructor {
        #[derivative(PartialEq = "ignore", Hash = "ignore")]
        span: Option<Span>,
        ctor: Opened,
        args: Vec<Rc<Term>>,
    },
    Apply {
        #[derivative(PartialEq = "ignore", Hash = "ignore")]
        span: Option<Span>,
        head: Head,
        elims: Vec<Elim>,
    },
}

impl Term {
    pub fn var(idx: Idx) -> Term {
        Term::Apply { span: None, head: Head::Var(Var { span: None, name: String::new(), idx }), elims: vec![] }
    }

    pub fn var_named(idx: Idx, name: impl Into<String>) -> Term {
        Term::Apply {
            span: None,
            head: Head::Var(Var { span: None, name: name.into(), idx }),
            elims: vec![],
        }
    }

    pub fn meta(m: MetaVar) -> Term {
        Term::Apply { span: None, head: Head::Meta(m), elims: vec![] }
    }

    pub fn meta_applied(m: MetaVar, spine: Vec<Rc<Term>>) -> Term {
        Term::Apply {
            span: None,
            head: Head::Meta(m),
            elims: spine.into_iter().map(Elim::ApplyArg).collect(),
        }
    }

    pub fn def(name: impl Into<QualName>, args: Vec<Rc<Term>>) -> Term {
        Term::Apply { span: None, head: Head::Def(Opened::new(name, args)), elims: vec![] }
    }

    /// The idx of the variable at this term, if it is a bare variable
    /// occurrence with no eliminators — used by inversion (§4.4.2) and the
    /// `Instantiate t ∘ Lift 1 σ = σ` substitution-smart-constructor law.
    pub fn as_bare_var(&self) -> Option<Idx> {
        match self {
            Term::Apply { head: Head::Var(v), elims, .. } if elims.is_empty() => Some(v.idx),
            _ => None,
        }
    }

    pub fn non_dependent_pi(dom: Rc<Term>, cod: Rc<Term>) -> Term {
        Term::Pi { span: None, name: "_".to_owned(), dom, cod }
    }

    /// The head of the outermost application, if this term is of `Apply` shape.
    pub fn head(&self) -> Option<&Head> {
        match self {
            Term::Apply { head, .. } => Some(head),
            _ => None,
        }
    }
}

impl HasSpan for Term {
    fn span(&self) -> Option<Span> {
        match self {
            Term::Type { span }
            | Term::Pi { span, .. }
            | Term::Lambda { span, .. }
            | Term::Equal { span, .. }
            | Term::Refl { span }
            | Term::Constructor { span, .. }
            | Term::Apply { span, .. } => *span,
        }
    }
}

// Printing
//
//

impl Print for Term {
    fn print<'a>(&'a self, cfg: &PrintCfg, alloc: &'a Alloc<'a>) -> Builder<'a> {
        match self {
            Term::Type { .. } => alloc.typ(TYPE),
            Term::Pi { name, dom, cod, .. } => alloc
                .text(LPAREN)
                .append(name.clone())
                .append(COLON)
                .append(alloc.space())
                .append(dom.print(cfg, alloc))
                .append(RPAREN)
                .append(alloc.space())
                .append(ARROW)
                .append(alloc.space())
                .append(cod.print(cfg, alloc)),
            Term::Lambda { name, body, .. } => alloc
                .text(LAMBDA)
                .append(name.clone())
                .append(DOT)
                .append(alloc.space())
                .append(body.print(cfg, alloc)),
            Term::Equal { ty, lhs, rhs, .. } => lhs
                .print(cfg, alloc)
                .append(alloc.space())
                .append("≡")
                .append(alloc.text("_"))
                .append(ty.print(cfg, alloc))
                .append(alloc.space())
                .append(rhs.print(cfg, alloc)),
            Term::Refl { .. } => alloc.keyword(REFL),
            Term::Constructor { ctor, args, .. } => {
                let doc = alloc.ctor(&ctor.name.0);
                if args.is_empty() {
                    doc
                } else {
                    doc.append(LPAREN).append(print_comma_separated(args, cfg, alloc)).append(RPAREN)
                }
            }
            Term::Apply { head, elims, .. } => {
                let mut doc = head.print(cfg, alloc);
                for elim in elims {
                    doc = match elim {
                        Elim::ApplyArg(arg) => {
                            doc.append(alloc.space()).append(arg.print(cfg, alloc))
                        }
                        Elim::Project(field, _) => doc.append(DOT).append(field.name.0.clone()),
                    };
                }
                doc
            }
        }
    }
}

impl Print for Head {
    fn print<'a>(&'a self, cfg: &PrintCfg, alloc: &'a Alloc<'a>) -> Builder<'a> {
        match self {
            Head::Var(v) => {
                if cfg.print_metavar_ids || !v.name.is_empty() {
                    alloc.text(if v.name.is_empty() { format!("@{}", v.idx) } else { v.name.clone() })
                } else {
                    alloc.text(format!("@{}", v.idx))
                }
            }
            Head::Def(opened) => {
                let doc = alloc.text(opened.name.0.clone());
                if opened.args.is_empty() || !cfg.print_metavar_args {
                    doc
                } else {
                    doc.append(LPAREN)
                        .append(print_comma_separated(&opened.args, cfg, alloc))
                        .append(RPAREN)
                }
            }
            Head::Meta(m) => alloc.text(format!("{QUESTION}{}", m.0)),
        }
    }
}
