use std::rc::Rc;

use printer::tokens::{ABSURD, FAT_ARROW};
use printer::util::print_comma_separated;
use printer::{Alloc, Builder, DocAllocator, Print, PrintCfg};

use crate::ident::QualName;
use crate::term::Term;

/// A clause pattern, as checked against an evolving Π type (§4.5).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    Var(String),
    Absurd,
    Constructor { name: QualName, args: Vec<Pattern> },
}

impl Pattern {
    pub fn is_var_like(&self) -> bool {
        matches!(self, Pattern::Var(_) | Pattern::Absurd)
    }
}

impl Print for Pattern {
    fn print<'a>(&'a self, cfg: &PrintCfg, alloc: &'a Alloc<'a>) -> Builder<'a> {
        match self {
            Pattern::Var(name) => alloc.text(name.clone()),
            Pattern::Absurd => alloc.keyword(ABSURD),
            Pattern::Constructor { name, args } => {
                let head = alloc.ctor(&name.0);
                if args.is_empty() {
                    head
                } else {
                    head.append("(").append(print_comma_separated(args, cfg, alloc)).append(")")
                }
            }
        }
    }
}

use printer::theme::ThemeExt;

/// `(pattern-vector, body?)`. `body == None` denotes an absurd clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub patterns: Vec<Pattern>,
    pub body: Option<Rc<Term>>,
}

impl Print for Clause {
    fn print<'a>(&'a self, cfg: &PrintCfg, alloc: &'a Alloc<'a>) -> Builder<'a> {
        let patterns = print_comma_separated(&self.patterns, cfg, alloc);
        match &self.body {
            Some(body) => patterns.append(" ").append(FAT_ARROW).append(" ").append(body.print(cfg, alloc)),
            None => patterns.append(" ").append(FAT_ARROW).append(" ").append(alloc.keyword(ABSURD)),
        }
    }
}

/// Classification of a function's invertibility, computed once per function
/// after all of its clauses are checked (§4.4.4) and consulted by WHNF to
/// decide whether to unfold it aggressively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invertibility {
    Invertible,
    NotInvertible,
}

/// A function body: either still open (clauses not yet checked/classified)
/// or finalized with its invertibility classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FunctionBody {
    Open,
    Checked { invertibility: Invertibility, clauses: Vec<Clause> },
}
