use std::rc::Rc;

use printer::tokens::{ARROW, COLON};
use printer::{Alloc, Builder, DocAllocator, Print, PrintCfg};

use crate::term::Term;

/// One entry of a telescope: later entries' types may reference earlier
/// ones via de Bruijn index, counting from the innermost (most recently
/// pushed) entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelescopeEntry {
    pub name: String,
    pub ty: Rc<Term>,
}

/// An ordered sequence of typed bindings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Telescope {
    pub entries: Vec<TelescopeEntry>,
}

impl Telescope {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push(&mut self, name: impl Into<String>, ty: Rc<Term>) {
        self.entries.push(TelescopeEntry { name: name.into(), ty });
    }
}

impl Print for Telescope {
    fn print<'a>(&'a self, cfg: &PrintCfg, alloc: &'a Alloc<'a>) -> Builder<'a> {
        alloc.intersperse(
            self.entries.iter().map(|e| {
                alloc
                    .text("(")
                    .append(e.name.clone())
                    .append(COLON)
                    .append(alloc.space())
                    .append(e.ty.print(cfg, alloc))
                    .append(")")
            }),
            alloc.space(),
        )
    }
}

/// A pair `(telescope, inside)`: `inside` is well-formed under `telescope`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contextual<T> {
    pub telescope: Telescope,
    pub inside: T,
}

impl<T> Contextual<T> {
    pub fn new(telescope: Telescope, inside: T) -> Self {
        Contextual { telescope, inside }
    }
}

/// The codomain-arrow form of a contextual type, `Π telescope. inside`,
/// folded into a single TT `Pi` chain. Used whenever a contextual type must
/// be treated as an ordinary TT term (e.g. an opened constructor's type).
pub fn telescope_to_pi(telescope: &Telescope, result: Rc<Term>) -> Rc<Term> {
    let mut acc = result;
    for entry in telescope.entries.iter().rev() {
        acc = Rc::new(Term::Pi {
            span: None,
            name: entry.name.clone(),
            dom: entry.ty.clone(),
            cod: acc,
        });
    }
    acc
}

impl<T: Print> Print for Contextual<T> {
    fn print<'a>(&'a self, cfg: &PrintCfg, alloc: &'a Alloc<'a>) -> Builder<'a> {
        if self.telescope.is_empty() {
            self.inside.print(cfg, alloc)
        } else {
            self.telescope
                .print(cfg, alloc)
                .append(alloc.space())
                .append(ARROW)
                .append(alloc.space())
                .append(self.inside.print(cfg, alloc))
        }
    }
}

/// One scope of the [`Environment`]: an ordered context plus the arguments
/// an opened definition was instantiated with at this scope (used by the
/// checker to keep track of which telescope entries came from opening a
/// parent data/record declaration).
#[derive(Debug, Clone, Default)]
pub struct Scope {
    pub context: Telescope,
    pub opened_args: Vec<Rc<Term>>,
}

/// A stack of scopes. Concatenating scopes innermost-first gives the
/// current context; indices count from the innermost binding of the
/// innermost scope.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    pub scopes: Vec<Scope>,
}

impl Environment {
    pub fn push_scope(&mut self, scope: Scope) {
        self.scopes.push(scope);
    }

    pub fn pop_scope(&mut self) -> Option<Scope> {
        self.scopes.pop()
    }

    pub fn len(&self) -> usize {
        self.scopes.iter().map(|s| s.context.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The type bound at de Bruijn index `idx`, counting from the innermost
    /// entry of the innermost scope across all scopes.
    pub fn lookup(&self, idx: crate::ident::Idx) -> Option<Rc<Term>> {
        let mut remaining = idx.0;
        for scope in self.scopes.iter().rev() {
            let n = scope.context.len();
            if remaining < n {
                return Some(scope.context.entries[n - 1 - remaining].ty.clone());
            }
            remaining -= n;
        }
        None
    }

    /// The de Bruijn index of the innermost binder named `name`, if any.
    /// Used to resolve an unresolved surface-level variable reference
    /// against the local context before falling back to the signature.
    pub fn lookup_by_name(&self, name: &str) -> Option<crate::ident::Idx> {
        let mut idx = 0usize;
        for scope in self.scopes.iter().rev() {
            for entry in scope.context.entries.iter().rev() {
                if entry.name == name {
                    return Some(crate::ident::Idx(idx));
                }
                idx += 1;
            }
        }
        None
    }

    pub fn push_binder(&mut self, name: impl Into<String>, ty: Rc<Term>) {
        if self.scopes.is_empty() {
            self.scopes.push(Scope::default());
        }
        self.scopes.last_mut().unwrap().context.push(name, ty);
    }

    pub fn pop_binder(&mut self) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.context.entries.pop();
        }
    }
}
