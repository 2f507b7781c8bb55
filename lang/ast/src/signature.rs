//! §4.2: the process-wide, append-mostly global store. One type-checking
//! job owns exactly one `Signature`; it is not `Sync` and makes no attempt
//! to be — §5 calls this out as the one shared mutable store threaded
//! through every phase under exclusive access.

use std::rc::Rc;

use fxhash::FxHashMap;
use log::trace;

use crate::clause::FunctionBody;
use crate::context::{telescope_to_pi, Contextual, Telescope};
use crate::ident::{MetaVar, QualName};
use crate::span::Span;
use crate::error::SignatureError;
use crate::term::Term;

/// One global definition. Mirrors the taxonomy of §3's "Definition kinds".
#[derive(Debug, Clone)]
pub enum Definition {
    Postulate { ty: Contextual<Rc<Term>> },
    Data { ty: Telescope, constructors: Vec<QualName> },
    Record { con_name: QualName, ty: Telescope, projections: Vec<QualName> },
    Function { ty: Contextual<Rc<Term>>, body: FunctionBody },
    DataConstructor { parent: QualName, arity: usize, ty: Contextual<Rc<Term>> },
    /// `field_idx` is this projection's position in the record's single
    /// constructor's field telescope.
    Projection { field_idx: usize, parent: QualName, ty: Contextual<Rc<Term>> },
    Module { inside: Vec<QualName> },
}

/// The solution of a solved metavariable: a body that must be wrapped in
/// exactly `arity` lambdas to be used as a closed term.
#[derive(Debug, Clone)]
pub struct MetaBinding {
    pub arity: usize,
    pub body: Rc<Term>,
}

impl MetaBinding {
    /// Wraps `body` in `arity` lambdas, producing a term usable in place of
    /// any application of the meta to `arity` arguments (WHNF's "internalize
    /// the binding" step, §4.1).
    pub fn internalize(&self) -> Rc<Term> {
        let mut acc = self.body.clone();
        for _ in 0..self.arity {
            acc = Rc::new(Term::Lambda { span: None, name: "_".to_owned(), body: acc });
        }
        acc
    }
}

#[derive(Debug, Clone)]
pub struct MetaRow {
    pub ty: Rc<Term>,
    pub origin: Option<Span>,
    pub binding: Option<MetaBinding>,
}

#[derive(Debug, Default)]
pub struct Signature {
    definitions: FxHashMap<QualName, Definition>,
    /// preserves declaration order for deterministic module iteration.
    order: Vec<QualName>,
    metas: Vec<MetaRow>,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert_new(&mut self, name: QualName, def: Definition) -> Result<(), SignatureError> {
        if self.definitions.contains_key(&name) {
            return Err(SignatureError::DuplicateName { name: name.0 });
        }
        self.order.push(name.clone());
        self.definitions.insert(name, def);
        Ok(())
    }

    pub fn add_data(&mut self, name: QualName, tel: Telescope) -> Result<(), SignatureError> {
        trace!("Signature::add_data({name})");
        self.insert_new(name, Definition::Data { ty: tel, constructors: Vec::new() })
    }

    pub fn add_record(&mut self, name: QualName, con_name: QualName, tel: Telescope) -> Result<(), SignatureError> {
        trace!("Signature::add_record({name})");
        self.insert_new(name, Definition::Record { con_name, ty: tel, projections: Vec::new() })
    }

    pub fn add_constructor(
        &mut self,
        c: QualName,
        parent: QualName,
        arity: usize,
        ctx_type: Contextual<Rc<Term>>,
    ) -> Result<(), SignatureError> {
        trace!("Signature::add_constructor({c}, parent = {parent})");
        match self.definitions.get_mut(&parent) {
            Some(Definition::Data { constructors, .. }) => constructors.push(c.clone()),
            Some(Definition::Record { .. }) => {}
            _ => return Err(SignatureError::NotDataOrRecord { name: parent.0 }),
        }
        self.insert_new(c, Definition::DataConstructor { parent, arity, ty: ctx_type })
    }

    pub fn add_projection(
        &mut self,
        f: QualName,
        idx: usize,
        parent: QualName,
        ctx_type: Contextual<Rc<Term>>,
    ) -> Result<(), SignatureError> {
        trace!("Signature::add_projection({f}, parent = {parent})");
        match self.definitions.get_mut(&parent) {
            Some(Definition::Record { projections, .. }) => projections.push(f.clone()),
            _ => return Err(SignatureError::NotRecord { name: parent.0 }),
        }
        self.insert_new(f, Definition::Projection { field_idx: idx, parent, ty: ctx_type })
    }

    pub fn add_postulate(&mut self, name: QualName, ty: Contextual<Rc<Term>>) -> Result<(), SignatureError> {
        trace!("Signature::add_postulate({name})");
        self.insert_new(name, Definition::Postulate { ty })
    }

    pub fn add_ascription(&mut self, name: QualName, ty: Contextual<Rc<Term>>) -> Result<(), SignatureError> {
        trace!("Signature::add_ascription({name})");
        self.insert_new(name, Definition::Function { ty, body: FunctionBody::Open })
    }

    pub fn add_module(&mut self, name: QualName, inside: Vec<QualName>) -> Result<(), SignatureError> {
        self.insert_new(name, Definition::Module { inside })
    }

    /// Replaces an open function's body with its checked clauses and
    /// invertibility classification. Fatal if `name` does not name a
    /// currently-open function — per §4.2, "replacing non-open ⇒ fatal".
    pub fn add_function_clauses(
        &mut self,
        name: &QualName,
        body: FunctionBody,
    ) -> Result<(), SignatureError> {
        trace!("Signature::add_function_clauses({name})");
        match self.definitions.get_mut(name) {
            Some(Definition::Function { body: slot @ FunctionBody::Open, .. }) => {
                *slot = body;
                Ok(())
            }
            Some(Definition::Function { .. }) => {
                Err(SignatureError::ReplacingClosedFunction { name: name.0.clone() })
            }
            _ => Err(SignatureError::UnboundName { name: name.0.clone() }),
        }
    }

    /// Overwrites an already-checked function's body in place, for the
    /// driver's post-check zonking pass (§7's "zonk, or name the first
    /// metavariable still blocking it") — unlike `add_function_clauses`,
    /// this does not require the previous body to be `Open`.
    pub fn set_function_body(&mut self, name: &QualName, body: FunctionBody) -> Result<(), SignatureError> {
        match self.definitions.get_mut(name) {
            Some(Definition::Function { body: slot, .. }) => {
                *slot = body;
                Ok(())
            }
            _ => Err(SignatureError::UnboundName { name: name.0.clone() }),
        }
    }

    pub fn lookup_definition(&self, name: &QualName) -> Option<&Definition> {
        self.definitions.get(name)
    }

    pub fn iter_in_order(&self) -> impl Iterator<Item = (&QualName, &Definition)> {
        self.order.iter().map(move |n| (n, &self.definitions[n]))
    }

    /// The contextual type of any top-level name that can appear opened in
    /// an [`crate::term::Opened`]. Data and record types have no separate
    /// ascription in source, so their contextual type is synthesized as
    /// their parameter telescope with `Type` as the result.
    pub fn ctx_type(&self, name: &QualName) -> Option<Contextual<Rc<Term>>> {
        match self.lookup_definition(name)? {
            Definition::Postulate { ty } => Some(ty.clone()),
            Definition::Function { ty, .. } => Some(ty.clone()),
            Definition::DataConstructor { ty, .. } => Some(ty.clone()),
            Definition::Projection { ty, .. } => Some(ty.clone()),
            Definition::Data { ty, .. } => {
                Some(Contextual::new(ty.clone(), Rc::new(Term::Type { span: None })))
            }
            Definition::Record { ty, .. } => {
                Some(Contextual::new(ty.clone(), Rc::new(Term::Type { span: None })))
            }
            Definition::Module { .. } => None,
        }
    }

    /// The contextual type of an opened reference, folded to a plain Π
    /// chain, convenient at call sites that just want a TT type to check
    /// against rather than a telescope to walk.
    pub fn opened_type(&self, name: &QualName) -> Option<Rc<Term>> {
        let ctxty = self.ctx_type(name)?;
        Some(telescope_to_pi(&ctxty.telescope, ctxty.inside))
    }

    // Metavariables
    //
    //

    pub fn add_meta(&mut self, ty: Rc<Term>, origin: Option<Span>) -> MetaVar {
        let id = MetaVar(self.metas.len());
        trace!("Signature::add_meta -> {id}");
        self.metas.push(MetaRow { ty, origin, binding: None });
        id
    }

    /// Binds `m` to `binding`. Fatal if `m` does not exist or is already
    /// bound — binding is monotonic, nothing ever unbinds (§3 invariants).
    pub fn instantiate_meta(&mut self, m: MetaVar, binding: MetaBinding) -> Result<(), SignatureError> {
        let row = self.metas.get_mut(m.0).ok_or(SignatureError::UnboundMeta { meta: m })?;
        if row.binding.is_some() {
            return Err(SignatureError::MetaAlreadyBound { meta: m });
        }
        trace!("Signature::instantiate_meta({m}) := {:?}", binding.body);
        row.binding = Some(binding);
        Ok(())
    }

    pub fn lookup_meta_type(&self, m: MetaVar) -> Option<Rc<Term>> {
        self.metas.get(m.0).map(|r| r.ty.clone())
    }

    pub fn lookup_meta_binding(&self, m: MetaVar) -> Option<&MetaBinding> {
        self.metas.get(m.0).and_then(|r| r.binding.as_ref())
    }

    pub fn lookup_meta_origin(&self, m: MetaVar) -> Option<Span> {
        self.metas.get(m.0).and_then(|r| r.origin)
    }

    /// All metas still unbound once the solver has reached fixpoint; §7's
    /// "unsolved metas" end state.
    pub fn unsolved_metas(&self) -> Vec<MetaVar> {
        self.metas
            .iter()
            .enumerate()
            .filter(|(_, row)| row.binding.is_none())
            .map(|(i, _)| MetaVar(i))
            .collect()
    }
}
