//! §4.6: the classifier itself. Walks a TT type, returns a [`Lowered`]
//! answer, and memoizes by TT type (to break cycles through recursive data
//! types) while also sharing structurally-equal answers via
//! [`TypeTable::intern`].

use std::rc::Rc;

use fxhash::FxHashMap;
use log::trace;

use ast::{apply_subst, whnf, Definition, HasSpan, Head, Idx, QualName, Signature, Subst, Telescope, Term};

use crate::error::LoweringError;
use crate::types::{BoxType, Category, GirType, Lowered, Parameterized, TypeTable};

/// Tracks which de Bruijn positions currently in scope are themselves
/// `Type`-sorted telescope entries — a function's own generic parameters —
/// so a later reference to one of them (e.g. `x : A` after `(A : Type)`)
/// lowers to [`Parameterized::Archetype`] rather than recursing into `A`'s
/// (nonexistent) definition.
#[derive(Debug, Clone, Default)]
pub struct ArchetypeEnv {
    /// Innermost-last; `Some(k)` marks the binder at that stack depth as
    /// archetype `k`.
    stack: Vec<Option<usize>>,
    next: usize,
}

impl ArchetypeEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes one binder. `is_type_level` should be `true` exactly when the
    /// binder's own domain is `Type` itself.
    pub fn push(&mut self, is_type_level: bool) -> Option<usize> {
        let slot = if is_type_level {
            let k = self.next;
            self.next += 1;
            Some(k)
        } else {
            None
        };
        self.stack.push(slot);
        slot
    }

    pub fn pop(&mut self) {
        self.stack.pop();
    }

    pub fn lookup(&self, idx: Idx) -> Option<usize> {
        if idx.0 >= self.stack.len() {
            return None;
        }
        self.stack[self.stack.len() - 1 - idx.0]
    }
}

#[derive(Debug, Clone)]
enum CacheState {
    InProgress,
    Done(Lowered),
}

/// One classification job's memo tables, living as long as the module
/// being lowered. `table` is the module's type unique-table (owned here by
/// reference so the `gir` crate's `Module` can hold the real one).
pub struct LowerCtx<'a> {
    pub sig: &'a Signature,
    pub table: &'a mut TypeTable,
    cache: FxHashMap<Rc<Term>, CacheState>,
    /// Constructor qualname -> its lowered payload tuple, populated as a
    /// side effect of lowering the data/record type that owns it. The GIR
    /// generator's `data_init` emission (§4.7) consults this directly
    /// rather than re-deriving it from the constructor's TT type.
    payloads: FxHashMap<QualName, Rc<GirType>>,
}

impl<'a> LowerCtx<'a> {
    pub fn new(sig: &'a Signature, table: &'a mut TypeTable) -> Self {
        LowerCtx { sig, table, cache: FxHashMap::default(), payloads: FxHashMap::default() }
    }

    pub fn constructor_payload(&self, ctor: &QualName) -> Option<Rc<GirType>> {
        self.payloads.get(ctor).cloned()
    }
}

/// Classifies a closed type with no archetype context — the common case
/// for a data/record's own parameter telescope entries and for any type
/// that isn't itself part of a generic function's signature.
pub fn classify(ctx: &mut LowerCtx, ty: &Rc<Term>) -> Result<Lowered, LoweringError> {
    classify_with(ctx, &ArchetypeEnv::new(), ty)
}

/// §4.6's classification proper, under an explicit archetype environment.
pub fn classify_with(ctx: &mut LowerCtx, archetypes: &ArchetypeEnv, ty: &Rc<Term>) -> Result<Lowered, LoweringError> {
    let reduced = whnf(ctx.sig, ty).into_term();
    match &*reduced {
        Term::Type { .. } => Ok(Lowered::address_only(GirType::Type)),

        Term::Pi { dom, cod, .. } => {
            let lowered_dom = classify_with(ctx, archetypes, dom)?;
            let dom_is_type = matches!(&*whnf(ctx.sig, dom).into_term(), Term::Type { .. });
            let mut inner = archetypes.clone();
            inner.push(dom_is_type);
            let lowered_cod = classify_with(ctx, &inner, cod)?;
            let gir_ty = ctx.table.intern(GirType::Function {
                args: vec![lowered_dom.ty.clone()],
                result: lowered_cod.ty.clone(),
            });
            Ok(Lowered { ty: gir_ty, complete: true, trivial: false, address_only: false })
        }

        // Propositional equality carries no runtime payload in this
        // reimplementation (a documented addition beyond the distilled
        // scope, see `DESIGN.md`): it lowers to the empty tuple.
        Term::Equal { .. } => Ok(Lowered::trivial_object(GirType::Tuple { elements: vec![], category: Category::Object })),

        Term::Refl { .. } | Term::Constructor { .. } | Term::Lambda { .. } => Err(LoweringError::unsupported(
            "a term that is not a type was asked to be lowered as one",
            reduced.span(),
        )),

        Term::Apply { head, elims, .. } => match head {
            Head::Var(v) if elims.is_empty() => match archetypes.lookup(v.idx) {
                Some(k) => Ok(Lowered {
                    ty: Rc::new(GirType::Parameterized(Parameterized::Archetype(k))),
                    complete: true,
                    trivial: false,
                    address_only: true,
                }),
                None => Err(LoweringError::unsupported(
                    format!("`{}` is a bound variable but not a generic type parameter of the enclosing function", v.name),
                    reduced.span(),
                )),
            },
            Head::Var(_) => Err(LoweringError::unsupported(
                "a type headed by a bound (non-generic) variable applied to arguments is outside the supported subset",
                reduced.span(),
            )),
            Head::Meta(_) => Err(LoweringError::unsupported(
                "an unresolved metavariable survived to lowering — the term should have been zonked first",
                reduced.span(),
            )),
            Head::Def(opened) => match ctx.sig.lookup_definition(&opened.name).cloned() {
                Some(Definition::Data { .. }) => classify_data(ctx, archetypes, &reduced, opened),
                Some(Definition::Record { .. }) => classify_record(ctx, archetypes, &reduced, opened),
                Some(Definition::Postulate { .. }) => Ok(Lowered {
                    ty: ctx.table.intern(GirType::Data {
                        name: opened.name.clone(),
                        indices: vec![],
                        constructors: vec![],
                        category: Category::Address,
                    }),
                    complete: true,
                    trivial: false,
                    address_only: true,
                }),
                _ => Err(LoweringError::unsupported(format!("`{}` does not name a type former", opened.name), reduced.span())),
            },
        },
    }
}

/// `Π telescope. _` instantiated by `args`, one per telescope entry in
/// order — mirrors `instantiate_telescope_with` in the checker, used here
/// to substitute a data/record's own parameters into a constructor's
/// stored type before walking its field telescope.
fn instantiate_with(tel: &Telescope, args: &[Rc<Term>]) -> Subst {
    let mut sigma = Subst::Id;
    for arg in tel.entries.iter().zip(args).map(|(_, a)| a) {
        sigma = Subst::instantiate(arg.clone(), sigma);
    }
    sigma
}

/// Walks a constructor's own field telescope (already a Π-chain ending in
/// its result type, with the parent's own parameters substituted in),
/// returning one lowered type per field. A field that recurses back into a
/// data/record type still being lowered comes back from [`classify_with`]
/// already wrapped in `GirType::Box(BoxType::Unresolved(_))` — the cache in
/// `classify_data`/`classify_record` below is what produces that answer, so
/// this function needn't special-case recursion itself.
fn lower_constructor_fields(
    ctx: &mut LowerCtx,
    archetypes: &ArchetypeEnv,
    arity: usize,
    mut cur: Rc<Term>,
) -> Result<(Vec<Rc<GirType>>, bool), LoweringError> {
    let mut fields = Vec::with_capacity(arity);
    let mut trivial = true;
    for _ in 0..arity {
        let reduced = whnf(ctx.sig, &cur).into_term();
        let Term::Pi { dom, cod, .. } = &*reduced else {
            return Err(LoweringError::unsupported(
                "constructor telescope ended before its declared arity",
                reduced.span(),
            ));
        };
        let field_lowered = classify_with(ctx, archetypes, dom)?;
        if !field_lowered.trivial {
            trivial = false;
        }
        let field_ty = if field_lowered.address_only && !matches!(&*field_lowered.ty, GirType::Box(_)) {
            trivial = false;
            Rc::new(GirType::Box(BoxType::Resolved(field_lowered.ty)))
        } else {
            field_lowered.ty
        };
        fields.push(field_ty);
        cur = cod.clone();
    }
    Ok((fields, trivial))
}

/// Recognizes `data Nat : Type where { zero : Nat ; suc : Nat -> Nat }`
/// shaped declarations (§4.6's "small peephole") — a non-indexed,
/// non-parameterized two-constructor type with one nullary and one
/// self-recursive-unary constructor — and classifies it as a trivial
/// singleton rather than threading it through the general boxed-recursion
/// path at all.
fn try_peano_peephole(
    ctx: &LowerCtx,
    data_tel: &Telescope,
    constructors: &[QualName],
    name: &QualName,
) -> Option<(QualName, QualName)> {
    if !data_tel.is_empty() || constructors.len() != 2 {
        return None;
    }
    let arities: Vec<(QualName, usize, Rc<Term>)> = constructors
        .iter()
        .map(|c| match ctx.sig.lookup_definition(c) {
            Some(Definition::DataConstructor { arity, ty, .. }) => Some((c.clone(), *arity, ty.inside.clone())),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;
    let zero = arities.iter().find(|(_, a, _)| *a == 0)?;
    let suc = arities.iter().find(|(_, a, _)| *a == 1)?;
    let Term::Pi { dom, .. } = &*suc.2 else { return None };
    let Term::Apply { head: Head::Def(o), elims, .. } = &**dom else { return None };
    if &o.name != name || !elims.is_empty() || !o.args.is_empty() {
        return None;
    }
    Some((zero.0.clone(), suc.0.clone()))
}

fn classify_data(
    ctx: &mut LowerCtx,
    archetypes: &ArchetypeEnv,
    whole: &Rc<Term>,
    opened: &ast::Opened,
) -> Result<Lowered, LoweringError> {
    if let Some(state) = ctx.cache.get(whole) {
        return Ok(match state {
            CacheState::Done(l) => l.clone(),
            CacheState::InProgress => Lowered {
                ty: Rc::new(GirType::Box(BoxType::Unresolved(opened.name.clone()))),
                complete: false,
                trivial: false,
                address_only: false,
            },
        });
    }
    trace!("lowering: classify_data({})", opened.name);
    ctx.cache.insert(whole.clone(), CacheState::InProgress);

    let Some(Definition::Data { ty: data_tel, constructors }) = ctx.sig.lookup_definition(&opened.name).cloned() else {
        return Err(LoweringError::unsupported(format!("`{}` is not a data type", opened.name), None));
    };

    if let Some((zero, suc)) = try_peano_peephole(ctx, &data_tel, &constructors, &opened.name) {
        let lowered = Lowered::trivial_object(GirType::Data {
            name: opened.name.clone(),
            indices: vec![],
            constructors: vec![zero, suc],
            category: Category::Object,
        });
        ctx.cache.insert(whole.clone(), CacheState::Done(lowered.clone()));
        return Ok(lowered);
    }

    let mut data_trivial = true;
    for cname in &constructors {
        let Some(Definition::DataConstructor { arity, ty: ctxty, .. }) = ctx.sig.lookup_definition(cname).cloned() else {
            return Err(LoweringError::unsupported(format!("`{cname}` is not known to be a constructor"), None));
        };
        let sigma = instantiate_with(&ctxty.telescope, &opened.args);
        let unrolled = Rc::new(apply_subst(&ctxty.inside, &sigma).unwrap_or_else(|_| (*ctxty.inside).clone()));
        let (fields, ctor_trivial) = lower_constructor_fields(ctx, archetypes, arity, unrolled)?;
        data_trivial &= ctor_trivial;
        let payload = Rc::new(GirType::Tuple { elements: fields, category: Category::Object });
        ctx.payloads.insert(cname.clone(), payload);
    }

    let indices: Vec<Rc<GirType>> = opened
        .args
        .iter()
        .map(|a| classify_with(ctx, archetypes, a).map(|l| l.ty))
        .collect::<Result<_, _>>()?;

    let gir_ty = ctx.table.intern(GirType::Data {
        name: opened.name.clone(),
        indices,
        constructors: constructors.clone(),
        category: Category::Object,
    });
    let lowered = Lowered { ty: gir_ty, complete: true, trivial: data_trivial, address_only: false };
    ctx.cache.insert(whole.clone(), CacheState::Done(lowered.clone()));
    Ok(lowered)
}

fn classify_record(
    ctx: &mut LowerCtx,
    archetypes: &ArchetypeEnv,
    whole: &Rc<Term>,
    opened: &ast::Opened,
) -> Result<Lowered, LoweringError> {
    if let Some(state) = ctx.cache.get(whole) {
        return Ok(match state {
            CacheState::Done(l) => l.clone(),
            CacheState::InProgress => Lowered {
                ty: Rc::new(GirType::Box(BoxType::Unresolved(opened.name.clone()))),
                complete: false,
                trivial: false,
                address_only: false,
            },
        });
    }
    trace!("lowering: classify_record({})", opened.name);
    ctx.cache.insert(whole.clone(), CacheState::InProgress);

    let Some(Definition::Record { con_name, projections, .. }) = ctx.sig.lookup_definition(&opened.name).cloned() else {
        return Err(LoweringError::unsupported(format!("`{}` is not a record type", opened.name), None));
    };
    let Some(Definition::DataConstructor { arity, ty: ctxty, .. }) = ctx.sig.lookup_definition(&con_name).cloned() else {
        return Err(LoweringError::unsupported(format!("record `{}` has no constructor", opened.name), None));
    };
    let sigma = instantiate_with(&ctxty.telescope, &opened.args);
    let unrolled = Rc::new(apply_subst(&ctxty.inside, &sigma).unwrap_or_else(|_| (*ctxty.inside).clone()));
    let (fields, trivial) = lower_constructor_fields(ctx, archetypes, arity, unrolled)?;
    let payload = Rc::new(GirType::Tuple { elements: fields, category: Category::Object });
    ctx.payloads.insert(con_name.clone(), payload);

    let gir_ty = ctx.table.intern(GirType::Record { name: opened.name.clone(), fields: projections.clone(), category: Category::Object });
    let lowered = Lowered { ty: gir_ty, complete: true, trivial, address_only: false };
    ctx.cache.insert(whole.clone(), CacheState::Done(lowered.clone()));
    Ok(lowered)
}

/// Lowers a whole Π-chain function type (a checked function's ascription),
/// used directly by the GIR generator to build an entry continuation's
/// parameter list: one [`GirType`] per Π-arg plus the final result type,
/// tracking which parameter positions are generic (`Type`-sorted) so the
/// generator knows which of them are archetypes rather than ordinary
/// values.
pub fn lower_function_type(
    ctx: &mut LowerCtx,
    ty: &Rc<Term>,
) -> Result<(Vec<Rc<GirType>>, Vec<bool>, Rc<GirType>), LoweringError> {
    let mut archetypes = ArchetypeEnv::new();
    let mut params = Vec::new();
    let mut is_archetype = Vec::new();
    let mut cur = ty.clone();
    loop {
        let reduced = whnf(ctx.sig, &cur).into_term();
        match &*reduced {
            Term::Pi { dom, cod, .. } => {
                let lowered_dom = classify_with(ctx, &archetypes, dom)?;
                let dom_is_type = matches!(&*whnf(ctx.sig, dom).into_term(), Term::Type { .. });
                params.push(lowered_dom.ty);
                is_archetype.push(dom_is_type);
                archetypes.push(dom_is_type);
                cur = cod.clone();
            }
            _ => {
                let result = classify_with(ctx, &archetypes, &cur)?;
                return Ok((params, is_archetype, result.ty));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ast::context::{Contextual, Telescope};
    use ast::Term;

    fn nat_signature() -> (Signature, QualName) {
        let mut sig = Signature::new();
        let nat = QualName::from("Nat");
        sig.add_data(nat.clone(), Telescope::default()).unwrap();
        let nat_ty = Rc::new(Term::def(nat.clone(), vec![]));
        sig.add_constructor(
            QualName::from("zero"),
            nat.clone(),
            0,
            Contextual::new(Telescope::default(), nat_ty.clone()),
        )
        .unwrap();
        let suc_inside = Rc::new(Term::Pi { span: None, name: "_".to_owned(), dom: nat_ty.clone(), cod: nat_ty.clone() });
        sig.add_constructor(QualName::from("suc"), nat.clone(), 1, Contextual::new(Telescope::default(), suc_inside)).unwrap();
        (sig, nat)
    }

    #[test]
    fn nat_triggers_the_peano_peephole() {
        let (sig, nat) = nat_signature();
        let mut table = TypeTable::new();
        let mut ctx = LowerCtx::new(&sig, &mut table);
        let ty = Rc::new(Term::def(nat, vec![]));
        let lowered = classify(&mut ctx, &ty).unwrap();
        assert!(lowered.trivial);
        assert!(!lowered.address_only);
        match &*lowered.ty {
            GirType::Data { constructors, indices, .. } => {
                assert_eq!(constructors.len(), 2);
                assert!(indices.is_empty());
            }
            other => panic!("expected a Data type, got {other:?}"),
        }
    }

    #[test]
    fn type_is_address_only_and_trivial() {
        let sig = Signature::new();
        let mut table = TypeTable::new();
        let mut ctx = LowerCtx::new(&sig, &mut table);
        let ty = Rc::new(Term::Type { span: None });
        let lowered = classify(&mut ctx, &ty).unwrap();
        assert!(lowered.trivial);
        assert!(lowered.address_only);
        assert_eq!(*lowered.ty, GirType::Type);
    }

    #[test]
    fn a_self_recursive_list_boxes_its_tail() {
        let mut sig = Signature::new();
        let list = QualName::from("List");
        sig.add_data(list.clone(), Telescope::default()).unwrap();
        let list_ty = Rc::new(Term::def(list.clone(), vec![]));
        sig.add_constructor(QualName::from("nil"), list.clone(), 0, Contextual::new(Telescope::default(), list_ty.clone()))
            .unwrap();
        // cons : List -> List -> List (two self-recursive fields, not the Peano shape)
        let cons_inside = Rc::new(Term::Pi {
            span: None,
            name: "_".to_owned(),
            dom: list_ty.clone(),
            cod: Rc::new(Term::Pi { span: None, name: "_".to_owned(), dom: list_ty.clone(), cod: list_ty.clone() }),
        });
        sig.add_constructor(QualName::from("cons"), list.clone(), 2, Contextual::new(Telescope::default(), cons_inside)).unwrap();

        let mut table = TypeTable::new();
        let mut ctx = LowerCtx::new(&sig, &mut table);
        let ty = Rc::new(Term::def(list.clone(), vec![]));
        let lowered = classify(&mut ctx, &ty).unwrap();
        assert!(!lowered.trivial);
        let payload = ctx.constructor_payload(&QualName::from("cons")).unwrap();
        match &*payload {
            GirType::Tuple { elements, .. } => {
                assert_eq!(elements.len(), 2);
                assert!(elements.iter().all(|e| matches!(&**e, GirType::Box(BoxType::Unresolved(n)) if *n == list)));
            }
            other => panic!("expected a Tuple payload, got {other:?}"),
        }
    }

    #[test]
    fn postulate_lowers_to_an_opaque_address_only_type() {
        let mut sig = Signature::new();
        let name = QualName::from("String");
        sig.add_postulate(name.clone(), Contextual::new(Telescope::default(), Rc::new(Term::Type { span: None }))).unwrap();
        let mut table = TypeTable::new();
        let mut ctx = LowerCtx::new(&sig, &mut table);
        let ty = Rc::new(Term::def(name, vec![]));
        let lowered = classify(&mut ctx, &ty).unwrap();
        assert!(lowered.address_only);
        assert!(!lowered.trivial);
    }
}
