//! §3's "GIR types" and §4.6's uniquing tables.

use std::rc::Rc;

use derivative::Derivative;
use fxhash::FxHashMap;

use ast::QualName;

/// Every GIR value belongs to one of two categories (§3, §6): `Object`
/// values can be loaded/stored directly; `Address` values must be
/// projected/copied indirectly via the `_address` primops. A type
/// classified address-only at lowering time must never be produced with
/// `Object` category — the GIR generator enforces this, not this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Object,
    Address,
}

/// A parameterized (generic) type reference, §3.
#[derive(Debug, Clone, Derivative)]
#[derivative(PartialEq, Eq, Hash)]
pub enum Parameterized {
    /// A type-level parameter of the enclosing function, referenced by the
    /// position among that function's `Type`-sorted telescope entries —
    /// built by [`crate::classify::ArchetypeEnv`] as the classifier walks a
    /// function's parameter telescope left to right.
    Archetype(usize),
    /// A generic type specialized by substitution, e.g. `List(Nat)`.
    SubstitutedType { substitutee: Rc<GirType>, substitutions: Vec<Rc<GirType>> },
}

/// §4.6's heap-indirection marker for a recursive or not-yet-lowered
/// payload field. `Unresolved` names the data type whose lowering is still
/// in progress; it resolves implicitly once that lowering completes — any
/// consumer that needs the pointee's shape re-queries [`TypeTable`] by name
/// rather than following a patched-in pointer (this crate never mutates a
/// `GirType` after it is built; see `DESIGN.md`).
#[derive(Debug, Clone, Derivative)]
#[derivative(PartialEq, Eq, Hash)]
pub enum BoxType {
    Resolved(Rc<GirType>),
    Unresolved(QualName),
}

/// §3's lowered GIR type vocabulary.
#[derive(Debug, Clone, Derivative)]
#[derivative(PartialEq, Eq, Hash)]
pub enum GirType {
    /// The uninhabited return type of a return continuation: `(result) -> ⊥`.
    Bottom,
    /// The universe itself, lowered; self-typed, trivial, address-only.
    Type,
    /// The runtime descriptor of a type value, reified when a generic
    /// function needs to size/lay out a boxed payload of archetype element
    /// type at the call site (§4.7's box allocation for recursive/boxed
    /// payloads under an archetype).
    TypeMetadata,
    Function { args: Vec<Rc<GirType>>, result: Rc<GirType> },
    Tuple { elements: Vec<Rc<GirType>>, category: Category },
    Data { name: QualName, indices: Vec<Rc<GirType>>, constructors: Vec<QualName>, category: Category },
    Record { name: QualName, fields: Vec<QualName>, category: Category },
    Parameterized(Parameterized),
    Box(BoxType),
}

impl GirType {
    pub fn category(&self) -> Category {
        match self {
            GirType::Bottom => Category::Object,
            GirType::Type | GirType::TypeMetadata => Category::Address,
            GirType::Function { .. } => Category::Object,
            GirType::Tuple { category, .. } => *category,
            GirType::Data { category, .. } => *category,
            GirType::Record { category, .. } => *category,
            GirType::Parameterized(Parameterized::Archetype(_)) => Category::Address,
            GirType::Parameterized(Parameterized::SubstitutedType { substitutee, .. }) => substitutee.category(),
            GirType::Box(_) => Category::Object,
        }
    }
}

/// The classification result the GIR generator actually consults: the
/// lowered type itself, plus the three facets §4.6 names.
#[derive(Debug, Clone)]
pub struct Lowered {
    pub ty: Rc<GirType>,
    /// Not still in the middle of being defined (i.e. not a provisional
    /// cyclic placeholder).
    pub complete: bool,
    /// No copy/destroy is needed to manage a value of this type.
    pub trivial: bool,
    /// Opaque; must be manipulated indirectly (never produced as `Object`).
    pub address_only: bool,
}

impl Lowered {
    pub fn trivial_object(ty: GirType) -> Lowered {
        Lowered { ty: Rc::new(ty), complete: true, trivial: true, address_only: false }
    }

    pub fn address_only(ty: GirType) -> Lowered {
        Lowered { ty: Rc::new(ty), complete: true, trivial: true, address_only: true }
    }
}

/// §4.9's "module owns ... the type unique-tables": function, tuple, data,
/// and record types are interned by structural equality so that two
/// lowerings of the same shape produce the identical `Rc`, letting callers
/// compare lowered types by pointer as a fast path.
#[derive(Debug, Default)]
pub struct TypeTable {
    table: FxHashMap<GirType, Rc<GirType>>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `ty`, returning the canonical `Rc` for its structural shape.
    /// Only `Function`/`Tuple`/`Data`/`Record` are worth uniquing (§4.6);
    /// every other shape is returned as freshly allocated, since uniquing
    /// them buys nothing (`Bottom`/`Type`/`TypeMetadata` are singletons by
    /// construction and `Box`/`Parameterized` aren't structurally shared).
    pub fn intern(&mut self, ty: GirType) -> Rc<GirType> {
        match &ty {
            GirType::Function { .. } | GirType::Tuple { .. } | GirType::Data { .. } | GirType::Record { .. } => {
                if let Some(existing) = self.table.get(&ty) {
                    return existing.clone();
                }
                let rc = Rc::new(ty.clone());
                self.table.insert(ty, rc.clone());
                rc
            }
            _ => Rc::new(ty),
        }
    }
}
