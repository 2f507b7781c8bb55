//! §4.7's GIR generator: turns a checked, zonked [`Signature`] into a
//! [`Module`]. One entry continuation per function, built by compiling its
//! clauses with [`crate::pattern_matrix`] and lowering each clause body
//! with the CPS calling convention documented on [`lowering::GirType::Bottom`]:
//! every function takes its ordinary arguments plus, for an address-only
//! result, an extra out-parameter naming where to write the result, then a
//! trailing continuation-typed "return" parameter invoked with the result
//! (or with nothing, once it has been written through the out-parameter).
//!
//! Scope, recorded in `DESIGN.md`: only non-indexed, non-parameterized data
//! types are supported (the §8 test scenarios — `Nat`, `Bool` — are all of
//! this shape); `Type`-sorted and proof-carrying (`Pi`/`Equal`/`Refl`)
//! runtime values are not generated (`GirError::Bug`), since no testable
//! scenario needs them and the spec does not ask for universe-polymorphic
//! runtime representations.

use std::rc::Rc;

use ast::{Clause, Definition, Head, Idx, Opened, QualName, Signature, Term};
use fxhash::FxHashMap;
use log::trace;
use lowering::{classify, lower_function_type, Category, GirType, LowerCtx, TypeTable};

use crate::builder::Builder;
use crate::error::GirError;
use crate::ident::{ContId, ValueId};
use crate::module::Module;
use crate::pattern_matrix::{self, DecisionTree, Occurrence};

/// Lowered types for every definition in the signature, computed once up
/// front so the per-function generation pass never needs a live
/// [`LowerCtx`] borrow interleaved with [`Module`] mutation.
struct LoweredTypes {
    function_sigs: FxHashMap<QualName, (Vec<Rc<GirType>>, Rc<GirType>)>,
    ctor_payloads: FxHashMap<QualName, Rc<GirType>>,
    ctor_parents: FxHashMap<QualName, QualName>,
    data_types: FxHashMap<QualName, Rc<GirType>>,
}

fn lower_all_types(sig: &Signature, table: &mut TypeTable) -> Result<LoweredTypes, GirError> {
    let mut ctx = LowerCtx::new(sig, table);
    let mut function_sigs = FxHashMap::default();
    let mut ctor_parents = FxHashMap::default();
    let mut data_types = FxHashMap::default();

    for (name, def) in sig.iter_in_order() {
        match def {
            Definition::Function { ty, .. } => {
                let pi = ast::context::telescope_to_pi(&ty.telescope, ty.inside.clone());
                let (params, _is_archetype, result) = lower_function_type(&mut ctx, &pi)?;
                function_sigs.insert(name.clone(), (params, result));
            }
            Definition::DataConstructor { parent, .. } => {
                ctor_parents.insert(name.clone(), parent.clone());
            }
            Definition::Data { .. } => {
                let applied = Rc::new(Term::def(name.clone(), vec![]));
                let lowered = classify(&mut ctx, &applied)?;
                data_types.insert(name.clone(), lowered.ty);
            }
            _ => {}
        }
    }

    let mut ctor_payloads = FxHashMap::default();
    for cname in ctor_parents.keys() {
        if let Some(payload) = ctx.constructor_payload(cname) {
            ctor_payloads.insert(cname.clone(), payload);
        }
    }

    Ok(LoweredTypes { function_sigs, ctor_payloads, ctor_parents, data_types })
}

impl LoweredTypes {
    /// The constructor's payload tuple, falling back to the shape the
    /// Peano peephole's short-circuit (which never populates
    /// `ctor_payloads`, §4.6) implies: nullary constructors get an empty
    /// tuple, and a constructor with exactly one argument of its own
    /// parent data type (the only shape `try_peano_peephole` recognizes)
    /// gets a one-element tuple of the parent type.
    fn ctor_payload(&self, ctor: &QualName, arity: usize) -> Rc<GirType> {
        if let Some(payload) = self.ctor_payloads.get(ctor) {
            return payload.clone();
        }
        let elements = match (arity, self.ctor_parents.get(ctor).and_then(|p| self.data_types.get(p))) {
            (1, Some(parent_ty)) => vec![parent_ty.clone()],
            _ => vec![],
        };
        Rc::new(GirType::Tuple { elements, category: Category::Object })
    }

    fn data_type_of(&self, ctor: &QualName) -> Option<Rc<GirType>> {
        self.ctor_parents.get(ctor).and_then(|p| self.data_types.get(p)).cloned()
    }

    fn indirect(&self, name: &QualName) -> bool {
        self.function_sigs.get(name).map(|(_, r)| r.category() == Category::Address).unwrap_or(false)
    }
}

/// Generates a complete [`Module`] for `name` from every checked, zonked
/// function in `sig`. Non-function definitions (data, records, postulates)
/// contribute only their lowered types, consulted while generating
/// function bodies; they have no GIR of their own to emit.
pub fn generate_module(sig: &Signature, name: impl Into<QualName>) -> Result<Module, GirError> {
    let mut module = Module::new(name.into());
    let types = lower_all_types(sig, &mut module.types)?;

    // Pre-allocate every function's entry continuation so a forward
    // reference (mutual or self recursion) always has a `ContId` to call
    // before that callee's own body has been generated.
    let mut entries = FxHashMap::default();
    for (fn_name, def) in sig.iter_in_order() {
        if matches!(def, Definition::Function { body: ast::FunctionBody::Checked { .. }, .. }) {
            let cont = module.new_continuation(mangled(fn_name));
            module.entries.insert(fn_name.clone(), cont);
            entries.insert(fn_name.clone(), cont);
        }
    }

    for (fn_name, def) in sig.iter_in_order() {
        let Definition::Function { body: ast::FunctionBody::Checked { clauses, .. }, .. } = def else {
            continue;
        };
        trace!("gir: generating `{fn_name}` ({} clause(s))", clauses.len());
        let entry = entries[fn_name];
        generate_function(sig, &types, &mut module, fn_name, entry, clauses)?;
    }

    Ok(module)
}

fn mangled(name: &QualName) -> String {
    name.0.replace("::", ".")
}

fn generate_function(
    sig: &Signature,
    types: &LoweredTypes,
    module: &mut Module,
    name: &QualName,
    entry: ContId,
    clauses: &[Clause],
) -> Result<(), GirError> {
    let (param_types, result_ty) =
        types.function_sigs.get(name).cloned().ok_or_else(|| GirError::bug(format!("no lowered signature for `{name}`")))?;
    let indirect = result_ty.category() == Category::Address;

    let mut occurrences: FxHashMap<Occurrence, ValueId> = FxHashMap::default();
    for (i, ty) in param_types.iter().enumerate() {
        let v = module.new_parameter(entry, ty.clone());
        occurrences.insert(vec![i], v);
    }

    let out_buffer = if indirect { Some(module.new_parameter(entry, result_ty.clone())) } else { None };
    let return_ty = return_cont_type(&result_ty, indirect);
    let return_cont = module.new_parameter(entry, return_ty);

    let compiled = pattern_matrix::compile(clauses);

    let mut builder = Builder::new(module, entry);
    let mut gen = Gen { sig, types };
    gen.walk(&mut builder, &compiled.tree, clauses, &compiled.var_counts, occurrences, return_cont, out_buffer, &result_ty)
}

fn return_cont_type(result_ty: &Rc<GirType>, indirect: bool) -> Rc<GirType> {
    let args = if indirect { vec![] } else { vec![result_ty.clone()] };
    Rc::new(GirType::Function { args, result: Rc::new(GirType::Bottom) })
}

/// Per-module-generation context: read-only collaborators consulted while
/// walking terms and decision trees.
struct Gen<'a> {
    sig: &'a Signature,
    types: &'a LoweredTypes,
}

impl<'a> Gen<'a> {
    fn walk(
        &mut self,
        builder: &mut Builder,
        tree: &DecisionTree,
        clauses: &[Clause],
        var_counts: &[usize],
        occurrences: FxHashMap<Occurrence, ValueId>,
        return_cont: ValueId,
        out_buffer: Option<ValueId>,
        result_ty: &Rc<GirType>,
    ) -> Result<(), GirError> {
        match tree {
            DecisionTree::Fail => Err(GirError::NonExhaustive),
            DecisionTree::Leaf { clause_index, bindings } => {
                let clause = &clauses[*clause_index];
                let Some(body) = &clause.body else {
                    builder.unreachable();
                    return Ok(());
                };
                let var_count = var_counts[*clause_index];
                let mut env: Vec<Option<ValueId>> = vec![None; var_count];
                for (slot, occurrence) in bindings {
                    let value = *occurrences
                        .get(occurrence)
                        .ok_or_else(|| GirError::bug(format!("unresolved occurrence {occurrence:?} at a leaf")))?;
                    env[slot.0] = Some(value);
                }
                let env: Vec<ValueId> = env
                    .into_iter()
                    .enumerate()
                    .map(|(i, v)| v.ok_or_else(|| GirError::bug(format!("binding slot {i} never bound at a leaf"))))
                    .collect::<Result<_, _>>()?;
                self.generate_clause_body(builder, body, &env, return_cont, out_buffer, result_ty)
            }
            DecisionTree::Switch { occurrence, arms, default } => {
                let scrutinee = *occurrences
                    .get(occurrence)
                    .ok_or_else(|| GirError::bug(format!("unresolved switch occurrence {occurrence:?}")))?;
                let scrutinee_ty = builder.module.value(scrutinee).ty.clone();
                let switch_cont = builder.current();

                let mut arm_conts = Vec::with_capacity(arms.len());
                for (ctor_name, subtree) in arms {
                    let arity = self.constructor_arity(ctor_name)?;
                    let payload = self.types.ctor_payload(ctor_name, arity);
                    let element_tys = match payload.as_ref() {
                        GirType::Tuple { elements, .. } => elements.clone(),
                        _ => return Err(GirError::bug(format!("`{ctor_name}`'s payload was not lowered to a tuple"))),
                    };

                    let arm_cont = builder.module.new_continuation(format!("bb{}.{}", switch_cont.0, ctor_name.0));
                    let mut arm_occurrences = occurrences.clone();
                    for (i, element_ty) in element_tys.iter().enumerate() {
                        let param = builder.module.new_parameter(arm_cont, element_ty.clone());
                        let mut occ = occurrence.clone();
                        occ.push(i);
                        arm_occurrences.insert(occ, param);
                    }

                    builder.switch_to(arm_cont);
                    self.walk(builder, subtree, clauses, var_counts, arm_occurrences, return_cont, out_buffer, result_ty)?;
                    arm_conts.push((ctor_name.clone(), arm_cont));
                }

                let default_cont = match default {
                    Some(subtree) => {
                        let cont = builder.module.new_continuation(format!("bb{}.default", switch_cont.0));
                        builder.switch_to(cont);
                        self.walk(builder, subtree, clauses, var_counts, occurrences.clone(), return_cont, out_buffer, result_ty)?;
                        Some(cont)
                    }
                    None => None,
                };

                builder.switch_to(switch_cont);
                let arm_fn_ty = Rc::new(GirType::Function { args: vec![], result: Rc::new(GirType::Bottom) });
                let mut arms_values = Vec::with_capacity(arm_conts.len());
                for (ctor_name, cont) in &arm_conts {
                    arms_values.push((ctor_name.clone(), builder.function_ref(*cont, arm_fn_ty.clone())));
                }
                let default_value = default_cont.map(|cont| builder.function_ref(cont, arm_fn_ty.clone()));
                builder.switch_constr(scrutinee, scrutinee_ty, arms_values, default_value);
                Ok(())
            }
        }
    }

    fn constructor_arity(&self, ctor: &QualName) -> Result<usize, GirError> {
        match self.sig.lookup_definition(ctor) {
            Some(Definition::DataConstructor { arity, .. }) => Ok(*arity),
            _ => Err(GirError::bug(format!("`{ctor}` is not a known constructor"))),
        }
    }

    fn generate_clause_body(
        &mut self,
        builder: &mut Builder,
        body: &Rc<Term>,
        env: &[ValueId],
        return_cont: ValueId,
        out_buffer: Option<ValueId>,
        result_ty: &Rc<GirType>,
    ) -> Result<(), GirError> {
        if let Some((opened, args)) = as_function_call(self.sig, body) {
            let mut values = Vec::with_capacity(args.len() + 2);
            for arg in &args {
                values.push(self.generate_value(builder, arg, env)?);
            }
            if let Some(buf) = out_buffer {
                values.push(buf);
            }
            values.push(return_cont);
            let callee = self.function_value(builder, &opened.name)?;
            builder.apply(callee, values, result_ty.clone());
            return Ok(());
        }

        let value = self.generate_value(builder, body, env)?;
        match out_buffer {
            Some(buf) => {
                builder.copy_address(value, buf);
                builder.apply(return_cont, vec![], Rc::new(GirType::Bottom));
            }
            None => {
                builder.apply(return_cont, vec![value], result_ty.clone());
            }
        }
        Ok(())
    }

    /// A first-class reference to `name`'s entry continuation, typed as a
    /// function taking its ordinary parameters, its out-buffer (if any),
    /// and its return continuation.
    fn function_value(&mut self, builder: &mut Builder, name: &QualName) -> Result<ValueId, GirError> {
        let entry = *builder
            .module
            .entries
            .get(name)
            .ok_or_else(|| GirError::bug(format!("`{name}` has no generated entry continuation")))?;
        let (params, result) = self
            .types
            .function_sigs
            .get(name)
            .cloned()
            .ok_or_else(|| GirError::bug(format!("no lowered signature for `{name}`")))?;
        let indirect = result.category() == Category::Address;
        let mut args = params;
        if indirect {
            args.push(result.clone());
        }
        args.push(return_cont_type(&result, indirect));
        let ty = Rc::new(GirType::Function { args, result: Rc::new(GirType::Bottom) });
        Ok(builder.function_ref(entry, ty))
    }

    /// Lowers a term used as a value: a variable, a fully-applied data
    /// constructor, or (when it denotes a call) a non-tail function
    /// application. A non-tail call ends the current continuation with a
    /// real `apply` and resumes in a freshly built join continuation whose
    /// single parameter (or, for an address-only result, an implicit
    /// stack-allocated out buffer) holds the produced value — this is the
    /// one place this generator performs the CPS transform for a term that
    /// isn't already in tail position.
    fn generate_value(&mut self, builder: &mut Builder, term: &Rc<Term>, env: &[ValueId]) -> Result<ValueId, GirError> {
        if let Some(idx) = term.as_bare_var() {
            return env
                .get(env_index(idx, env.len()))
                .copied()
                .ok_or_else(|| GirError::bug(format!("variable idx {idx} out of range in clause body")));
        }
        match term.as_ref() {
            Term::Constructor { ctor, args, .. } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.generate_value(builder, arg, env)?);
                }
                let arity = self.constructor_arity(&ctor.name)?;
                let payload_ty = self.types.ctor_payload(&ctor.name, arity);
                let payload = builder.tuple(values, payload_ty);
                let data_ty = self
                    .types
                    .data_type_of(&ctor.name)
                    .ok_or_else(|| GirError::bug(format!("`{}`'s parent data type has no lowered type", ctor.name)))?;
                Ok(builder.data_init(ctor.name.clone(), payload, data_ty))
            }
            Term::Apply { head: Head::Def(opened), elims, .. } if elims.is_empty() => {
                match self.sig.lookup_definition(&opened.name) {
                    Some(Definition::Function { .. }) => self.generate_call(builder, opened, env),
                    _ => Err(GirError::bug(format!("`{}` is used as a value but is not a function", opened.name))),
                }
            }
            Term::Apply { head: Head::Meta(m), .. } => Err(GirError::bug(format!("unzonked metavariable ?{} reached GIR generation", m.0))),
            other => Err(GirError::bug(format!("term shape not supported by the GIR generator: {other:?}"))),
        }
    }

    fn generate_call(&mut self, builder: &mut Builder, opened: &Opened, env: &[ValueId]) -> Result<ValueId, GirError> {
        let mut values = Vec::with_capacity(opened.args.len() + 2);
        for arg in &opened.args {
            values.push(self.generate_value(builder, arg, env)?);
        }
        let (_, result_ty) = self
            .types
            .function_sigs
            .get(&opened.name)
            .cloned()
            .ok_or_else(|| GirError::bug(format!("no lowered signature for `{}`", opened.name)))?;
        let indirect = self.types.indirect(&opened.name);

        let join = builder.module.new_continuation(format!("{}.join", mangled(&opened.name)));
        let out_buffer = if indirect { Some(builder.alloca(result_ty.clone())) } else { None };
        let join_param = if indirect { None } else { Some(builder.module.new_parameter(join, result_ty.clone())) };

        let join_ref = builder.function_ref(join, return_cont_type(&result_ty, indirect));
        if let Some(buf) = out_buffer {
            values.push(buf);
        }
        values.push(join_ref);

        let callee = self.function_value(builder, &opened.name)?;
        builder.apply(callee, values, result_ty.clone());

        builder.switch_to(join);
        match (indirect, join_param, out_buffer) {
            (true, _, Some(buf)) => Ok(builder.load(buf, result_ty, true)),
            (false, Some(p), _) => Ok(p),
            _ => Err(GirError::bug("inconsistent call result plumbing")),
        }
    }
}

fn env_index(idx: Idx, len: usize) -> usize {
    len - 1 - idx.0
}

/// If `term` is itself a saturated call to a known function, returns its
/// callee and argument terms — the root-of-clause-body shape that gets a
/// true CPS tail call (reusing the enclosing function's own return
/// continuation and out-buffer) rather than a synthesized join
/// continuation.
fn as_function_call(sig: &Signature, term: &Rc<Term>) -> Option<(Opened, Vec<Rc<Term>>)> {
    match term.as_ref() {
        Term::Apply { head: Head::Def(opened), elims, .. } if elims.is_empty() => {
            matches!(sig.lookup_definition(&opened.name), Some(Definition::Function { .. })).then(|| (opened.clone(), opened.args.clone()))
        }
        _ => None,
    }
}
