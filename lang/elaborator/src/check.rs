//! §4.5: the module check phase. Walks a [`crate::surface::Module`] tree
//! depth-first, registering each declaration into the [`ast::Signature`] in
//! source order, elaborating every type and term it carries along the way.
//!
//! Unification failures and unsolved metas are not fatal here — per §7 they
//! are reported to the caller's [`crate::surface::DiagnosticsSink`] and
//! checking continues with whatever the solver did manage to pin down.
//! Only a [`CheckError`] (a structural bug, or a malformed pattern) aborts
//! the run outright.

use std::rc::Rc;

use ast::{
    apply_subst, whnf, Clause, Contextual, Definition, Environment, FunctionBody, Head, Opened, Pattern,
    QualName, Scope, Signature, Span, Subst, Telescope, Term,
};

use crate::elaborate::{elaborate_surface_telescope, ElabCtx};
use crate::error::CheckError;
use crate::options::ElabOptions;
use crate::solver::{residue_origins, Constraint, Solver};
use crate::surface::{Decl, Diagnostic, DiagnosticKind, DiagnosticsSink, Expr, Module, SurfaceClause};

/// Checks an entire top-level module, registering everything it (directly
/// or, through nested modules, indirectly) declares into `sig`.
pub fn check_module(
    sig: &mut Signature,
    opts: &ElabOptions,
    module: &Module,
    sink: &mut dyn DiagnosticsSink,
) -> Result<(), CheckError> {
    check_module_at(sig, opts, &Telescope::default(), module, sink)?;
    Ok(())
}

fn ambient_env(tel: &Telescope) -> Environment {
    let mut env = Environment::default();
    env.push_scope(Scope { context: tel.clone(), opened_args: Vec::new() });
    env
}

fn sig_err(e: ast::SignatureError) -> CheckError {
    CheckError::structural(e.to_string())
}

/// Runs the solver over one declaration's accumulated constraints and
/// reports whatever it could not discharge, without aborting checking.
fn drain_and_solve(constraints: Vec<Constraint>, sig: &mut Signature, opts: &ElabOptions, sink: &mut dyn DiagnosticsSink) {
    if constraints.is_empty() {
        return;
    }
    let mut solver = Solver::new(constraints);
    match solver.run(sig, opts) {
        Ok(residues) => {
            for (meta, origin) in residue_origins(sig, &residues) {
                sink.report(Diagnostic {
                    kind: DiagnosticKind::UnsolvedMeta,
                    primary: origin,
                    message: format!("unsolved metavariable {meta}"),
                    notes: vec![],
                });
            }
        }
        Err(e) => sink.report(Diagnostic {
            kind: DiagnosticKind::UnificationFailure,
            primary: e.lhs.span().or_else(|| e.rhs.span()),
            message: e.reason.clone(),
            notes: vec![],
        }),
    }
}

/// Checks one module's params and declarations under `outer`, the ambient
/// telescope contributed by every enclosing module. Returns the names
/// directly declared in this module, for its own `Definition::Module` entry.
fn check_module_at(
    sig: &mut Signature,
    opts: &ElabOptions,
    outer: &Telescope,
    module: &Module,
    sink: &mut dyn DiagnosticsSink,
) -> Result<Vec<QualName>, CheckError> {
    let mut ctx = ElabCtx::new(sig, ambient_env(outer));
    let own_params = elaborate_surface_telescope(&mut ctx, &module.params)?;
    drain_and_solve(std::mem::take(&mut ctx.constraints), sig, opts, sink);

    let mut ambient = outer.clone();
    ambient.entries.extend(own_params.entries);

    let mut inside = Vec::new();
    let mut i = 0;
    while i < module.decls.len() {
        match &module.decls[i] {
            Decl::DataSig { name, params } => {
                check_data_sig(sig, opts, &ambient, name, params, sink)?;
                inside.push(name.clone());
                i += 1;
            }
            Decl::DataBody { name, constructors } => {
                for (cname, cparams, result_ty) in constructors {
                    check_constructor(sig, opts, name, cname, cparams, result_ty, sink)?;
                    inside.push(cname.clone());
                }
                i += 1;
            }
            Decl::RecordSig { name, params } => {
                let Some(Decl::RecordBody { name: body_name, con_name, fields }) = module.decls.get(i + 1) else {
                    return Err(CheckError::structural(format!(
                        "record `{name}`'s signature is not immediately followed by its body"
                    )));
                };
                if body_name != name {
                    return Err(CheckError::structural(format!(
                        "record signature `{name}` is followed by the body of `{body_name}`"
                    )));
                }
                let mut names = check_record(sig, opts, &ambient, name, params, con_name, fields, sink)?;
                inside.append(&mut names);
                i += 2;
            }
            Decl::RecordBody { name, .. } => {
                return Err(CheckError::structural(format!(
                    "record body `{name}` encountered without a preceding signature"
                )));
            }
            Decl::Postulate { name, ty } => {
                check_postulate(sig, opts, &ambient, name, ty, sink)?;
                inside.push(name.clone());
                i += 1;
            }
            Decl::Ascription { name, ty } => {
                check_ascription(sig, opts, &ambient, name, ty, sink)?;
                inside.push(name.clone());
                i += 1;
            }
            Decl::Function { name, clauses } => {
                check_function(sig, opts, name, clauses, sink)?;
                i += 1;
            }
            Decl::Module(inner) => {
                let inner_inside = check_module_at(sig, opts, &ambient, inner, sink)?;
                sig.add_module(inner.name.clone(), inner_inside).map_err(sig_err)?;
                inside.push(inner.name.clone());
                i += 1;
            }
        }
    }
    Ok(inside)
}

fn check_data_sig(
    sig: &mut Signature,
    opts: &ElabOptions,
    ambient: &Telescope,
    name: &QualName,
    params: &crate::surface::SurfaceTelescope,
    sink: &mut dyn DiagnosticsSink,
) -> Result<(), CheckError> {
    let mut ctx = ElabCtx::new(sig, ambient_env(ambient));
    let own = elaborate_surface_telescope(&mut ctx, params)?;
    drain_and_solve(std::mem::take(&mut ctx.constraints), sig, opts, sink);
    let mut full = ambient.clone();
    full.entries.extend(own.entries);
    sig.add_data(name.clone(), full).map_err(sig_err)
}

fn check_constructor(
    sig: &mut Signature,
    opts: &ElabOptions,
    parent: &QualName,
    cname: &QualName,
    cparams: &crate::surface::SurfaceTelescope,
    result_ty: &Expr,
    sink: &mut dyn DiagnosticsSink,
) -> Result<(), CheckError> {
    let parent_tel = match sig.lookup_definition(parent) {
        Some(Definition::Data { ty, .. }) => ty.clone(),
        _ => return Err(CheckError::structural(format!("`{parent}` has no preceding data signature"))),
    };
    let mut ctx = ElabCtx::new(sig, ambient_env(&parent_tel));
    let field_tel = elaborate_surface_telescope(&mut ctx, cparams)?;
    let type_ty = Rc::new(Term::Type { span: None });
    let result_t = ctx.elaborate(type_ty, result_ty)?;
    drain_and_solve(std::mem::take(&mut ctx.constraints), sig, opts, sink);
    let inside = telescope_to_pi(&field_tel, result_t);
    sig.add_constructor(cname.clone(), parent.clone(), field_tel.len(), Contextual::new(parent_tel, inside))
        .map_err(sig_err)
}

/// Checks a record's signature and body together: the constructor name is
/// only known once the body is seen, so both decls are processed as one
/// unit (requiring them to appear adjacently — see `DESIGN.md`).
#[allow(clippy::too_many_arguments)]
fn check_record(
    sig: &mut Signature,
    opts: &ElabOptions,
    ambient: &Telescope,
    name: &QualName,
    params: &crate::surface::SurfaceTelescope,
    con_name: &QualName,
    fields: &[(String, Expr)],
    sink: &mut dyn DiagnosticsSink,
) -> Result<Vec<QualName>, CheckError> {
    let mut ctx = ElabCtx::new(sig, ambient_env(ambient));
    let own_params = elaborate_surface_telescope(&mut ctx, params)?;
    drain_and_solve(std::mem::take(&mut ctx.constraints), sig, opts, sink);
    let mut full_tel = ambient.clone();
    full_tel.entries.extend(own_params.entries);
    sig.add_record(name.clone(), con_name.clone(), full_tel.clone()).map_err(sig_err)?;

    let type_ty = Rc::new(Term::Type { span: None });
    let mut ctx = ElabCtx::new(sig, ambient_env(&full_tel));
    let mut field_tys: Vec<(String, Rc<Term>)> = Vec::with_capacity(fields.len());
    for (fname, fty_expr) in fields {
        let fty_t = ctx.elaborate(type_ty.clone(), fty_expr)?;
        ctx.env.push_binder(fname.clone(), fty_t.clone());
        field_tys.push((fname.clone(), fty_t));
    }
    drain_and_solve(std::mem::take(&mut ctx.constraints), sig, opts, sink);

    let arity = full_tel.len();
    let own_vars: Vec<Rc<Term>> = (0..arity).rev().map(|i| Rc::new(Term::var(ast::Idx(i)))).collect();
    let record_applied = Rc::new(Term::def(name.clone(), own_vars));
    let mut field_telescope = Telescope::default();
    for (fname, fty) in &field_tys {
        field_telescope.push(fname.clone(), fty.clone());
    }
    let con_inside = telescope_to_pi(&field_telescope, record_applied);
    sig.add_constructor(
        con_name.clone(),
        name.clone(),
        fields.len(),
        Contextual::new(full_tel.clone(), con_inside),
    )
    .map_err(sig_err)?;

    // `self`-based projection types: field `i`'s type, computed under
    // `full_tel` plus the earlier fields as binders, is re-expressed under
    // `full_tel` plus one `self : Record(...)` binder by replacing every
    // reference to an earlier field with the corresponding projection of
    // `self` — the standard dependent-record "telescope of projections".
    let proj_vars: Vec<Rc<Term>> = (0..arity).rev().map(|i| Rc::new(Term::var(ast::Idx(i + 1)))).collect();
    let record_applied_self = Rc::new(Term::def(name.clone(), proj_vars.clone()));
    let mut names = vec![name.clone(), con_name.clone()];
    for (i, (fname, fty)) in field_tys.iter().enumerate() {
        let proj_name = QualName::from(fname.as_str());
        let mut sigma = Subst::weaken(1, Subst::Id);
        for m in (0..i).rev() {
            let earlier_idx = i - 1 - m;
            let earlier_name = QualName::from(field_tys[earlier_idx].0.as_str());
            let proj_term = Rc::new(Term::Apply {
                span: None,
                head: ast::Head::Var(ast::Var { span: None, name: "self".to_owned(), idx: ast::Idx(0) }),
                elims: vec![ast::Elim::Project(Opened::new(earlier_name, proj_vars.clone()), earlier_idx)],
            });
            sigma = Subst::instantiate(proj_term, sigma);
        }
        let projected = Rc::new(apply_subst(fty, &sigma).unwrap_or_else(|_| (**fty).clone()));
        let pi = Rc::new(Term::Pi { span: None, name: "self".to_owned(), dom: record_applied_self.clone(), cod: projected });
        sig.add_projection(proj_name.clone(), i, name.clone(), Contextual::new(full_tel.clone(), pi))
            .map_err(sig_err)?;
        names.push(proj_name);
    }
    Ok(names)
}

fn check_postulate(
    sig: &mut Signature,
    opts: &ElabOptions,
    ambient: &Telescope,
    name: &QualName,
    ty: &Expr,
    sink: &mut dyn DiagnosticsSink,
) -> Result<(), CheckError> {
    let mut ctx = ElabCtx::new(sig, ambient_env(ambient));
    let type_ty = Rc::new(Term::Type { span: None });
    let ty_t = ctx.elaborate(type_ty, ty)?;
    drain_and_solve(std::mem::take(&mut ctx.constraints), sig, opts, sink);
    sig.add_postulate(name.clone(), Contextual::new(ambient.clone(), ty_t)).map_err(sig_err)
}

fn check_ascription(
    sig: &mut Signature,
    opts: &ElabOptions,
    ambient: &Telescope,
    name: &QualName,
    ty: &Expr,
    sink: &mut dyn DiagnosticsSink,
) -> Result<(), CheckError> {
    let mut ctx = ElabCtx::new(sig, ambient_env(ambient));
    let type_ty = Rc::new(Term::Type { span: None });
    let ty_t = ctx.elaborate(type_ty, ty)?;
    drain_and_solve(std::mem::take(&mut ctx.constraints), sig, opts, sink);
    sig.add_ascription(name.clone(), Contextual::new(ambient.clone(), ty_t)).map_err(sig_err)
}

fn check_function(
    sig: &mut Signature,
    opts: &ElabOptions,
    name: &QualName,
    clauses: &[SurfaceClause],
    sink: &mut dyn DiagnosticsSink,
) -> Result<(), CheckError> {
    let ty = match sig.lookup_definition(name) {
        Some(Definition::Function { ty, body: FunctionBody::Open }) => ty.clone(),
        _ => return Err(CheckError::structural(format!("function `{name}` has no preceding type ascription"))),
    };
    let mut checked = Vec::with_capacity(clauses.len());
    for clause in clauses {
        checked.push(check_function_clause(sig, opts, &ty, clause, sink)?);
    }
    let invertibility = crate::solver::invertibility::infer_invertibility(sig, &checked);
    sig.add_function_clauses(name, FunctionBody::Checked { invertibility, clauses: checked }).map_err(sig_err)
}

fn check_function_clause(
    sig: &mut Signature,
    opts: &ElabOptions,
    fn_ty: &Contextual<Rc<Term>>,
    clause: &SurfaceClause,
    sink: &mut dyn DiagnosticsSink,
) -> Result<Clause, CheckError> {
    let mut ctx = ElabCtx::new(sig, Environment::default());
    let mut cur_ty = telescope_to_pi(&fn_ty.telescope, fn_ty.inside.clone());
    for pat in &clause.patterns {
        let reduced = whnf(ctx.sig, &cur_ty).into_term();
        let Term::Pi { dom, cod, .. } = &*reduced else {
            return Err(CheckError::pattern_match("clause has more patterns than the function's arity", None, vec![]));
        };
        let (dom, cod) = (dom.clone(), cod.clone());
        let arg_term = bind_pattern(&mut ctx, pat, &dom)?;
        cur_ty = Rc::new(apply_subst(&cod, &Subst::singleton(arg_term)).unwrap_or_else(|_| (*cod).clone()));
    }
    let body = match &clause.body {
        Some(body_expr) => Some(ctx.elaborate(cur_ty, body_expr)?),
        None => None,
    };
    drain_and_solve(std::mem::take(&mut ctx.constraints), sig, opts, sink);
    Ok(Clause { patterns: clause.patterns.clone(), body })
}

/// Binds one pattern against `dom`, pushing whatever variables it
/// introduces into `ctx.env` and returning the term it denotes — used both
/// to build the next pattern's domain (via substitution into the Π's
/// codomain) and as a constructor argument one level up.
fn bind_pattern(ctx: &mut ElabCtx, pat: &Pattern, dom: &Rc<Term>) -> Result<Rc<Term>, CheckError> {
    match pat {
        Pattern::Var(name) => {
            ctx.env.push_binder(name.clone(), dom.clone());
            Ok(Rc::new(Term::var_named(ast::Idx(0), name.clone())))
        }
        Pattern::Absurd => {
            let reduced = whnf(ctx.sig, dom).into_term();
            let Term::Apply { head: Head::Def(opened), .. } = &*reduced else {
                return Err(CheckError::pattern_match("absurd pattern's scrutinee type is not a data type", None, vec![]));
            };
            match ctx.sig.lookup_definition(&opened.name) {
                Some(Definition::Data { constructors, .. }) if constructors.is_empty() => {}
                _ => {
                    return Err(CheckError::pattern_match(
                        format!("`{}` is not known to be an empty data type; cannot use an absurd pattern here", opened.name),
                        None,
                        vec![],
                    ))
                }
            }
            Ok(ctx.fresh_meta_pub(dom.clone(), None))
        }
        Pattern::Constructor { name, args } => {
            let reduced = whnf(ctx.sig, dom).into_term();
            let Term::Apply { head: Head::Def(opened), .. } = &*reduced else {
                return Err(CheckError::pattern_match(format!("pattern `{name}` does not match a data type"), None, vec![]));
            };
            let data_args = opened.args.clone();
            let Some(Definition::DataConstructor { parent, ty: ctxty, .. }) = ctx.sig.lookup_definition(name).cloned()
            else {
                return Err(CheckError::pattern_match(format!("`{name}` does not name a constructor"), None, vec![]));
            };
            if &parent != &opened.name {
                return Err(CheckError::pattern_match(
                    format!("constructor `{name}` does not belong to the data type being matched"),
                    None,
                    vec![],
                ));
            }
            let sigma = instantiate_telescope_with(&ctxty.telescope, &data_args);
            let mut field_ty = Rc::new(apply_subst(&ctxty.inside, &sigma).unwrap_or_else(|_| (*ctxty.inside).clone()));
            let mut sub_terms = Vec::with_capacity(args.len());
            for sub_pat in args {
                let reduced = whnf(ctx.sig, &field_ty).into_term();
                let Term::Pi { dom: sub_dom, cod: sub_cod, .. } = &*reduced else {
                    return Err(CheckError::pattern_match(
                        format!("constructor `{name}` applied to too many sub-patterns"),
                        None,
                        vec![],
                    ));
                };
                let (sub_dom, sub_cod) = (sub_dom.clone(), sub_cod.clone());
                let sub_term = bind_pattern(ctx, sub_pat, &sub_dom)?;
                field_ty = Rc::new(apply_subst(&sub_cod, &Subst::singleton(sub_term.clone())).unwrap_or_else(|_| (*sub_cod).clone()));
                sub_terms.push(sub_term);
            }
            Ok(Rc::new(Term::Constructor { span: None, ctor: Opened::new(name.clone(), data_args), args: sub_terms }))
        }
    }
}

/// `Π telescope. _` instantiated by `args`, one per telescope entry in
/// order — the substitution a pattern's constructor opens its parent data
/// type's parameters with, mirroring `ElabCtx::open_ctx_type` but using
/// already-known arguments instead of fresh metas.
fn instantiate_telescope_with(tel: &Telescope, args: &[Rc<Term>]) -> Subst {
    let mut sigma = Subst::Id;
    for arg in tel.entries.iter().zip(args).map(|(_, a)| a) {
        sigma = Subst::instantiate(arg.clone(), sigma);
    }
    sigma
}

fn telescope_to_pi(tel: &Telescope, result: Rc<Term>) -> Rc<Term> {
    ast::context::telescope_to_pi(tel, result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::CollectingSink;

    fn span() -> Option<Span> {
        None
    }

    #[test]
    fn postulate_registers_a_closed_type() {
        let mut sig = Signature::new();
        let opts = ElabOptions::default();
        let mut sink = CollectingSink::default();
        let module = Module {
            name: QualName::from("M"),
            params: crate::surface::SurfaceTelescope::default(),
            decls: vec![Decl::Postulate { name: QualName::from("unit"), ty: Expr::Type { span: span() } }],
        };
        check_module(&mut sig, &opts, &module, &mut sink).unwrap();
        assert!(sig.lookup_definition(&QualName::from("unit")).is_some());
        assert!(sink.diagnostics.is_empty());
    }

    #[test]
    fn data_then_constructor_round_trips() {
        let mut sig = Signature::new();
        let opts = ElabOptions::default();
        let mut sink = CollectingSink::default();
        let module = Module {
            name: QualName::from("M"),
            params: crate::surface::SurfaceTelescope::default(),
            decls: vec![
                Decl::DataSig { name: QualName::from("Unit"), params: crate::surface::SurfaceTelescope::default() },
                Decl::DataBody {
                    name: QualName::from("Unit"),
                    constructors: vec![(
                        QualName::from("tt"),
                        crate::surface::SurfaceTelescope::default(),
                        Expr::Apply { span: span(), head: "Unit".to_owned(), elims: vec![] },
                    )],
                },
            ],
        };
        check_module(&mut sig, &opts, &module, &mut sink).unwrap();
        assert!(matches!(sig.lookup_definition(&QualName::from("Unit")), Some(Definition::Data { .. })));
        assert!(matches!(
            sig.lookup_definition(&QualName::from("tt")),
            Some(Definition::DataConstructor { .. })
        ));
    }

    #[test]
    fn function_without_ascription_is_structural() {
        let mut sig = Signature::new();
        let opts = ElabOptions::default();
        let mut sink = CollectingSink::default();
        let module = Module {
            name: QualName::from("M"),
            params: crate::surface::SurfaceTelescope::default(),
            decls: vec![Decl::Function { name: QualName::from("f"), clauses: vec![] }],
        };
        assert!(matches!(check_module(&mut sig, &opts, &module, &mut sink), Err(CheckError::Structural { .. })));
    }
}
