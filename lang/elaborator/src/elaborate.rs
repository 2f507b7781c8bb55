//! §4.3: syntax-to-TT elaboration. Every rule here is bidirectional against
//! an `expected` type; the only way a mismatch is ever reported is via
//! [`ElabCtx::expect`], which defers the actual comparison to the solver
//! instead of deciding it on the spot.

use std::rc::Rc;

use ast::{
    apply_subst, eliminate, weaken_term, whnf, Contextual, Definition, Environment, Head, Opened, QualName,
    Signature, Span, Subst, Term,
};

use crate::error::CheckError;
use crate::solver::{equal_constraint, Constraint};
use crate::surface::{Elim as SElim, Expr};

/// Threads the signature and the local context through one elaboration
/// pass, accumulating the heterogeneous constraints `expect` emits along
/// the way. A single `ElabCtx` is good for one declaration body; the
/// caller drains `constraints` into a [`crate::solver::Solver`] once the
/// body is fully elaborated.
pub struct ElabCtx<'a> {
    pub sig: &'a mut Signature,
    pub env: Environment,
    pub constraints: Vec<Constraint>,
}

impl<'a> ElabCtx<'a> {
    pub fn new(sig: &'a mut Signature, env: Environment) -> Self {
        ElabCtx { sig, env, constraints: Vec::new() }
    }

    fn type_ty(&self) -> Rc<Term> {
        Rc::new(Term::Type { span: None })
    }

    /// A fresh meta of type `ty`, applied to the full spine of the current
    /// local context — the pattern-fragment convention every meta
    /// occurrence in this crate follows (§4.4's "metas are always used
    /// applied to their enclosing context").
    fn fresh_meta(&mut self, ty: Rc<Term>, origin: Option<Span>) -> Rc<Term> {
        let n = self.env.len();
        let tel = env_telescope(&self.env);
        let pi_chain = ast::context::telescope_to_pi(&tel, ty);
        let m = self.sig.add_meta(pi_chain, origin);
        let spine: Vec<Rc<Term>> = (0..n).rev().map(|i| Rc::new(Term::var(ast::Idx(i)))).collect();
        Rc::new(Term::meta_applied(m, spine))
    }

    /// Creates a fresh meta of type `expected`, emits the heterogeneous
    /// `Equal(Γ, expected, meta, given, term)` constraint, and returns the
    /// meta. This is the only way elaboration ever reports a mismatch —
    /// even a mismatch that is trivially true (`expected == given`) still
    /// goes through here, leaving the solver to discharge it by reflexivity.
    fn expect(&mut self, expected: Rc<Term>, given: Rc<Term>, term: Rc<Term>, origin: Option<Span>) -> Rc<Term> {
        let meta = self.fresh_meta(expected.clone(), origin);
        self.constraints.push(equal_constraint(self.env.clone(), expected, meta.clone(), given, term));
        meta
    }

    /// Opens a contextual type at its use site: fills `ctxty.telescope`
    /// with fresh metas (each one elaborated against the earlier metas
    /// already substituted into its type), returning those metas alongside
    /// `ctxty.inside` instantiated by them. Used for constructors,
    /// projections, and any reference to a name from a parametrized scope.
    fn open_ctx_type(&mut self, ctxty: &Contextual<Rc<Term>>, origin: Option<Span>) -> (Vec<Rc<Term>>, Rc<Term>) {
        let mut sigma = Subst::Id;
        let mut metas = Vec::with_capacity(ctxty.telescope.len());
        for entry in &ctxty.telescope.entries {
            let ty = Rc::new(apply_subst(&entry.ty, &sigma).unwrap_or_else(|_| (*entry.ty).clone()));
            let m = self.fresh_meta(ty, origin);
            sigma = Subst::instantiate(m.clone(), sigma);
            metas.push(m);
        }
        let inside = Rc::new(apply_subst(&ctxty.inside, &sigma).unwrap_or_else(|_| (*ctxty.inside).clone()));
        (metas, inside)
    }

    /// Resolves `name` against the local context first, then the global
    /// signature. A name that resolves to neither is a structural bug: a
    /// frontend that has already scope-checked its input is assumed never
    /// to hand the elaborator a dangling reference.
    fn resolve_head(&mut self, name: &str, origin: Option<Span>) -> Result<(Rc<Term>, Rc<Term>), CheckError> {
        if let Some(idx) = self.env.lookup_by_name(name) {
            let ty = self.env.lookup(idx).expect("lookup_by_name found an entry lookup(idx) must also find");
            return Ok((Rc::new(Term::var_named(idx, name)), ty));
        }
        let qualname = QualName::from(name);
        let Some(ctxty) = self.sig.ctx_type(&qualname) else {
            return Err(CheckError::structural(format!(
                "unresolved name `{name}` — scope checking should have rejected this"
            )));
        };
        let (metas, inside) = self.open_ctx_type(&ctxty, origin);
        let term = Rc::new(Term::Apply { span: origin, head: Head::Def(Opened::new(qualname, metas)), elims: vec![] });
        Ok((term, inside))
    }

    /// The top-level bidirectional elaboration judgment, `Γ ⊢ e ⇐ expected`.
    pub fn elaborate(&mut self, expected: Rc<Term>, e: &Expr) -> Result<Rc<Term>, CheckError> {
        let span = e.span();
        match e {
            Expr::Type { .. } => {
                let ty = self.type_ty();
                Ok(self.expect(expected, ty, Rc::new(Term::Type { span }), span))
            }

            Expr::Meta { .. } => Ok(self.fresh_meta(expected, span)),

            Expr::Pi { name, dom, cod, .. } => {
                let type_ty = self.type_ty();
                let dom_t = self.elaborate(type_ty.clone(), dom)?;
                self.env.push_binder(name.clone(), dom_t.clone());
                let cod_t = self.elaborate(type_ty.clone(), cod)?;
                self.env.pop_binder();
                let pi = Rc::new(Term::Pi { span, name: name.clone(), dom: dom_t, cod: cod_t });
                Ok(self.expect(expected, type_ty, pi, span))
            }

            Expr::Arrow { dom, cod, .. } => {
                let type_ty = self.type_ty();
                let dom_t = self.elaborate(type_ty.clone(), dom)?;
                self.env.push_binder("_", dom_t.clone());
                let cod_t = self.elaborate(type_ty.clone(), cod)?;
                self.env.pop_binder();
                let pi = Rc::new(Term::non_dependent_pi(dom_t, cod_t));
                Ok(self.expect(expected, type_ty, Rc::new(pi), span))
            }

            Expr::Lambda { name, body, .. } => {
                let type_ty = self.type_ty();
                let dom = self.fresh_meta(type_ty.clone(), span);
                self.env.push_binder(name.clone(), dom.clone());
                let cod = self.fresh_meta(type_ty, span);
                let body_t = self.elaborate(cod.clone(), body)?;
                self.env.pop_binder();
                let pi_ty = Rc::new(Term::Pi { span: None, name: name.clone(), dom, cod });
                let lambda = Rc::new(Term::Lambda { span, name: name.clone(), body: body_t });
                Ok(self.expect(expected, pi_ty, lambda, span))
            }

            Expr::Equal { ty, lhs, rhs, .. } => {
                let type_ty = self.type_ty();
                let ty_t = match ty {
                    Some(ty_expr) => self.elaborate(type_ty.clone(), ty_expr)?,
                    None => self.fresh_meta(type_ty.clone(), span),
                };
                let lhs_t = self.elaborate(ty_t.clone(), lhs)?;
                let rhs_t = self.elaborate(ty_t.clone(), rhs)?;
                let eq = Rc::new(Term::Equal { span, ty: ty_t, lhs: lhs_t, rhs: rhs_t });
                Ok(self.expect(expected, type_ty, eq, span))
            }

            Expr::Refl { .. } => {
                let type_ty = self.type_ty();
                let a = self.fresh_meta(type_ty, span);
                let x = self.fresh_meta(a.clone(), span);
                let given_ty = Rc::new(Term::Equal { span: None, ty: a, lhs: x.clone(), rhs: x });
                Ok(self.expect(expected, given_ty, Rc::new(Term::Refl { span }), span))
            }

            Expr::Constructor { name, args, .. } => {
                let Some(ctxty) = self.sig.ctx_type(name) else {
                    return Err(CheckError::structural(format!(
                        "unresolved constructor `{name}` — scope checking should have rejected this"
                    )));
                };
                if !matches!(self.sig.lookup_definition(name), Some(Definition::DataConstructor { .. })) {
                    return Err(CheckError::structural(format!("`{name}` does not name a constructor")));
                }
                let (param_metas, mut cur) = self.open_ctx_type(&ctxty, span);
                let mut field_terms = Vec::with_capacity(args.len());
                for arg_expr in args {
                    let reduced = whnf(self.sig, &cur).into_term();
                    let Term::Pi { dom, cod, .. } = &*reduced else {
                        return Err(CheckError::structural(format!(
                            "constructor `{name}` applied to too many arguments"
                        )));
                    };
                    let (dom, cod) = (dom.clone(), cod.clone());
                    let arg_t = self.elaborate(dom, arg_expr)?;
                    cur = Rc::new(apply_subst(&cod, &Subst::singleton(arg_t.clone())).unwrap_or_else(|_| (*cod).clone()));
                    field_terms.push(arg_t);
                }
                let ctor_term =
                    Rc::new(Term::Constructor { span, ctor: Opened::new(name.clone(), param_metas), args: field_terms });
                Ok(self.expect(expected, cur, ctor_term, span))
            }

            Expr::Apply { head, elims, .. } => {
                let (mut cur_term, mut cur_ty) = self.resolve_head(head, span)?;
                for elim in elims {
                    match elim {
                        SElim::ApplyArg(arg_expr) => {
                            let type_ty = self.type_ty();
                            let dm = self.fresh_meta(type_ty.clone(), span);
                            self.env.push_binder("_", dm.clone());
                            let cd = self.fresh_meta(type_ty, span);
                            self.env.pop_binder();
                            let expected_fn_ty = Rc::new(Term::Pi { span: None, name: "_".to_owned(), dom: dm.clone(), cod: cd.clone() });
                            let unified_fn = self.expect(expected_fn_ty, cur_ty.clone(), cur_term.clone(), span);
                            let arg_t = self.elaborate(dm, arg_expr)?;
                            cur_term = Rc::new(eliminate(unified_fn, vec![ast::Elim::ApplyArg(arg_t.clone())]));
                            cur_ty = Rc::new(apply_subst(&cd, &Subst::singleton(arg_t)).unwrap_or_else(|_| (*cd).clone()));
                        }
                        SElim::Project(field_name) => {
                            let qualname = QualName::from(field_name.as_str());
                            let field_idx = match self.sig.lookup_definition(&qualname) {
                                Some(Definition::Projection { field_idx, .. }) => *field_idx,
                                _ => {
                                    return Err(CheckError::structural(format!(
                                        "`{field_name}` does not name a field projection"
                                    )))
                                }
                            };
                            let ctxty = self.sig.ctx_type(&qualname).expect("projection always has a ctx type");
                            let (metas, inside) = self.open_ctx_type(&ctxty, span);
                            let Term::Pi { dom: self_ty, cod: field_ty, .. } = &*inside else {
                                return Err(CheckError::structural(format!(
                                    "projection `{field_name}` has a malformed contextual type"
                                )));
                            };
                            let (self_ty, field_ty) = (self_ty.clone(), field_ty.clone());
                            let unified_self = self.expect(self_ty, cur_ty.clone(), cur_term.clone(), span);
                            let proj = Opened::new(qualname, metas);
                            cur_term = Rc::new(eliminate(unified_self.clone(), vec![ast::Elim::Project(proj, field_idx)]));
                            cur_ty = Rc::new(
                                apply_subst(&field_ty, &Subst::singleton(unified_self)).unwrap_or_else(|_| (*field_ty).clone()),
                            );
                        }
                    }
                }
                Ok(self.expect(expected, cur_ty, cur_term, span))
            }

            Expr::Let { name, bound, body, .. } => {
                let type_ty = self.type_ty();
                let bound_ty = self.fresh_meta(type_ty, span);
                let bound_t = self.elaborate(bound_ty.clone(), bound)?;
                self.env.push_binder(name.clone(), bound_ty);
                let body_ty = weaken_term(&expected, 1);
                let body_t = self.elaborate(body_ty, body)?;
                self.env.pop_binder();
                let reduced = apply_subst(&body_t, &Subst::singleton(bound_t)).unwrap_or_else(|_| (*body_t).clone());
                Ok(Rc::new(reduced))
            }
        }
    }
}

/// Elaborates a surface telescope's parameter types in turn, pushing each
/// as a binder into `ctx.env` so later parameters can refer to earlier ones
/// by name. Used for data/record parameter lists and module parameters.
pub(crate) fn elaborate_surface_telescope(
    ctx: &mut ElabCtx,
    params: &crate::surface::SurfaceTelescope,
) -> Result<ast::Telescope, CheckError> {
    let mut tel = ast::Telescope::default();
    let type_ty = ctx.type_ty();
    for p in &params.params {
        let ty_t = ctx.elaborate(type_ty.clone(), &p.ty)?;
        tel.push(p.name.clone(), ty_t.clone());
        ctx.env.push_binder(p.name.clone(), ty_t);
    }
    Ok(tel)
}

/// Flattens an [`Environment`]'s scopes, outer to inner, into a single
/// telescope — the shape `telescope_to_pi` and every fresh meta's type need.
fn env_telescope(env: &Environment) -> ast::Telescope {
    let mut tel = ast::Telescope::default();
    for scope in &env.scopes {
        for entry in &scope.context.entries {
            tel.push(entry.name.clone(), entry.ty.clone());
        }
    }
    tel
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> Option<Span> {
        None
    }

    #[test]
    fn elaborating_type_against_a_meta_emits_one_constraint() {
        let mut sig = Signature::new();
        let mut ctx = ElabCtx::new(&mut sig, Environment::default());
        let expected = ctx.fresh_meta(ctx.type_ty(), span());
        let result = ctx.elaborate(expected, &Expr::Type { span: span() }).unwrap();
        assert!(matches!(&*result, Term::Apply { head: Head::Meta(_), .. }));
        assert_eq!(ctx.constraints.len(), 1);
    }

    #[test]
    fn elaborating_a_lambda_produces_a_pi_constraint() {
        let mut sig = Signature::new();
        let mut ctx = ElabCtx::new(&mut sig, Environment::default());
        let type_ty = ctx.type_ty();
        let expected = ctx.fresh_meta(type_ty, span());
        let lam = Expr::Lambda {
            span: span(),
            name: "x".to_owned(),
            body: Box::new(Expr::Meta { span: span() }),
        };
        let result = ctx.elaborate(expected, &lam).unwrap();
        assert!(matches!(&*result, Term::Lambda { .. }));
        assert_eq!(ctx.constraints.len(), 1);
    }

    #[test]
    fn unresolved_apply_head_is_structural() {
        let mut sig = Signature::new();
        let mut ctx = ElabCtx::new(&mut sig, Environment::default());
        let expected = ctx.fresh_meta(ctx.type_ty(), span());
        let e = Expr::Apply { span: span(), head: "nonexistent".to_owned(), elims: vec![] };
        assert!(matches!(ctx.elaborate(expected, &e), Err(CheckError::Structural { .. })));
    }
}
