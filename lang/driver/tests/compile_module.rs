//! §8's end-to-end scenarios, driven straight through `compile_module`
//! against hand-built `surface::Module` values — this crate has no parser,
//! so these stand in for what a frontend would otherwise produce.

use ast::{Definition, FunctionBody, Pattern};
use elaborator::options::ElabOptions;
use elaborator::surface::{
    Decl, DiagnosticKind, Elim as SElim, Expr, Module, SurfaceClause, SurfaceParam, SurfaceTelescope,
};
use gir::Terminator;

fn qn(s: &str) -> ast::QualName {
    s.into()
}

fn var(name: &str) -> Expr {
    Expr::Apply { span: None, head: name.to_owned(), elims: vec![] }
}

fn app1(head: &str, arg: Expr) -> Expr {
    Expr::Apply { span: None, head: head.to_owned(), elims: vec![SElim::ApplyArg(arg)] }
}

fn app2(head: &str, a: Expr, b: Expr) -> Expr {
    Expr::Apply { span: None, head: head.to_owned(), elims: vec![SElim::ApplyArg(a), SElim::ApplyArg(b)] }
}

fn arrow(dom: Expr, cod: Expr) -> Expr {
    Expr::Arrow { span: None, dom: Box::new(dom), cod: Box::new(cod) }
}

fn nullary_telescope() -> SurfaceTelescope {
    SurfaceTelescope::default()
}

/// §8.1: an empty module checks to an empty signature and an empty GIR
/// module — there is nothing to elaborate and nothing to generate.
#[test]
fn empty_module_compiles_to_nothing() {
    let module = Module { name: qn("M"), params: nullary_telescope(), decls: vec![] };
    let out = driver::compile_module(&module, &ElabOptions::default()).expect("empty module checks");
    assert_eq!(out.signature.iter_in_order().count(), 0);
    assert_eq!(out.gir.iter_continuations().count(), 0);
    assert!(out.diagnostics.is_empty());
}

/// Builds `data Unit : Type where { tt : Unit }` as a pair of adjacent
/// `DataSig`/`DataBody` decls.
fn unit_decls() -> Vec<Decl> {
    let unit_ty = var("Unit");
    vec![
        Decl::DataSig { name: qn("Unit"), params: nullary_telescope() },
        Decl::DataBody { name: qn("Unit"), constructors: vec![(qn("tt"), nullary_telescope(), unit_ty)] },
    ]
}

/// §8.2: `id : (A : Type) -> A -> A`, `id A x = x` — the polymorphic
/// identity function, checked against a dependent `Pi` and compiled to a
/// single continuation that just forwards its second parameter.
#[test]
fn identity_function_compiles() {
    let mut decls = unit_decls();
    let id_ty = Expr::Pi {
        span: None,
        name: "A".to_owned(),
        dom: Box::new(Expr::Type { span: None }),
        cod: Box::new(arrow(var("A"), var("A"))),
    };
    decls.push(Decl::Ascription { name: qn("id"), ty: id_ty });
    decls.push(Decl::Function {
        name: qn("id"),
        clauses: vec![SurfaceClause {
            patterns: vec![Pattern::Var("A".to_owned()), Pattern::Var("x".to_owned())],
            body: Some(var("x")),
        }],
    });
    let module = Module { name: qn("M"), params: nullary_telescope(), decls };

    let out = driver::compile_module(&module, &ElabOptions::default()).expect("identity checks");
    assert!(out.diagnostics.is_empty());
    assert!(matches!(
        out.signature.lookup_definition(&qn("id")),
        Some(Definition::Function { body: FunctionBody::Checked { .. }, .. })
    ));

    let entry = *out.gir.entries.get(&qn("id")).expect("id has an entry continuation");
    let cont = out.gir.continuation(entry);
    // `A : Type`, `x : A`, and a trailing return continuation.
    assert_eq!(cont.params.len(), 3);
    match cont.terminator.as_ref().expect("entry has a terminator") {
        Terminator::Apply { callee, args, .. } => {
            assert_eq!(*callee, cont.params[2]);
            assert_eq!(args.as_slice(), &[cont.params[1]]);
        }
        other => panic!("expected a tail apply of the return continuation, got {other:?}"),
    }
}

/// Builds `data Nat : Type where { zero : Nat; suc : Nat -> Nat }`.
fn nat_decls() -> Vec<Decl> {
    let nat_ty = || var("Nat");
    vec![
        Decl::DataSig { name: qn("Nat"), params: nullary_telescope() },
        Decl::DataBody {
            name: qn("Nat"),
            constructors: vec![
                (qn("zero"), nullary_telescope(), nat_ty()),
                (
                    qn("suc"),
                    SurfaceTelescope { params: vec![SurfaceParam { name: "_".to_owned(), ty: nat_ty() }] },
                    nat_ty(),
                ),
            ],
        },
    ]
}

/// §8.3: `plus : Nat -> Nat -> Nat`, defined by recursion on its first
/// argument — the spec's worked example for the generator's tail-call and
/// switch-arm-destructuring machinery.
#[test]
fn peano_addition_compiles_to_a_recursive_switch() {
    let mut decls = nat_decls();
    let nat = || var("Nat");
    decls.push(Decl::Ascription { name: qn("plus"), ty: arrow(nat(), arrow(nat(), nat())) });
    decls.push(Decl::Function {
        name: qn("plus"),
        clauses: vec![
            SurfaceClause {
                patterns: vec![
                    Pattern::Constructor { name: qn("zero"), args: vec![] },
                    Pattern::Var("m".to_owned()),
                ],
                body: Some(var("m")),
            },
            SurfaceClause {
                patterns: vec![
                    Pattern::Constructor { name: qn("suc"), args: vec![Pattern::Var("n".to_owned())] },
                    Pattern::Var("m".to_owned()),
                ],
                body: Some(Expr::Constructor {
                    span: None,
                    name: qn("suc"),
                    args: vec![app2("plus", var("n"), var("m"))],
                }),
            },
        ],
    });
    let module = Module { name: qn("M"), params: nullary_telescope(), decls };

    let out = driver::compile_module(&module, &ElabOptions::default()).expect("plus checks");
    assert!(out.diagnostics.is_empty());

    let entry = *out.gir.entries.get(&qn("plus")).expect("plus has an entry continuation");
    let entry_cont = out.gir.continuation(entry);
    // `n : Nat`, `m : Nat`, a trailing return continuation — `Nat` is an
    // unboxed two-constructor enum, so no out-buffer parameter is needed.
    assert_eq!(entry_cont.params.len(), 3);

    let (arms, default) = match entry_cont.terminator.as_ref().expect("entry has a terminator") {
        Terminator::SwitchConstr { arms, default, .. } => (arms, default),
        other => panic!("expected plus's entry to switch on its first argument, got {other:?}"),
    };
    assert!(default.is_none(), "Nat has exactly two constructors; no default arm is needed");
    let arm_names: Vec<&str> = arms.iter().map(|(n, _)| n.0.as_str()).collect();
    assert_eq!(arm_names, vec!["zero", "suc"]);

    // The `zero` arm tail-calls the return continuation with `m` — no
    // further recursion.
    let zero_arm_cont = out.gir.as_function_ref(arms[0].1).expect("zero arm is a function_ref");
    match out.gir.continuation(zero_arm_cont).terminator.as_ref().unwrap() {
        Terminator::Apply { .. } => {}
        other => panic!("zero arm should tail-apply the return continuation, got {other:?}"),
    }

    // The `suc` arm recurses: it has one parameter (`n`, the unwrapped
    // payload) plus whatever `plus`'s own entry already bound, and its
    // terminator is itself an `Apply` (the recursive call to `plus`, whose
    // join continuation in turn tail-calls `suc` and the outer return
    // continuation) rather than another switch.
    let suc_arm_cont = out.gir.as_function_ref(arms[1].1).expect("suc arm is a function_ref");
    assert_eq!(out.gir.continuation(suc_arm_cont).params.len(), 1);
    match out.gir.continuation(suc_arm_cont).terminator.as_ref().unwrap() {
        Terminator::Apply { .. } => {}
        other => panic!("suc arm should apply the recursive call, got {other:?}"),
    }
}

/// Builds `data Bool : Type where { tt : Bool; ff : Bool }`.
fn bool_decls() -> Vec<Decl> {
    let bool_ty = || var("Bool");
    vec![
        Decl::DataSig { name: qn("Bool"), params: nullary_telescope() },
        Decl::DataBody {
            name: qn("Bool"),
            constructors: vec![(qn("tt"), nullary_telescope(), bool_ty()), (qn("ff"), nullary_telescope(), bool_ty())],
        },
    ]
}

/// §8.4: `ite : Bool -> Bool -> Bool -> Bool`, matching on its first
/// argument and forwarding one of the remaining two — every clause binds
/// both trailing parameters (one of them unused, under the name `_`) so
/// the two arms agree on arity.
#[test]
fn if_then_else_compiles() {
    let mut decls = bool_decls();
    let bool_ty = || var("Bool");
    decls.push(Decl::Ascription { name: qn("ite"), ty: arrow(bool_ty(), arrow(bool_ty(), arrow(bool_ty(), bool_ty()))) });
    decls.push(Decl::Function {
        name: qn("ite"),
        clauses: vec![
            SurfaceClause {
                patterns: vec![
                    Pattern::Constructor { name: qn("tt"), args: vec![] },
                    Pattern::Var("x".to_owned()),
                    Pattern::Var("_".to_owned()),
                ],
                body: Some(var("x")),
            },
            SurfaceClause {
                patterns: vec![
                    Pattern::Constructor { name: qn("ff"), args: vec![] },
                    Pattern::Var("_".to_owned()),
                    Pattern::Var("x".to_owned()),
                ],
                body: Some(var("x")),
            },
        ],
    });
    let module = Module { name: qn("M"), params: nullary_telescope(), decls };

    let out = driver::compile_module(&module, &ElabOptions::default()).expect("ite checks");
    assert!(out.diagnostics.is_empty());
    let entry = *out.gir.entries.get(&qn("ite")).expect("ite has an entry continuation");
    assert_eq!(out.gir.continuation(entry).params.len(), 4);
    assert!(matches!(
        out.gir.continuation(entry).terminator.as_ref().unwrap(),
        Terminator::SwitchConstr { .. }
    ));
}

/// §8.5: a function whose body is left as a hole (`Expr::Meta`) checks
/// without a hard failure, but its metavariable can never be solved from
/// context alone — it is reported as an `UnsolvedMeta` diagnostic and
/// excluded from the generated GIR module rather than aborting the whole
/// compilation.
#[test]
fn unsolved_meta_is_reported_and_excluded_from_gir() {
    let mut decls = unit_decls();
    decls.push(Decl::Ascription { name: qn("stuck"), ty: arrow(var("Unit"), var("Unit")) });
    decls.push(Decl::Function {
        name: qn("stuck"),
        clauses: vec![SurfaceClause {
            patterns: vec![Pattern::Var("x".to_owned())],
            body: Some(Expr::Meta { span: None }),
        }],
    });
    let module = Module { name: qn("M"), params: nullary_telescope(), decls };

    let out = driver::compile_module(&module, &ElabOptions::default()).expect("a hole is not a hard failure");
    assert!(
        out.diagnostics.iter().any(|d| d.kind == DiagnosticKind::UnsolvedMeta),
        "expected an UnsolvedMeta diagnostic, got {:?}",
        out.diagnostics
    );
    assert!(
        out.gir.entries.get(&qn("stuck")).is_none(),
        "a function that didn't zonk cleanly must not reach GIR generation"
    );
    assert!(matches!(
        out.signature.lookup_definition(&qn("stuck")),
        Some(Definition::Function { body: FunctionBody::Open, .. })
    ));
}
