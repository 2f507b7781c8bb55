//! The single-shot pipeline: a [`elaborator::surface::Module`] in, a
//! [`gir::Module`] plus accumulated diagnostics out. Unlike the teacher's
//! own driver, this is not a demand-driven incremental query database —
//! there is no parser, no LSP surface, and no file system here (all named
//! non-goals); `compile_module` just runs check → zonk → generate once,
//! start to finish.

pub mod error;

use ast::{Definition, FunctionBody, QualName, Signature};
use elaborator::options::ElabOptions;
use elaborator::surface::{CollectingSink, Diagnostic, DiagnosticKind, Module};

pub use error::Error;

/// Everything a compilation run produced. `gir` covers whichever functions
/// zonked cleanly; a function that didn't is excluded from it and reported
/// in `diagnostics` instead of failing the whole run — `check_module`
/// itself failing is a different, fatal case, reported as `Err` since a
/// [`elaborator::error::CheckError`] is a bug in a collaborator rather than
/// a normal compile outcome (§7).
pub struct CompileOutput {
    pub signature: Signature,
    pub gir: gir::Module,
    pub diagnostics: Vec<Diagnostic>,
}

/// Runs the whole pipeline over `module`: registers and elaborates every
/// declaration into a fresh [`Signature`] (§4.5), zonks every checked
/// function body (§4.1's "zonk, or name the first metavariable still
/// blocking it"), and generates GIR (§4.7) for whichever functions zonked
/// cleanly. A function whose body still has an unsolved metavariable is
/// reported as a [`DiagnosticKind::UnsolvedMeta`] diagnostic and excluded
/// from the generated module rather than aborting the whole run — unsolved
/// metas are legal output (§7).
pub fn compile_module(module: &Module, opts: &ElabOptions) -> Result<CompileOutput, Error> {
    let mut sig = Signature::new();
    let mut sink = CollectingSink::default();
    elaborator::check_module(&mut sig, opts, module, &mut sink)?;

    let checked_functions: Vec<QualName> = sig
        .iter_in_order()
        .filter(|(_, def)| matches!(def, Definition::Function { body: FunctionBody::Checked { .. }, .. }))
        .map(|(name, _)| name.clone())
        .collect();

    let mut diagnostics = sink.diagnostics;
    for name in checked_functions {
        let Some(Definition::Function { body, .. }) = sig.lookup_definition(&name) else {
            unreachable!("name was just collected from this signature's own Function definitions");
        };
        match ast::zonk_function_body(&sig, body) {
            Ok(zonked) => sig
                .set_function_body(&name, zonked)
                .expect("name was just looked up in this signature"),
            Err(e) => {
                diagnostics.push(Diagnostic {
                    kind: DiagnosticKind::UnsolvedMeta,
                    primary: e.origin,
                    message: e.to_string(),
                    notes: Vec::new(),
                });
                sig.set_function_body(&name, FunctionBody::Open)
                    .expect("name was just looked up in this signature");
            }
        }
    }

    let gir = gir::generate_module(&sig, module.name.clone())?;
    Ok(CompileOutput { signature: sig, gir, diagnostics })
}
