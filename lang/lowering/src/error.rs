use ast::Span;
use miette::Diagnostic;
use thiserror::Error;

/// §7's "lowering failure": a type this reimplementation's classifier does
/// not support (the spec's example is "generic polymorphism beyond the
/// current subset"). Fatal for the affected definition only — the caller
/// (the driver) skips GIR emission for that one function and continues
/// with the rest of the module.
#[derive(Debug, Clone, Error, Diagnostic)]
pub enum LoweringError {
    #[error("cannot lower type: {message}")]
    Unsupported {
        message: String,
        #[label("while lowering this type")]
        span: Option<miette::SourceSpan>,
    },
}

impl LoweringError {
    pub fn unsupported(message: impl Into<String>, span: Option<Span>) -> Self {
        use miette_util::ToMiette;
        LoweringError::Unsupported { message: message.into(), span: span.to_miette() }
    }
}
