pub use miette_util::codespan::Span;

/// Every syntax node that came from real source carries an optional span;
/// nodes synthesized by the elaborator (inserted metas, desugared arrows)
/// are free to leave it `None`.
pub trait HasSpan {
    fn span(&self) -> Option<Span>;
}
