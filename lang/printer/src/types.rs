pub type Alloc<'a> = pretty::Arena<'a, Anno>;
pub type Builder<'a> = pretty::DocBuilder<'a, Alloc<'a>, Anno>;

/// Annotation carried on a printed fragment; the terminal renderer maps
/// each variant onto a `ColorSpec` via [`crate::theme`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anno {
    Keyword,
    Ctor,
    Dtor,
    Type,
    Comment,
    Reference(String, String),
}

/// Knobs that every `Print` impl threads through a tree. Kept small and
/// `Copy`-friendly so it can be passed by reference at every recursive call
/// without cloning.
#[derive(Debug, Clone)]
pub struct PrintCfg {
    pub width: usize,
    pub braces: (&'static str, &'static str),
    pub print_metavar_ids: bool,
    pub print_metavar_args: bool,
}

impl Default for PrintCfg {
    fn default() -> Self {
        PrintCfg {
            width: crate::DEFAULT_WIDTH,
            braces: ("{", "}"),
            print_metavar_ids: true,
            print_metavar_args: true,
        }
    }
}

/// A tree printable with the allocator-based combinator style used
/// throughout the crate: every node prints itself and recurses into its
/// children, threading `cfg` unchanged.
pub trait Print {
    fn print<'a>(&'a self, cfg: &PrintCfg, alloc: &'a Alloc<'a>) -> Builder<'a>;

    fn print_trailing_comma<'a>(&'a self, cfg: &PrintCfg, alloc: &'a Alloc<'a>) -> Builder<'a> {
        self.print(cfg, alloc)
    }
}

impl<T: Print> Print for Box<T> {
    fn print<'a>(&'a self, cfg: &PrintCfg, alloc: &'a Alloc<'a>) -> Builder<'a> {
        (**self).print(cfg, alloc)
    }
}

impl<T: Print> Print for Option<T> {
    fn print<'a>(&'a self, cfg: &PrintCfg, alloc: &'a Alloc<'a>) -> Builder<'a> {
        match self {
            Some(x) => x.print(cfg, alloc),
            None => alloc.nil(),
        }
    }
}
