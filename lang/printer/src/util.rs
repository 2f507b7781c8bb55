use pretty::DocAllocator;

use crate::types::PrintCfg;

pub trait BracesExt<'a, D, A: 'a>
where
    D: ?Sized + DocAllocator<'a, A>,
{
    fn braces_from(self, cfg: &PrintCfg) -> pretty::DocBuilder<'a, D, A>;
}

impl<'a, D, A> BracesExt<'a, D, A> for pretty::DocBuilder<'a, D, A>
where
    D: ?Sized + DocAllocator<'a, A>,
{
    fn braces_from(self, cfg: &PrintCfg) -> pretty::DocBuilder<'a, D, A> {
        self.enclose(cfg.braces.0, cfg.braces.1)
    }
}

/// Prints an iterator of printable items separated by `, `, matching the
/// layout every comma-separated list in the surface grammar and the GIR
/// textual grammar uses.
pub fn print_comma_separated<'a, T: crate::types::Print>(
    items: &'a [T],
    cfg: &PrintCfg,
    alloc: &'a crate::types::Alloc<'a>,
) -> crate::types::Builder<'a> {
    alloc.intersperse(items.iter().map(|item| item.print(cfg, alloc)), alloc.text(", "))
}
