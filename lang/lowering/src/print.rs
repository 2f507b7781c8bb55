//! Textual rendering of [`GirType`], sharing the GIR grammar tokens
//! declared in `printer::tokens` so this crate's output and the `gir`
//! crate's continuation/primop serializer read as one consistent grammar.

use pretty::DocAllocator;
use printer::theme::ThemeExt;
use printer::tokens::*;
use printer::{Alloc, Builder, Print, PrintCfg};

use crate::types::{BoxType, Category, GirType, Parameterized};

fn category_suffix<'a>(category: Category, alloc: &'a Alloc<'a>) -> Builder<'a> {
    match category {
        Category::Object => alloc.nil(),
        Category::Address => alloc.text(PERCENT).append(alloc.text("addr")),
    }
}

fn print_list<'a>(items: &'a [std::rc::Rc<GirType>], cfg: &PrintCfg, alloc: &'a Alloc<'a>) -> Builder<'a> {
    alloc.intersperse(items.iter().map(|item| item.print(cfg, alloc)), alloc.text(", "))
}

impl Print for GirType {
    fn print<'a>(&'a self, cfg: &PrintCfg, alloc: &'a Alloc<'a>) -> Builder<'a> {
        match self {
            GirType::Bottom => alloc.typ("Bottom"),
            GirType::Type => alloc.typ(TYPE),
            GirType::TypeMetadata => alloc.typ("TypeMetadata"),
            GirType::Function { args, result } => {
                alloc.text(LPAREN).append(print_list(args, cfg, alloc)).append(RPAREN).append(alloc.space()).append(ARROW).append(alloc.space()).append(result.print(cfg, alloc))
            }
            GirType::Tuple { elements, category } => alloc
                .text(LPAREN)
                .append(print_list(elements, cfg, alloc))
                .append(RPAREN)
                .append(category_suffix(*category, alloc)),
            GirType::Data { name, indices, constructors, category } => {
                let mut doc = alloc.typ(&name.0);
                if !indices.is_empty() {
                    doc = doc.append(alloc.text("<")).append(print_list(indices, cfg, alloc)).append(alloc.text(">"));
                }
                doc = doc.append(category_suffix(*category, alloc));
                if constructors.is_empty() {
                    doc
                } else {
                    doc.append(alloc.text("{")).append(
                        alloc.intersperse(constructors.iter().map(|c| alloc.ctor(&c.0)), alloc.text(", ")),
                    ).append(alloc.text("}"))
                }
            }
            GirType::Record { name, fields, category } => {
                let doc = alloc.typ(&name.0).append(category_suffix(*category, alloc));
                doc.append(alloc.text("{")).append(
                    alloc.intersperse(fields.iter().map(|f| alloc.dtor(&f.0)), alloc.text(", ")),
                ).append(alloc.text("}"))
            }
            GirType::Parameterized(Parameterized::Archetype(k)) => alloc.text(format!("A{k}")),
            GirType::Parameterized(Parameterized::SubstitutedType { substitutee, substitutions }) => substitutee
                .print(cfg, alloc)
                .append(alloc.text("<"))
                .append(print_list(substitutions, cfg, alloc))
                .append(alloc.text(">")),
            GirType::Box(BoxType::Resolved(inner)) => alloc.text(BOX).append(alloc.text(" ")).append(inner.print(cfg, alloc)),
            GirType::Box(BoxType::Unresolved(name)) => alloc.text(BOX).append(alloc.text(" ")).append(alloc.typ(&name.0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use printer::print_to_string::PrintToString;

    use super::*;

    #[test]
    fn a_boxed_unresolved_recursion_prints_with_the_box_token() {
        let ty = GirType::Box(BoxType::Unresolved(ast::QualName::from("List")));
        assert_eq!(ty.print_to_string(None), "@box List");
    }

    #[test]
    fn a_trivial_tuple_prints_without_a_category_suffix() {
        let ty = GirType::Tuple { elements: vec![Rc::new(GirType::Type)], category: Category::Object };
        assert_eq!(ty.print_to_string(None), format!("({})", TYPE));
    }
}
