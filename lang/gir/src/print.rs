//! §6's textual GIR grammar: one `Module` renders as a sequence of
//! continuations, each a label, a parameter list, a body of primops, and a
//! terminator. Shares tokens with `lowering::print` so a `GirType` embedded
//! in a primop/terminator reads consistently.

use pretty::DocAllocator;
use printer::theme::ThemeExt;
use printer::tokens::*;
use printer::{Alloc, Builder, Print, PrintCfg};

use crate::ident::ValueId;
use crate::module::Module;
use crate::primop::{Opcode, PrimOp};
use crate::terminator::Terminator;

fn print_value<'a>(v: ValueId, alloc: &'a Alloc<'a>) -> Builder<'a> {
    alloc.text(format!("{v}"))
}

fn print_values<'a>(vs: &'a [ValueId], alloc: &'a Alloc<'a>) -> Builder<'a> {
    alloc.intersperse(vs.iter().map(|v| print_value(*v, alloc)), alloc.text(", "))
}

impl Print for Opcode {
    fn print<'a>(&'a self, _cfg: &PrintCfg, alloc: &'a Alloc<'a>) -> Builder<'a> {
        match self {
            Opcode::FunctionRef(target) => alloc.text(self.mnemonic()).append(" ").append(alloc.text(format!("{target}"))),
            Opcode::DataInit(name) => alloc.text(self.mnemonic()).append(" ").append(alloc.ctor(&name.0)),
            Opcode::TupleElementAddress(i) => alloc.text(self.mnemonic()).append(" ").append(alloc.text(i.to_string())),
            _ => alloc.text(self.mnemonic()),
        }
    }
}

impl Print for PrimOp {
    fn print<'a>(&'a self, cfg: &PrintCfg, alloc: &'a Alloc<'a>) -> Builder<'a> {
        let head = match self.result {
            Some(r) => print_value(r, alloc).append(" ").append(EQ).append(" "),
            None => alloc.nil(),
        };
        head.append(self.opcode.print(cfg, alloc)).append(if self.operands.is_empty() {
            alloc.nil()
        } else {
            alloc.text("(").append(print_values(&self.operands, alloc)).append(")")
        })
    }
}

impl Print for Terminator {
    fn print<'a>(&'a self, cfg: &PrintCfg, alloc: &'a Alloc<'a>) -> Builder<'a> {
        match self {
            Terminator::Apply { callee, args, .. } => alloc
                .keyword(APPLY)
                .append(" ")
                .append(print_value(*callee, alloc))
                .append("(")
                .append(print_values(args, alloc))
                .append(")"),
            Terminator::SwitchConstr { scrutinee, arms, default, .. } => {
                let mut doc = alloc.keyword(SWITCH_CONSTR).append(" ").append(print_value(*scrutinee, alloc)).append(" ").append(LBRACE);
                let mut body = alloc.nil();
                let mut first = true;
                for (name, cont) in arms {
                    if !first {
                        body = body.append(alloc.line());
                    }
                    first = false;
                    body = body.append(alloc.ctor(&name.0)).append(" ").append(ARROW).append(" ").append(print_value(*cont, alloc));
                }
                if let Some(d) = default {
                    if !first {
                        body = body.append(alloc.line());
                    }
                    body = body.append(alloc.keyword(DEFAULT)).append(" ").append(ARROW).append(" ").append(print_value(*d, alloc));
                }
                doc.append(body.nest(INDENT)).append(alloc.line()).append(RBRACE)
            }
            Terminator::Unreachable => alloc.keyword(UNREACHABLE),
        }
    }
}

impl Print for Module {
    /// Renders every continuation reachable from any of the module's
    /// `entries`, in reverse-postorder per entry (§4.9), one after another.
    /// Continuations unreachable from every entry are never printed — a
    /// `Module` may retain stale arena slots after `remove_continuation`.
    fn print<'a>(&'a self, cfg: &PrintCfg, alloc: &'a Alloc<'a>) -> Builder<'a> {
        let mut entries: Vec<_> = self.entries.iter().collect();
        entries.sort_by(|a, b| a.0.0.cmp(&b.0.0));
        let mut doc = alloc.nil();
        let mut first = true;
        for (name, &entry) in entries {
            for cont_id in crate::graph::reverse_postorder(self, entry) {
                if !first {
                    doc = doc.append(alloc.hardline()).append(alloc.hardline());
                }
                first = false;
                let cont = self.continuation(cont_id);
                let params = print_values(&cont.params, alloc);
                let mut block = alloc
                    .text(cont.name.clone())
                    .append(if cont_id == entry { alloc.text(" ").append(AT).append(alloc.typ(&name.0)) } else { alloc.nil() })
                    .append("(")
                    .append(params)
                    .append(")")
                    .append(" ")
                    .append(LBRACE);
                let mut body = alloc.nil();
                for primop_id in &cont.body {
                    body = body.append(alloc.hardline()).append(self.primop(*primop_id).print(cfg, alloc));
                }
                if let Some(terminator) = &cont.terminator {
                    body = body.append(alloc.hardline()).append(terminator.print(cfg, alloc));
                }
                block = block.append(body.nest(INDENT)).append(alloc.hardline()).append(RBRACE);
                doc = doc.append(block);
            }
        }
        doc
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use ast::QualName;
    use lowering::GirType;
    use printer::print_to_string::PrintToString;

    use super::*;
    use crate::builder::Builder as GirBuilder;

    #[test]
    fn an_apply_terminator_prints_with_the_apply_token() {
        let mut module = Module::new(QualName::from("test"));
        let entry = module.new_continuation("test");
        let ret = module.new_continuation("test.ret");
        let param = module.new_parameter(entry, Rc::new(GirType::Type));
        module.entries.insert(QualName::from("test"), entry);
        {
            let mut builder = GirBuilder::new(&mut module, entry);
            let callee = builder.function_ref(ret, Rc::new(GirType::Function { args: vec![], result: Rc::new(GirType::Type) }));
            builder.apply(callee, vec![param], Rc::new(GirType::Type));
        }
        module.set_terminator(ret, Terminator::Unreachable);
        let rendered = module.print_to_string(None);
        assert!(rendered.contains(APPLY));
    }
}
