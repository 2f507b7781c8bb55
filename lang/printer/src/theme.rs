use pretty::DocAllocator;

use crate::types::Anno;
use crate::types::{Alloc, Builder};

pub trait ThemeExt<'a> {
    fn keyword(&'a self, text: &str) -> Builder<'a>;
    fn ctor(&'a self, text: &str) -> Builder<'a>;
    fn dtor(&'a self, text: &str) -> Builder<'a>;
    fn typ(&'a self, text: &str) -> Builder<'a>;
    fn comment(&'a self, text: &str) -> Builder<'a>;
    fn reference(&'a self, uri: &str, text: &str) -> Builder<'a>;
}

impl<'a> ThemeExt<'a> for Alloc<'a> {
    fn keyword(&'a self, text: &str) -> Builder<'a> {
        self.text(text.to_owned()).annotate(Anno::Keyword)
    }

    fn ctor(&'a self, text: &str) -> Builder<'a> {
        self.text(text.to_owned()).annotate(Anno::Ctor)
    }

    fn dtor(&'a self, text: &str) -> Builder<'a> {
        self.text(text.to_owned()).annotate(Anno::Dtor)
    }

    fn typ(&'a self, text: &str) -> Builder<'a> {
        self.text(text.to_owned()).annotate(Anno::Type)
    }

    fn comment(&'a self, text: &str) -> Builder<'a> {
        self.text(text.to_owned()).annotate(Anno::Comment)
    }

    fn reference(&'a self, uri: &str, text: &str) -> Builder<'a> {
        self.text(text.to_owned()).annotate(Anno::Reference(uri.to_owned(), text.to_owned()))
    }
}

/// Maps an [`Anno`] onto a concrete terminal color for the `termcolor`-backed
/// renderer in [`crate::print_to_string`].
pub fn color_spec(anno: &Anno) -> pretty::termcolor::ColorSpec {
    use pretty::termcolor::Color;
    let mut spec = pretty::termcolor::ColorSpec::new();
    match anno {
        Anno::Keyword => {
            spec.set_fg(Some(Color::Blue)).set_bold(true);
        }
        Anno::Ctor => {
            spec.set_fg(Some(Color::Green));
        }
        Anno::Dtor => {
            spec.set_fg(Some(Color::Magenta));
        }
        Anno::Type => {
            spec.set_fg(Some(Color::Yellow));
        }
        Anno::Comment => {
            spec.set_fg(Some(Color::Black)).set_italic(true);
        }
        Anno::Reference(_, _) => {
            spec.set_underline(true);
        }
    }
    spec
}
