use crate::types::{Alloc, Print, PrintCfg};

pub trait PrintToString {
    fn print_to_string(&self, cfg: Option<PrintCfg>) -> String;
}

impl<T: Print> PrintToString for T {
    fn print_to_string(&self, cfg: Option<PrintCfg>) -> String {
        let cfg = cfg.unwrap_or_default();
        let alloc = Alloc::new();
        let mut buf = Vec::new();
        {
            let doc_builder = self.print(&cfg, &alloc);
            doc_builder.1.render(cfg.width, &mut buf).expect("failed to render to string");
        }
        String::from_utf8(buf).expect("printer produced invalid utf8")
    }
}
