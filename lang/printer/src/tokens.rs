//! Textual tokens shared by every pretty-printed surface and by the GIR
//! serializer's textual grammar, kept in one place so the two stay in sync.

pub const INDENT: isize = 4;

// Symbols
pub const SEMI: &str = ";";
pub const EQ: &str = "=";
pub const FAT_ARROW: &str = "=>";
pub const ARROW: &str = "->";
pub const COMMA: &str = ",";
pub const COLON: &str = ":";
pub const COLONEQ: &str = ":=";
pub const DOT: &str = ".";
pub const AT: &str = "@";
pub const PERCENT: &str = "%";
pub const STAR: &str = "*";
pub const LPAREN: &str = "(";
pub const RPAREN: &str = ")";
pub const LBRACE: &str = "{";
pub const RBRACE: &str = "}";
pub const QUESTION: &str = "?";
pub const UNDERSCORE: &str = "_";

// Keywords (surface)
pub const TYPE: &str = "Type";
pub const LAMBDA: &str = "\\";
pub const LET: &str = "let";
pub const REFL: &str = "refl";
pub const MODULE: &str = "module";
pub const WHERE: &str = "where";
pub const DATA: &str = "data";
pub const RECORD: &str = "record";
pub const POSTULATE: &str = "postulate";
pub const ABSURD: &str = "absurd";

// GIR grammar keywords (see `lowering`/`gir` crates' textual serializer)
pub const BOX: &str = "@box";
pub const DEFAULT: &str = "default";
pub const SWITCH_CONSTR: &str = "switch_constr";
pub const APPLY: &str = "apply";
pub const UNREACHABLE: &str = "unreachable";
