pub use pretty::DocAllocator;
pub use pretty::termcolor;
pub use pretty::termcolor::Color;
pub use pretty::termcolor::ColorChoice;
pub use pretty::termcolor::ColorSpec;
pub use pretty::termcolor::StandardStream;
pub use pretty::termcolor::WriteColor;

pub mod print_to_string;
pub mod theme;
pub mod tokens;
pub mod types;
pub mod util;

pub use print_to_string::PrintToString;
pub use types::*;
pub use util::print_comma_separated;

pub const DEFAULT_WIDTH: usize = 100;
