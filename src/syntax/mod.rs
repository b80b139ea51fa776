pub use nodes::*;
pub use parser::{parse, ParseError};
pub use printer::{print, print_node};
pub use source_map::print_with_map;

/// Stylesheet tree: rules, at-rules, declarations, comments and their raw formatting
pub mod nodes;
/// Raw-preserving stylesheet parser
mod parser;
/// Stylesheet printer
mod printer;
/// Inline source-map emission
mod source_map;
