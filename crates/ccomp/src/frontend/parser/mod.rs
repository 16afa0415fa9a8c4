//! Parser for the C subset

mod parser;

pub use parser::Parser;
