//! Lexer for the mscript language
//!
//! The compiler consumes a flat list of [`Element`]s rather than a syntax
//! tree: the pest grammar only classifies characters into tokens, and line
//! breaks survive as explicit `Separator` elements because statement
//! boundaries are significant.

pub mod lexer;
pub mod symbol;

pub use lexer::{parse_script, ParseError};
pub use symbol::{Element, Symbol};
