//! PDF syntax: tokens and objects.

pub mod lexer;
pub mod objects;

pub use lexer::{Lexer, Token};
pub use objects::{parse_indirect_object, parse_object};
