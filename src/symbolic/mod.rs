//! Parsing symbolic assembly programs.

pub mod literal;
pub mod program;
pub mod reader;
pub mod token;

pub use self::program::{Operand, Program, Spanned, Statement};
