//! A crate for assembling and executing programs for the Little Man Computer, the imaginary
//! mailbox machine used in teaching computer architecture.
//!
//! Currently this crate provides the functionality to:
//! - Parse symbolic LMC assembly into a list of statements.
//! - Assemble the statements into memory words, resolving labels.
//! - Execute the words one instruction at a time, with pluggable input and output.
//!
//! # Example
//! ```
//! use lmc::{
//!     assemble,
//!     machine::{Machine, TestInput, TestOutput},
//! };
//!
//! // Adds 13 and 15 together and prints the answer.
//! let source = r#"
//!         LDA x
//!         ADD y
//!         OUT
//!         HLT
//! x       DAT 13
//! y       DAT 15
//! "#;
//!
//! // Parse and assemble the source into words.
//! let program = assemble(source).unwrap();
//!
//! // Load the words into a machine which records its output.
//! let mut machine = Machine::new(TestInput::new(), TestOutput::new());
//! machine.load(&program).unwrap();
//!
//! // Execute until HLT.
//! machine.run().unwrap();
//!
//! assert_eq!(machine.context.output, "28");
//! ```
//!
//! # Executables
//!
//! ## `lmcrun`
//!
//! Assembles and executes a source file, reading `INP` values from the standard input.
//! Built with the `lmcrun` feature.
pub mod compiler;
pub mod error;
pub mod event;
pub mod instruction;
pub mod machine;
pub mod parsing;
pub mod program;
pub mod source_map;
pub mod symbol_table;
pub mod symbolic;

pub use compiler::assemble;
pub use machine::Machine;
pub use program::Program;
