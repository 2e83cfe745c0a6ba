//! Assembled programs.

use std::convert::TryFrom;
use std::fmt;

use crate::instruction::{Address, Instruction, Word};
use crate::parsing::Span;
use crate::source_map::SourceMap;
use crate::symbol_table::SymbolTable;

/// An assembled program: one word per statement, in source order.
///
/// Addresses in the program are relative to the start of the program, which is where the
/// labels were bound. Use [Program::relocated_words] to place it anywhere else.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub words: Vec<Word>,
    pub symbol_table: SymbolTable,
    pub source_map: SourceMap<Span>,
    /// Addresses of the words whose operand is a label.
    pub relocations: Vec<Address>,
}

impl Program {
    pub fn words(&self) -> &[Word] {
        &self.words[..]
    }

    /// The words of the program as if it had been assembled to start at `offset`.
    ///
    /// Label operands move along with the program. Literal operands are absolute and stay as
    /// they are. `offset` is expected to be a mailbox address.
    pub fn relocated_words(&self, offset: Address) -> Vec<Word> {
        let mut words = self.words.clone();

        for &addr in &self.relocations {
            words[addr] += offset as Word;
        }

        words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// The address a label was bound to.
    pub fn address_of<S: AsRef<str>>(&self, label: S) -> Option<Address> {
        self.symbol_table.address_of(label)
    }
}

/// Prints a listing with the address, the encoded word, the decoded instruction and the labels
/// of every word. Words that do not decode are listed as `DAT`.
impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (addr, word) in self.words.iter().enumerate() {
            let labels: Vec<_> = self.symbol_table
                .defined()
                .filter(|&(_, a)| a == addr)
                .map(|(label, _)| label)
                .collect();

            let ins = match Instruction::try_from(*word) {
                Ok(ins) => ins.to_string(),
                Err(_) => "DAT".to_string(),
            };

            write!(f, "{:02}  {:03}  {:<8}", addr, word, ins)?;

            if !labels.is_empty() {
                write!(f, "  {}", labels.join(", "))?;
            }

            writeln!(f)?;
        }

        Ok(())
    }
}
