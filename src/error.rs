//! Errors produced while assembling a program.
//!
//! For errors produced while executing a program see [MachineError](crate::machine::MachineError).

use std::fmt::{self, Display};

use crate::instruction::OpCode;
use crate::parsing::{line_location, Span};

/// The reason an assembly was aborted.
#[derive(Clone, Debug, PartialEq)]
pub enum AssemblyErrorKind {
    /// A word in mnemonic position is not a known mnemonic.
    InvalidOpcode {
        word: String,
        /// The closest known mnemonic, if the word looks like a typo of one.
        suggestion: Option<&'static str>,
    },

    /// A numeric literal that does not fit into a memory word.
    NumberFormat {
        word: String,
    },

    /// The source ended where an operand was expected.
    MissingOperand {
        opcode: OpCode,
    },

    /// A label was referenced but never defined.
    UndefinedReference {
        label: String,
    },

    /// A label was defined twice while duplicate definitions are rejected.
    DuplicateLabel {
        label: String,
        previous: Span,
    },
}

impl Display for AssemblyErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AssemblyErrorKind::InvalidOpcode { word, suggestion: Some(suggestion) } => {
                write!(f, "invalid op '{}', did you mean '{}'?", word, suggestion)
            }
            AssemblyErrorKind::InvalidOpcode { word, suggestion: None } => {
                write!(f, "invalid op '{}'", word)
            }
            AssemblyErrorKind::NumberFormat { word } => {
                write!(f, "'{}' is not a valid number", word)
            }
            AssemblyErrorKind::MissingOperand { opcode } => {
                write!(f, "{} expects an operand", opcode)
            }
            AssemblyErrorKind::UndefinedReference { label } => {
                write!(f, "undefined reference {}", label)
            }
            AssemblyErrorKind::DuplicateLabel { label, .. } => {
                write!(f, "label '{}' is defined more than once", label)
            }
        }
    }
}

/// Error type that contains the reason of the error and the location of the offending word.
///
/// For line and column information see [AssemblyError::verbose].
#[derive(Clone, Debug, PartialEq)]
pub struct AssemblyError {
    pub kind: AssemblyErrorKind,
    /// Byte offsets of the offending word. `None` if the source ended unexpectedly.
    pub span: Option<Span>,
}

impl AssemblyError {
    pub(crate) fn new(kind: AssemblyErrorKind, span: Span) -> AssemblyError {
        AssemblyError {
            kind,
            span: Some(span),
        }
    }

    pub(crate) fn eos(kind: AssemblyErrorKind) -> AssemblyError {
        AssemblyError {
            kind,
            span: None,
        }
    }

    /// Calculates the error location information from the [AssemblyError] and the original
    /// source.
    ///
    /// # Parameters
    /// - `source`: The original source text or an exact copy of it.
    pub fn verbose(self, source: &str) -> VerboseAssemblyError {
        let start = self.span
            .as_ref()
            .map(|span| span.start)
            .unwrap_or(source.len())
            .min(source.len());

        let location = line_location(source, start);

        let rest = source[start..]
            .split('\n')
            .next()
            .unwrap_or("");

        let end = rest
            .char_indices()
            .nth(20)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());

        VerboseAssemblyError {
            line: location.line,
            column: location.column,
            kind: self.kind,
            rest: &rest[..end],
        }
    }
}

impl Display for AssemblyError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.span {
            Some(ref span) => write!(f, "{} at {}..{}", self.kind, span.start, span.end),
            None => write!(f, "{} at end of input", self.kind),
        }
    }
}

impl std::error::Error for AssemblyError {}

/// Error type containing location information in addition to the reason of the error.
///
/// Created from an [AssemblyError] with [AssemblyError::verbose].
#[derive(Clone, Debug)]
pub struct VerboseAssemblyError<'a> {
    /// The line number of the error location.
    pub line: usize,
    /// The column number of the error location.
    pub column: usize,
    pub kind: AssemblyErrorKind,
    rest: &'a str,
}

impl<'a> Display for VerboseAssemblyError<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.rest.is_empty() {
            write!(f, "at line {} col {}: {}", self.line, self.column, self.kind)
        } else {
            write!(f, "at line {} col {}: {}, at '{}'", self.line, self.column, self.kind, self.rest)
        }
    }
}
