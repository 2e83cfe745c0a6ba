//! The first assembly pass: turning source text into a list of statements.

use std::fmt;
use std::iter;

use itertools::Itertools;

use crate::error::{AssemblyError, AssemblyErrorKind};
use crate::instruction::{Address, OpCode, Word};
use crate::parsing::Span;

use super::literal::{parse_literal, Literal};
use super::reader::{Reader, SourceWord};

/// A value together with the location it was read from.
#[derive(Clone, Debug, PartialEq)]
pub struct Spanned<T> {
    pub value: T,
    pub span: Span,
}

/// The operand written after a mnemonic.
#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    /// A number. `text` is the literal as it was written.
    Literal {
        value: Word,
        text: String,
    },

    /// A label that is replaced with its address in the second pass.
    Reference(String),
}

impl Operand {
    pub fn text(&self) -> &str {
        match self {
            Operand::Literal { text, .. } => text,
            Operand::Reference(label) => label,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.text())
    }
}

/// One line of assembly: an optional label, a mnemonic and an optional operand.
#[derive(Clone, Debug, PartialEq)]
pub struct Statement {
    /// Position of the statement in the program and the address it assembles into.
    pub address: Address,
    pub label: Option<Spanned<String>>,
    pub opcode: Spanned<OpCode>,
    pub operand: Option<Spanned<Operand>>,
    /// Line breaks and comments that precede the statement.
    pub layout: String,
}

impl Statement {
    /// The span from the label (or mnemonic) to the end of the operand (or mnemonic).
    pub fn span(&self) -> Span {
        let start = self.label
            .as_ref()
            .map(|label| label.span.start)
            .unwrap_or(self.opcode.span.start);

        let end = self.operand
            .as_ref()
            .map(|operand| operand.span.end)
            .unwrap_or(self.opcode.span.end);

        start..end
    }

    /// The label this statement refers to in its operand.
    pub fn reference(&self) -> Option<&Spanned<Operand>> {
        self.operand
            .as_ref()
            .filter(|operand| match operand.value {
                Operand::Reference(_) => true,
                Operand::Literal { .. } => false,
            })
    }

    fn render(&self) -> String {
        let label = self.label
            .as_ref()
            .map(|label| label.value.as_str())
            .unwrap_or("");

        let operand = self.operand
            .as_ref()
            .map(|operand| operand.value.text());

        iter::once(label)
            .chain(iter::once(self.opcode.value.mnemonic()))
            .chain(operand)
            .join("\t")
    }
}

/// A parsed, not yet resolved assembly program.
///
/// Created with [Program::parse] and turned into an executable
/// [Program](crate::program::Program) with [Program::compile].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Program {
    pub statements: Vec<Statement>,
    /// Line breaks and comments after the last statement.
    pub trailing_layout: String,
}

fn invalid_opcode(words: &[&SourceWord], span: Span) -> AssemblyError {
    let word = words.iter().map(|w| w.text).join(" ");

    let suggestion = words.iter()
        .rev()
        .find_map(|w| OpCode::suggest(w.text));

    AssemblyError::new(AssemblyErrorKind::InvalidOpcode { word, suggestion }, span)
}

fn number_format(word: &SourceWord) -> AssemblyError {
    let kind = AssemblyErrorKind::NumberFormat {
        word: word.text.to_string(),
    };

    AssemblyError::new(kind, word.span.clone())
}

fn literal_operand(word: &SourceWord, value: Word) -> Spanned<Operand> {
    Spanned {
        value: Operand::Literal {
            value,
            text: word.text.to_string(),
        },
        span: word.span.clone(),
    }
}

impl Program {
    /// Reads the source text statement by statement.
    ///
    /// A line is either `MNEMONIC [OPERAND]` or `LABEL MNEMONIC [OPERAND]`. Labels are not
    /// resolved here, so a label may be used before it is defined.
    pub fn parse(source: &str) -> Result<Program, AssemblyError> {
        let mut reader = Reader::new(source);
        let mut statements = Vec::new();

        loop {
            let layout = reader.skip_layout();

            let first = match reader.read_word() {
                Some(word) => word,
                None => {
                    return Ok(Program {
                        statements,
                        trailing_layout: layout,
                    })
                },
            };

            let (label, opcode) = match OpCode::lookup(first.text) {
                Some(opcode) => (None, Spanned { value: opcode, span: first.span.clone() }),
                None => {
                    let word = reader.read_word()
                        .ok_or_else(|| invalid_opcode(&[&first], first.span.clone()))?;

                    let opcode = OpCode::lookup(word.text)
                        .ok_or_else(|| invalid_opcode(&[&first, &word], first.span.start..word.span.end))?;

                    let label = Spanned {
                        value: first.text.to_string(),
                        span: first.span.clone(),
                    };

                    (Some(label), Spanned { value: opcode, span: word.span })
                },
            };

            let operand = if opcode.value.is_data() {
                // The value of DAT is optional, so only a literal is taken from the stream.
                match reader.peek_word() {
                    Some(word) => match parse_literal(word.text) {
                        Literal::Number(value) => {
                            reader.read_word();
                            Some(literal_operand(&word, value))
                        },
                        Literal::Malformed => return Err(number_format(&word)),
                        Literal::NotANumber => None,
                    },
                    None => None,
                }
            } else if opcode.value.has_operand() {
                let word = reader.read_word()
                    .ok_or_else(|| AssemblyError::eos(AssemblyErrorKind::MissingOperand {
                        opcode: opcode.value,
                    }))?;

                match parse_literal(word.text) {
                    Literal::Number(value) => Some(literal_operand(&word, value)),
                    Literal::Malformed => return Err(number_format(&word)),
                    Literal::NotANumber => Some(Spanned {
                        value: Operand::Reference(word.text.to_string()),
                        span: word.span,
                    }),
                }
            } else {
                None
            };

            statements.push(Statement {
                address: statements.len(),
                label,
                opcode,
                operand,
                layout,
            });
        }
    }

    /// Renders a normalized listing of the program: one `label<TAB>MNEMONIC<TAB>operand` line
    /// per statement, with the comments and blank lines of the source kept in place.
    pub fn pretty(&self) -> String {
        let mut listing = String::new();

        for statement in &self.statements {
            listing.push_str(&statement.layout);
            listing.push_str(&statement.render());
        }

        listing.push_str(&self.trailing_layout);

        listing
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opcodes(program: &Program) -> Vec<OpCode> {
        program.statements.iter().map(|s| s.opcode.value).collect()
    }

    #[test]
    fn parse_labels_and_operands() {
        let program = Program::parse("start LDA x\n  out\n  BRA start\nx DAT 7").unwrap();

        assert_eq!(opcodes(&program), vec![
            OpCode::Load,
            OpCode::Output,
            OpCode::Branch,
            OpCode::Data,
        ]);

        let first = &program.statements[0];
        assert_eq!(first.label.as_ref().map(|l| l.value.as_str()), Some("start"));
        assert_eq!(first.operand.as_ref().map(|o| o.value.clone()), Some(Operand::Reference("x".into())));
        assert_eq!(first.span(), 0..11);

        let data = &program.statements[3];
        assert_eq!(data.address, 3);
        assert_eq!(
            data.operand.as_ref().map(|o| o.value.clone()),
            Some(Operand::Literal { value: 7, text: "7".into() }),
        );
    }

    #[test]
    fn data_operand_is_optional() {
        let program = Program::parse("a DAT\nb DAT HLT\nc DAT -3").unwrap();

        assert_eq!(opcodes(&program), vec![OpCode::Data, OpCode::Data, OpCode::Halt, OpCode::Data]);
        assert!(program.statements[0].operand.is_none());
        assert!(program.statements[1].operand.is_none());
        assert_eq!(program.statements[3].operand.as_ref().map(|o| o.value.text()), Some("-3"));
    }

    #[test]
    fn empty_source() {
        let program = Program::parse("  \n// nothing here\n").unwrap();
        assert!(program.is_empty());
        assert_eq!(program.trailing_layout, "\n// nothing here\n");
    }

    #[test]
    fn invalid_opcodes() {
        let err = Program::parse("FOO 5").unwrap_err();
        assert_eq!(err.kind, AssemblyErrorKind::InvalidOpcode { word: "FOO 5".into(), suggestion: None });
        assert_eq!(err.span, Some(0..5));

        let err = Program::parse("HLT\nlonely").unwrap_err();
        assert_eq!(err.kind, AssemblyErrorKind::InvalidOpcode { word: "lonely".into(), suggestion: None });

        let err = Program::parse("LDX 5").unwrap_err();
        assert_eq!(err.kind, AssemblyErrorKind::InvalidOpcode { word: "LDX 5".into(), suggestion: Some("LDA") });
    }

    #[test]
    fn number_after_label_is_not_an_opcode() {
        let err = Program::parse("x 5").unwrap_err();
        assert!(matches!(err.kind, AssemblyErrorKind::InvalidOpcode { .. }));
    }

    #[test]
    fn missing_operand() {
        let err = Program::parse("LDA").unwrap_err();
        assert_eq!(err.kind, AssemblyErrorKind::MissingOperand { opcode: OpCode::Load });
        assert_eq!(err.span, None);
    }

    #[test]
    fn overflowing_literals() {
        let err = Program::parse("ADD 99999999999").unwrap_err();
        assert_eq!(err.kind, AssemblyErrorKind::NumberFormat { word: "99999999999".into() });
        assert_eq!(err.span, Some(4..15));

        let err = Program::parse("x DAT 0x1FFFFFFFF").unwrap_err();
        assert!(matches!(err.kind, AssemblyErrorKind::NumberFormat { .. }));
    }

    #[test]
    fn pretty_listing() {
        let source = "// adds\nstart lda a\n   hlt\n\na dat 5 // five\n";
        let program = Program::parse(source).unwrap();

        assert_eq!(
            program.pretty(),
            "\n// adds\nstart\tLDA\ta\n\tHLT\n\na\tDAT\t5\n// five\n",
        );

        // A listing renders to itself.
        let again = Program::parse(&program.pretty()).unwrap();
        assert_eq!(again.pretty(), program.pretty());
    }
}
