//! The second assembly pass: resolving labels and encoding the statements into words.

use crate::error::{AssemblyError, AssemblyErrorKind};
use crate::instruction::{Address, Word, MEMORY_SIZE};
use crate::parsing::Span;
use crate::program::Program;
use crate::symbol_table::SymbolTable;
use crate::symbolic::{self, Operand, Spanned};

use slog::{debug, o, trace, warn, Discard, Logger};

/// What to do when a label is defined more than once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateLabels {
    /// The last definition wins.
    Overwrite,

    /// The second definition fails the assembly with
    /// [DuplicateLabel](AssemblyErrorKind::DuplicateLabel).
    Reject,
}

impl Default for DuplicateLabels {
    fn default() -> Self {
        DuplicateLabels::Overwrite
    }
}

#[derive(Debug, Clone, Default)]
pub struct AssemblerOptions {
    pub duplicate_labels: DuplicateLabels,
}

impl AssemblerOptions {
    pub fn reject_duplicate_labels(mut self) -> Self {
        self.duplicate_labels = DuplicateLabels::Reject;
        self
    }
}

/// Assembles the source text into a program with the default options.
pub fn assemble(source: &str) -> Result<Program, AssemblyError> {
    assemble_with_logger(source, &AssemblerOptions::default(), None)
}

pub fn assemble_with_logger<L>(
    source: &str,
    options: &AssemblerOptions,
    logger: L,
) -> Result<Program, AssemblyError>
where
    L: Into<Option<Logger>>,
{
    let program = symbolic::Program::parse(source)?;
    compile_with_logger(&program, options, logger)
}

impl symbolic::Program {
    /// Resolves the labels of the program and encodes it.
    pub fn compile(&self) -> Result<Program, AssemblyError> {
        compile(self)
    }

    pub fn compile_with(&self, options: &AssemblerOptions) -> Result<Program, AssemblyError> {
        compile_with_logger(self, options, None)
    }
}

/// Compiles the parsed program into words.
///
/// Never looks at the source text again. Every statement becomes one word, the label
/// references are filled in after all statements have been encoded so that labels can be
/// used before they are defined.
pub fn compile(symprog: &symbolic::Program) -> Result<Program, AssemblyError> {
    compile_with_logger(symprog, &AssemblerOptions::default(), None)
}

pub fn compile_with_logger<L>(
    symprog: &symbolic::Program,
    options: &AssemblerOptions,
    logger: L,
) -> Result<Program, AssemblyError>
where
    L: Into<Option<Logger>>,
{
    let logger = logger
        .into()
        .unwrap_or(Logger::root(Discard, o!()))
        .new(o!("stage" => "assembly"));

    let mut symbol_table = SymbolTable::new();
    let mut words = Vec::with_capacity(symprog.len());
    let mut relocation_table = Vec::<(Address, &str, Span)>::new();
    let mut source_map = Vec::with_capacity(symprog.len());

    for statement in &symprog.statements {
        let loc_log = logger.new(o!("address" => statement.address));

        let mut word = statement.opcode.value.base_code();

        match &statement.operand {
            Some(Spanned { value: Operand::Literal { value, text }, span }) => {
                word = word.checked_add(*value).ok_or_else(|| {
                    let kind = AssemblyErrorKind::NumberFormat { word: text.clone() };
                    AssemblyError::new(kind, span.clone())
                })?;
            },
            Some(Spanned { value: Operand::Reference(label), span }) => {
                trace!(loc_log, "add a location to relocation table"; "label" => label.as_str());
                symbol_table.reference_symbol(span.clone(), label);
                relocation_table.push((statement.address, label.as_str(), span.clone()));
            },
            None => (),
        }

        trace!(loc_log, "append word"; "opcode" => statement.opcode.value.mnemonic(), "word" => word);
        words.push(word);

        if let Some(label) = &statement.label {
            trace!(loc_log, "add a label to the symbol table"; "label" => label.value.as_str());

            let previous = symbol_table.define_symbol(label.span.clone(), &label.value, statement.address);

            if let Some(previous) = previous {
                match options.duplicate_labels {
                    DuplicateLabels::Reject => {
                        let kind = AssemblyErrorKind::DuplicateLabel {
                            label: label.value.clone(),
                            previous,
                        };

                        return Err(AssemblyError::new(kind, label.span.clone()));
                    },
                    DuplicateLabels::Overwrite => {
                        warn!(loc_log, "label redefined"; "label" => label.value.as_str());
                    },
                }
            }
        }

        source_map.push((statement.address, statement.span()));
    }

    let mut relocations = Vec::with_capacity(relocation_table.len());

    for (addr, label, span) in relocation_table {
        let target = symbol_table.address_of(label).ok_or_else(|| {
            let kind = AssemblyErrorKind::UndefinedReference { label: label.to_string() };
            AssemblyError::new(kind, span)
        })?;

        trace!(logger, "replace address part"; "address" => addr, "label" => label, "target" => target);

        words[addr] += target as Word;
        relocations.push(addr);
    }

    if words.len() > MEMORY_SIZE {
        warn!(logger, "program does not fit into memory"; "words" => words.len(), "memory" => MEMORY_SIZE);
    }

    debug!(logger, "assembled program"; "words" => words.len());

    Ok(Program {
        words,
        symbol_table,
        source_map: source_map.into_iter().collect(),
        relocations,
    })
}

#[test]
fn test_compile() {
    let source = "LDA a\nADD b\nSTA c\nHLT\na DAT 5\nb DAT 7\nc DAT 0";

    let program = assemble(source).unwrap();

    assert_eq!(program.words, vec![504, 105, 306, 0, 5, 7, 0]);
    assert_eq!(program.address_of("a"), Some(4));
    assert_eq!(program.address_of("c"), Some(6));
}

#[test]
fn test_compile_forward_and_backward_references() {
    let program = assemble("BRA target\ntarget LDA target\nBRA target").unwrap();

    assert_eq!(program.words, vec![601, 501, 601]);
}

#[test]
fn test_compile_relocations() {
    let program = assemble("LDA one\nOUT\nBRA 0\none DAT 7").unwrap();

    assert_eq!(program.relocations, vec![0]);
    assert_eq!(program.relocated_words(50), vec![553, 902, 600, 7]);
    assert_eq!(program.relocated_words(0), program.words);
}

#[test]
fn test_compile_literals() {
    let program = assemble("lda 7\nout\notc\ninp\nbrp -1\nx dat 0x10\ndat").unwrap();

    assert_eq!(program.words, vec![507, 902, 922, 901, 799, 16, 0]);
}

#[test]
fn test_compile_empty() {
    let program = assemble("").unwrap();

    assert!(program.is_empty());
}

#[test]
fn test_compile_undefined_reference() {
    let err = assemble("LDA missing\nHLT").unwrap_err();

    assert_eq!(err.kind, AssemblyErrorKind::UndefinedReference { label: "missing".into() });
    assert_eq!(err.span, Some(4..11));
}

#[test]
fn test_compile_labels_are_case_sensitive() {
    let err = assemble("LDA Value\nHLT\nvalue DAT 1").unwrap_err();

    assert_eq!(err.kind, AssemblyErrorKind::UndefinedReference { label: "Value".into() });
}

#[test]
fn test_compile_duplicate_labels() {
    let source = "LDA x\nHLT\nx DAT 1\nx DAT 2";

    let program = assemble(source).unwrap();
    assert_eq!(program.words, vec![503, 0, 1, 2]);

    let options = AssemblerOptions::default().reject_duplicate_labels();
    let err = assemble_with_logger(source, &options, None).unwrap_err();

    assert_eq!(err.kind, AssemblyErrorKind::DuplicateLabel { label: "x".into(), previous: 10..11 });
    assert_eq!(err.span, Some(18..19));
}

#[test]
fn test_compile_sourcemap() {
    let source = r#"
// print the sum
        LDA x
        ADD y
        OUT
        HLT
x       DAT 13
y       DAT 15
"#;

    let program = assemble(source).unwrap();

    let source_lines = program.source_map
        .clone()
        .into_line_based(source);

    let line = |addr| source_lines.get_source_span(addr).map(|span| span.start.line);

    assert_eq!(line(0), Some(3));
    assert_eq!(line(3), Some(6));
    assert_eq!(line(5), Some(8));

    let span = program.source_map.get_source_span(4).cloned().unwrap();
    assert_eq!(&source[span], "x       DAT 13");
}
