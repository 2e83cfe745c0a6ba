use slog::{o, Drain, Logger};
use slog_term::{FullFormat, TermDecorator};

use lmc::{
    compiler::{assemble_with_logger, AssemblerOptions},
    machine::{Machine, MachineError, MachineErrorKind, NoInput, NoOutput},
    symbolic,
};

fn logger() -> Logger {
    let decorator = TermDecorator::new().build();
    let drain = FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();

    Logger::root(drain, o!())
}

#[test]
fn test_add_round_trip() {
    let source = include_str!("add.lmc");
    let logger = logger();

    let program = assemble_with_logger(source, &AssemblerOptions::default(), logger.clone())
        .expect("could not assemble add.lmc");

    assert_eq!(program.words, vec![504, 105, 306, 0, 5, 7, 0]);

    let mut machine = Machine::with_logger(NoInput, NoOutput, logger);
    machine.load(&program).unwrap();
    machine.run().unwrap();

    let c = program.address_of("c").unwrap();
    assert_eq!(machine.context.memory[c], 12);
    assert_eq!(machine.context.accumulator, 12);
    assert_eq!(machine.context.instruction_pointer, 4);
}

#[test]
fn test_add_parse_is_separate_from_compile() {
    let symprog = symbolic::Program::parse(include_str!("add.lmc")).unwrap();

    assert_eq!(symprog.len(), 7);

    let first = symprog.compile().unwrap();
    let second = symprog.compile().unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_add_loaded_elsewhere() {
    let program = lmc::assemble(include_str!("add.lmc")).unwrap();

    let mut machine = Machine::new(NoInput, NoOutput);
    machine.load_program_at(&program, 50).unwrap();
    machine.context.instruction_pointer = 50;

    assert_eq!(&machine.context.memory[50..57], &[554, 155, 356, 0, 5, 7, 0]);
    assert!(machine.context.memory[..50].iter().all(|&word| word == 0));

    machine.run().unwrap();

    assert_eq!(machine.context.memory[56], 12);
    assert_eq!(machine.context.memory[6], 0);

    let source_map = program.source_map.clone().relocate(50);
    assert_eq!(source_map.get_source_span(54), program.source_map.get_source_span(4));
    assert_eq!(source_map.statement(54, include_str!("add.lmc")), Some("a       dat 5"));
}

#[test]
fn test_add_label_operands_follow_the_program() {
    let program = lmc::assemble("LDA one\nOUT\nHLT\none DAT 7").unwrap();

    let mut machine = Machine::new(NoInput, NoOutput);
    machine.load_program_at(&program, 50).unwrap();
    machine.context.instruction_pointer = 50;
    machine.run().unwrap();

    assert_eq!(machine.context.output, "7");

    let err = machine.load_program_at(&program, 97).unwrap_err();
    assert_eq!(err, MachineError { address: 100, kind: MachineErrorKind::OutOfBounds });
}
