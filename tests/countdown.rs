use lmc::{
    assemble,
    machine::{Machine, MachineError, MachineErrorKind, TestInput, TestOutput},
    Program,
};

fn compile_program() -> Program {
    assemble(include_str!("countdown.lmc")).expect("could not assemble countdown.lmc")
}

fn machine(start: i32) -> Machine<TestInput, TestOutput> {
    let mut machine = Machine::new(TestInput::with_input(vec![start]), TestOutput::new());
    machine.load(&compile_program()).unwrap();
    machine
}

#[test]
fn test_countdown_compile_program() {
    assert_eq!(compile_program().words, vec![901, 902, 705, 206, 601, 0, 1]);
}

#[test]
fn test_countdown_emulate_program() {
    let mut machine = machine(3);

    machine.run().unwrap();

    assert_eq!(machine.context.output, "3\n2\n1\n0");
    assert_eq!(machine.output.numbers(), vec![3, 2, 1, 0]);
}

#[test]
fn test_countdown_cycle_budget() {
    // A negative start never reaches zero before wrapping around.
    let mut machine = machine(-5);

    assert_eq!(machine.run_cycles(1000), Ok(false));
    assert!(!machine.context.halted);
    assert_eq!(machine.output.numbers()[..3], [-5, -6, -7]);

    machine.reset();
    assert_eq!(machine.context.output, "");
    assert!(machine.context.memory.iter().all(|&word| word == 0));
}

#[test]
fn test_countdown_corrupted() {
    let program = compile_program();

    let mut machine = machine(3);
    machine.context.memory[5] = 405;

    let err = machine.run().unwrap_err();
    assert!(matches!(err, MachineError { address: 5, kind: MachineErrorKind::BadInstruction { word: 405, .. } }));
    assert!(machine.context.halted);

    let lines = program.source_map.into_line_based(include_str!("countdown.lmc"));
    assert_eq!(lines.line_of(err.address), Some(6));
}
