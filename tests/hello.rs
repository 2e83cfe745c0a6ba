use lmc::{
    assemble,
    machine::{Machine, NoInput, TestOutput},
    symbolic,
    Program,
};

fn compile_program() -> Program {
    assemble(include_str!("hello.lmc")).expect("could not assemble hello.lmc")
}

#[test]
fn test_hello_compile_program() {
    let p = compile_program();

    assert_eq!(p.words, vec![507, 922, 508, 922, 509, 922, 0, 72, 105, 33]);
    assert_eq!(p.address_of("bang"), Some(9));
}

#[test]
fn test_hello_emulate_program() {
    let mut machine = Machine::new(NoInput, TestOutput::new());
    machine.load(&compile_program()).unwrap();

    machine.run().unwrap();

    assert_eq!(machine.context.output, "Hi!");
    assert_eq!(machine.output.into_output(), vec!["H", "i", "!"]);
}

#[test]
fn test_hello_listing() {
    let listing = compile_program().to_string();
    let lines: Vec<_> = listing.lines().collect();

    assert_eq!(lines.len(), 10);
    assert_eq!(lines[0], "00  507  LDA 07  ");
    assert_eq!(lines[9], "09  033  DAT       bang");
}

#[test]
fn test_hello_pretty() {
    let source = include_str!("hello.lmc");

    let pretty = symbolic::Program::parse(source).unwrap().pretty();

    assert!(pretty.starts_with("\n// Prints \"Hi!\" one character at a time.\n\tLDA\th\n"));
    assert!(pretty.ends_with("bang\tDAT\t0x21\n"));

    // The normalized listing assembles into the same words.
    assert_eq!(assemble(&pretty).unwrap().words, assemble(source).unwrap().words);
}
