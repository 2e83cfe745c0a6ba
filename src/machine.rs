//! [Machine] for executing [assembled programs](crate::program::Program).

use std::collections::VecDeque;
use std::convert::TryFrom;
use std::fmt;
use std::io::{BufRead, Write};
use std::time::{Duration, Instant};

use slog::{debug, o, trace, warn, Discard, Logger};

use crate::event::{Event, EventDispatcher, EventListener};
use crate::instruction::{Address, DecodeError, Instruction, Word, MEMORY_SIZE};
use crate::program::Program;

/// The smallest value the accumulator holds after arithmetic.
pub const ACCUMULATOR_MIN: Word = -999;

/// The largest value the accumulator holds after arithmetic.
pub const ACCUMULATOR_MAX: Word = 999;

const ACCUMULATOR_RANGE: i64 = (ACCUMULATOR_MAX - ACCUMULATOR_MIN + 1) as i64;

/// Wraps the result of an addition or a subtraction into the range of the accumulator.
///
/// `1000` becomes `-999` and `-1000` becomes `999`.
pub fn wrap_accumulator(value: i64) -> Word {
    let offset = (value - ACCUMULATOR_MIN as i64).rem_euclid(ACCUMULATOR_RANGE);
    (offset + ACCUMULATOR_MIN as i64) as Word
}

/// Contains the state of the emulated hardware.
#[derive(Clone, Debug, PartialEq)]
pub struct Context {
    /// The mailboxes. Contain all the instructions and data of the program.
    pub memory: [Word; MEMORY_SIZE],

    /// The address of the next instruction to be executed.
    pub instruction_pointer: Address,

    pub accumulator: Word,

    /// True if the execution has been halted.
    pub halted: bool,

    /// The value last supplied by the [InputSource].
    pub input: Word,

    /// Everything the program has printed so far.
    pub output: String,
}

impl Default for Context {
    fn default() -> Context {
        Context {
            memory: [0; MEMORY_SIZE],
            instruction_pointer: 0,
            accumulator: 0,
            halted: false,
            input: 0,
            output: String::new(),
        }
    }
}

/// The host side of the `INP` instruction.
pub trait InputSource {
    /// Called when an `INP` instruction is executed, before the accumulator is loaded.
    ///
    /// # Parameters
    /// - `pending`: The pending input slot. Holds the value supplied last time. The value in
    ///   the slot when this method returns is loaded into the accumulator.
    fn before_input(&mut self, pending: &mut Word);
}

/// The host side of the `OUT` and `OTC` instructions.
pub trait OutputSink {
    /// Called after an `OUT` or `OTC` instruction has appended to the output.
    ///
    /// # Parameters
    /// - `appended`: The text that was appended, including the line break that separates
    ///   numbers.
    /// - `output`: The complete output of the program so far.
    fn after_output(&mut self, appended: &str, output: &str);
}

impl<T: InputSource + ?Sized> InputSource for &mut T {
    fn before_input(&mut self, pending: &mut Word) {
        (**self).before_input(pending)
    }
}

impl<T: OutputSink + ?Sized> OutputSink for &mut T {
    fn after_output(&mut self, appended: &str, output: &str) {
        (**self).after_output(appended, output)
    }
}

/// Reason for a [MachineError].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MachineErrorKind {
    /// The word at the instruction pointer is not a valid instruction.
    BadInstruction {
        word: Word,
        reason: DecodeError,
    },

    /// `OTC` was executed with an accumulator that is not a character.
    InvalidCharacter {
        value: Word,
    },

    /// An access past the last mailbox.
    OutOfBounds,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MachineError {
    /// The address of the failing instruction, or of the first mailbox that could not be
    /// written when loading.
    pub address: Address,
    pub kind: MachineErrorKind,
}

impl fmt::Display for MachineError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            MachineErrorKind::BadInstruction { word, reason } => {
                write!(f, "runtime error at {}: bad instruction {}: {}", self.address, word, reason)
            },
            MachineErrorKind::InvalidCharacter { value } => {
                write!(f, "runtime error at {}: {} is not a character", self.address, value)
            },
            MachineErrorKind::OutOfBounds => {
                write!(f, "address {} is outside of the memory", self.address)
            },
        }
    }
}

impl std::error::Error for MachineError {}

/// The machine contains the hardware state for executing a program and the interfaces for
/// doing IO.
pub struct Machine<In, Out> {
    /// Registers, memory and output. Read this to display the state of the machine.
    pub context: Context,

    /// Supplies the values for `INP`.
    pub input: In,

    /// Is notified of everything `OUT` and `OTC` print.
    pub output: Out,

    dispatcher: EventDispatcher,
    logger: Logger,
}

impl<In, Out> fmt::Debug for Machine<In, Out> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Machine")
            .field("context", &self.context)
            .field("listeners", &self.dispatcher.len())
            .finish()
    }
}

impl<In, Out> Machine<In, Out> where In: InputSource, Out: OutputSink {
    /// Create a new machine with empty memory.
    ///
    /// # Parameters
    /// - `input`: An [InputSource] consulted by `INP`.
    /// - `output`: An [OutputSink] notified by `OUT` and `OTC`.
    pub fn new(input: In, output: Out) -> Machine<In, Out> {
        Machine::with_logger(input, output, None)
    }

    pub fn with_logger<L>(input: In, output: Out, logger: L) -> Machine<In, Out>
    where
        L: Into<Option<Logger>>,
    {
        let logger = logger
            .into()
            .unwrap_or(Logger::root(Discard, o!()))
            .new(o!("stage" => "execution"));

        Machine {
            context: Context::default(),
            input,
            output,
            dispatcher: EventDispatcher::new(),
            logger,
        }
    }

    pub fn set_logger(&mut self, logger: Logger) {
        self.logger = logger.new(o!("stage" => "execution"));
    }

    pub fn add_listener<L: EventListener + 'static>(&mut self, listener: L) {
        self.dispatcher.add_listener(listener);
    }

    /// Clears the memory, the registers and the output. The IO interfaces and event listeners
    /// are kept.
    pub fn reset(&mut self) {
        self.context = Context::default();
        debug!(self.logger, "reset");
    }

    /// Copies `program` into the memory starting from `address`.
    ///
    /// Other mailboxes and the registers are left as they are.
    ///
    /// # Errors
    /// [OutOfBounds](MachineErrorKind::OutOfBounds) if the program does not fit into the
    /// memory. Nothing is written in that case.
    pub fn load_at(&mut self, program: &[Word], address: Address) -> Result<(), MachineError> {
        let end = match address.checked_add(program.len()).filter(|&end| end <= MEMORY_SIZE) {
            Some(end) => end,
            None => {
                warn!(self.logger, "program does not fit into memory"; "address" => address, "size" => program.len());

                return Err(MachineError {
                    address: std::cmp::max(address, MEMORY_SIZE),
                    kind: MachineErrorKind::OutOfBounds,
                });
            },
        };

        self.context.memory[address..end].copy_from_slice(program);

        debug!(self.logger, "loaded program"; "address" => address, "size" => program.len());

        Ok(())
    }

    /// Loads an assembled program at address zero.
    pub fn load(&mut self, program: &Program) -> Result<(), MachineError> {
        self.load_program_at(program, 0)
    }

    /// Loads an assembled program starting from `address`, moving its label operands along.
    ///
    /// The instruction pointer is not touched.
    pub fn load_program_at(&mut self, program: &Program, address: Address) -> Result<(), MachineError> {
        if address.checked_add(program.len()).map_or(true, |end| end > MEMORY_SIZE) {
            // Does not fit. Report it without relocating.
            return self.load_at(program.words(), address);
        }

        self.load_at(&program.relocated_words(address), address)
    }

    /// Decodes the instruction at the instruction pointer without executing it.
    pub fn current_instruction(&self) -> Result<Instruction, MachineError> {
        let address = self.context.instruction_pointer;

        let word = *self.context.memory.get(address)
            .ok_or(MachineError { address, kind: MachineErrorKind::OutOfBounds })?;

        Instruction::try_from(word)
            .map_err(|reason| MachineError {
                address,
                kind: MachineErrorKind::BadInstruction { word, reason },
            })
    }

    /// Fetches the next instruction, increments the instruction pointer and executes the
    /// instruction. Does nothing if the machine has halted.
    ///
    /// # Errors
    /// Halts the machine and returns the address of the instruction if it is not valid.
    pub fn step(&mut self) -> Result<(), MachineError> {
        if self.context.halted {
            return Ok(());
        }

        let address = self.context.instruction_pointer;

        let word = match self.context.memory.get(address) {
            Some(word) => *word,
            None => return Err(self.fault(address, MachineErrorKind::OutOfBounds)),
        };

        self.context.instruction_pointer += 1;

        let ins = match Instruction::try_from(word) {
            Ok(ins) => ins,
            Err(reason) => {
                return Err(self.fault(address, MachineErrorKind::BadInstruction { word, reason }))
            },
        };

        trace!(self.logger, "execute"; "address" => address, "word" => word, "instruction" => %ins);

        self.emulate_instruction(address, ins)
    }

    /// Executes the program until it halts.
    pub fn run(&mut self) -> Result<(), MachineError> {
        while !self.context.halted {
            self.step()?;
        }

        Ok(())
    }

    /// Executes the program until it halts or `budget` has passed. The instruction that is
    /// running when the budget runs out is finished first.
    ///
    /// # Returns
    /// True if the machine has halted.
    pub fn run_for(&mut self, budget: Duration) -> Result<bool, MachineError> {
        let deadline = Instant::now() + budget;

        while !self.context.halted && Instant::now() < deadline {
            self.step()?;
        }

        Ok(self.context.halted)
    }

    /// Executes at most `limit` instructions.
    ///
    /// # Returns
    /// True if the machine has halted.
    pub fn run_cycles(&mut self, limit: usize) -> Result<bool, MachineError> {
        for _ in 0..limit {
            if self.context.halted {
                break;
            }

            self.step()?;
        }

        Ok(self.context.halted)
    }

    fn emulate_instruction(&mut self, address: Address, ins: Instruction) -> Result<(), MachineError> {
        match ins {
            Instruction::Halt => self.halt(),

            Instruction::Add(addr) => {
                let sum = self.context.accumulator as i64 + self.context.memory[addr] as i64;
                self.set_accumulator(wrap_accumulator(sum));
            },
            Instruction::Subtract(addr) => {
                let difference = self.context.accumulator as i64 - self.context.memory[addr] as i64;
                self.set_accumulator(wrap_accumulator(difference));
            },

            Instruction::Store(addr) => {
                let data = self.context.accumulator;
                self.context.memory[addr] = data;
                self.dispatcher.dispatch(Event::MemoryChange { address: addr, data });
            },
            Instruction::Load(addr) => {
                self.set_accumulator(self.context.memory[addr]);
            },

            Instruction::Branch(addr) => self.jump(address, addr),
            Instruction::BranchIfZero(addr) => {
                if self.context.accumulator == 0 {
                    self.jump(address, addr);
                }
            },
            Instruction::BranchIfPositive(addr) => {
                if self.context.accumulator >= 0 {
                    self.jump(address, addr);
                }
            },

            Instruction::Input => {
                self.input.before_input(&mut self.context.input);

                let data = self.context.input;
                self.dispatcher.dispatch(Event::Input { data });
                self.set_accumulator(data);
            },
            Instruction::Output => {
                let text = if self.context.output.is_empty() {
                    self.context.accumulator.to_string()
                } else {
                    format!("\n{}", self.context.accumulator)
                };

                self.emit(text);
            },
            Instruction::OutputChar => {
                let value = self.context.accumulator;

                let ch = match u32::try_from(value).ok().and_then(std::char::from_u32) {
                    Some(ch) => ch,
                    None => return Err(self.fault(address, MachineErrorKind::InvalidCharacter { value })),
                };

                self.emit(ch.to_string());
            },
        }

        Ok(())
    }

    fn set_accumulator(&mut self, data: Word) {
        self.context.accumulator = data;
        self.dispatcher.dispatch(Event::AccumulatorChange { data });
    }

    fn jump(&mut self, from: Address, to: Address) {
        trace!(self.logger, "jump"; "from" => from, "to" => to);
        self.context.instruction_pointer = to;
        self.dispatcher.dispatch(Event::Jump { from, to });
    }

    fn emit(&mut self, text: String) {
        self.context.output.push_str(&text);
        self.output.after_output(&text, &self.context.output);
        self.dispatcher.dispatch(Event::Output { text });
    }

    fn halt(&mut self) {
        self.context.halted = true;
        debug!(self.logger, "halted"; "address" => self.context.instruction_pointer.saturating_sub(1));
        self.dispatcher.dispatch(Event::Halt);
    }

    fn fault(&mut self, address: Address, kind: MachineErrorKind) -> MachineError {
        let error = MachineError { address, kind };

        warn!(self.logger, "execution failed"; "address" => address, "error" => %error);
        self.context.halted = true;
        self.dispatcher.dispatch(Event::Halt);

        error
    }
}

/// An input source that never supplies anything. `INP` reads the last pending value.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoInput;

impl InputSource for NoInput {
    fn before_input(&mut self, _pending: &mut Word) {}
}

/// An output sink that ignores the output. It can still be read from [Context::output].
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOutput;

impl OutputSink for NoOutput {
    fn after_output(&mut self, _appended: &str, _output: &str) {}
}

/// An input source for testing purposes.
///
/// Supplies values from a pre-determined input buffer. Once the buffer runs dry the pending
/// value is left as it is.
#[derive(Clone, Debug, Default)]
pub struct TestInput {
    input_buffer: VecDeque<Word>,
    requests: usize,
}

impl TestInput {
    pub fn new() -> TestInput {
        TestInput::default()
    }

    pub fn with_input<I: IntoIterator<Item = Word>>(input: I) -> TestInput {
        TestInput {
            input_buffer: input.into_iter().collect(),
            requests: 0,
        }
    }

    pub fn input(&mut self, value: Word) {
        self.input_buffer.push_back(value);
    }

    /// How many times `INP` has asked for a value.
    pub fn requests(&self) -> usize {
        self.requests
    }
}

impl InputSource for TestInput {
    fn before_input(&mut self, pending: &mut Word) {
        self.requests += 1;

        if let Some(value) = self.input_buffer.pop_front() {
            *pending = value;
        }
    }
}

/// An output sink for testing purposes. Records every appended piece of text.
#[derive(Clone, Debug, Default)]
pub struct TestOutput {
    output_buffer: Vec<String>,
}

impl TestOutput {
    pub fn new() -> TestOutput {
        TestOutput::default()
    }

    /// The appended pieces, one per output instruction.
    pub fn output(&self) -> &[String] {
        &self.output_buffer[..]
    }

    /// The numbers printed with `OUT`, in order.
    pub fn numbers(&self) -> Vec<Word> {
        self.output_buffer
            .iter()
            .filter_map(|text| text.trim_start_matches('\n').parse().ok())
            .collect()
    }

    pub fn into_output(self) -> Vec<String> {
        self.output_buffer
    }
}

impl OutputSink for TestOutput {
    fn after_output(&mut self, appended: &str, _output: &str) {
        self.output_buffer.push(appended.to_string());
    }
}

/// An input source that reads one integer per line from the standard input.
///
/// Lines that are not integers are skipped. At the end of the input the pending value is left
/// as it is.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdInput;

impl InputSource for StdInput {
    fn before_input(&mut self, pending: &mut Word) {
        let stdin = std::io::stdin();

        for line in stdin.lock().lines() {
            match line.map(|line| line.trim().parse()) {
                Ok(Ok(value)) => {
                    *pending = value;
                    return;
                },
                Ok(Err(_)) => continue,
                Err(_) => return,
            }
        }
    }
}

/// An output sink that prints to the standard output as the program runs.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdOutput;

impl OutputSink for StdOutput {
    fn after_output(&mut self, appended: &str, _output: &str) {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();

        let _ = handle.write_all(appended.as_bytes());
        let _ = handle.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::RefCell;
    use std::rc::Rc;

    type TestMachine = Machine<TestInput, TestOutput>;

    fn machine(words: &[Word]) -> TestMachine {
        let mut machine = Machine::new(TestInput::new(), TestOutput::new());
        machine.load_at(words, 0).unwrap();
        machine
    }

    macro_rules! assert_accumulator {
        ($machine:expr, $value:expr) => {
            assert_eq!($machine.context.accumulator, $value, "accumulator != {}", $value);
        };
    }

    #[test]
    fn wraps_accumulator() {
        assert_eq!(wrap_accumulator(1000), -999);
        assert_eq!(wrap_accumulator(-1000), 999);
        assert_eq!(wrap_accumulator(999), 999);
        assert_eq!(wrap_accumulator(-999), -999);
        assert_eq!(wrap_accumulator(1999), 0);
        assert_eq!(wrap_accumulator(2998), 999);
    }

    #[test]
    fn add_wraps_around() {
        let mut machine = machine(&[110, 0]);
        machine.context.memory[10] = 1;
        machine.context.accumulator = 999;

        machine.step().unwrap();

        assert_accumulator!(machine, -999);
    }

    #[test]
    fn subtract_wraps_around() {
        let mut machine = machine(&[210, 0]);
        machine.context.memory[10] = 1;
        machine.context.accumulator = -999;

        machine.step().unwrap();

        assert_accumulator!(machine, 999);
    }

    #[test]
    fn load_and_store_do_not_wrap() {
        let mut machine = machine(&[510, 311, 0]);
        machine.context.memory[10] = 1234;

        machine.run().unwrap();

        assert_accumulator!(machine, 1234);
        assert_eq!(machine.context.memory[11], 1234);
    }

    #[test]
    fn halt_is_terminal() {
        let mut machine = machine(&[0, 0, 0]);
        machine.context.accumulator = 5;

        machine.step().unwrap();

        assert!(machine.context.halted);
        assert_accumulator!(machine, 5);
        assert_eq!(machine.context.instruction_pointer, 1);

        machine.step().unwrap();
        assert_eq!(machine.context.instruction_pointer, 1);
    }

    #[test]
    fn bad_instructions_halt() {
        for &(word, reason) in &[
            (5, DecodeError::HaltOperand(5)),
            (412, DecodeError::Reserved),
            (903, DecodeError::IoSelector(3)),
            (-1, DecodeError::OutOfRange),
        ] {
            let mut machine = machine(&[500, word]);

            let err = machine.run().unwrap_err();

            assert_eq!(err, MachineError {
                address: 1,
                kind: MachineErrorKind::BadInstruction { word, reason },
            });
            assert!(machine.context.halted);
        }
    }

    #[test]
    fn branches() {
        // 0: LDA 10, 1: BRZ 4, 2: BRP 5, 3: HLT, 4: HLT, 5: BRA 3
        let program = [510, 704, 805, 0, 0, 603];

        let mut machine = machine(&program);
        machine.run().unwrap();
        assert_eq!(machine.context.instruction_pointer, 5);

        let mut machine = self::machine(&program);
        machine.context.memory[10] = 3;
        machine.run().unwrap();
        assert_eq!(machine.context.instruction_pointer, 4);

        let mut machine = self::machine(&program);
        machine.context.memory[10] = -3;
        machine.run().unwrap();
        assert_eq!(machine.context.instruction_pointer, 4);
    }

    #[test]
    fn running_off_the_end_of_memory() {
        let mut machine = machine(&[699]);
        machine.context.memory[99] = 599;

        machine.step().unwrap();
        machine.step().unwrap();
        assert_eq!(machine.context.instruction_pointer, MEMORY_SIZE);

        let err = machine.step().unwrap_err();
        assert_eq!(err, MachineError { address: 100, kind: MachineErrorKind::OutOfBounds });
        assert!(machine.context.halted);
    }

    #[test]
    fn output_numbers_and_characters() {
        // LDA 10, OUT, OUT, LDA 11, OTC, OTC, HLT
        let mut machine = machine(&[510, 902, 902, 511, 922, 922, 0]);
        machine.context.memory[10] = -42;
        machine.context.memory[11] = 72;

        machine.run().unwrap();

        assert_eq!(machine.context.output, "-42\n-42HH");
        assert_eq!(machine.output.output(), &["-42", "\n-42", "H", "H"]);
        assert_eq!(machine.output.numbers(), vec![-42, -42]);
    }

    #[test]
    fn output_invalid_character() {
        let mut machine = machine(&[510, 922, 0]);
        machine.context.memory[10] = -1;

        let err = machine.run().unwrap_err();

        assert_eq!(err, MachineError { address: 1, kind: MachineErrorKind::InvalidCharacter { value: -1 } });
        assert_eq!(machine.context.output, "");
    }

    #[test]
    fn input_keeps_last_value() {
        let mut machine = Machine::new(TestInput::with_input(vec![7]), TestOutput::new());
        machine.load_at(&[901, 310, 901, 0], 0).unwrap();

        machine.run().unwrap();

        assert_eq!(machine.context.memory[10], 7);
        assert_accumulator!(machine, 7);
        assert_eq!(machine.input.requests(), 2);

        // Values queued later are picked up by the next INP.
        machine.input.input(-4);
        machine.context.halted = false;
        machine.context.instruction_pointer = 2;
        machine.run().unwrap();

        assert_accumulator!(machine, -4);
        assert_eq!(machine.input.requests(), 3);
    }

    #[test]
    fn load_at_bounds() {
        let program = [111; 10];
        let mut machine = Machine::new(NoInput, NoOutput);

        let err = machine.load_at(&program, 95).unwrap_err();
        assert_eq!(err.kind, MachineErrorKind::OutOfBounds);
        assert!(machine.context.memory.iter().all(|&word| word == 0));

        let err = machine.load_at(&program, usize::MAX).unwrap_err();
        assert_eq!(err, MachineError { address: usize::MAX, kind: MachineErrorKind::OutOfBounds });
        assert!(machine.context.memory.iter().all(|&word| word == 0));

        machine.load_at(&program, 90).unwrap();
        assert_eq!(machine.context.memory[99], 111);
        assert_eq!(machine.context.memory[89], 0);
    }

    #[test]
    fn load_at_keeps_registers_and_other_cells() {
        let mut machine = machine(&[1, 2, 3]);
        machine.context.accumulator = 12;
        machine.context.instruction_pointer = 2;

        machine.load_at(&[9], 1).unwrap();

        assert_eq!(&machine.context.memory[..4], &[1, 9, 3, 0]);
        assert_accumulator!(machine, 12);
        assert_eq!(machine.context.instruction_pointer, 2);
    }

    #[test]
    fn reset_restores_fresh_state() {
        let mut machine = Machine::new(TestInput::with_input(vec![3]), TestOutput::new());
        machine.load_at(&[901, 902, 320, 0], 0).unwrap();
        machine.run().unwrap();

        machine.reset();

        let fresh = Machine::new(TestInput::new(), TestOutput::new());
        assert_eq!(machine.context, fresh.context);
    }

    #[test]
    fn run_with_budgets() {
        // An endless loop.
        let mut machine = machine(&[600]);

        assert_eq!(machine.run_for(Duration::from_millis(0)), Ok(false));
        assert_eq!(machine.run_for(Duration::from_millis(5)), Ok(false));
        assert_eq!(machine.run_cycles(100), Ok(false));

        let mut machine = self::machine(&[0]);
        assert_eq!(machine.run_for(Duration::from_secs(1)), Ok(true));
        assert_eq!(machine.run_cycles(1), Ok(true));
    }

    #[test]
    fn current_instruction() {
        let machine = machine(&[512, 40]);
        assert_eq!(machine.current_instruction(), Ok(Instruction::Load(12)));
    }

    #[test]
    fn events() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();

        let mut machine = machine(&[510, 311, 902, 0]);
        machine.context.memory[10] = 4;
        machine.add_listener(move |event: &Event| sink.borrow_mut().push(event.clone()));

        machine.run().unwrap();

        assert_eq!(*events.borrow(), vec![
            Event::AccumulatorChange { data: 4 },
            Event::MemoryChange { address: 11, data: 4 },
            Event::Output { text: "4".into() },
            Event::Halt,
        ]);
    }
}
