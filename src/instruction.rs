//! Types for representing instructions and their parts.
//!
//! There are two views of an instruction. An [OpCode] is the mnemonic as it is written in the
//! symbolic assembly, together with the numeric base code it is encoded with. An [Instruction]
//! is a memory word decoded by the [Machine](crate::machine::Machine) right before it is
//! executed.

use std::collections::HashMap;
use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;

/// A single memory cell of the machine.
pub type Word = i32;

/// Index of a memory cell. Valid addresses are `0..MEMORY_SIZE`.
pub type Address = usize;

/// Number of mailboxes in the machine.
pub const MEMORY_SIZE: usize = 100;

/// Opcodes of the instruction set, including the `DAT` pseudo instruction.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum OpCode {
    /// Stops the execution. (`HLT`)
    Halt,

    /// Adds the value of a memory cell into the accumulator. (`ADD`)
    Add,

    /// Subtracts the value of a memory cell from the accumulator. (`SUB`)
    Subtract,

    /// Copies the accumulator into a memory cell. (`STA`)
    Store,

    /// Copies the value of a memory cell into the accumulator. (`LDA`)
    Load,

    /// Unconditional jump. (`BRA`)
    Branch,

    /// Jump if the accumulator is zero. (`BRZ`)
    BranchIfZero,

    /// Jump if the accumulator is zero or positive. (`BRP`)
    BranchIfPositive,

    /// Reads a value from the host into the accumulator. (`INP`)
    Input,

    /// Appends the accumulator to the output as a decimal number. (`OUT`)
    Output,

    /// Appends the accumulator to the output as a character. (`OTC`)
    ///
    /// Not part of the standard instruction set, but supported by most simulators.
    OutputChar,

    /// Raw data. The operand is stored into the cell as is. (`DAT`)
    Data,
}

impl OpCode {
    /// Every opcode, in the order of their base codes.
    pub const ALL: [OpCode; 12] = [
        OpCode::Halt,
        OpCode::Add,
        OpCode::Subtract,
        OpCode::Store,
        OpCode::Load,
        OpCode::Branch,
        OpCode::BranchIfZero,
        OpCode::BranchIfPositive,
        OpCode::Input,
        OpCode::Output,
        OpCode::OutputChar,
        OpCode::Data,
    ];

    /// The value of the instruction word before the operand is added to it.
    pub fn base_code(self) -> Word {
        match self {
            OpCode::Halt => 0,
            OpCode::Add => 100,
            OpCode::Subtract => 200,
            OpCode::Store => 300,
            OpCode::Load => 500,
            OpCode::Branch => 600,
            OpCode::BranchIfZero => 700,
            OpCode::BranchIfPositive => 800,
            OpCode::Input => 901,
            OpCode::Output => 902,
            OpCode::OutputChar => 922,
            OpCode::Data => 0,
        }
    }

    /// True if the mnemonic is followed by an operand in the source. For [OpCode::Data] the
    /// operand is optional.
    pub fn has_operand(self) -> bool {
        match self {
            OpCode::Halt | OpCode::Input | OpCode::Output | OpCode::OutputChar => false,
            _ => true,
        }
    }

    /// True for the raw data pseudo instruction.
    pub fn is_data(self) -> bool {
        self == OpCode::Data
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            OpCode::Halt => "HLT",
            OpCode::Add => "ADD",
            OpCode::Subtract => "SUB",
            OpCode::Store => "STA",
            OpCode::Load => "LDA",
            OpCode::Branch => "BRA",
            OpCode::BranchIfZero => "BRZ",
            OpCode::BranchIfPositive => "BRP",
            OpCode::Input => "INP",
            OpCode::Output => "OUT",
            OpCode::OutputChar => "OTC",
            OpCode::Data => "DAT",
        }
    }

    /// Looks up a mnemonic. Matching is case-insensitive.
    pub fn lookup(word: &str) -> Option<OpCode> {
        OPCODES.get(word.to_uppercase().as_str()).copied()
    }

    /// Returns the mnemonic closest to `word`, if any is close enough to be a plausible typo.
    pub fn suggest(word: &str) -> Option<&'static str> {
        let word = word.to_uppercase();

        OpCode::ALL
            .iter()
            .map(|op| (edit_distance::edit_distance(&word, op.mnemonic()), op.mnemonic()))
            .filter(|(distance, _)| *distance <= 1)
            .min_by_key(|(distance, _)| *distance)
            .map(|(_, mnemonic)| mnemonic)
    }
}

lazy_static! {
    static ref OPCODES: HashMap<&'static str, OpCode> = OpCode::ALL
        .iter()
        .map(|op| (op.mnemonic(), *op))
        .collect();
}

impl FromStr for OpCode {
    type Err = ();

    fn from_str(input: &str) -> Result<OpCode, ()> {
        OpCode::lookup(input).ok_or(())
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

/// An instruction decoded from a memory word.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    Halt,
    Add(Address),
    Subtract(Address),
    Store(Address),
    Load(Address),
    Branch(Address),
    BranchIfZero(Address),
    BranchIfPositive(Address),
    Input,
    Output,
    OutputChar,
}

impl Instruction {
    pub fn opcode(&self) -> OpCode {
        match self {
            Instruction::Halt => OpCode::Halt,
            Instruction::Add(_) => OpCode::Add,
            Instruction::Subtract(_) => OpCode::Subtract,
            Instruction::Store(_) => OpCode::Store,
            Instruction::Load(_) => OpCode::Load,
            Instruction::Branch(_) => OpCode::Branch,
            Instruction::BranchIfZero(_) => OpCode::BranchIfZero,
            Instruction::BranchIfPositive(_) => OpCode::BranchIfPositive,
            Instruction::Input => OpCode::Input,
            Instruction::Output => OpCode::Output,
            Instruction::OutputChar => OpCode::OutputChar,
        }
    }

    /// The memory operand of the instruction, if it has one.
    pub fn address(&self) -> Option<Address> {
        match *self {
            Instruction::Add(addr)
            | Instruction::Subtract(addr)
            | Instruction::Store(addr)
            | Instruction::Load(addr)
            | Instruction::Branch(addr)
            | Instruction::BranchIfZero(addr)
            | Instruction::BranchIfPositive(addr) => Some(addr),
            _ => None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.address() {
            Some(addr) => write!(f, "{} {:02}", self.opcode(), addr),
            None => write!(f, "{}", self.opcode()),
        }
    }
}

impl From<Instruction> for Word {
    fn from(ins: Instruction) -> Word {
        ins.opcode().base_code() + ins.address().unwrap_or(0) as Word
    }
}

/// Reason why a memory word is not a valid instruction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DecodeError {
    /// The word is negative or has more than three digits.
    OutOfRange,

    /// `HLT` was given a non-zero operand.
    HaltOperand(Address),

    /// The opcode class 4 has no instruction.
    Reserved,

    /// The I/O class was given something other than 1, 2 or 22.
    IoSelector(Address),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DecodeError::OutOfRange => write!(f, "word is not a three digit instruction"),
            DecodeError::HaltOperand(operand) => {
                write!(f, "HLT takes no operand but found {}", operand)
            }
            DecodeError::Reserved => write!(f, "invalid opcode 4"),
            DecodeError::IoSelector(operand) => {
                write!(f, "operand should be 1, 2 or 22 but found {}", operand)
            }
        }
    }
}

impl std::error::Error for DecodeError {}

impl TryFrom<Word> for Instruction {
    type Error = DecodeError;

    fn try_from(word: Word) -> Result<Instruction, DecodeError> {
        if word < 0 || word > 999 {
            return Err(DecodeError::OutOfRange);
        }

        let operand = (word % 100) as Address;

        let ins = match word / 100 {
            0 if operand == 0 => Instruction::Halt,
            0 => return Err(DecodeError::HaltOperand(operand)),
            1 => Instruction::Add(operand),
            2 => Instruction::Subtract(operand),
            3 => Instruction::Store(operand),
            4 => return Err(DecodeError::Reserved),
            5 => Instruction::Load(operand),
            6 => Instruction::Branch(operand),
            7 => Instruction::BranchIfZero(operand),
            8 => Instruction::BranchIfPositive(operand),
            _ => match operand {
                1 => Instruction::Input,
                2 => Instruction::Output,
                22 => Instruction::OutputChar,
                other => return Err(DecodeError::IoSelector(other)),
            },
        };

        Ok(ins)
    }
}
