//! Numeric literals.

use nom::{
    IResult,
    branch::alt,
    bytes::complete::tag_no_case,
    character::complete::{digit1, hex_digit1, one_of},
    combinator::{all_consuming, map, opt},
    sequence::{preceded, tuple},
};

use crate::instruction::Word;

/// Result of interpreting a word as a numeric literal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Literal {
    /// The word is a literal that fits into a memory word.
    Number(Word),

    /// The word is shaped like a literal but its value does not fit into a memory word.
    Malformed,

    /// The word is not a literal at all.
    NotANumber,
}

/// Splits a literal into its sign, radix and digits.
fn take_literal(input: &str) -> IResult<&str, (Option<char>, u32, &str)> {
    map(
        tuple((
            opt(one_of("+-")),
            alt((
                map(preceded(tag_no_case("0x"), hex_digit1), |digits| (16, digits)),
                map(digit1, |digits| (10, digits)),
            )),
        )),
        |(sign, (radix, digits))| (sign, radix, digits),
    )(input)
}

/// Classifies `word` as a decimal (`-12`, `+7`) or hexadecimal (`0x1F`) literal.
pub fn parse_literal(word: &str) -> Literal {
    let (sign, radix, digits) = match all_consuming(take_literal)(word) {
        Ok((_, parts)) => parts,
        Err(_) => return Literal::NotANumber,
    };

    match Word::from_str_radix(digits, radix) {
        Ok(value) if sign == Some('-') => Literal::Number(-value),
        Ok(value) => Literal::Number(value),
        Err(_) => Literal::Malformed,
    }
}
