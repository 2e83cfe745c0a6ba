//! Tokens and a tokenizer for the symbolic assembly.
//!
//! The assembly is a stream of whitespace separated words. Line breaks and comments carry no
//! meaning for the assembler, but they are kept as tokens so that the layout of the source can
//! be reproduced by the [listing](super::Program::pretty).

use logos::{Lexer, Logos};

use std::fmt;

/// Enumeration of all tokens of the symbolic format.
#[derive(Logos, Debug, PartialEq, Clone)]
pub enum Token<'a> {
    /// Errorneous token that could not be interpreted as any of the other variants.
    ///
    /// All characters up to and including the space count as whitespace.
    #[error]
    #[regex(r"[\x00-\x09\x0B-\x20]+", logos::skip)]
    Error,

    /// A line break.
    #[token("\n")]
    Newline,

    /// A comment that starts with `//` and runs to the end of the line.
    #[regex(r"//[^\n]*", Lexer::slice)]
    Comment(&'a str),

    /// Anything else: a mnemonic, a label or a numeric literal.
    #[regex(r"[^\x00-\x20]+", Lexer::slice)]
    Word(&'a str),
}

impl<'t> fmt::Display for Token<'t> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Token::Error => write!(f, "<error>"),
            Token::Newline => writeln!(f),
            Token::Comment(comment) => write!(f, "{}", comment),
            Token::Word(word) => write!(f, "{}", word),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_comments_and_newlines() {
        let tokens: Vec<_> = Token::lexer("loop LDA x // load it\n\tHLT").collect();

        assert_eq!(tokens, vec![
            Token::Word("loop"),
            Token::Word("LDA"),
            Token::Word("x"),
            Token::Comment("// load it"),
            Token::Newline,
            Token::Word("HLT"),
        ]);
    }

    #[test]
    fn comment_only_at_word_start() {
        let tokens: Vec<_> = Token::lexer("a//b //c").collect();

        assert_eq!(tokens, vec![Token::Word("a//b"), Token::Comment("//c")]);
    }
}
