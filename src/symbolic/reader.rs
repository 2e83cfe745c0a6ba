//! Word-by-word reading of the symbolic assembly.

use logos::{Logos, SpannedIter};

use crate::parsing::{BufferedStream, SeekStream, Span};

use super::token::Token;

/// A whitespace delimited word and its location in the source.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceWord<'a> {
    pub text: &'a str,
    pub span: Span,
}

/// Cursor over the words of a source text.
pub struct Reader<'a> {
    source: &'a str,
    stream: BufferedStream<SpannedIter<'a, Token<'a>>>,
}

impl<'a> Reader<'a> {
    pub fn new(source: &'a str) -> Reader<'a> {
        Reader {
            source,
            stream: BufferedStream::from(Token::lexer(source).spanned()),
        }
    }

    /// Consumes the line breaks and comments before the next word and returns them.
    ///
    /// A comment always starts on its own line in the returned layout.
    pub fn skip_layout(&mut self) -> String {
        let mut layout = String::new();

        loop {
            match self.stream.next() {
                Some((Token::Newline, _)) => layout.push('\n'),
                Some((Token::Comment(comment), _)) => {
                    if !layout.ends_with('\n') {
                        layout.push('\n');
                    }

                    layout.push_str(comment);
                },
                Some(_) => {
                    self.stream.seek(-1);
                    return layout;
                },
                None => return layout,
            }
        }
    }

    /// Reads the next word. Returns `None` at the end of the source.
    pub fn read_word(&mut self) -> Option<SourceWord<'a>> {
        self.skip_layout();

        match self.stream.next() {
            Some((Token::Word(text), span)) => Some(SourceWord { text, span }),
            // The whitespace and word patterns cover every character, but should the lexer
            // still give up on something, hand the raw text to the parser to reject.
            Some((Token::Error, span)) => Some(SourceWord {
                text: &self.source[span.clone()],
                span,
            }),
            _ => None,
        }
    }

    /// Returns the next word without consuming it.
    pub fn peek_word(&mut self) -> Option<SourceWord<'a>> {
        let position = self.stream.offset() as isize;
        let word = self.read_word();

        let delta = position - self.stream.offset() as isize;
        self.stream.seek(delta);

        word
    }
}
