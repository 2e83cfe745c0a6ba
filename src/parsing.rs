//! Spans and a seekable token stream shared by the assembler stages.

use std::ops::Range;

/// Byte offsets into the source text.
pub type Span = Range<usize>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineLocation {
    pub line: usize,
    pub column: usize,
}

pub type LineSpan = Range<LineLocation>;

/// Conversion of byte offset based spans into line and column based ones.
pub trait AsLineSpan {
    fn as_line_span(&self, source: &str) -> LineSpan;
}

/// Returns the one-based line and column of the byte `offset` in `source`.
pub fn line_location(source: &str, offset: usize) -> LineLocation {
    let mut line = 1;
    let mut column = 1;

    for ch in source[..offset.min(source.len())].chars() {
        if ch == '\n' {
            line += 1;
            column = 0;
        }

        column += 1;
    }

    LineLocation { line, column }
}

impl AsLineSpan for Span {
    fn as_line_span(&self, source: &str) -> LineSpan {
        line_location(source, self.start)..line_location(source, self.end)
    }
}

pub trait SeekStream: Iterator {
    fn offset(&self) -> usize;
    fn seek(&mut self, amount: isize);
    fn seek_boundary(&self) -> Range<isize>;
}

/// Wraps an iterator and remembers everything it has produced so that the reader can step
/// back. Used to look ahead one word without consuming it.
pub struct BufferedStream<S: Iterator> {
    stream: S,
    position: usize,
    buffer: Vec<S::Item>,
}

impl<S> From<S> for BufferedStream<S>
where
    S: Iterator,
{
    fn from(stream: S) -> BufferedStream<S> {
        BufferedStream {
            stream,
            position: 0,
            buffer: Vec::new(),
        }
    }
}

impl<S> Iterator for BufferedStream<S>
where
    S: Iterator,
    S::Item: Clone,
{
    type Item = S::Item;

    fn next(&mut self) -> Option<S::Item> {
        if let Some(item) = self.buffer.get(self.position) {
            self.position += 1;
            return Some(item.clone());
        }

        match self.stream.next() {
            Some(item) => {
                self.position += 1;
                self.buffer.push(item.clone());
                Some(item)
            },
            None => None,
        }
    }
}

impl<S> SeekStream for BufferedStream<S>
where
    S: Iterator,
    S::Item: Clone,
{
    fn offset(&self) -> usize {
        self.position
    }

    fn seek(&mut self, amount: isize) {
        assert!(self.seek_boundary().contains(&amount));
        self.position = ((self.position as isize) + amount) as usize;
    }

    fn seek_boundary(&self) -> Range<isize> {
        let backwards = - (self.position as isize);
        let forwards = (self.buffer.len() as isize) - (self.position as isize);

        backwards .. forwards + 1
    }
}
