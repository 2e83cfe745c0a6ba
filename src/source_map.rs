//! Mapping between mailboxes and the statements they were assembled from.

use std::collections::HashMap;
use std::iter::FromIterator;

use crate::instruction::Address;
use crate::parsing::{AsLineSpan, LineSpan, Span};

/// Mapping from mailbox addresses into source code spans, one entry per statement. Generic over
/// the span type: [Span] while assembling, [LineSpan] for reporting to a user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceMap<V> {
    inner: HashMap<Address, V>,
}

impl<V> FromIterator<(Address, V)> for SourceMap<V> {
    fn from_iter<I>(iter: I) -> Self
        where I: IntoIterator<Item = (Address, V)>
    {
        SourceMap {
            inner: HashMap::from_iter(iter),
        }
    }
}

impl<V> SourceMap<V> {
    /// Returns the span of the statement that was assembled into `addr`.
    pub fn get_source_span(&self, addr: Address) -> Option<&V> {
        self.inner.get(&addr)
    }

    /// Number of mailboxes with a known statement.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Moves every address by `offset`, for a program loaded with
    /// [load_program_at](crate::machine::Machine::load_program_at).
    pub fn relocate(self, offset: Address) -> SourceMap<V> {
        self.inner.into_iter()
            .map(|(addr, span)| (addr + offset, span))
            .collect()
    }
}

impl SourceMap<Span> {
    /// The statement text that was assembled into `addr`.
    pub fn statement<'a>(&self, addr: Address, source: &'a str) -> Option<&'a str> {
        self.get_source_span(addr)
            .and_then(|span| source.get(span.clone()))
    }

    /// Converts byte offset spans ([Span]) into line and column spans ([LineSpan]).
    pub fn into_line_based(self, source: &str) -> SourceMap<LineSpan> {
        SourceMap {
            inner: self.inner.into_iter()
                .map(|(addr, span)| (addr, span.as_line_span(source)))
                .collect(),
        }
    }
}

impl SourceMap<LineSpan> {
    /// The line the statement assembled into `addr` starts on.
    pub fn line_of(&self, addr: Address) -> Option<usize> {
        self.get_source_span(addr).map(|span| span.start.line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statements_and_lines() {
        let source = "LDA x\n\nx DAT 4";
        let map: SourceMap<Span> = vec![(0, 0..5), (1, 7..14)].into_iter().collect();

        assert_eq!(map.len(), 2);
        assert_eq!(map.statement(1, source), Some("x DAT 4"));
        assert_eq!(map.statement(2, source), None);

        let lines = map.relocate(10).into_line_based(source);

        assert_eq!(lines.line_of(10), Some(1));
        assert_eq!(lines.line_of(11), Some(3));
        assert_eq!(lines.line_of(0), None);
    }
}
