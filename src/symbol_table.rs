//! The label table built while assembling a program.

use std::collections::HashMap;

use crate::instruction::Address;
use crate::parsing::Span;

/// Everything known about a single label.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SymbolInfo {
    pub label: String,
    /// The address the label is bound to. `None` if it was only referenced.
    pub address: Option<Address>,
    /// Where the label was (last) defined.
    pub defined: Option<Span>,
    /// Every operand that refers to the label.
    pub references: Vec<Span>,
}

/// Mapping from case-sensitive labels into addresses.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SymbolTable {
    inner: HashMap<String, SymbolInfo>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            inner: HashMap::new(),
        }
    }

    fn entry(&mut self, label: &str) -> &mut SymbolInfo {
        self.inner
            .entry(label.to_string())
            .or_insert_with(|| SymbolInfo {
                label: label.to_string(),
                ..SymbolInfo::default()
            })
    }

    /// Binds `label` to `address`, replacing an earlier binding.
    ///
    /// # Returns
    /// The span of the replaced definition, if the label was already defined.
    pub fn define_symbol(&mut self, span: Span, label: &str, address: Address) -> Option<Span> {
        let symbol = self.entry(label);
        let previous = symbol.defined.replace(span);
        symbol.address = Some(address);

        previous
    }

    /// Records a use of `label` as an operand.
    pub fn reference_symbol(&mut self, span: Span, label: &str) {
        self.entry(label).references.push(span);
    }

    pub fn symbol_by_label<S: AsRef<str>>(&self, label: S) -> Option<&SymbolInfo> {
        self.inner.get(label.as_ref())
    }

    /// Returns the address `label` is bound to.
    pub fn address_of<S: AsRef<str>>(&self, label: S) -> Option<Address> {
        self.symbol_by_label(label).and_then(|symbol| symbol.address)
    }

    /// Iterates over the defined labels sorted by address.
    pub fn defined(&self) -> impl Iterator<Item = (&str, Address)> {
        let mut symbols: Vec<_> = self.inner
            .values()
            .filter_map(|symbol| symbol.address.map(|addr| (symbol.label.as_str(), addr)))
            .collect();

        symbols.sort_by_key(|&(label, addr)| (addr, label));
        symbols.into_iter()
    }
}
