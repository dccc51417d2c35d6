//! Symbol tables and label scoping.
//!
//! A label whose first letter is lowercase is local to its module and is
//! dropped from emitted lines after resolution. An uppercase-first label is
//! exported: it stays attached to the emitted line in the linked text.
//! `Stack` is built in and may not be defined by a linked module.

use std::collections::HashMap;

use crate::errors::ErrorKind;

/// Name of the built-in label placed after all code and data.
pub const STACK_SYMBOL: &str = "Stack";

/// Visibility of a label after module resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelScope {
    /// Lowercase-first: visible only inside its module.
    Local,
    /// Uppercase-first: kept on the emitted line.
    Exported,
}

/// Returns the scope implied by a label's first character.
#[must_use]
pub fn label_scope(name: &str) -> LabelScope {
    if name.starts_with(|c: char| c.is_ascii_lowercase()) {
        LabelScope::Local
    } else {
        LabelScope::Exported
    }
}

/// Returns `true` for names the assembler defines when the source does not.
#[must_use]
pub fn is_builtin(name: &str) -> bool {
    name == STACK_SYMBOL
}

/// A label with its assigned address and definition line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Symbol {
    /// Absolute address of the labelled line.
    pub address: i32,
    /// Source line number where the label was defined.
    pub defined_at: usize,
}

/// Mapping from label name to definition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    symbols: HashMap<String, Symbol>,
}

impl SymbolTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a label definition.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::DuplicateLabel`] when `name` is already defined.
    pub fn define(&mut self, name: &str, address: i32, line: usize) -> Result<(), ErrorKind> {
        if let Some(existing) = self.symbols.get(name) {
            return Err(ErrorKind::DuplicateLabel {
                name: name.to_owned(),
                first_definition: existing.defined_at,
            });
        }
        self.symbols.insert(
            name.to_owned(),
            Symbol {
                address,
                defined_at: line,
            },
        );
        Ok(())
    }

    /// Looks up a label.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    /// Resolves a label to its address.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::UndefinedLabel`] when `name` is not defined.
    pub fn address_of(&self, name: &str) -> Result<i32, ErrorKind> {
        self.get(name)
            .map(|symbol| symbol.address)
            .ok_or_else(|| ErrorKind::UndefinedLabel(name.to_owned()))
    }

    /// Returns `true` when `name` is defined.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }
}
