// File: src/symbol_table.rs
//
// Lexical scope resolver used by the compiler. Each active function body
// (plus the top-level program) owns one `SymbolTable`; tables chain through
// `outer` so inner scopes can resolve names defined further out.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolScope {
    Global,
    Local,
    Builtin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub scope: SymbolScope,
    pub index: usize,
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    outer: Option<Box<SymbolTable>>,
    store: HashMap<String, Symbol>,
    num_definitions: usize,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    pub fn new_enclosed(outer: SymbolTable) -> Self {
        SymbolTable { outer: Some(Box::new(outer)), store: HashMap::new(), num_definitions: 0 }
    }

    /// Unwraps this table, handing back its `outer` table (or an empty table
    /// if this was the outermost one). Used by `Compiler::leave_scope`.
    pub fn into_outer(self) -> SymbolTable {
        match self.outer {
            Some(outer) => *outer,
            None => SymbolTable::new(),
        }
    }

    pub fn define(&mut self, name: &str) -> Symbol {
        let scope = if self.outer.is_none() { SymbolScope::Global } else { SymbolScope::Local };
        let symbol = Symbol { name: name.to_string(), scope, index: self.num_definitions };
        self.num_definitions += 1;
        self.store.insert(name.to_string(), symbol.clone());
        symbol
    }

    /// Registers a builtin at a fixed index on the outermost table. Must be
    /// called (in index order) before any user compilation, so inner scopes
    /// resolve through the `outer` chain down to it.
    pub fn define_builtin(&mut self, index: usize, name: &str) -> Symbol {
        let symbol = Symbol { name: name.to_string(), scope: SymbolScope::Builtin, index };
        self.store.insert(name.to_string(), symbol.clone());
        symbol
    }

    pub fn resolve(&self, name: &str) -> Option<Symbol> {
        match self.store.get(name) {
            Some(symbol) => Some(symbol.clone()),
            None => self.outer.as_ref().and_then(|outer| outer.resolve(name)),
        }
    }

    pub fn num_definitions(&self) -> usize {
        self.num_definitions
    }

    pub fn has_outer(&self) -> bool {
        self.outer.is_some()
    }
}
