use super::ty::Type;
use crate::{
    frontend::{intern::InternedSymbol, lexer::Span},
    index::{IndexVec, simple_index},
};

simple_index! {
    /// Identifies a declared name (global, function, parameter or local) in a
    /// [`SymbolTable`]
    pub struct SymbolId;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: InternedSymbol,
    /// Declared type. For functions this is the return type.
    pub ty: Type,
    pub scope: Scope,
    pub kind: SymbolKind,
    /// Where the name was declared
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Global,
    /// Declared inside the body (or parameter list) of this function
    Local(SymbolId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SymbolKind {
    Variable,
    Parameter,
    Function { parameter_types: Vec<Type> },
}

impl Symbol {
    pub fn is_function(&self) -> bool {
        matches!(self.kind, SymbolKind::Function { .. })
    }

    pub fn is_global_variable(&self) -> bool {
        self.scope == Scope::Global && !self.is_function()
    }
}

/// Every name declared in a program. Symbols are never removed, and shadowed
/// names get distinct entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolTable {
    symbols: IndexVec<SymbolId, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: Symbol) -> SymbolId {
        self.symbols.push(symbol)
    }

    pub fn name(&self, id: SymbolId) -> &'static str {
        self.symbols[id].name.value()
    }

    pub fn ty(&self, id: SymbolId) -> Type {
        self.symbols[id].ty
    }

    #[cfg(test)]
    pub(crate) fn iter(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        use crate::index::Index;
        self.symbols
            .raw
            .iter()
            .enumerate()
            .map(|(i, symbol)| (SymbolId::new(i), symbol))
    }
}

impl core::ops::Index<SymbolId> for SymbolTable {
    type Output = Symbol;

    fn index(&self, id: SymbolId) -> &Self::Output {
        &self.symbols[id]
    }
}
