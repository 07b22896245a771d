use std::sync::{PoisonError, RwLock};

use once_cell::sync::Lazy;

/// Process-wide string table backing [`InternedSymbol`]. Strings are leaked
/// on insertion and never removed.
#[derive(Debug, Default)]
pub struct InterningTable {
    strings: RwLock<Vec<&'static str>>,
}

pub static INTERNING_TABLE: Lazy<InterningTable> = Lazy::new(Default::default);

impl InterningTable {
    pub fn get(&self, index: u32) -> Option<&'static str> {
        let strings = self.strings.read().unwrap_or_else(PoisonError::into_inner);

        strings.get(index as usize).copied()
    }

    pub fn insert_if_absent(&self, string: &str) -> u32 {
        let mut strings = self.strings.write().unwrap_or_else(PoisonError::into_inner);

        // Checked under the write lock so two threads cannot both insert
        if let Some(index) = strings.iter().position(|s| *s == string) {
            return index as _;
        }

        strings.push(Box::leak(string.to_owned().into_boxed_str()));
        (strings.len() - 1) as _
    }
}

/// An index into the string interning table
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InternedSymbol(u32);

impl InternedSymbol {
    pub fn new(value: &str) -> Self {
        Self(INTERNING_TABLE.insert_if_absent(value))
    }

    pub fn value(&self) -> &'static str {
        // Symbols are only minted by `new`, which inserted the string first
        INTERNING_TABLE.get(self.0).unwrap_or("<unknown>")
    }
}

impl core::fmt::Debug for InternedSymbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("InternedSymbol")
            .field(&self.0)
            .field(&self.value())
            .finish()
    }
}

impl core::fmt::Display for InternedSymbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.value())
    }
}
