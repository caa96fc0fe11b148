//! String interning for the offline builder.
//!
//! The builder sees the same property names and values on millions of lines.
//! An [`Interner`] stores each distinct string once and hands out [`Symbol`]s.
//! It is an ordinary value owned by whoever builds the dictionary and dropped
//! with it.

use std::fmt;

use super::hash::FxIndexSet;

/// Handle to an interned string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

impl Symbol {
    /// Returns the dense index of this symbol.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Deduplicating string store.
#[derive(Default)]
pub struct Interner {
    strings: FxIndexSet<Box<str>>,
}

impl Interner {
    /// Creates an empty interner.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `s`, returning the existing symbol if it was seen before.
    pub fn intern(&mut self, s: &str) -> Symbol {
        if let Some(index) = self.strings.get_index_of(s) {
            return Symbol(index as u32);
        }
        let (index, _) = self.strings.insert_full(s.into());
        Symbol(index as u32)
    }

    /// Returns the symbol for `s` without interning it.
    #[must_use]
    pub fn get(&self, s: &str) -> Option<Symbol> {
        self.strings.get_index_of(s).map(|i| Symbol(i as u32))
    }

    /// Returns the string behind `symbol`.
    ///
    /// Symbols from another interner resolve to the empty string.
    #[must_use]
    pub fn resolve(&self, symbol: Symbol) -> &str {
        self.strings
            .get_index(symbol.index())
            .map_or("", |s| s.as_ref())
    }

    /// Number of distinct strings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Returns true if nothing has been interned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

impl fmt::Debug for Interner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interner")
            .field("len", &self.strings.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_dedup() {
        let mut interner = Interner::new();
        let a = interner.intern("inflection");
        let b = interner.intern("gender");
        let c = interner.intern("inflection");

        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(interner.len(), 2);
        assert_eq!(interner.resolve(b), "gender");
    }

    #[test]
    fn test_get_does_not_insert() {
        let mut interner = Interner::new();
        assert!(interner.get("x").is_none());
        let x = interner.intern("x");
        assert_eq!(interner.get("x"), Some(x));
        assert_eq!(interner.len(), 1);
    }
}
