//! String interning.
//!
//! Interned strings are leaked to get a `'static` lifetime; the
//! interner lives for the whole compilation anyway. Lookup and
//! insertion go through an `RwLock` so the interner can be shared by
//! reference everywhere without threading `&mut` through the lexer,
//! parser, and elaborator.

use std::fmt;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

/// An interned string handle. Equality and hashing are O(1).
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Name(u32);

impl Name {
    /// The pre-interned empty string.
    pub const EMPTY: Name = Name(0);

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The resolved text would require interner access; show the index.
        write!(f, "Name({})", self.0)
    }
}

struct Inner {
    map: FxHashMap<&'static str, u32>,
    strings: Vec<&'static str>,
}

/// Interner for identifiers, raw token text, and literal strings.
pub struct StringInterner {
    inner: RwLock<Inner>,
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl StringInterner {
    pub fn new() -> Self {
        let mut map = FxHashMap::default();
        map.insert("", 0);
        StringInterner {
            inner: RwLock::new(Inner {
                map,
                strings: vec![""],
            }),
        }
    }

    /// Intern a string, returning its stable handle.
    pub fn intern(&self, s: &str) -> Name {
        // Fast path: already interned.
        {
            let inner = self.inner.read();
            if let Some(&idx) = inner.map.get(s) {
                return Name(idx);
            }
        }

        let mut inner = self.inner.write();
        // Re-check after taking the write lock.
        if let Some(&idx) = inner.map.get(s) {
            return Name(idx);
        }
        let leaked: &'static str = Box::leak(s.to_owned().into_boxed_str());
        let idx = u32::try_from(inner.strings.len())
            .unwrap_or_else(|_| panic!("interner capacity exceeded"));
        inner.strings.push(leaked);
        inner.map.insert(leaked, idx);
        Name(idx)
    }

    /// Resolve a handle back to its text.
    pub fn get(&self, name: Name) -> &'static str {
        self.inner.read().strings[name.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.inner.read().strings.len()
    }

    pub fn is_empty(&self) -> bool {
        // Never empty: the empty string is pre-interned.
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_deduplicates() {
        let interner = StringInterner::new();
        let a = interner.intern("clk");
        let b = interner.intern("clk");
        let c = interner.intern("rst");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(interner.get(a), "clk");
        assert_eq!(interner.get(c), "rst");
    }

    #[test]
    fn empty_string_is_preinterned() {
        let interner = StringInterner::new();
        assert_eq!(interner.intern(""), Name::EMPTY);
        assert_eq!(interner.get(Name::EMPTY), "");
    }
}
