mod interner;
mod table;

use std::cell::RefCell;
use std::fmt;

use self::interner::Interner;
pub use self::table::{Scope, SymbolTable};

fn with_interner<T>(f: impl FnOnce(&mut Interner) -> T) -> T {
    thread_local! {
        static INTERNER: RefCell<Interner> = RefCell::new(Interner::default());
    }

    INTERNER.with(|i| f(&mut *i.borrow_mut()))
}

/// An interned identifier or token text.
#[derive(Copy, Clone, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub struct Symbol(u32);

impl Symbol {
    pub fn intern(s: &str) -> Self {
        with_interner(|interner| interner.intern(s))
    }

    pub fn as_str_with<T>(&self, f: impl FnOnce(&str) -> T) -> T {
        with_interner(|interner| f(interner.lookup(self.0)))
    }

    pub fn is(&self, s: &str) -> bool {
        self.as_str_with(|t| t == s)
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        with_interner(|interner| f.write_str(interner.lookup(self.0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_is_stable() {
        let a = Symbol::intern("Foo");
        let b = Symbol::intern("Foo");
        assert_eq!(a, b);
        assert_ne!(a, Symbol::intern("Bar"));
        assert_eq!(a.to_string(), "Foo");
        assert!(a.is("Foo"));
    }

    #[test]
    fn leaving_a_scope_restores_shadowed() {
        let x = Symbol::intern("x");
        let y = Symbol::intern("y");
        let mut table = SymbolTable::new();
        table.insert(x, 1);
        let block = table.enter();
        assert!(!table.declared_in(x, block));
        table.insert(x, 2);
        table.insert(y, 3);
        assert!(table.declared_in(x, block));
        assert_eq!(table.get(x), Some(&2));
        table.leave(block);
        assert_eq!(table.get(x), Some(&1));
        assert_eq!(table.get(y), None);
    }
}
