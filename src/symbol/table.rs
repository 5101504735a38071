use crate::symbol::Symbol;
use std::collections::HashMap;

/// Names visible at the current point of a method body.
///
/// Every binding is recorded on a trail together with whatever it shadowed.
/// `enter` marks the trail; `leave` pops back to the mark and puts the
/// shadowed bindings back.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolTable<T> {
    visible: HashMap<Symbol, T>,
    trail: Vec<Binding<T>>,
}

#[derive(Debug, Clone, PartialEq)]
struct Binding<T> {
    name: Symbol,
    shadowed: Option<T>,
}

/// Position on the trail where a block began.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scope(usize);

impl<T> Default for SymbolTable<T> {
    fn default() -> Self {
        Self {
            visible: HashMap::new(),
            trail: vec![],
        }
    }
}

impl<T> SymbolTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: Symbol, value: T) {
        let shadowed = self.visible.insert(name, value);
        self.trail.push(Binding { name, shadowed });
    }

    pub fn get(&self, name: Symbol) -> Option<&T> {
        self.visible.get(&name)
    }

    /// Whether `name` was bound inside `scope` itself, ignoring outer blocks.
    pub fn declared_in(&self, name: Symbol, scope: Scope) -> bool {
        self.trail
            .get(scope.0..)
            .map_or(false, |inner| inner.iter().any(|b| b.name == name))
    }

    pub fn enter(&self) -> Scope {
        Scope(self.trail.len())
    }

    pub fn leave(&mut self, scope: Scope) {
        let start = scope.0.min(self.trail.len());
        for Binding { name, shadowed } in self.trail.drain(start..).rev() {
            match shadowed {
                Some(v) => self.visible.insert(name, v),
                None => self.visible.remove(&name),
            };
        }
    }
}
