//! Symbol table: identifier → stored variable, insertion-once.

use std::collections::HashMap;

use crate::value::Type;

/// A stored variable. Type and slot are fixed at creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Variable {
    pub ty: Type,
    /// Storage slot index (declaration order).
    pub slot: usize,
    /// Element count. Always 1: variables are scalars.
    pub count: usize,
}

/// Identifier → `Variable`, iterated in insertion order so the
/// declarations section is reproducible.
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    order: Vec<String>,
    entries: HashMap<String, Variable>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` with type `ty`.
    ///
    /// Returns `Ok` with the new entry, or `Err` with the existing entry
    /// (left untouched) when `name` is already registered.
    pub fn insert(&mut self, name: &str, ty: Type) -> Result<&Variable, &Variable> {
        if self.entries.contains_key(name) {
            return Err(&self.entries[name]);
        }
        let slot = self.order.len();
        self.order.push(name.to_string());
        let var = self.entries.entry(name.to_string()).or_insert(Variable {
            ty,
            slot,
            count: 1,
        });
        Ok(var)
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Variable)> {
        self.order
            .iter()
            .map(move |name| (name.as_str(), &self.entries[name]))
    }
}
