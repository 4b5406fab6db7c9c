use std::collections::{HashMap, HashSet};

use cranelift_entity::{EntityRef, PrimaryMap};
use gbnf_runtime::RuleId;

use crate::span::Span;

/// Names starting with this belong to generated helper rules.
pub const RESERVED_PREFIX: &str = "_";

#[derive(Clone, Debug)]
struct Entry {
    name: Box<str>,
    /// Where the name was first seen, either a reference or the definition.
    mention: Span,
}

/// Bijection between rule names and identities, in order of first mention.
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    entries: PrimaryMap<RuleId, Entry>,
    ids: HashMap<Box<str>, RuleId>,
    /// Names which generated helpers must avoid even before they are interned.
    reserved: HashSet<Box<str>>,
}

impl SymbolTable {
    pub fn new() -> SymbolTable {
        Self::default()
    }
    /// Returns the identity of `name`, assigning the next one if it was never seen.
    pub fn intern(&mut self, name: &str, mention: Span) -> RuleId {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        self.insert(name.into(), mention)
    }
    /// Creates a fresh identity for a helper rule of `base`, named `_<base>_<n>`.
    ///
    /// `n` starts at the new identity's index and is bumped while the name is interned or
    /// reserved.
    pub fn generate(&mut self, base: &str, mention: Span) -> RuleId {
        let mut n = self.entries.next_key().index();
        loop {
            let name = format!("{RESERVED_PREFIX}{base}_{n}");
            if !self.ids.contains_key(name.as_str()) && !self.reserved.contains(name.as_str()) {
                return self.insert(name.into_boxed_str(), mention);
            }
            n += 1;
        }
    }
    /// Keeps `name` away from [`SymbolTable::generate`] without assigning it an identity.
    pub fn reserve(&mut self, name: &str) {
        if !self.reserved.contains(name) {
            self.reserved.insert(name.into());
        }
    }
    fn insert(&mut self, name: Box<str>, mention: Span) -> RuleId {
        let id = self.entries.push(Entry {
            name: name.clone(),
            mention,
        });
        self.ids.insert(name, id);
        id
    }
    pub fn get(&self, name: &str) -> Option<RuleId> {
        self.ids.get(name).copied()
    }
    pub fn name(&self, id: RuleId) -> &str {
        &self.entries[id].name
    }
    pub fn first_mention(&self, id: RuleId) -> Span {
        self.entries[id].mention
    }
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    pub fn ids(&self) -> cranelift_entity::Keys<RuleId> {
        self.entries.keys()
    }
    pub fn iter(&self) -> impl Iterator<Item = (RuleId, &str)> + '_ {
        self.entries.iter().map(|(id, entry)| (id, &*entry.name))
    }
}
