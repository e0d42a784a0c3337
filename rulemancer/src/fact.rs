//! Working memory
//!
//! Facts are kept in insertion order, keyed by a monotonically increasing
//! [`FactId`]. A fact never changes after it is asserted; `modify` is a
//! retract followed by an assert.

use crate::value::Value;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Index of a fact within its environment. Ids start at 1 after every reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct FactId(u64);

impl FactId {
    pub fn new(index: u64) -> Self {
        Self(index)
    }

    pub fn index(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for FactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slot {
    pub name: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FactFields {
    Ordered(Vec<Value>),
    Template(Vec<Slot>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fact {
    pub id: FactId,
    pub relation: String,
    pub fields: FactFields,
}

impl Fact {
    pub fn slot(&self, name: &str) -> Option<&Value> {
        match &self.fields {
            FactFields::Template(slots) => slots.iter().find(|s| s.name == name).map(|s| &s.value),
            FactFields::Ordered(_) => None,
        }
    }

    /// The canonical pretty-printed form, e.g. `(move (player x) (x 1))`.
    pub fn pp_form(&self) -> String {
        self.to_string()
    }

    fn same_content(&self, relation: &str, fields: &FactFields) -> bool {
        self.relation == relation && &self.fields == fields
    }
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.relation)?;
        match &self.fields {
            FactFields::Ordered(values) => {
                for value in values {
                    write!(f, " {}", value)?;
                }
            }
            FactFields::Template(slots) => {
                for slot in slots {
                    match &slot.value {
                        Value::Multifield(values) if values.is_empty() => {
                            write!(f, " ({})", slot.name)?
                        }
                        value => write!(f, " ({} {})", slot.name, value)?,
                    }
                }
            }
        }
        write!(f, ")")
    }
}

/// Ordered collection of asserted facts
#[derive(Debug, Default)]
pub struct FactStore {
    facts: BTreeMap<FactId, Fact>,
    next_index: u64,
}

impl FactStore {
    pub fn new() -> Self {
        Self {
            facts: BTreeMap::new(),
            next_index: 1,
        }
    }

    /// Insert a fact unless an identical one is already present.
    ///
    /// Returns the id of the stored fact and whether it is new.
    pub fn insert(&mut self, relation: String, fields: FactFields) -> (FactId, bool) {
        if let Some(existing) = self
            .facts
            .values()
            .find(|fact| fact.same_content(&relation, &fields))
        {
            return (existing.id, false);
        }

        let id = FactId(self.next_index.max(1));
        self.next_index = id.0 + 1;
        self.facts.insert(
            id,
            Fact {
                id,
                relation,
                fields,
            },
        );
        (id, true)
    }

    pub fn remove(&mut self, id: FactId) -> Option<Fact> {
        self.facts.remove(&id)
    }

    pub fn get(&self, id: FactId) -> Option<&Fact> {
        self.facts.get(&id)
    }

    /// All facts in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Fact> {
        self.facts.values()
    }

    /// Facts of one relation in insertion order.
    pub fn by_relation<'a>(&'a self, relation: &'a str) -> impl Iterator<Item = &'a Fact> + 'a {
        self.facts.values().filter(move |f| f.relation == relation)
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// Drop every fact and restart numbering.
    pub fn clear(&mut self) {
        self.facts.clear();
        self.next_index = 1;
    }
}
