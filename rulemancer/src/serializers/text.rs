//! Text dumps of working memory
//!
//! The relation dump joins facts with no separator while the full dump ends
//! every fact with a newline. Callers parse both shapes, so the two stay
//! distinct.

use crate::fact::{Fact, FactStore};

/// Separator after each fact in a full dump.
pub const FULL_DUMP_SEPARATOR: &str = "\n";

/// Separator after each fact in a dump filtered by relation.
pub const RELATION_DUMP_SEPARATOR: &str = "";

/// Concatenate the pretty forms of `facts` (optionally only those of
/// `relation`), each followed by `separator`.
///
/// Returns `None` when the buffer cannot grow; a partial dump is never
/// returned.
pub fn render_facts<'a>(
    facts: impl IntoIterator<Item = &'a Fact>,
    relation: Option<&str>,
    separator: &str,
) -> Option<String> {
    let mut accumulator = String::new();
    for fact in facts {
        if relation.is_some_and(|name| fact.relation != name) {
            continue;
        }
        let form = fact.pp_form();
        accumulator
            .try_reserve(form.len() + separator.len())
            .ok()?;
        accumulator.push_str(&form);
        accumulator.push_str(separator);
    }
    Some(accumulator)
}

pub fn dump_all(store: &FactStore) -> Option<String> {
    render_facts(store.iter(), None, FULL_DUMP_SEPARATOR)
}

pub fn dump_relation(store: &FactStore, relation: &str) -> Option<String> {
    render_facts(store.iter(), Some(relation), RELATION_DUMP_SEPARATOR)
}
