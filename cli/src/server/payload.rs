//! JSON bodies of named assertions
//!
//! A body maps every relation of the assertion to a list of items; each
//! item maps slot names to their values:
//!
//! ```json
//! { "move": [ { "player": ["x"], "cell": ["4"] } ] }
//! ```
//!
//! becomes `(move (cell 4) (player x))`.

use serde_json::{Map, Value as Json};
use std::collections::BTreeMap;
use std::fmt;

type Item = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, PartialEq)]
pub enum PayloadError {
    Missing(String),
    Invalid(String),
}

impl fmt::Display for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadError::Missing(relation) => write!(f, "missing required field: {}", relation),
            PayloadError::Invalid(relation) => write!(f, "invalid field format: {}", relation),
        }
    }
}

/// Fact text for every item of every relation, in the order `relations`
/// lists them. Keys of `body` that are not relations of the assertion are
/// ignored.
pub fn assertion_facts(
    relations: &[String],
    body: &Map<String, Json>,
) -> Result<Vec<String>, PayloadError> {
    let mut facts = Vec::new();
    for relation in relations {
        let value = body
            .get(relation)
            .ok_or_else(|| PayloadError::Missing(relation.clone()))?;
        let items: Vec<Item> = serde_json::from_value(value.clone())
            .map_err(|_| PayloadError::Invalid(relation.clone()))?;
        facts.extend(items.iter().map(|item| fact_text(relation, item)));
    }
    Ok(facts)
}

fn fact_text(relation: &str, item: &Item) -> String {
    let mut text = format!("({}", relation);
    for (slot, values) in item {
        text.push_str(" (");
        text.push_str(slot);
        for value in values {
            text.push(' ');
            text.push_str(&atom(value));
        }
        text.push(')');
    }
    text.push(')');
    text
}

/// A value as one field: bare when it reads as a single atom, otherwise
/// as a string literal.
fn atom(value: &str) -> String {
    let bare = !value.is_empty()
        && !value.starts_with('?')
        && !value.starts_with("$?")
        && !value.chars().any(|c| {
            c.is_whitespace() || matches!(c, '(' | ')' | '"' | ';' | '&' | '|' | '~' | '\\')
        });
    if bare {
        value.to_string()
    } else {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: Json) -> Map<String, Json> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_items_become_template_facts() {
        let facts = assertion_facts(
            &["move".to_string()],
            &body(json!({
                "move": [
                    {"player": ["x"], "cell": ["4"]},
                    {"player": ["o"], "cell": ["0"], "tags": ["fast", "bold"]}
                ],
                "ignored": 1
            })),
        )
        .unwrap();
        assert_eq!(
            facts,
            vec![
                "(move (cell 4) (player x))",
                "(move (cell 0) (player o) (tags fast bold))"
            ]
        );
    }

    #[test]
    fn test_relations_keep_their_order() {
        let facts = assertion_facts(
            &["b".to_string(), "a".to_string()],
            &body(json!({"a": [{"k": ["1"]}], "b": [{"k": ["2"]}]})),
        )
        .unwrap();
        assert_eq!(facts, vec!["(b (k 2))", "(a (k 1))"]);
    }

    #[test]
    fn test_values_that_are_not_atoms_are_quoted() {
        let facts = assertion_facts(
            &["say".to_string()],
            &body(json!({"say": [{"text": ["hello world", "a) (b", "?x", "", "back\\slash \"q\""]}]})),
        )
        .unwrap();
        assert_eq!(
            facts[0],
            r#"(say (text "hello world" "a) (b" "?x" "" "back\\slash \"q\""))"#
        );
    }

    #[test]
    fn test_missing_and_malformed_relations() {
        let relations = ["move".to_string()];
        assert_eq!(
            assertion_facts(&relations, &body(json!({}))),
            Err(PayloadError::Missing("move".to_string()))
        );
        let err = assertion_facts(&relations, &body(json!({"move": {"player": ["x"]}}))).unwrap_err();
        assert_eq!(err.to_string(), "invalid field format: move");
        assert!(assertion_facts(&relations, &body(json!({"move": [{"cell": [4]}]}))).is_err());
    }
}
