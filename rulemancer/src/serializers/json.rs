//! JSON view of facts
//!
//! Ordered facts become `{"id", "relation", "fields": [...]}` and template
//! facts `{"id", "relation", "slots": {...}}`. Symbols and strings both map
//! to JSON strings; fact addresses keep their `<Fact-N>` text.

use crate::fact::{Fact, FactFields};
use crate::value::{format_float, Value};
use serde_json::{json, Map, Value as JsonValue};

fn value_to_json(value: &Value) -> JsonValue {
    match value {
        Value::Symbol(s) | Value::String(s) => JsonValue::String(s.clone()),
        Value::Integer(i) => json!(i),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(JsonValue::Number)
            .unwrap_or_else(|| JsonValue::String(format_float(*f))),
        Value::Fact(_) => JsonValue::String(value.to_string()),
        Value::Multifield(values) => JsonValue::Array(values.iter().map(value_to_json).collect()),
    }
}

pub fn fact_to_json(fact: &Fact) -> JsonValue {
    match &fact.fields {
        FactFields::Ordered(values) => json!({
            "id": fact.id.index(),
            "relation": fact.relation,
            "fields": values.iter().map(value_to_json).collect::<Vec<_>>(),
        }),
        FactFields::Template(slots) => {
            let mut map = Map::new();
            for slot in slots {
                map.insert(slot.name.clone(), value_to_json(&slot.value));
            }
            json!({
                "id": fact.id.index(),
                "relation": fact.relation,
                "slots": map,
            })
        }
    }
}

pub fn facts_to_json<'a>(facts: impl IntoIterator<Item = &'a Fact>) -> JsonValue {
    JsonValue::Array(facts.into_iter().map(fact_to_json).collect())
}
