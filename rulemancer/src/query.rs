//! Helpers for reading dumped facts back into plain data
//!
//! Clients of the room server receive fact dumps as text; these functions
//! split a fact line into its fields and turn `(relation (key value) ...)`
//! facts into maps.

use crate::{RulemancerError, RulemancerResult};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};

/// Split on runs of spaces and tabs, keeping double-quoted segments together.
///
/// Quote characters themselves are dropped.
pub fn split_fields(input: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in input.trim().chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ' ' | '\t' if !in_quotes => {
                if !current.is_empty() {
                    fields.push(std::mem::take(&mut current));
                }
            }
            other => current.push(other),
        }
    }
    if !current.is_empty() {
        fields.push(current);
    }
    fields
}

fn compile(pattern: &str) -> RulemancerResult<Regex> {
    Regex::new(pattern)
        .map_err(|e| RulemancerError::Engine(format!("Invalid pattern '{}': {}", pattern, e)))
}

/// Bodies of every `(relation ...)` in `fact_list`, matched by parenthesis
/// depth. An unterminated fact is skipped; if every one is unterminated the
/// list is malformed.
fn relation_bodies<'a>(relation: &str, fact_list: &'a str) -> RulemancerResult<Vec<&'a str>> {
    let start = compile(&format!(r"\({}\s+", regex::escape(relation)))?;

    let bytes = fact_list.as_bytes();
    let mut bodies = Vec::new();
    let mut openings = 0;
    for opening in start.find_iter(fact_list) {
        openings += 1;
        let body_start = opening.end();
        let mut pos = body_start;
        let mut depth = 1;
        while pos < bytes.len() && depth > 0 {
            match bytes[pos] {
                b'(' => depth += 1,
                b')' => depth -= 1,
                _ => {}
            }
            pos += 1;
        }
        if depth == 0 {
            bodies.push(&fact_list[body_start..pos - 1]);
        }
    }
    if openings > 0 && bodies.is_empty() {
        return Err(RulemancerError::Engine(format!(
            "no matching {} items found",
            relation
        )));
    }
    Ok(bodies)
}

/// Turn every `(relation (key value) ...)` fact in `fact_list` into a map.
///
/// Returns `Ok(None)` when the relation does not occur or none of its facts
/// has a `(key value)` pair, and an error when it occurs only in
/// unterminated facts. All non-empty facts must have the same keys;
/// the first non-empty one sets them.
pub fn fact_list_to_maps(
    relation: &str,
    fact_list: &str,
) -> RulemancerResult<Option<Vec<BTreeMap<String, String>>>> {
    let bodies = relation_bodies(relation, fact_list)?;
    if bodies.is_empty() {
        return Ok(None);
    }

    let key_value = compile(r"\(([^\s]+)\s+([^)]+)\)")?;
    let mut results: Vec<BTreeMap<String, String>> = Vec::new();
    let mut expected: Option<BTreeSet<String>> = None;

    for (index, body) in bodies.iter().enumerate() {
        let item: BTreeMap<String, String> = key_value
            .captures_iter(body)
            .map(|caps| (caps[1].to_string(), caps[2].to_string()))
            .collect();
        if item.is_empty() {
            continue;
        }

        match &expected {
            None => expected = Some(item.keys().cloned().collect()),
            Some(keys) => {
                if item.len() != keys.len() {
                    return Err(inconsistent(format!(
                        "item {} has {} fields, expected {}",
                        index,
                        item.len(),
                        keys.len()
                    )));
                }
                if let Some(unexpected) = item.keys().find(|k| !keys.contains(*k)) {
                    return Err(inconsistent(format!(
                        "item {} has unexpected field \"{}\"",
                        index, unexpected
                    )));
                }
                if let Some(missing) = keys.iter().find(|k| !item.contains_key(*k)) {
                    return Err(inconsistent(format!(
                        "item {} missing expected field \"{}\"",
                        index, missing
                    )));
                }
            }
        }
        results.push(item);
    }

    if results.is_empty() {
        Ok(None)
    } else {
        Ok(Some(results))
    }
}

fn inconsistent(detail: String) -> RulemancerError {
    RulemancerError::Engine(format!("Inconsistent fields: {}", detail))
}
