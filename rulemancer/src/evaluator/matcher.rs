//! Pattern matching of rule conditions against working memory
//!
//! A straightforward nested-loop join: conditional elements are visited left
//! to right, every positive pattern ranges over the facts of its relation in
//! insertion order, and multifield constraints are matched by backtracking.

use crate::evaluator::expression::evaluate;
use crate::evaluator::Bindings;
use crate::fact::{Fact, FactFields, FactId, FactStore};
use crate::semantic::{ConditionalElement, FieldConstraint, Pattern, PatternBody, Term};
use crate::value::Value;
use crate::RulemancerResult;

/// A complete match of a rule's left-hand side.
#[derive(Debug, Clone)]
pub(crate) struct Match {
    pub facts: Vec<FactId>,
    pub bindings: Bindings,
}

pub(crate) fn match_conditions(
    conditions: &[ConditionalElement],
    facts: &FactStore,
) -> RulemancerResult<Vec<Match>> {
    let mut matches = Vec::new();
    join(conditions, facts, Bindings::new(), Vec::new(), &mut matches)?;
    Ok(matches)
}

fn join(
    conditions: &[ConditionalElement],
    facts: &FactStore,
    bindings: Bindings,
    matched: Vec<FactId>,
    out: &mut Vec<Match>,
) -> RulemancerResult<()> {
    let Some((condition, rest)) = conditions.split_first() else {
        out.push(Match {
            facts: matched,
            bindings,
        });
        return Ok(());
    };

    match condition {
        ConditionalElement::Pattern(pattern) => {
            for fact in facts.by_relation(&pattern.relation) {
                for extended in match_pattern(pattern, fact, &bindings)? {
                    let mut next = matched.clone();
                    next.push(fact.id);
                    join(rest, facts, extended, next, out)?;
                }
            }
        }
        ConditionalElement::Not(pattern) => {
            let mut blocked = false;
            for fact in facts.by_relation(&pattern.relation) {
                if !match_pattern(pattern, fact, &bindings)?.is_empty() {
                    blocked = true;
                    break;
                }
            }
            if !blocked {
                join(rest, facts, bindings, matched, out)?;
            }
        }
        ConditionalElement::Test(expression) => {
            if evaluate(expression, &bindings)?.is_truthy() {
                join(rest, facts, bindings, matched, out)?;
            }
        }
    }

    Ok(())
}

/// All ways `fact` satisfies `pattern` given the bindings so far.
pub(crate) fn match_pattern(
    pattern: &Pattern,
    fact: &Fact,
    bindings: &Bindings,
) -> RulemancerResult<Vec<Bindings>> {
    let mut start = bindings.clone();
    if let Some(name) = &pattern.binding {
        let address = Value::Fact(fact.id);
        match start.get(name) {
            Some(existing) if existing != &address => return Ok(Vec::new()),
            Some(_) => {}
            None => {
                start.insert(name.clone(), address);
            }
        }
    }

    let mut results = Vec::new();
    match (&pattern.body, &fact.fields) {
        (PatternBody::Ordered(constraints), FactFields::Ordered(values)) => {
            match_sequence(constraints, values, start, &mut results)?;
        }
        (PatternBody::Ordered(constraints), FactFields::Template(_)) => {
            if constraints.is_empty() {
                results.push(start);
            }
        }
        (PatternBody::Slots(slot_constraints), FactFields::Template(_)) => {
            let mut partial = vec![start];
            for constraint in slot_constraints {
                let Some(value) = fact.slot(&constraint.slot) else {
                    return Ok(Vec::new());
                };
                let values: &[Value] = match value {
                    Value::Multifield(values) => values,
                    single => std::slice::from_ref(single),
                };
                let mut next = Vec::new();
                for b in partial {
                    match_sequence(&constraint.fields, values, b, &mut next)?;
                }
                if next.is_empty() {
                    return Ok(Vec::new());
                }
                partial = next;
            }
            results = partial;
        }
        (PatternBody::Slots(_), FactFields::Ordered(_)) => {}
    }

    Ok(results)
}

fn match_sequence(
    constraints: &[FieldConstraint],
    values: &[Value],
    bindings: Bindings,
    out: &mut Vec<Bindings>,
) -> RulemancerResult<()> {
    let Some((constraint, rest)) = constraints.split_first() else {
        if values.is_empty() {
            out.push(bindings);
        }
        return Ok(());
    };

    match constraint {
        FieldConstraint::Single(terms) => {
            let Some((value, remaining)) = values.split_first() else {
                return Ok(());
            };
            let mut extended = bindings;
            if terms_hold(terms, value, &mut extended)? {
                match_sequence(rest, remaining, extended, out)?;
            }
        }
        FieldConstraint::Multi(variable) => {
            for take in 0..=values.len() {
                let mut extended = bindings.clone();
                if let Some(name) = variable {
                    let segment = Value::Multifield(values[..take].to_vec());
                    match extended.get(name) {
                        Some(existing) if existing != &segment => continue,
                        Some(_) => {}
                        None => {
                            extended.insert(name.clone(), segment);
                        }
                    }
                }
                match_sequence(rest, &values[take..], extended, out)?;
            }
        }
    }

    Ok(())
}

fn terms_hold(terms: &[Term], value: &Value, bindings: &mut Bindings) -> RulemancerResult<bool> {
    for term in terms {
        if !term_holds(term, value, bindings)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn term_holds(term: &Term, value: &Value, bindings: &mut Bindings) -> RulemancerResult<bool> {
    match term {
        Term::Wildcard => Ok(true),
        Term::Literal(literal) => Ok(literal == value),
        Term::Variable(name) => match bindings.get(name) {
            Some(bound) => Ok(bound == value),
            None => {
                bindings.insert(name.clone(), value.clone());
                Ok(true)
            }
        },
        Term::Not(inner) => {
            let mut scratch = bindings.clone();
            Ok(!term_holds(inner, value, &mut scratch)?)
        }
        Term::Or(alternatives) => {
            for alternative in alternatives {
                let mut scratch = bindings.clone();
                if term_holds(alternative, value, &mut scratch)? {
                    *bindings = scratch;
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Term::Predicate(expression) => Ok(evaluate(expression, bindings)?.is_truthy()),
    }
}
