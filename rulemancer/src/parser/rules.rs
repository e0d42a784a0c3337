use crate::ast::Span;
use crate::error::RulemancerError;
use crate::parser::expressions::{parse_expression, parse_function_call, variable_name};
use crate::parser::literals::parse_literal;
use crate::parser::{parse_comment, ParseSource, Rule};
use crate::semantic::{
    ConditionalElement, Expression, FieldConstraint, Pattern, PatternBody, SlotConstraint, Term,
};
use pest::iterators::Pair;

pub(crate) fn parse_defrule(
    pair: Pair<Rule>,
    source: &ParseSource,
) -> Result<crate::semantic::Rule, RulemancerError> {
    let span = Span::from_pest_span(pair.as_span());
    let mut name = None;
    let mut comment = None;
    let mut salience = 0;
    let mut conditions = Vec::new();
    let mut actions = Vec::new();

    for inner_pair in pair.into_inner() {
        match inner_pair.as_rule() {
            Rule::symbol => name = Some(inner_pair.as_str().to_string()),
            Rule::comment => comment = Some(parse_comment(inner_pair)?),
            Rule::declaration => salience = parse_declaration(inner_pair)?,
            Rule::conditional_element => {
                conditions.push(parse_conditional_element(inner_pair, source)?)
            }
            Rule::function_call => {
                actions.push(Expression::Call(parse_function_call(inner_pair, source)?))
            }
            _ => {}
        }
    }

    let name = name.ok_or_else(|| source.error("defrule is missing a name", span.clone()))?;

    Ok(crate::semantic::Rule {
        name,
        comment,
        salience,
        conditions,
        actions,
        span,
    })
}

fn parse_declaration(pair: Pair<Rule>) -> Result<i64, RulemancerError> {
    let integer = pair
        .into_inner()
        .find(|p| p.as_rule() == Rule::salience_decl)
        .and_then(|p| p.into_inner().find(|i| i.as_rule() == Rule::integer))
        .ok_or_else(|| {
            RulemancerError::Engine("Grammar error: declare must contain salience".to_string())
        })?;

    integer.as_str().parse::<i64>().map_err(|e| {
        RulemancerError::Engine(format!("Invalid salience '{}': {}", integer.as_str(), e))
    })
}

fn parse_conditional_element(
    pair: Pair<Rule>,
    source: &ParseSource,
) -> Result<ConditionalElement, RulemancerError> {
    let span = Span::from_pest_span(pair.as_span());
    let inner = pair
        .into_inner()
        .next()
        .ok_or_else(|| source.error("Empty conditional element", span.clone()))?;

    match inner.as_rule() {
        Rule::pattern_ce => Ok(ConditionalElement::Pattern(parse_pattern(inner, None, source)?)),
        Rule::assigned_pattern => {
            let mut binding = None;
            let mut pattern = None;
            for part in inner.into_inner() {
                match part.as_rule() {
                    Rule::variable => binding = Some(variable_name(part.as_str())),
                    Rule::pattern_ce => pattern = Some(part),
                    _ => {}
                }
            }
            let pattern = pattern.ok_or_else(|| {
                RulemancerError::Engine("Grammar error: assigned_pattern missing pattern".to_string())
            })?;
            Ok(ConditionalElement::Pattern(parse_pattern(
                pattern, binding, source,
            )?))
        }
        Rule::not_ce => {
            let pattern = inner
                .into_inner()
                .find(|p| p.as_rule() == Rule::pattern_ce)
                .ok_or_else(|| source.error("(not ...) needs a pattern", span))?;
            Ok(ConditionalElement::Not(parse_pattern(pattern, None, source)?))
        }
        Rule::test_ce => {
            let expression = inner
                .into_inner()
                .find(|p| p.as_rule() == Rule::expression)
                .ok_or_else(|| source.error("(test ...) needs an expression", span))?;
            Ok(ConditionalElement::Test(parse_expression(expression, source)?))
        }
        other => Err(RulemancerError::Engine(format!(
            "Grammar error: unexpected conditional element {:?}",
            other
        ))),
    }
}

fn parse_pattern(
    pair: Pair<Rule>,
    binding: Option<String>,
    source: &ParseSource,
) -> Result<Pattern, RulemancerError> {
    let span = Span::from_pest_span(pair.as_span());
    let mut relation = None;
    let mut fields = Vec::new();
    let mut slots = Vec::new();

    for inner_pair in pair.into_inner() {
        match inner_pair.as_rule() {
            Rule::symbol => relation = Some(inner_pair.as_str().to_string()),
            Rule::field_constraint => fields.push(parse_field_constraint(inner_pair, source)?),
            Rule::slot_constraint => slots.push(parse_slot_constraint(inner_pair, source)?),
            _ => {}
        }
    }

    let relation = relation.ok_or_else(|| source.error("Pattern is missing a relation", span.clone()))?;
    let body = if slots.is_empty() {
        PatternBody::Ordered(fields)
    } else {
        PatternBody::Slots(slots)
    };

    Ok(Pattern {
        binding,
        relation,
        body,
        span,
    })
}

fn parse_slot_constraint(
    pair: Pair<Rule>,
    source: &ParseSource,
) -> Result<SlotConstraint, RulemancerError> {
    let mut slot = None;
    let mut fields = Vec::new();
    for inner_pair in pair.into_inner() {
        match inner_pair.as_rule() {
            Rule::symbol => slot = Some(inner_pair.as_str().to_string()),
            Rule::field_constraint => fields.push(parse_field_constraint(inner_pair, source)?),
            _ => {}
        }
    }
    let slot = slot.ok_or_else(|| {
        RulemancerError::Engine("Grammar error: slot_constraint missing slot name".to_string())
    })?;
    Ok(SlotConstraint { slot, fields })
}

fn parse_field_constraint(
    pair: Pair<Rule>,
    source: &ParseSource,
) -> Result<FieldConstraint, RulemancerError> {
    let span = Span::from_pest_span(pair.as_span());
    let inner = pair
        .into_inner()
        .next()
        .ok_or_else(|| source.error("Empty field constraint", span))?;

    match inner.as_rule() {
        Rule::multi_variable => Ok(FieldConstraint::Multi(Some(variable_name(inner.as_str())))),
        Rule::multi_wildcard => Ok(FieldConstraint::Multi(None)),
        Rule::connected => {
            let mut terms = Vec::new();
            for or_pair in inner.into_inner() {
                if or_pair.as_rule() == Rule::or_constraint {
                    terms.push(parse_or_constraint(or_pair, source)?);
                }
            }
            Ok(FieldConstraint::Single(terms))
        }
        other => Err(RulemancerError::Engine(format!(
            "Grammar error: unexpected field constraint {:?}",
            other
        ))),
    }
}

fn parse_or_constraint(pair: Pair<Rule>, source: &ParseSource) -> Result<Term, RulemancerError> {
    let mut alternatives = Vec::new();
    for term_pair in pair.into_inner() {
        if term_pair.as_rule() == Rule::single_term {
            alternatives.push(parse_single_term(term_pair, source)?);
        }
    }
    if alternatives.len() == 1 {
        Ok(alternatives.remove(0))
    } else {
        Ok(Term::Or(alternatives))
    }
}

fn parse_single_term(pair: Pair<Rule>, source: &ParseSource) -> Result<Term, RulemancerError> {
    let span = Span::from_pest_span(pair.as_span());
    let inner = pair
        .into_inner()
        .next()
        .ok_or_else(|| source.error("Empty constraint term", span.clone()))?;

    match inner.as_rule() {
        Rule::variable => Ok(Term::Variable(variable_name(inner.as_str()))),
        Rule::wildcard => Ok(Term::Wildcard),
        Rule::literal => Ok(Term::Literal(parse_literal(inner)?)),
        Rule::negated_term => {
            let negated = inner
                .into_inner()
                .next()
                .ok_or_else(|| source.error("~ needs a value or variable", span))?;
            let term = match negated.as_rule() {
                Rule::variable => Term::Variable(variable_name(negated.as_str())),
                _ => Term::Literal(parse_literal(negated)?),
            };
            Ok(Term::Not(Box::new(term)))
        }
        Rule::predicate_term => {
            let call = inner
                .into_inner()
                .next()
                .ok_or_else(|| source.error(": needs a function call", span))?;
            Ok(Term::Predicate(Expression::Call(parse_function_call(
                call, source,
            )?)))
        }
        other => Err(RulemancerError::Engine(format!(
            "Grammar error: unexpected constraint term {:?}",
            other
        ))),
    }
}
