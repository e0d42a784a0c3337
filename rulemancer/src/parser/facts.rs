use crate::ast::Span;
use crate::error::RulemancerError;
use crate::parser::literals::parse_literal;
use crate::parser::{parse_comment, ParseSource, Rule};
use crate::semantic::{Deffacts, FactItem, FactSpec};
use pest::iterators::Pair;

pub(crate) fn parse_fact_body(
    pair: Pair<Rule>,
    source: &ParseSource,
) -> Result<FactSpec, RulemancerError> {
    let span = Span::from_pest_span(pair.as_span());
    let mut relation = None;
    let mut items = Vec::new();

    for inner_pair in pair.into_inner() {
        match inner_pair.as_rule() {
            Rule::symbol => relation = Some(inner_pair.as_str().to_string()),
            Rule::fact_item => items.push(parse_fact_item(inner_pair, source)?),
            _ => {}
        }
    }

    let relation = relation.ok_or_else(|| source.error("Fact is missing a relation name", span.clone()))?;

    Ok(FactSpec {
        relation,
        items,
        span,
    })
}

fn parse_fact_item(pair: Pair<Rule>, source: &ParseSource) -> Result<FactItem, RulemancerError> {
    let span = Span::from_pest_span(pair.as_span());
    let inner = pair
        .into_inner()
        .next()
        .ok_or_else(|| source.error("Empty fact field", span))?;

    match inner.as_rule() {
        Rule::slot_group => {
            let mut name = None;
            let mut values = Vec::new();
            for group_pair in inner.into_inner() {
                match group_pair.as_rule() {
                    Rule::symbol => name = Some(group_pair.as_str().to_string()),
                    Rule::literal => values.push(parse_literal(group_pair)?),
                    _ => {}
                }
            }
            let name = name.ok_or_else(|| {
                RulemancerError::Engine("Grammar error: slot_group missing slot name".to_string())
            })?;
            Ok(FactItem::SlotGroup { name, values })
        }
        Rule::literal => Ok(FactItem::Field(parse_literal(inner)?)),
        other => Err(RulemancerError::Engine(format!(
            "Grammar error: unexpected fact item {:?}",
            other
        ))),
    }
}

pub(crate) fn parse_deffacts(
    pair: Pair<Rule>,
    source: &ParseSource,
) -> Result<Deffacts, RulemancerError> {
    let span = Span::from_pest_span(pair.as_span());
    let mut name = None;
    let mut comment = None;
    let mut facts = Vec::new();

    for inner_pair in pair.into_inner() {
        match inner_pair.as_rule() {
            Rule::symbol => name = Some(inner_pair.as_str().to_string()),
            Rule::comment => comment = Some(parse_comment(inner_pair)?),
            Rule::fact_body => facts.push(parse_fact_body(inner_pair, source)?),
            _ => {}
        }
    }

    let name = name.ok_or_else(|| source.error("deffacts is missing a name", span.clone()))?;

    Ok(Deffacts {
        name,
        comment,
        facts,
        span,
    })
}
