use crate::ast::Span;
use crate::error::RulemancerError;
use crate::parser::literals::parse_literal;
use crate::parser::{parse_comment, ParseSource, Rule};
use crate::semantic::{SlotDefault, SlotDefinition, SlotKind, Template};
use pest::iterators::Pair;

pub(crate) fn parse_deftemplate(
    pair: Pair<Rule>,
    source: &ParseSource,
) -> Result<Template, RulemancerError> {
    let span = Span::from_pest_span(pair.as_span());
    let mut name = None;
    let mut comment = None;
    let mut slots: Vec<SlotDefinition> = Vec::new();

    for inner_pair in pair.into_inner() {
        match inner_pair.as_rule() {
            Rule::symbol => name = Some(inner_pair.as_str().to_string()),
            Rule::comment => comment = Some(parse_comment(inner_pair)?),
            Rule::slot_definition => {
                let slot_span = Span::from_pest_span(inner_pair.as_span());
                let slot = parse_slot_definition(inner_pair, source)?;
                if slots.iter().any(|s| s.name == slot.name) {
                    return Err(source.error(
                        format!("Slot '{}' is defined more than once", slot.name),
                        slot_span,
                    ));
                }
                slots.push(slot);
            }
            _ => {}
        }
    }

    let name = name.ok_or_else(|| source.error("deftemplate is missing a name", span.clone()))?;

    Ok(Template {
        name,
        comment,
        slots,
        span,
    })
}

fn parse_slot_definition(
    pair: Pair<Rule>,
    source: &ParseSource,
) -> Result<SlotDefinition, RulemancerError> {
    let span = Span::from_pest_span(pair.as_span());
    let mut kind = SlotKind::Single;
    let mut name = None;
    let mut default = SlotDefault::Derive;

    for inner_pair in pair.into_inner() {
        match inner_pair.as_rule() {
            Rule::slot_kind => {
                if let Some(kw) = inner_pair.into_inner().next() {
                    kind = if kw.as_rule() == Rule::kw_multislot {
                        SlotKind::Multi
                    } else {
                        SlotKind::Single
                    };
                }
            }
            Rule::symbol => name = Some(inner_pair.as_str().to_string()),
            Rule::slot_attribute => {
                if let Some(attr) = inner_pair.into_inner().next() {
                    if attr.as_rule() == Rule::default_attribute {
                        default = parse_default(attr)?;
                    }
                }
            }
            _ => {}
        }
    }

    let name = name.ok_or_else(|| source.error("Slot definition is missing a name", span.clone()))?;

    if let (SlotKind::Single, SlotDefault::Value(values)) = (kind, &default) {
        if values.len() != 1 {
            return Err(source.error(
                format!(
                    "Single-field slot '{}' needs exactly one default value, got {}",
                    name,
                    values.len()
                ),
                span,
            ));
        }
    }

    Ok(SlotDefinition {
        name,
        kind,
        default,
    })
}

fn parse_default(pair: Pair<Rule>) -> Result<SlotDefault, RulemancerError> {
    let mut values = Vec::new();
    for inner_pair in pair.into_inner() {
        match inner_pair.as_rule() {
            Rule::none_default => return Ok(SlotDefault::Required),
            Rule::derive_default => return Ok(SlotDefault::Derive),
            Rule::literal => values.push(parse_literal(inner_pair)?),
            _ => {}
        }
    }
    Ok(SlotDefault::Value(values))
}
