use crate::ast::Span;
use crate::error::RulemancerError;
use crate::parser::literals::parse_literal;
use crate::parser::{ParseSource, Rule};
use crate::semantic::{Expression, FunctionCall};
use pest::iterators::Pair;

pub(crate) fn parse_expression(
    pair: Pair<Rule>,
    source: &ParseSource,
) -> Result<Expression, RulemancerError> {
    let span = Span::from_pest_span(pair.as_span());
    let inner = match pair.as_rule() {
        Rule::expression => pair
            .into_inner()
            .next()
            .ok_or_else(|| source.error("Empty expression", span))?,
        _ => pair,
    };

    match inner.as_rule() {
        Rule::variable => Ok(Expression::Variable(variable_name(inner.as_str()))),
        Rule::multi_variable => Ok(Expression::MultiVariable(variable_name(inner.as_str()))),
        Rule::function_call => Ok(Expression::Call(parse_function_call(inner, source)?)),
        Rule::literal => Ok(Expression::Literal(parse_literal(inner)?)),
        other => Err(RulemancerError::Engine(format!(
            "Grammar error: unexpected expression rule {:?}",
            other
        ))),
    }
}

pub(crate) fn parse_function_call(
    pair: Pair<Rule>,
    source: &ParseSource,
) -> Result<FunctionCall, RulemancerError> {
    let span = Span::from_pest_span(pair.as_span());
    let mut name = None;
    let mut args = Vec::new();

    for inner_pair in pair.into_inner() {
        match inner_pair.as_rule() {
            Rule::symbol => name = Some(inner_pair.as_str().to_string()),
            Rule::expression => args.push(parse_expression(inner_pair, source)?),
            _ => {}
        }
    }

    let name = name.ok_or_else(|| source.error("Function call is missing a name", span.clone()))?;

    Ok(FunctionCall { name, args, span })
}

/// Strip the `?` or `$?` prefix from a variable token.
pub(crate) fn variable_name(token: &str) -> String {
    token
        .strip_prefix("$?")
        .or_else(|| token.strip_prefix('?'))
        .unwrap_or(token)
        .to_string()
}
