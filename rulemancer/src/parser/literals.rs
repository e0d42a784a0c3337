use crate::error::RulemancerError;
use crate::parser::Rule;
use crate::value::Value;
use pest::iterators::Pair;

/// Parse a `literal` pair (or one of its alternatives directly).
pub(crate) fn parse_literal(pair: Pair<Rule>) -> Result<Value, RulemancerError> {
    match pair.as_rule() {
        Rule::literal => {
            let inner = pair.into_inner().next().ok_or_else(|| {
                RulemancerError::Engine("Grammar error: empty literal".to_string())
            })?;
            parse_literal(inner)
        }
        Rule::integer => parse_integer(pair.as_str()),
        Rule::float => pair
            .as_str()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|e| RulemancerError::Engine(format!("Invalid float '{}': {}", pair.as_str(), e))),
        Rule::string => Ok(Value::String(parse_string(pair)?)),
        Rule::symbol => Ok(Value::Symbol(pair.as_str().to_string())),
        other => Err(RulemancerError::Engine(format!(
            "Grammar error: unexpected literal rule {:?}",
            other
        ))),
    }
}

pub(crate) fn parse_integer(text: &str) -> Result<Value, RulemancerError> {
    text.parse::<i64>()
        .map(Value::Integer)
        .map_err(|e| RulemancerError::Engine(format!("Invalid integer '{}': {}", text, e)))
}

/// Unescape the body of a `string` pair.
pub(crate) fn parse_string(pair: Pair<Rule>) -> Result<String, RulemancerError> {
    let raw = pair
        .into_inner()
        .find(|p| p.as_rule() == Rule::string_inner)
        .map(|p| p.as_str())
        .unwrap_or("");

    let mut text = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(escaped) = chars.next() {
                text.push(escaped);
            }
        } else {
            text.push(ch);
        }
    }
    Ok(text)
}
