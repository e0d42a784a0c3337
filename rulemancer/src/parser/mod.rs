use crate::ast::Span;
use crate::error::RulemancerError;
use crate::resource_limits::ResourceLimits;
use crate::semantic::*;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use std::sync::Arc;

pub mod expressions;
pub mod facts;
pub mod literals;
pub mod rules;
pub mod templates;

#[derive(Parser)]
#[grammar = "src/parser/rulemancer.pest"]
pub struct RulemancerParser;

/// Source text and id threaded through the parse so errors can carry them.
pub(crate) struct ParseSource<'a> {
    pub id: &'a str,
    pub text: Arc<str>,
}

impl ParseSource<'_> {
    pub(crate) fn error(&self, message: impl Into<String>, span: Span) -> RulemancerError {
        RulemancerError::parse(message, span, self.id, self.text.clone())
    }
}

/// Parse a rule file into its constructs, in source order.
pub fn parse_constructs(
    content: &str,
    source_id: Option<String>,
    limits: &ResourceLimits,
) -> Result<Vec<Construct>, RulemancerError> {
    if content.len() > limits.max_file_size_bytes {
        return Err(RulemancerError::ResourceLimitExceeded {
            limit_name: "max_file_size_bytes".to_string(),
            limit_value: format!(
                "{} bytes ({} MB)",
                limits.max_file_size_bytes,
                limits.max_file_size_bytes / (1024 * 1024)
            ),
            actual_value: format!(
                "{} bytes ({:.2} MB)",
                content.len(),
                content.len() as f64 / (1024.0 * 1024.0)
            ),
            suggestion: "Reduce file size or split the rules into multiple files".to_string(),
        });
    }

    let source_id = source_id.unwrap_or_else(|| "<input>".to_string());
    let source = ParseSource {
        id: &source_id,
        text: Arc::from(content),
    };

    let pairs = RulemancerParser::parse(Rule::file, content)
        .map_err(|e| source.error(format!("Parse error: {}", e.variant), pest_error_span(&e)))?;

    let mut constructs = Vec::new();
    for pair in pairs {
        if pair.as_rule() != Rule::file {
            continue;
        }
        for inner_pair in pair.into_inner() {
            match inner_pair.as_rule() {
                Rule::deftemplate => constructs.push(Construct::Template(
                    templates::parse_deftemplate(inner_pair, &source)?,
                )),
                Rule::deffacts => constructs.push(Construct::Deffacts(facts::parse_deffacts(
                    inner_pair, &source,
                )?)),
                Rule::defrule => constructs.push(Construct::Rule(rules::parse_defrule(
                    inner_pair, &source,
                )?)),
                _ => {}
            }
        }
    }

    Ok(constructs)
}

/// Parse a single fact such as `(move (player x) (x 1))` or `(turn o)`.
pub fn parse_fact(text: &str, limits: &ResourceLimits) -> Result<FactSpec, RulemancerError> {
    if text.len() > limits.max_fact_text_bytes {
        return Err(RulemancerError::ResourceLimitExceeded {
            limit_name: "max_fact_text_bytes".to_string(),
            limit_value: limits.max_fact_text_bytes.to_string(),
            actual_value: text.len().to_string(),
            suggestion: format!(
                "Keep asserted fact text to {} bytes or less",
                limits.max_fact_text_bytes
            ),
        });
    }

    let source = ParseSource {
        id: "<fact>",
        text: Arc::from(text),
    };

    let pairs = RulemancerParser::parse(Rule::fact_text, text)
        .map_err(|e| source.error(format!("Invalid fact: {}", e.variant), pest_error_span(&e)))?;

    let body = pairs
        .flat_map(|p| p.into_inner())
        .find(|p| p.as_rule() == Rule::fact_body)
        .ok_or_else(|| {
            RulemancerError::Engine("Grammar error: fact_text missing fact_body".to_string())
        })?;

    facts::parse_fact_body(body, &source)
}

fn pest_error_span(e: &pest::error::Error<Rule>) -> Span {
    let (line, col) = match e.line_col {
        pest::error::LineColLocation::Pos((line, col)) => (line, col),
        pest::error::LineColLocation::Span((start_line, start_col), (_, _)) => {
            (start_line, start_col)
        }
    };
    let (start, end) = match e.location {
        pest::error::InputLocation::Pos(pos) => (pos, pos),
        pest::error::InputLocation::Span((start, end)) => (start, end),
    };
    Span {
        start,
        end,
        line,
        col,
    }
}

/// Text of an optional `comment` pair.
pub(crate) fn parse_comment(pair: Pair<Rule>) -> Result<String, RulemancerError> {
    let string_pair = pair.into_inner().next().ok_or_else(|| {
        RulemancerError::Engine("Grammar error: comment must contain a string".to_string())
    })?;
    literals::parse_string(string_pair)
}
