//! AST infrastructure types
//!
//! `Span` tracks where a construct, pattern or expression came from so that
//! parse and semantic errors can point back into the rule file.

/// Span representing a location in source code
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub col: usize,
}

impl Span {
    pub fn from_pest_span(span: pest::Span) -> Self {
        let (line, col) = span.start_pos().line_col();
        Self {
            start: span.start(),
            end: span.end(),
            line,
            col,
        }
    }
}
