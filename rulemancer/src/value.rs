//! Slot values
//!
//! Every field of a fact, every variable binding and every function result
//! is a [`Value`]. The boolean results of predicates are the symbols `TRUE`
//! and `FALSE`; anything other than `FALSE` counts as true in a test.

use crate::fact::FactId;
use serde::Serialize;
use std::fmt;

pub const TRUE_SYMBOL: &str = "TRUE";
pub const FALSE_SYMBOL: &str = "FALSE";
pub const NIL_SYMBOL: &str = "nil";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Symbol(String),
    String(String),
    Integer(i64),
    Float(f64),
    Fact(FactId),
    Multifield(Vec<Value>),
}

impl Value {
    pub fn symbol(name: impl Into<String>) -> Self {
        Value::Symbol(name.into())
    }

    pub fn string(text: impl Into<String>) -> Self {
        Value::String(text.into())
    }

    pub fn boolean(b: bool) -> Self {
        if b {
            Value::symbol(TRUE_SYMBOL)
        } else {
            Value::symbol(FALSE_SYMBOL)
        }
    }

    pub fn nil() -> Self {
        Value::symbol(NIL_SYMBOL)
    }

    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Symbol(s) if s == FALSE_SYMBOL)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Symbol(_) => "SYMBOL",
            Value::String(_) => "STRING",
            Value::Integer(_) => "INTEGER",
            Value::Float(_) => "FLOAT",
            Value::Fact(_) => "FACT-ADDRESS",
            Value::Multifield(_) => "MULTIFIELD",
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Text content without quoting, as used by `printout` and `str-cat`.
    pub fn display_text(&self) -> String {
        match self {
            Value::Symbol(s) | Value::String(s) => s.clone(),
            Value::Multifield(values) => values
                .iter()
                .map(Value::display_text)
                .collect::<Vec<_>>()
                .join(" "),
            other => other.to_string(),
        }
    }

    /// Flatten a value into the fields it contributes to an ordered fact.
    pub fn into_fields(self) -> Vec<Value> {
        match self {
            Value::Multifield(values) => values.into_iter().flat_map(Value::into_fields).collect(),
            other => vec![other],
        }
    }
}

/// Render a float the way the engine prints it: always with a decimal point
/// unless an exponent is needed.
pub fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{:.1}", f)
    } else {
        let text = format!("{}", f);
        if text.contains('.') || text.contains('e') || !f.is_finite() {
            text
        } else {
            format!("{}.0", text)
        }
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    f.write_str("\"")?;
    for ch in text.chars() {
        match ch {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            other => write!(f, "{}", other)?,
        }
    }
    f.write_str("\"")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Symbol(s) => f.write_str(s),
            Value::String(s) => write_quoted(f, s),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => f.write_str(&format_float(*x)),
            Value::Fact(id) => write!(f, "<Fact-{}>", id.index()),
            Value::Multifield(values) => {
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}", value)?;
                }
                Ok(())
            }
        }
    }
}
