//! Construct definitions produced by the parser and stored in an environment

use crate::ast::Span;
use crate::value::Value;
use std::fmt;

/// A top-level definition from a rule file
#[derive(Debug, Clone, PartialEq)]
pub enum Construct {
    Template(Template),
    Deffacts(Deffacts),
    Rule(Rule),
}

impl Construct {
    pub fn name(&self) -> &str {
        match self {
            Construct::Template(t) => &t.name,
            Construct::Deffacts(d) => &d.name,
            Construct::Rule(r) => &r.name,
        }
    }

    pub fn span(&self) -> &Span {
        match self {
            Construct::Template(t) => &t.span,
            Construct::Deffacts(d) => &d.span,
            Construct::Rule(r) => &r.span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Single,
    Multi,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SlotDefault {
    /// No default given: `nil` for a single slot, empty for a multislot.
    Derive,
    /// `(default ?NONE)`: the slot must be supplied on assert.
    Required,
    Value(Vec<Value>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlotDefinition {
    pub name: String,
    pub kind: SlotKind,
    pub default: SlotDefault,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub name: String,
    pub comment: Option<String>,
    pub slots: Vec<SlotDefinition>,
    pub span: Span,
}

impl Template {
    pub fn slot(&self, name: &str) -> Option<&SlotDefinition> {
        self.slots.iter().find(|s| s.name == name)
    }
}

/// A fact as written in a rule file, a deffacts body or an assert string.
///
/// Whether the groups are template slots or plain fields is only known once
/// the relation is looked up against the defined templates.
#[derive(Debug, Clone, PartialEq)]
pub struct FactSpec {
    pub relation: String,
    pub items: Vec<FactItem>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FactItem {
    Field(Value),
    SlotGroup { name: String, values: Vec<Value> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Deffacts {
    pub name: String,
    pub comment: Option<String>,
    pub facts: Vec<FactSpec>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub name: String,
    pub comment: Option<String>,
    pub salience: i64,
    pub conditions: Vec<ConditionalElement>,
    pub actions: Vec<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConditionalElement {
    Pattern(Pattern),
    Not(Pattern),
    Test(Expression),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    /// `?f` in `?f <- (relation ...)`
    pub binding: Option<String>,
    pub relation: String,
    pub body: PatternBody,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PatternBody {
    Ordered(Vec<FieldConstraint>),
    Slots(Vec<SlotConstraint>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlotConstraint {
    pub slot: String,
    pub fields: Vec<FieldConstraint>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldConstraint {
    /// Matches exactly one field; all terms must hold.
    Single(Vec<Term>),
    /// `$?` or `$?name`: matches zero or more fields.
    Multi(Option<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Wildcard,
    Variable(String),
    Literal(Value),
    Not(Box<Term>),
    Or(Vec<Term>),
    Predicate(Expression),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Value),
    Variable(String),
    MultiVariable(String),
    Call(FunctionCall),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub args: Vec<Expression>,
    pub span: Span,
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(v) => write!(f, "{}", v),
            Expression::Variable(name) => write!(f, "?{}", name),
            Expression::MultiVariable(name) => write!(f, "$?{}", name),
            Expression::Call(call) => {
                write!(f, "({}", call.name)?;
                for arg in &call.args {
                    write!(f, " {}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}
