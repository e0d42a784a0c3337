//! Semantic validation of parsed constructs
//!
//! Runs before any construct of a `load` is committed, against the templates
//! that will be visible once the load succeeds.

use crate::ast::Span;
use crate::evaluator::facts::spec_fields;
use crate::semantic::{
    ConditionalElement, Construct, Deffacts, Expression, FieldConstraint, FunctionCall, Pattern,
    PatternBody, Rule, Template, Term,
};
use crate::{RulemancerError, RulemancerResult};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Checks constructs against the template set they will be used with.
pub struct Validator<'a> {
    templates: HashMap<&'a str, &'a Template>,
    batch_templates: Vec<&'a Template>,
    source_id: &'a str,
    source_text: Arc<str>,
}

impl<'a> Validator<'a> {
    /// `existing` are the templates already loaded; templates among
    /// `constructs` replace them by name.
    pub fn new(
        existing: impl IntoIterator<Item = &'a Template>,
        constructs: &'a [Construct],
        source_id: &'a str,
        source_text: Arc<str>,
    ) -> Self {
        let mut templates: HashMap<&str, &Template> =
            existing.into_iter().map(|t| (t.name.as_str(), t)).collect();
        let mut batch_templates = Vec::new();
        for construct in constructs {
            if let Construct::Template(template) = construct {
                templates.insert(template.name.as_str(), template);
                batch_templates.push(template);
            }
        }
        Self {
            templates,
            batch_templates,
            source_id,
            source_text,
        }
    }

    /// Validate every construct, collecting all errors.
    pub fn validate_all(&self, constructs: &[Construct]) -> RulemancerResult<()> {
        let mut errors = Vec::new();
        for construct in constructs {
            if let Err(e) = self.validate(construct) {
                errors.push(e);
            }
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(RulemancerError::MultipleErrors(errors)),
        }
    }

    fn validate(&self, construct: &Construct) -> RulemancerResult<()> {
        match construct {
            Construct::Template(_) => Ok(()),
            Construct::Deffacts(deffacts) => self.validate_deffacts(deffacts),
            Construct::Rule(rule) => self.validate_rule(rule),
        }
    }

    /// Re-check loaded rules and deffacts that the batch does not replace.
    ///
    /// Templates defined by the batch can invalidate them, e.g. by renaming
    /// a slot they use. Errors point at the template of the batch.
    pub fn validate_existing(
        &self,
        batch: &[Construct],
        rules: &[Rule],
        deffacts: &[Deffacts],
    ) -> RulemancerResult<()> {
        if self.batch_templates.is_empty() {
            return Ok(());
        }
        let replaced = |kind: &str, name: &str| {
            batch.iter().any(|c| match c {
                Construct::Rule(r) => kind == "rule" && r.name == name,
                Construct::Deffacts(d) => kind == "deffacts" && d.name == name,
                Construct::Template(_) => false,
            })
        };

        let mut errors = Vec::new();
        for rule in rules.iter().filter(|r| !replaced("rule", &r.name)) {
            if let Err(e) = self.validate_rule(rule) {
                let uses = |t: &str| rule_uses(rule, t);
                errors.push(self.broken_by_redefinition("rule", &rule.name, uses, e));
            }
        }
        for facts in deffacts.iter().filter(|d| !replaced("deffacts", &d.name)) {
            if let Err(e) = self.validate_deffacts(facts) {
                let uses = |t: &str| facts.facts.iter().any(|f| f.relation == t);
                errors.push(self.broken_by_redefinition("deffacts", &facts.name, uses, e));
            }
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(RulemancerError::MultipleErrors(errors)),
        }
    }

    fn broken_by_redefinition(
        &self,
        kind: &str,
        name: &str,
        uses: impl Fn(&str) -> bool,
        cause: RulemancerError,
    ) -> RulemancerError {
        let template = self
            .batch_templates
            .iter()
            .find(|t| uses(t.name.as_str()))
            .or_else(|| self.batch_templates.first())
            .copied();
        let cause = match cause {
            RulemancerError::Semantic(details) | RulemancerError::Parse(details) => details.message,
            other => other.to_string(),
        };
        match template {
            Some(template) => self.error_with_suggestion(
                format!(
                    "Template '{}' no longer fits loaded {} '{}': {}",
                    template.name, kind, name, cause
                ),
                &template.span,
                format!("Redefine {} '{}' in the same load", kind, name),
            ),
            None => RulemancerError::Engine(cause),
        }
    }

    fn validate_deffacts(&self, deffacts: &Deffacts) -> RulemancerResult<()> {
        for fact in &deffacts.facts {
            let template = self.templates.get(fact.relation.as_str()).copied();
            spec_fields(fact, template).map_err(|e| match e {
                RulemancerError::Runtime(message) => self.error(
                    format!("In deffacts '{}': {}", deffacts.name, message),
                    &fact.span,
                ),
                other => other,
            })?;
        }
        Ok(())
    }

    fn validate_rule(&self, rule: &Rule) -> RulemancerResult<()> {
        for condition in &rule.conditions {
            match condition {
                ConditionalElement::Pattern(pattern) | ConditionalElement::Not(pattern) => {
                    self.validate_pattern(&rule.name, pattern)?
                }
                ConditionalElement::Test(_) => {}
            }
        }
        for action in &rule.actions {
            self.validate_action(&rule.name, &rule.span, action)?;
        }
        self.validate_variables(rule)
    }

    /// Every variable must be bound before it is read: by a positive
    /// pattern to its left, or by `bind` earlier on the right-hand side.
    /// Variables first seen inside `not` stay local to it.
    fn validate_variables(&self, rule: &Rule) -> RulemancerResult<()> {
        let mut bound = HashSet::new();
        for condition in &rule.conditions {
            match condition {
                ConditionalElement::Pattern(pattern) => {
                    self.bind_pattern(&rule.name, pattern, &mut bound)?
                }
                ConditionalElement::Not(pattern) => {
                    let mut local = bound.clone();
                    self.bind_pattern(&rule.name, pattern, &mut local)?
                }
                ConditionalElement::Test(expression) => {
                    self.read_expression(&rule.name, expression, &bound, &rule.span)?
                }
            }
        }
        for action in &rule.actions {
            self.read_action(&rule.name, action, &mut bound, &rule.span)?;
        }
        Ok(())
    }

    fn bind_pattern(
        &self,
        rule: &str,
        pattern: &Pattern,
        bound: &mut HashSet<String>,
    ) -> RulemancerResult<()> {
        if let Some(name) = &pattern.binding {
            bound.insert(name.clone());
        }
        let constraints: Vec<&FieldConstraint> = match &pattern.body {
            PatternBody::Ordered(fields) => fields.iter().collect(),
            PatternBody::Slots(slots) => slots.iter().flat_map(|s| s.fields.iter()).collect(),
        };
        for constraint in constraints {
            match constraint {
                FieldConstraint::Multi(Some(name)) => {
                    bound.insert(name.clone());
                }
                FieldConstraint::Multi(None) => {}
                FieldConstraint::Single(terms) => {
                    for term in terms {
                        self.read_term(rule, term, bound, &pattern.span, true)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// A plain `?x` term binds when `binds` is set; under `~` and `|` it
    /// must already be bound.
    fn read_term(
        &self,
        rule: &str,
        term: &Term,
        bound: &mut HashSet<String>,
        span: &Span,
        binds: bool,
    ) -> RulemancerResult<()> {
        match term {
            Term::Wildcard | Term::Literal(_) => Ok(()),
            Term::Variable(name) if binds => {
                bound.insert(name.clone());
                Ok(())
            }
            Term::Variable(name) => self.require_bound(rule, name, bound, span),
            Term::Not(inner) => self.read_term(rule, inner, bound, span, false),
            Term::Or(alternatives) => {
                for alternative in alternatives {
                    self.read_term(rule, alternative, bound, span, false)?;
                }
                Ok(())
            }
            Term::Predicate(expression) => self.read_expression(rule, expression, bound, span),
        }
    }

    fn read_expression(
        &self,
        rule: &str,
        expression: &Expression,
        bound: &HashSet<String>,
        span: &Span,
    ) -> RulemancerResult<()> {
        match expression {
            Expression::Literal(_) => Ok(()),
            Expression::Variable(name) | Expression::MultiVariable(name) => {
                self.require_bound(rule, name, bound, span)
            }
            Expression::Call(call) => {
                for arg in &call.args {
                    self.read_expression(rule, arg, bound, &call.span)?;
                }
                Ok(())
            }
        }
    }

    /// Like `read_expression`, but `(bind ?x ...)` adds `?x` for the
    /// actions that follow.
    fn read_action(
        &self,
        rule: &str,
        action: &Expression,
        bound: &mut HashSet<String>,
        span: &Span,
    ) -> RulemancerResult<()> {
        let Expression::Call(call) = action else {
            return self.read_expression(rule, action, bound, span);
        };
        if call.name == "bind" {
            if let Some((Expression::Variable(name) | Expression::MultiVariable(name), rest)) =
                call.args.split_first()
            {
                for arg in rest {
                    self.read_action(rule, arg, bound, &call.span)?;
                }
                bound.insert(name.clone());
                return Ok(());
            }
        }
        for arg in &call.args {
            self.read_action(rule, arg, bound, &call.span)?;
        }
        Ok(())
    }

    fn require_bound(
        &self,
        rule: &str,
        name: &str,
        bound: &HashSet<String>,
        span: &Span,
    ) -> RulemancerResult<()> {
        if bound.contains(name) {
            return Ok(());
        }
        Err(self.error_with_suggestion(
            format!("Rule '{}' reads ?{} before it is bound", rule, name),
            span,
            format!("Bind ?{} in a pattern to the left of this use", name),
        ))
    }

    fn validate_pattern(&self, rule: &str, pattern: &Pattern) -> RulemancerResult<()> {
        let template = self.templates.get(pattern.relation.as_str());
        match (&pattern.body, template) {
            (PatternBody::Slots(constraints), Some(template)) => {
                for constraint in constraints {
                    if template.slot(&constraint.slot).is_none() {
                        return Err(self.unknown_slot(rule, template, &constraint.slot, &pattern.span));
                    }
                }
                Ok(())
            }
            (PatternBody::Slots(_), None) => Err(self.error_with_suggestion(
                format!(
                    "Rule '{}' matches slots of '{}', which has no deftemplate",
                    rule, pattern.relation
                ),
                &pattern.span,
                format!("Declare (deftemplate {} ...) before using slot patterns", pattern.relation),
            )),
            (PatternBody::Ordered(fields), Some(template)) if !fields.is_empty() => {
                Err(self.error_with_suggestion(
                    format!(
                        "Rule '{}' matches '{}' positionally, but it is a deftemplate",
                        rule, template.name
                    ),
                    &pattern.span,
                    "Match template facts with (slot value) groups",
                ))
            }
            (PatternBody::Ordered(_), _) => Ok(()),
        }
    }

    /// Template asserts must name known slots; nested `if` branches are
    /// walked too.
    fn validate_action(&self, rule: &str, span: &Span, action: &Expression) -> RulemancerResult<()> {
        let Expression::Call(call) = action else {
            return Ok(());
        };
        match call.name.as_str() {
            "assert" => {
                for fact in &call.args {
                    if let Expression::Call(fact) = fact {
                        self.validate_template_assert(rule, fact)?;
                    }
                }
            }
            "if" => {
                for arg in &call.args {
                    self.validate_action(rule, span, arg)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn validate_template_assert(&self, rule: &str, fact: &FunctionCall) -> RulemancerResult<()> {
        let Some(template) = self.templates.get(fact.name.as_str()) else {
            return Ok(());
        };
        for arg in &fact.args {
            match arg {
                Expression::Call(group) if template.slot(&group.name).is_some() => {}
                Expression::Call(group) => {
                    return Err(self.unknown_slot(rule, template, &group.name, &fact.span))
                }
                other => {
                    return Err(self.error(
                        format!(
                            "Rule '{}' asserts '{}' with a bare field {}; templates take (slot value) groups",
                            rule, template.name, other
                        ),
                        &fact.span,
                    ))
                }
            }
        }
        Ok(())
    }

    fn unknown_slot(&self, rule: &str, template: &Template, slot: &str, span: &Span) -> RulemancerError {
        let known = template
            .slots
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        self.error_with_suggestion(
            format!(
                "Rule '{}' uses slot '{}', which template '{}' does not declare",
                rule, slot, template.name
            ),
            span,
            format!("Known slots: {}", known),
        )
    }

    fn error(&self, message: impl Into<String>, span: &Span) -> RulemancerError {
        RulemancerError::semantic(message, span.clone(), self.source_id, self.source_text.clone())
    }

    fn error_with_suggestion(
        &self,
        message: impl Into<String>,
        span: &Span,
        suggestion: impl Into<String>,
    ) -> RulemancerError {
        RulemancerError::semantic_with_suggestion(
            message,
            span.clone(),
            self.source_id,
            self.source_text.clone(),
            suggestion,
        )
    }
}

/// Whether `rule` matches or asserts facts of `relation`
fn rule_uses(rule: &Rule, relation: &str) -> bool {
    fn asserts(expression: &Expression, relation: &str) -> bool {
        match expression {
            Expression::Call(call) if call.name == "assert" => call
                .args
                .iter()
                .any(|fact| matches!(fact, Expression::Call(f) if f.name == relation)),
            Expression::Call(call) => call.args.iter().any(|arg| asserts(arg, relation)),
            _ => false,
        }
    }

    rule.conditions.iter().any(|condition| match condition {
        ConditionalElement::Pattern(p) | ConditionalElement::Not(p) => p.relation == relation,
        ConditionalElement::Test(_) => false,
    }) || rule.actions.iter().any(|action| asserts(action, relation))
}
