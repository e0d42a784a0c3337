//! Execution of rule right-hand sides

use crate::environment::ConstructBase;
use crate::error::RulemancerError;
use crate::evaluator::expression::lookup;
use crate::evaluator::facts::{ordered_fields, template_fields};
use crate::evaluator::{functions, Bindings};
use crate::fact::{FactFields, FactId, FactStore};
use crate::semantic::{Expression, FunctionCall};
use crate::value::Value;
use crate::RulemancerResult;
use tracing::{debug, trace};

pub(crate) struct ExecutionContext<'a> {
    pub constructs: &'a ConstructBase,
    pub facts: &'a mut FactStore,
    pub output: &'a mut String,
    pub bindings: Bindings,
    pub halted: bool,
}

impl ExecutionContext<'_> {
    pub(crate) fn execute(&mut self, expression: &Expression) -> RulemancerResult<Value> {
        match expression {
            Expression::Literal(value) => Ok(value.clone()),
            Expression::Variable(name) | Expression::MultiVariable(name) => {
                lookup(name, &self.bindings)
            }
            Expression::Call(call) => match call.name.as_str() {
                "assert" => self.assert_facts(call),
                "retract" => self.retract_facts(call),
                "modify" => self.modify_fact(call),
                "printout" => self.printout(call),
                "bind" => self.bind(call),
                "if" => self.if_then_else(call),
                "halt" => {
                    self.halted = true;
                    Ok(Value::boolean(true))
                }
                name => {
                    let args = call
                        .args
                        .iter()
                        .map(|arg| self.execute(arg))
                        .collect::<RulemancerResult<Vec<_>>>()?;
                    functions::call(name, args)
                }
            },
        }
    }

    fn assert_facts(&mut self, call: &FunctionCall) -> RulemancerResult<Value> {
        if call.args.is_empty() {
            return Err(RulemancerError::runtime("assert needs at least one fact"));
        }

        let mut last = Value::boolean(false);
        for arg in &call.args {
            let Expression::Call(fact) = arg else {
                return Err(RulemancerError::runtime(format!(
                    "assert expects facts like (relation ...), got {}",
                    arg
                )));
            };
            let fields = self.fact_fields(fact)?;
            let (id, added) = self.facts.insert(fact.name.clone(), fields);
            if added {
                debug!(fact = %id, relation = %fact.name, "asserted fact from rule");
            }
            last = Value::Fact(id);
        }
        Ok(last)
    }

    fn fact_fields(&mut self, fact: &FunctionCall) -> RulemancerResult<FactFields> {
        let constructs = self.constructs;
        match constructs.template(&fact.name) {
            Some(template) => {
                let mut supplied = Vec::new();
                for arg in &fact.args {
                    let (slot, values) = self.slot_values(&fact.name, arg)?;
                    supplied.push((slot, values));
                }
                template_fields(template, supplied)
            }
            None => {
                let values = fact
                    .args
                    .iter()
                    .map(|arg| self.execute(arg))
                    .collect::<RulemancerResult<Vec<_>>>()?;
                Ok(ordered_fields(values))
            }
        }
    }

    /// Evaluate a `(slot value...)` group of a template assert or modify.
    fn slot_values(
        &mut self,
        relation: &str,
        arg: &Expression,
    ) -> RulemancerResult<(String, Vec<Value>)> {
        let Expression::Call(group) = arg else {
            return Err(RulemancerError::runtime(format!(
                "Template '{}' expects (slot value) groups, got {}",
                relation, arg
            )));
        };
        let mut values = Vec::new();
        for value_expression in &group.args {
            values.extend(self.execute(value_expression)?.into_fields());
        }
        Ok((group.name.clone(), values))
    }

    fn fact_id(&mut self, arg: &Expression) -> RulemancerResult<FactId> {
        match self.execute(arg)? {
            Value::Fact(id) => Ok(id),
            Value::Integer(index) if index > 0 => Ok(FactId::new(index as u64)),
            other => Err(RulemancerError::runtime(format!(
                "Expected a fact address or fact index, got {} {}",
                other.type_name(),
                other
            ))),
        }
    }

    fn retract_facts(&mut self, call: &FunctionCall) -> RulemancerResult<Value> {
        for arg in &call.args {
            let id = self.fact_id(arg)?;
            match self.facts.remove(id) {
                Some(fact) => debug!(fact = %id, relation = %fact.relation, "retracted fact"),
                None => {
                    return Err(RulemancerError::runtime(format!(
                        "Cannot retract {}: fact does not exist",
                        id
                    )))
                }
            }
        }
        Ok(Value::boolean(true))
    }

    fn modify_fact(&mut self, call: &FunctionCall) -> RulemancerResult<Value> {
        let (target, updates) = call
            .args
            .split_first()
            .ok_or_else(|| RulemancerError::runtime("modify needs a fact to change"))?;
        let id = self.fact_id(target)?;

        let fact = self.facts.get(id).cloned().ok_or_else(|| {
            RulemancerError::runtime(format!("Cannot modify {}: fact does not exist", id))
        })?;
        let constructs = self.constructs;
        let template = constructs.template(&fact.relation).ok_or_else(|| {
            RulemancerError::runtime(format!(
                "Cannot modify {}: relation '{}' has no deftemplate",
                id, fact.relation
            ))
        })?;

        let mut supplied: Vec<(String, Vec<Value>)> = match &fact.fields {
            FactFields::Template(slots) => slots
                .iter()
                .map(|slot| (slot.name.clone(), vec![slot.value.clone()]))
                .collect(),
            FactFields::Ordered(_) => Vec::new(),
        };
        for update in updates {
            let (slot, values) = self.slot_values(&fact.relation, update)?;
            match supplied.iter_mut().find(|(name, _)| name == &slot) {
                Some(existing) => existing.1 = values,
                None => supplied.push((slot, values)),
            }
        }

        let fields = template_fields(template, supplied)?;
        self.facts.remove(id);
        let (new_id, _) = self.facts.insert(fact.relation.clone(), fields);
        debug!(old = %id, new = %new_id, relation = %fact.relation, "modified fact");
        Ok(Value::Fact(new_id))
    }

    fn printout(&mut self, call: &FunctionCall) -> RulemancerResult<Value> {
        let (router, items) = call
            .args
            .split_first()
            .ok_or_else(|| RulemancerError::runtime("printout needs a logical name"))?;
        let router = self.execute(router)?.display_text();

        let mut text = String::new();
        for item in items {
            match self.execute(item)? {
                Value::Symbol(s) if s == "crlf" => text.push('\n'),
                Value::Symbol(s) if s == "tab" => text.push('\t'),
                value => text.push_str(&value.display_text()),
            }
        }
        trace!(router = %router, text = %text, "printout");
        self.output.push_str(&text);
        Ok(Value::boolean(true))
    }

    fn bind(&mut self, call: &FunctionCall) -> RulemancerResult<Value> {
        let (target, rest) = call
            .args
            .split_first()
            .ok_or_else(|| RulemancerError::runtime("bind needs a variable"))?;
        let name = match target {
            Expression::Variable(name) | Expression::MultiVariable(name) => name.clone(),
            other => {
                return Err(RulemancerError::runtime(format!(
                    "bind expects a variable, got {}",
                    other
                )))
            }
        };

        let mut values = rest
            .iter()
            .map(|arg| self.execute(arg))
            .collect::<RulemancerResult<Vec<_>>>()?;
        let value = if values.len() == 1 {
            values.remove(0)
        } else {
            Value::Multifield(values.into_iter().flat_map(Value::into_fields).collect())
        };
        self.bindings.insert(name, value.clone());
        Ok(value)
    }

    fn if_then_else(&mut self, call: &FunctionCall) -> RulemancerResult<Value> {
        let is_keyword = |arg: &Expression, keyword: &str| {
            matches!(arg, Expression::Literal(Value::Symbol(s)) if s == keyword)
        };

        let condition = call
            .args
            .first()
            .ok_or_else(|| RulemancerError::runtime("if needs a condition"))?;
        if !call.args.get(1).is_some_and(|arg| is_keyword(arg, "then")) {
            return Err(RulemancerError::runtime("if expects 'then' after the condition"));
        }
        let body = &call.args[2..];
        let (then_branch, else_branch) = match body.iter().position(|arg| is_keyword(arg, "else")) {
            Some(split) => (&body[..split], &body[split + 1..]),
            None => (body, &body[body.len()..]),
        };

        let branch = if self.execute(condition)?.is_truthy() {
            then_branch
        } else {
            else_branch
        };

        let mut result = Value::boolean(false);
        for action in branch {
            result = self.execute(action)?;
        }
        Ok(result)
    }
}
