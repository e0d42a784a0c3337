use crate::error::RulemancerError;
use crate::evaluator::functions;
use crate::evaluator::Bindings;
use crate::semantic::Expression;
use crate::value::Value;
use crate::RulemancerResult;

/// Evaluate an expression without side effects (tests and predicates).
pub(crate) fn evaluate(expression: &Expression, bindings: &Bindings) -> RulemancerResult<Value> {
    match expression {
        Expression::Literal(value) => Ok(value.clone()),
        Expression::Variable(name) | Expression::MultiVariable(name) => lookup(name, bindings),
        Expression::Call(call) => {
            let args = call
                .args
                .iter()
                .map(|arg| evaluate(arg, bindings))
                .collect::<RulemancerResult<Vec<_>>>()?;
            functions::call(&call.name, args)
        }
    }
}

pub(crate) fn lookup(name: &str, bindings: &Bindings) -> RulemancerResult<Value> {
    bindings
        .get(name)
        .cloned()
        .ok_or_else(|| RulemancerError::runtime(format!("Variable ?{} is not bound", name)))
}
