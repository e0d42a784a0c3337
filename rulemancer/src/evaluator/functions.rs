//! Side-effect free functions callable from tests, predicate constraints and
//! rule actions

use crate::error::RulemancerError;
use crate::value::Value;
use crate::RulemancerResult;
use std::cmp::Ordering;

/// Names handled by the action executor rather than here.
pub(crate) const ACTION_FUNCTIONS: &[&str] =
    &["assert", "retract", "modify", "printout", "bind", "halt", "if"];

pub(crate) fn is_action(name: &str) -> bool {
    ACTION_FUNCTIONS.contains(&name)
}

pub(crate) fn call(name: &str, args: Vec<Value>) -> RulemancerResult<Value> {
    match name {
        "+" => arithmetic(name, args, i64::checked_add, |a, b| a + b),
        "-" => arithmetic(name, args, i64::checked_sub, |a, b| a - b),
        "*" => arithmetic(name, args, i64::checked_mul, |a, b| a * b),
        "/" => divide(args),
        "div" => integer_divide(args),
        "mod" => modulo(args),
        "abs" => {
            expect_arity(name, &args, 1)?;
            match &args[0] {
                Value::Integer(i) => i
                    .checked_abs()
                    .map(Value::Integer)
                    .ok_or_else(|| overflow(name)),
                Value::Float(f) => Ok(Value::Float(f.abs())),
                other => Err(type_error(name, "a number", other)),
            }
        }
        "min" => extremum(name, args, Ordering::Less),
        "max" => extremum(name, args, Ordering::Greater),
        "integer" => {
            expect_arity(name, &args, 1)?;
            match &args[0] {
                Value::Integer(i) => Ok(Value::Integer(*i)),
                Value::Float(f) => Ok(Value::Integer(f.trunc() as i64)),
                other => Err(type_error(name, "a number", other)),
            }
        }
        "float" => {
            expect_arity(name, &args, 1)?;
            Ok(Value::Float(number(name, &args[0])?))
        }
        "=" => compare_chain(name, args, |o| o == Ordering::Equal),
        "<>" | "!=" => {
            expect_min_arity(name, &args, 2)?;
            let first = number(name, &args[0])?;
            let mut all_differ = true;
            for arg in &args[1..] {
                if number(name, arg)? == first {
                    all_differ = false;
                }
            }
            Ok(Value::boolean(all_differ))
        }
        "<" => compare_chain(name, args, |o| o == Ordering::Less),
        "<=" => compare_chain(name, args, |o| o != Ordering::Greater),
        ">" => compare_chain(name, args, |o| o == Ordering::Greater),
        ">=" => compare_chain(name, args, |o| o != Ordering::Less),
        "eq" => {
            expect_min_arity(name, &args, 2)?;
            Ok(Value::boolean(args[1..].iter().all(|a| a == &args[0])))
        }
        "neq" => {
            expect_min_arity(name, &args, 2)?;
            Ok(Value::boolean(args[1..].iter().all(|a| a != &args[0])))
        }
        "and" => Ok(Value::boolean(args.iter().all(Value::is_truthy))),
        "or" => Ok(Value::boolean(args.iter().any(Value::is_truthy))),
        "not" => {
            expect_arity(name, &args, 1)?;
            Ok(Value::boolean(!args[0].is_truthy()))
        }
        "str-cat" => Ok(Value::String(concat(&args))),
        "sym-cat" => Ok(Value::Symbol(concat(&args))),
        "str-length" => {
            expect_arity(name, &args, 1)?;
            Ok(Value::Integer(lexeme(name, &args[0])?.chars().count() as i64))
        }
        "upcase" => map_lexeme(name, args, |s| s.to_uppercase()),
        "lowcase" => map_lexeme(name, args, |s| s.to_lowercase()),
        "integerp" => predicate(name, args, |v| matches!(v, Value::Integer(_))),
        "floatp" => predicate(name, args, |v| matches!(v, Value::Float(_))),
        "numberp" => predicate(name, args, |v| v.as_number().is_some()),
        "stringp" => predicate(name, args, |v| matches!(v, Value::String(_))),
        "symbolp" => predicate(name, args, |v| matches!(v, Value::Symbol(_))),
        "lexemep" => predicate(name, args, |v| {
            matches!(v, Value::Symbol(_) | Value::String(_))
        }),
        "multifieldp" => predicate(name, args, |v| matches!(v, Value::Multifield(_))),
        "create$" => Ok(Value::Multifield(
            args.into_iter().flat_map(Value::into_fields).collect(),
        )),
        "length$" => {
            expect_arity(name, &args, 1)?;
            Ok(Value::Integer(multifield(name, &args[0])?.len() as i64))
        }
        "nth$" => {
            expect_arity(name, &args, 2)?;
            let index = integer(name, &args[0])?;
            let values = multifield(name, &args[1])?;
            usize::try_from(index)
                .ok()
                .and_then(|i| i.checked_sub(1))
                .and_then(|i| values.get(i))
                .cloned()
                .ok_or_else(|| {
                    RulemancerError::runtime(format!(
                        "Function 'nth$' index {} is out of range 1..{}",
                        index,
                        values.len()
                    ))
                })
        }
        "member$" => {
            expect_arity(name, &args, 2)?;
            let values = multifield(name, &args[1])?;
            Ok(values
                .iter()
                .position(|v| v == &args[0])
                .map(|i| Value::Integer(i as i64 + 1))
                .unwrap_or_else(|| Value::boolean(false)))
        }
        other if is_action(other) => Err(RulemancerError::runtime(format!(
            "Function '{}' has side effects and can only be used in rule actions",
            other
        ))),
        other => Err(RulemancerError::runtime(format!(
            "Unknown function '{}'",
            other
        ))),
    }
}

fn expect_arity(name: &str, args: &[Value], n: usize) -> RulemancerResult<()> {
    if args.len() != n {
        return Err(RulemancerError::runtime(format!(
            "Function '{}' expected {} argument(s), got {}",
            name,
            n,
            args.len()
        )));
    }
    Ok(())
}

fn expect_min_arity(name: &str, args: &[Value], n: usize) -> RulemancerResult<()> {
    if args.len() < n {
        return Err(RulemancerError::runtime(format!(
            "Function '{}' expected at least {} argument(s), got {}",
            name,
            n,
            args.len()
        )));
    }
    Ok(())
}

fn type_error(name: &str, expected: &str, got: &Value) -> RulemancerError {
    RulemancerError::runtime(format!(
        "Function '{}' expected {}, got {} {}",
        name,
        expected,
        got.type_name(),
        got
    ))
}

fn overflow(name: &str) -> RulemancerError {
    RulemancerError::runtime(format!("Integer overflow in function '{}'", name))
}

fn number(name: &str, value: &Value) -> RulemancerResult<f64> {
    value
        .as_number()
        .ok_or_else(|| type_error(name, "a number", value))
}

fn integer(name: &str, value: &Value) -> RulemancerResult<i64> {
    match value {
        Value::Integer(i) => Ok(*i),
        other => Err(type_error(name, "an integer", other)),
    }
}

fn lexeme<'a>(name: &str, value: &'a Value) -> RulemancerResult<&'a str> {
    match value {
        Value::Symbol(s) | Value::String(s) => Ok(s),
        other => Err(type_error(name, "a symbol or string", other)),
    }
}

fn multifield<'a>(name: &str, value: &'a Value) -> RulemancerResult<&'a [Value]> {
    match value {
        Value::Multifield(values) => Ok(values),
        other => Err(type_error(name, "a multifield", other)),
    }
}

fn arithmetic(
    name: &str,
    args: Vec<Value>,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> RulemancerResult<Value> {
    let mut iter = args.iter();
    let first = match iter.next() {
        Some(v) => v.clone(),
        // (+) is 0 and (*) is 1; (-) with no arguments is an error
        None => match name {
            "+" => return Ok(Value::Integer(0)),
            "*" => return Ok(Value::Integer(1)),
            _ => return Err(RulemancerError::runtime(format!(
                "Function '{}' expected at least 1 argument(s), got 0",
                name
            ))),
        },
    };
    number(name, &first)?;

    let mut acc = first;
    for arg in iter {
        acc = match (&acc, arg) {
            (Value::Integer(a), Value::Integer(b)) => {
                Value::Integer(int_op(*a, *b).ok_or_else(|| overflow(name))?)
            }
            (a, b) => Value::Float(float_op(number(name, a)?, number(name, b)?)),
        };
    }
    Ok(acc)
}

fn divide(args: Vec<Value>) -> RulemancerResult<Value> {
    expect_min_arity("/", &args, 2)?;
    let mut acc = number("/", &args[0])?;
    for arg in &args[1..] {
        let divisor = number("/", arg)?;
        if divisor == 0.0 {
            return Err(RulemancerError::runtime("Division by zero in function '/'"));
        }
        acc /= divisor;
    }
    Ok(Value::Float(acc))
}

fn integer_divide(args: Vec<Value>) -> RulemancerResult<Value> {
    expect_min_arity("div", &args, 2)?;
    let mut acc = number("div", &args[0])?.trunc() as i64;
    for arg in &args[1..] {
        let divisor = number("div", arg)?.trunc() as i64;
        if divisor == 0 {
            return Err(RulemancerError::runtime("Division by zero in function 'div'"));
        }
        acc = acc.checked_div(divisor).ok_or_else(|| overflow("div"))?;
    }
    Ok(Value::Integer(acc))
}

fn modulo(args: Vec<Value>) -> RulemancerResult<Value> {
    expect_arity("mod", &args, 2)?;
    match (&args[0], &args[1]) {
        (Value::Integer(_), Value::Integer(0)) => {
            Err(RulemancerError::runtime("Division by zero in function 'mod'"))
        }
        (Value::Integer(a), Value::Integer(b)) => a
            .checked_rem(*b)
            .map(Value::Integer)
            .ok_or_else(|| overflow("mod")),
        (a, b) => {
            let divisor = number("mod", b)?;
            if divisor == 0.0 {
                return Err(RulemancerError::runtime("Division by zero in function 'mod'"));
            }
            Ok(Value::Float(number("mod", a)? % divisor))
        }
    }
}

fn extremum(name: &str, args: Vec<Value>, wanted: Ordering) -> RulemancerResult<Value> {
    expect_min_arity(name, &args, 1)?;
    let mut best = args[0].clone();
    let mut best_number = number(name, &best)?;
    for arg in &args[1..] {
        let n = number(name, arg)?;
        if n.partial_cmp(&best_number) == Some(wanted) {
            best = arg.clone();
            best_number = n;
        }
    }
    Ok(best)
}

fn compare_chain(
    name: &str,
    args: Vec<Value>,
    holds: fn(Ordering) -> bool,
) -> RulemancerResult<Value> {
    expect_min_arity(name, &args, 2)?;
    let numbers = args
        .iter()
        .map(|a| number(name, a))
        .collect::<RulemancerResult<Vec<f64>>>()?;
    let result = numbers.windows(2).all(|pair| {
        pair[0]
            .partial_cmp(&pair[1])
            .map(holds)
            .unwrap_or(false)
    });
    Ok(Value::boolean(result))
}

fn concat(args: &[Value]) -> String {
    args.iter().map(Value::display_text).collect()
}

fn map_lexeme(name: &str, args: Vec<Value>, f: fn(&str) -> String) -> RulemancerResult<Value> {
    expect_arity(name, &args, 1)?;
    match &args[0] {
        Value::Symbol(s) => Ok(Value::Symbol(f(s))),
        Value::String(s) => Ok(Value::String(f(s))),
        other => Err(type_error(name, "a symbol or string", other)),
    }
}

fn predicate(name: &str, args: Vec<Value>, test: fn(&Value) -> bool) -> RulemancerResult<Value> {
    expect_arity(name, &args, 1)?;
    Ok(Value::boolean(test(&args[0])))
}
