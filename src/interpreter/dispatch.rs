//! Operator dispatch (§4.4): dunder-method lookup with right-hand fallback,
//! the built-in numeric/string operator tables, and value-to-string
//! conversion (including the `__str__` hook).

use super::calls::call_closure;
use super::Interpreter;
use crate::env::Environment;
use crate::error::{RuntimeError, RuntimeErrorKind};
use crate::value::{Key, Value};
use std::path::PathBuf;
use std::rc::Rc;

fn left_dunder(op: &str) -> Option<&'static str> {
    Some(match op {
        "+" => "__add__",
        "-" => "__sub__",
        "*" => "__mul__",
        "/" => "__div__",
        "<" => "__lt__",
        ">" => "__gt__",
        "<=" => "__le__",
        ">=" => "__ge__",
        "==" => "__eq__",
        "!=" => "__ne__",
        _ => return None,
    })
}

fn right_dunder(op: &str) -> Option<&'static str> {
    Some(match op {
        "+" => "__radd__",
        "-" => "__rsub__",
        "*" => "__rmul__",
        "/" => "__rdiv__",
        _ => return None,
    })
}

fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Int(n) => Some(*n as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

pub fn binop(
    interp: &Interpreter,
    env: &Environment,
    op: &str,
    a: Value,
    b: Value,
    line: usize,
    file: &Rc<PathBuf>,
) -> Result<Value, RuntimeError> {
    if let Value::Instance(inst) = &a {
        if let Some(name) = left_dunder(op) {
            if let Some(m) = inst.class.find_method(name) {
                return call_closure(interp, &m, vec![a.clone(), b], env, Some(inst.clone()), line, file);
            }
        }
    }
    if let Value::Instance(inst) = &b {
        if let Some(name) = right_dunder(op) {
            if let Some(m) = inst.class.find_method(name) {
                return call_closure(interp, &m, vec![b.clone(), a], env, Some(inst.clone()), line, file);
            }
        }
    }

    match op {
        "==" => return Ok(Value::Bool(a == b)),
        "!=" => return Ok(Value::Bool(a != b)),
        _ => {}
    }

    if matches!(a, Value::Str(_)) || matches!(b, Value::Str(_)) {
        let sa = natural_str(&a);
        let sb = natural_str(&b);
        return match op {
            "+" => Ok(Value::str(format!("{sa}{sb}"))),
            "<" => Ok(Value::Bool(sa < sb)),
            ">" => Ok(Value::Bool(sa > sb)),
            "<=" => Ok(Value::Bool(sa <= sb)),
            ">=" => Ok(Value::Bool(sa >= sb)),
            _ => Err(RuntimeError::new(
                RuntimeErrorKind::type_mismatch(op, "operator not supported for strings"),
                line,
            )),
        };
    }

    if let (Some(na), Some(nb)) = (as_f64(&a), as_f64(&b)) {
        return match op {
            "+" | "-" | "*" => {
                if let (Value::Int(x), Value::Int(y)) = (&a, &b) {
                    let r = match op {
                        "+" => x.wrapping_add(*y),
                        "-" => x.wrapping_sub(*y),
                        "*" => x.wrapping_mul(*y),
                        _ => unreachable!(),
                    };
                    return Ok(Value::Int(r));
                }
                let r = match op {
                    "+" => na + nb,
                    "-" => na - nb,
                    "*" => na * nb,
                    _ => unreachable!(),
                };
                Ok(Value::Float(r))
            }
            "/" => {
                if nb == 0.0 {
                    Err(RuntimeError::new(RuntimeErrorKind::DivisionByZero, line))
                } else {
                    Ok(Value::Float(na / nb))
                }
            }
            "<" => Ok(Value::Bool(na < nb)),
            ">" => Ok(Value::Bool(na > nb)),
            "<=" => Ok(Value::Bool(na <= nb)),
            ">=" => Ok(Value::Bool(na >= nb)),
            _ => Err(RuntimeError::new(
                RuntimeErrorKind::type_mismatch(op, "unsupported numeric operator"),
                line,
            )),
        };
    }

    Err(RuntimeError::new(
        RuntimeErrorKind::type_mismatch(
            op,
            format!(
                "unsupported operand types: '{}' and '{}'",
                a.type_name(),
                b.type_name()
            ),
        ),
        line,
    ))
}

pub fn unary(op: &str, val: Value, line: usize) -> Result<Value, RuntimeError> {
    if op == "not" {
        return Ok(Value::Bool(!val.is_truthy()));
    }
    match &val {
        Value::Int(n) => match op {
            "-" => Ok(Value::Int(-n)),
            "+" => Ok(val.clone()),
            _ => Err(unary_type_error(op, &val, line)),
        },
        Value::Float(f) => match op {
            "-" => Ok(Value::Float(-f)),
            "+" => Ok(val.clone()),
            _ => Err(unary_type_error(op, &val, line)),
        },
        _ => Err(unary_type_error(op, &val, line)),
    }
}

fn unary_type_error(op: &str, val: &Value, line: usize) -> RuntimeError {
    RuntimeError::new(
        RuntimeErrorKind::type_mismatch(
            op,
            format!("unary operator not supported for type '{}'", val.type_name()),
        ),
        line,
    )
}

/// Converts to the printed form used by `print`/`println`/`to_str`, invoking
/// `__str__` on instances that define it (must return a string itself).
pub fn to_display_str(
    interp: &Interpreter,
    env: &Environment,
    val: &Value,
    line: usize,
    file: &Rc<PathBuf>,
) -> Result<String, RuntimeError> {
    if let Value::Instance(inst) = val {
        if let Some(m) = inst.class.find_method("__str__") {
            let result = call_closure(interp, &m, vec![val.clone()], env, Some(inst.clone()), line, file)?;
            return match result {
                Value::Str(s) => Ok(s.to_string()),
                other => Err(RuntimeError::new(
                    RuntimeErrorKind::Other {
                        message: format!("method '__str__' must return a string, not '{}'", other.type_name()),
                    },
                    line,
                )),
            };
        }
    }
    Ok(natural_str(val))
}

pub fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{f:.1}")
    } else {
        f.to_string()
    }
}

/// The natural printed form of a value, without invoking any dunder hook.
/// Nested string elements inside lists/mappings are quoted, matching the
/// bracketed recursive form described in §4.4.
pub fn natural_str(v: &Value) -> String {
    match v {
        Value::Int(n) => n.to_string(),
        Value::Float(f) => format_float(*f),
        Value::Str(s) => s.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::List(l) => {
            let items: Vec<String> = l.borrow().iter().map(repr).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Map(m) => {
            let items: Vec<String> = m
                .borrow()
                .iter()
                .map(|(k, v)| format!("{}: {}", repr_key(k), repr(v)))
                .collect();
            format!("{{{}}}", items.join(", "))
        }
        Value::Class(c) => format!("<class {}>", c.name),
        Value::Instance(i) => format!("<instance of {}>", i.class.name),
        Value::Closure(c) => format!("<function {}>", c.name),
        Value::BoundMethod(b) => format!("<bound method {}>", b.method.name),
        Value::Native(n) => format!("<native function {}>", n.name),
        Value::Handle(_) => "<handle>".to_string(),
    }
}

fn repr(v: &Value) -> String {
    match v {
        Value::Str(s) => format!("'{s}'"),
        other => natural_str(other),
    }
}

fn repr_key(k: &Key) -> String {
    match k {
        Key::Str(s) => format!("'{s}'"),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_whole_numbers_print_with_trailing_dot_zero() {
        assert_eq!(format_float(1.0), "1.0");
        assert_eq!(format_float(1.5), "1.5");
    }

    #[test]
    fn list_repr_quotes_string_elements() {
        let v = Value::list(vec![Value::Int(1), Value::str("a")]);
        assert_eq!(natural_str(&v), "[1, 'a']");
    }
}
