//! Built-in methods on primitive `str`/`list`/`dict` values (§4.4's
//! "Calls" built-in-method-dispatch bullet). Checked before general member
//! resolution, so these names are reserved on every string, list, and map
//! regardless of the value's contents.

use crate::error::RuntimeErrorKind;
use crate::value::{Key, Value};

/// Returns `None` when `member` isn't one of the reserved built-in method
/// names for `receiver`'s type, letting the caller fall through to general
/// member/class resolution (e.g. a user-defined instance's own methods).
pub fn dispatch(receiver: &Value, member: &str, args: &[Value]) -> Option<Result<Value, RuntimeErrorKind>> {
    match receiver {
        Value::Str(s) => str_method(s, member, args),
        Value::List(l) => list_method(l, member, args),
        Value::Map(m) => map_method(m, member, args),
        _ => None,
    }
}

fn check_arity(name: &str, expected: usize, args: &[Value]) -> Result<(), RuntimeErrorKind> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(RuntimeErrorKind::arity_mismatch(name, expected.to_string(), args.len()))
    }
}

fn str_method(s: &str, member: &str, args: &[Value]) -> Option<Result<Value, RuntimeErrorKind>> {
    Some(match member {
        "upper" => check_arity("upper", 0, args).map(|_| Value::str(s.to_uppercase())),
        "lower" => check_arity("lower", 0, args).map(|_| Value::str(s.to_lowercase())),
        "strip" => check_arity("strip", 0, args).map(|_| Value::str(s.trim().to_string())),
        "len" => check_arity("len", 0, args).map(|_| Value::Int(s.chars().count() as i64)),
        "startswith" => check_arity("startswith", 1, args).and_then(|_| {
            let needle = expect_str("startswith", &args[0])?;
            Ok(Value::Bool(s.starts_with(needle.as_ref())))
        }),
        "endswith" => check_arity("endswith", 1, args).and_then(|_| {
            let needle = expect_str("endswith", &args[0])?;
            Ok(Value::Bool(s.ends_with(needle.as_ref())))
        }),
        "find" => check_arity("find", 1, args).and_then(|_| {
            let needle = expect_str("find", &args[0])?;
            let idx = s.find(needle.as_ref()).map(|byte_idx| s[..byte_idx].chars().count() as i64).unwrap_or(-1);
            Ok(Value::Int(idx))
        }),
        _ => return None,
    })
}

fn expect_str(method: &str, v: &Value) -> Result<std::rc::Rc<str>, RuntimeErrorKind> {
    match v {
        Value::Str(s) => Ok(s.clone()),
        other => Err(RuntimeErrorKind::type_mismatch(method, format!("expected a str argument, got {}", other.type_name()))),
    }
}

fn list_method(l: &std::rc::Rc<std::cell::RefCell<Vec<Value>>>, member: &str, args: &[Value]) -> Option<Result<Value, RuntimeErrorKind>> {
    Some(match member {
        "len" => check_arity("len", 0, args).map(|_| Value::Int(l.borrow().len() as i64)),
        "append" => check_arity("append", 1, args).map(|_| {
            l.borrow_mut().push(args[0].clone());
            Value::Int(0)
        }),
        "pop" => check_arity("pop", 0, args).and_then(|_| {
            l.borrow_mut()
                .pop()
                .ok_or_else(|| RuntimeErrorKind::Other { message: "pop from empty list".to_string() })
        }),
        _ => return None,
    })
}

fn map_method(m: &std::rc::Rc<std::cell::RefCell<crate::value::Map>>, member: &str, args: &[Value]) -> Option<Result<Value, RuntimeErrorKind>> {
    Some(match member {
        "len" => check_arity("len", 0, args).map(|_| Value::Int(m.borrow().len() as i64)),
        "keys" => check_arity("keys", 0, args).map(|_| {
            let keys: Vec<Value> = m.borrow().keys().cloned().map(Key::into_value).collect();
            Value::list(keys)
        }),
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_find_returns_char_index_not_byte_index() {
        let result = dispatch(&Value::str("héllo"), "find", &[Value::str("llo")]);
        assert_eq!(result, Some(Ok(Value::Int(2))));
    }

    #[test]
    fn string_find_returns_negative_one_when_absent() {
        let result = dispatch(&Value::str("hello"), "find", &[Value::str("z")]);
        assert_eq!(result, Some(Ok(Value::Int(-1))));
    }

    #[test]
    fn list_pop_on_empty_list_errors() {
        let list = Value::list(vec![]);
        let result = dispatch(&list, "pop", &[]);
        assert!(matches!(result, Some(Err(_))));
    }

    #[test]
    fn non_builtin_member_returns_none() {
        assert!(dispatch(&Value::str("x"), "nope", &[]).is_none());
    }
}
