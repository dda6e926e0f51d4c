//! Call handling (§4.4): arity checks, call-environment construction from a
//! closure's captured snapshot, constructor/bound-method/native dispatch, and
//! call-frame trace accumulation on error propagation.

use super::{builtins_methods, exec_block, eval_expr, resolve_member_value, Flow, Interpreter};
use crate::ast::Expr;
use crate::class::Instance;
use crate::env::Environment;
use crate::error::{RuntimeError, RuntimeErrorKind};
use crate::value::{Closure, Value};
use std::path::PathBuf;
use std::rc::Rc;

pub fn eval_call(
    interp: &Interpreter,
    env: &Environment,
    callee: &Expr,
    arg_exprs: &[Expr],
    line: usize,
    file: &Rc<PathBuf>,
) -> Result<Value, RuntimeError> {
    let args: Vec<Value> = arg_exprs
        .iter()
        .map(|a| eval_expr(interp, env, a, file, line))
        .collect::<Result<_, _>>()?;

    if let Expr::MemberAccess { object, member, line: ma_line } = callee {
        let obj_val = eval_expr(interp, env, object, file, *ma_line)?;
        if let Some(result) = builtins_methods::dispatch(&obj_val, member, &args) {
            return result.map_err(|k| RuntimeError::new(k, *ma_line));
        }
        let func = resolve_member_value(interp, env, &obj_val, object, member, *ma_line)?;
        return call_value(interp, env, func, args, *ma_line, file);
    }

    let func = eval_expr(interp, env, callee, file, line)?;
    call_value(interp, env, func, args, line, file)
}

pub fn call_value(
    interp: &Interpreter,
    env: &Environment,
    func: Value,
    args: Vec<Value>,
    line: usize,
    file: &Rc<PathBuf>,
) -> Result<Value, RuntimeError> {
    match func {
        Value::Closure(c) => call_closure(interp, &c, args, env, None, line, file),
        Value::BoundMethod(bm) => {
            if bm.method.name.starts_with("__") {
                let current_self = env.get("__current_self__");
                let ok = matches!(&current_self, Some(Value::Instance(cs)) if Rc::ptr_eq(cs, &bm.receiver));
                if !ok {
                    return Err(RuntimeError::new(
                        RuntimeErrorKind::PrivateAccessViolation { member: bm.method.name.clone() },
                        line,
                    ));
                }
            }
            let mut full_args = Vec::with_capacity(args.len() + 1);
            full_args.push(Value::Instance(bm.receiver.clone()));
            full_args.extend(args);
            call_closure(interp, &bm.method, full_args, env, Some(bm.receiver.clone()), line, file)
        }
        Value::Class(class) => {
            let instance = Rc::new(Instance::new(class.clone()));
            if let Some(ctor) = class.find_method("__main__") {
                let mut full_args = Vec::with_capacity(args.len() + 1);
                full_args.push(Value::Instance(instance.clone()));
                full_args.extend(args);
                call_closure(interp, &ctor, full_args, env, Some(instance.clone()), line, file)?;
            } else if !args.is_empty() {
                return Err(RuntimeError::new(
                    RuntimeErrorKind::Other {
                        message: format!("class '{}' has no constructor to accept arguments", class.name),
                    },
                    line,
                ));
            }
            Ok(Value::Instance(instance))
        }
        Value::Native(native) => native.call(&args).map_err(|k| RuntimeError::new(k, line)),
        _ => Err(RuntimeError::new(RuntimeErrorKind::NotCallable, line)),
    }
}

/// Builds a fresh call environment from the closure's captured snapshot,
/// re-binds the closure's own name for recursion (the snapshot itself never
/// stores a self-reference, see [`crate::value::Closure`]), threads the
/// private-access receiver (`__current_self__`) through, and runs the body.
///
/// A method call also binds its own class's name in the call environment, so
/// a method body can refer to its own class (e.g. to build more instances)
/// without the class having to be woven into every method's captured
/// snapshot at definition time.
pub fn call_closure(
    interp: &Interpreter,
    closure: &Rc<Closure>,
    args: Vec<Value>,
    caller_env: &Environment,
    self_instance: Option<Rc<Instance>>,
    call_line: usize,
    _caller_file: &Rc<PathBuf>,
) -> Result<Value, RuntimeError> {
    if args.len() != closure.params.len() {
        return Err(RuntimeError::new(
            RuntimeErrorKind::arity_mismatch(closure.name.clone(), closure.params.len().to_string(), args.len()),
            call_line,
        ));
    }

    let call_env = Environment::from_bindings(closure.snapshot.clone());
    call_env.define(&closure.name, Value::Closure(closure.clone()));
    if let Some(inherited) = caller_env.get("__current_self__") {
        call_env.define("__current_self__", inherited);
    }
    if let Some(inst) = &self_instance {
        call_env.define("__current_self__", Value::Instance(inst.clone()));
        call_env.define(inst.class.name.clone(), Value::Class(inst.class.clone()));
    }
    for (param, arg) in closure.params.iter().zip(args) {
        call_env.define(param, arg);
    }

    match exec_block(interp, &call_env, &closure.body, &closure.file) {
        Ok(Flow::Return(v)) => Ok(v),
        Ok(Flow::Normal) => Ok(Value::Int(0)),
        Err(mut e) => {
            let context = match &self_instance {
                Some(inst) => format!("method '{}' of class '{}'", closure.name, inst.class.name),
                None => format!("function '{}'", closure.name),
            };
            e.push_frame((*closure.file).clone(), call_line, context);
            Err(e)
        }
    }
}
