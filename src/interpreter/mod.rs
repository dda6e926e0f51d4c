//! The tree-walking interpreter (§4.4-§4.6).
//!
//! Runtime scoping is flat within a function call: unlike the static
//! analyzer, which opens a nested lexical scope per block, `if`/`while`/
//! `for`/`try` bodies here execute directly against the same
//! [`crate::env::Environment`] as their enclosing call — only the `except`
//! arm of a `try/except` runs in a forked copy (see [`exec_stmt`]).

mod builtins_methods;
pub mod calls;
mod dispatch;
mod modules;

use crate::ast::{Expr, Program, Stmt};
use crate::class::{Class, Instance};
use crate::env::Environment;
use crate::error::{RuntimeError, RuntimeErrorKind};
use crate::native::NativeModuleTable;
use crate::value::{Closure, Key, Map, Value};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub use dispatch::to_display_str;

/// What a block of statements did: ran to the end, or hit a `return`.
/// Loops unwind on `Return` the same way a call body does; `Stmt::Return`
/// outside any function is simply returned all the way up to [`Interpreter::run`].
enum Flow {
    Normal,
    Return(Value),
}

/// Owns the module cache and import-cycle guard shared by every call into
/// [`modules::ensure_imported`], and holds the native-module table the host
/// registered before running any source.
pub struct Interpreter<'a> {
    native_modules: &'a NativeModuleTable,
    modules: RefCell<HashMap<String, Value>>,
    importing: RefCell<HashSet<PathBuf>>,
}

impl<'a> Interpreter<'a> {
    pub fn new(native_modules: &'a NativeModuleTable) -> Self {
        Self {
            native_modules,
            modules: RefCell::new(HashMap::new()),
            importing: RefCell::new(HashSet::new()),
        }
    }

    /// Runs a parsed program's top-level statements in a fresh environment.
    pub fn run(&self, program: &Program, file: &Path) -> Result<(), RuntimeError> {
        let env = Environment::new();
        let file = Rc::new(file.to_path_buf());
        match exec_block(self, &env, &program.statements, &file)? {
            Flow::Normal | Flow::Return(_) => Ok(()),
        }
    }
}

fn exec_block(interp: &Interpreter, env: &Environment, body: &[Stmt], file: &Rc<PathBuf>) -> Result<Flow, RuntimeError> {
    for stmt in body {
        match exec_stmt(interp, env, stmt, file)? {
            Flow::Normal => {}
            ret @ Flow::Return(_) => return Ok(ret),
        }
    }
    Ok(Flow::Normal)
}

fn exec_stmt(interp: &Interpreter, env: &Environment, stmt: &Stmt, file: &Rc<PathBuf>) -> Result<Flow, RuntimeError> {
    match stmt {
        Stmt::Print(exprs, line) => {
            let mut out = String::new();
            for e in exprs {
                let v = eval_expr(interp, env, e, file, *line)?;
                out.push_str(&to_display_str(interp, env, &v, *line, file)?);
            }
            print!("{out}");
            Ok(Flow::Normal)
        }
        Stmt::Println(exprs, line) => {
            let mut out = String::new();
            for e in exprs {
                let v = eval_expr(interp, env, e, file, *line)?;
                out.push_str(&to_display_str(interp, env, &v, *line, file)?);
            }
            println!("{out}");
            Ok(Flow::Normal)
        }
        Stmt::Import(name, line) => {
            let value = modules::ensure_imported(interp, name, file, *line)?;
            env.define(name.clone(), value);
            Ok(Flow::Normal)
        }
        Stmt::FuncDef(def) => {
            let closure = Rc::new(Closure {
                name: def.name.clone(),
                params: def.params.clone(),
                body: Rc::new(def.body.clone()),
                snapshot: env.snapshot(),
                file: file.clone(),
            });
            env.define(def.name.clone(), Value::Closure(closure));
            Ok(Flow::Normal)
        }
        Stmt::ClassDef { name, parent, methods, line } => {
            let base = match parent {
                Some(p) => match env.get(p) {
                    Some(Value::Class(c)) => Some(c),
                    _ => {
                        return Err(RuntimeError::new(
                            RuntimeErrorKind::UndefinedName(p.clone()),
                            *line,
                        ))
                    }
                },
                None => None,
            };
            let snapshot = env.snapshot();
            let mut built = HashMap::new();
            for m in methods {
                built.insert(
                    m.name.clone(),
                    Rc::new(Closure {
                        name: m.name.clone(),
                        params: m.params.clone(),
                        body: Rc::new(m.body.clone()),
                        snapshot: snapshot.clone(),
                        file: file.clone(),
                    }),
                );
            }
            let class = Rc::new(Class::new(name.clone(), base, built));
            env.define(name.clone(), Value::Class(class));
            Ok(Flow::Normal)
        }
        Stmt::Return(expr, line) => {
            let value = match expr {
                Some(e) => eval_expr(interp, env, e, file, *line)?,
                None => Value::Int(0),
            };
            Ok(Flow::Return(value))
        }
        Stmt::If { clauses, else_body, line } => {
            for (cond, body) in clauses {
                let v = eval_expr(interp, env, cond, file, *line)?;
                if v.is_truthy() {
                    return exec_block(interp, env, body, file);
                }
            }
            match else_body {
                Some(body) => exec_block(interp, env, body, file),
                None => Ok(Flow::Normal),
            }
        }
        Stmt::While { cond, body, line } => {
            while eval_expr(interp, env, cond, file, *line)?.is_truthy() {
                match exec_block(interp, env, body, file)? {
                    Flow::Normal => {}
                    ret @ Flow::Return(_) => return Ok(ret),
                }
            }
            Ok(Flow::Normal)
        }
        Stmt::For { var, iter, body, line } => {
            let iterable = eval_expr(interp, env, iter, file, *line)?;
            match iterable {
                Value::List(l) => {
                    let items = l.borrow().clone();
                    for item in items {
                        env.define(var.clone(), item);
                        match exec_block(interp, env, body, file)? {
                            Flow::Normal => {}
                            ret @ Flow::Return(_) => return Ok(ret),
                        }
                    }
                }
                Value::Str(s) => {
                    for ch in s.chars() {
                        env.define(var.clone(), Value::str(ch.to_string()));
                        match exec_block(interp, env, body, file)? {
                            Flow::Normal => {}
                            ret @ Flow::Return(_) => return Ok(ret),
                        }
                    }
                }
                Value::Map(m) => {
                    let keys: Vec<Key> = m.borrow().keys().cloned().collect();
                    for k in keys {
                        env.define(var.clone(), k.into_value());
                        match exec_block(interp, env, body, file)? {
                            Flow::Normal => {}
                            ret @ Flow::Return(_) => return Ok(ret),
                        }
                    }
                }
                other => {
                    return Err(RuntimeError::new(
                        RuntimeErrorKind::NonIterable { type_name: other.type_name().to_string() },
                        *line,
                    ))
                }
            }
            Ok(Flow::Normal)
        }
        Stmt::TryExcept { try_body, err_var, except_body, line: _ } => {
            match exec_block(interp, env, try_body, file) {
                Ok(flow) => Ok(flow),
                Err(e) => {
                    let forked = env.fork();
                    if let Some(name) = err_var {
                        let mut error_map = Map::new();
                        error_map.insert(Key::Str("message".into()), Value::str(e.message()));
                        error_map.insert(Key::Str("line".into()), Value::Int(e.line as i64));
                        error_map.insert(Key::Str("col".into()), Value::Int(e.column as i64));
                        forked.define(name.clone(), Value::map(error_map));
                    }
                    let flow = exec_block(interp, &forked, except_body, file)?;
                    Ok(flow)
                }
            }
        }
        Stmt::Assign { name, value, line } => {
            let v = eval_expr(interp, env, value, file, *line)?;
            env.define(name.clone(), v);
            Ok(Flow::Normal)
        }
        Stmt::IndexAssign { object, index, value, line } => {
            let target = eval_expr(interp, env, object, file, *line)?;
            let idx = eval_expr(interp, env, index, file, *line)?;
            let val = eval_expr(interp, env, value, file, *line)?;
            index_assign(target, idx, val, *line)?;
            Ok(Flow::Normal)
        }
        Stmt::MemberAssign { object, member, value, line } => {
            let target = eval_expr(interp, env, object, file, *line)?;
            let val = eval_expr(interp, env, value, file, *line)?;
            match &target {
                Value::Instance(inst) => {
                    check_private_access(env, inst, member, *line)?;
                    inst.fields.borrow_mut().insert(member.clone(), val);
                    Ok(Flow::Normal)
                }
                Value::Map(m) => {
                    m.borrow_mut().insert(Key::Str(member.as_str().into()), val);
                    Ok(Flow::Normal)
                }
                other => Err(RuntimeError::new(
                    RuntimeErrorKind::UnknownAttribute { name: other.type_name().to_string(), member: member.clone() },
                    *line,
                )),
            }
        }
        Stmt::Expr(expr, line) => {
            eval_expr(interp, env, expr, file, *line)?;
            Ok(Flow::Normal)
        }
    }
}

fn eval_expr(interp: &Interpreter, env: &Environment, expr: &Expr, file: &Rc<PathBuf>, line: usize) -> Result<Value, RuntimeError> {
    match expr {
        Expr::Int(n) => Ok(Value::Int(*n)),
        Expr::Float(f) => Ok(Value::Float(*f)),
        Expr::Str(s) => Ok(Value::str(s.clone())),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::List(items) => {
            let values: Vec<Value> = items
                .iter()
                .map(|i| eval_expr(interp, env, i, file, line))
                .collect::<Result<_, _>>()?;
            Ok(Value::list(values))
        }
        Expr::Dict(pairs) => {
            let mut map = Map::new();
            for (k, v) in pairs {
                let kv = eval_expr(interp, env, k, file, line)?;
                let vv = eval_expr(interp, env, v, file, line)?;
                let key = Key::from_value(&kv).ok_or_else(|| {
                    RuntimeError::new(RuntimeErrorKind::UnhashableKey { type_name: kv.type_name().to_string() }, line)
                })?;
                map.insert(key, vv);
            }
            Ok(Value::map(map))
        }
        Expr::Var(name) => env
            .get(name)
            .ok_or_else(|| RuntimeError::new(RuntimeErrorKind::UndefinedName(name.clone()), line)),
        Expr::Input => {
            let mut line_in = String::new();
            std::io::stdin()
                .read_line(&mut line_in)
                .map_err(|e| RuntimeError::new(RuntimeErrorKind::Other { message: e.to_string() }, line))?;
            Ok(Value::str(line_in.trim_end_matches(['\n', '\r']).to_string()))
        }
        Expr::ToInt(inner) => {
            let v = eval_expr(interp, env, inner, file, line)?;
            match &v {
                Value::Int(n) => Ok(Value::Int(*n)),
                Value::Float(f) => Ok(Value::Int(*f as i64)),
                Value::Str(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(Value::Int)
                    .map_err(|_| RuntimeError::new(RuntimeErrorKind::Other { message: format!("cannot convert '{s}' to int") }, line)),
                Value::Bool(b) => Ok(Value::Int(*b as i64)),
                other => Err(RuntimeError::new(
                    RuntimeErrorKind::type_mismatch("to_int", format!("cannot convert {} to int", other.type_name())),
                    line,
                )),
            }
        }
        Expr::ToFloat(inner) => {
            let v = eval_expr(interp, env, inner, file, line)?;
            match &v {
                Value::Int(n) => Ok(Value::Float(*n as f64)),
                Value::Float(f) => Ok(Value::Float(*f)),
                Value::Str(s) => s
                    .trim()
                    .parse::<f64>()
                    .map(Value::Float)
                    .map_err(|_| RuntimeError::new(RuntimeErrorKind::Other { message: format!("cannot convert '{s}' to float") }, line)),
                other => Err(RuntimeError::new(
                    RuntimeErrorKind::type_mismatch("to_float", format!("cannot convert {} to float", other.type_name())),
                    line,
                )),
            }
        }
        Expr::ToStr(inner) => {
            let v = eval_expr(interp, env, inner, file, line)?;
            Ok(Value::str(to_display_str(interp, env, &v, line, file)?))
        }
        Expr::TypeOf(inner) => {
            let v = eval_expr(interp, env, inner, file, line)?;
            Ok(Value::str(v.type_tag()))
        }
        Expr::Unary { op, expr, line } => {
            let v = eval_expr(interp, env, expr, file, *line)?;
            dispatch::unary(op, v, *line)
        }
        Expr::BinOp { op, left, right, line } => {
            let a = eval_expr(interp, env, left, file, *line)?;
            let b = eval_expr(interp, env, right, file, *line)?;
            dispatch::binop(interp, env, op, a, b, *line, file)
        }
        Expr::LogicalOp { op, left, right, line } => {
            let a = eval_expr(interp, env, left, file, *line)?;
            match op.as_str() {
                "and" => {
                    if !a.is_truthy() {
                        Ok(a)
                    } else {
                        eval_expr(interp, env, right, file, *line)
                    }
                }
                "or" => {
                    if a.is_truthy() {
                        Ok(a)
                    } else {
                        eval_expr(interp, env, right, file, *line)
                    }
                }
                other => Err(RuntimeError::new(
                    RuntimeErrorKind::Other { message: format!("unknown logical operator '{other}'") },
                    *line,
                )),
            }
        }
        Expr::MemberAccess { object, member, line } => {
            let obj_val = eval_expr(interp, env, object, file, *line)?;
            resolve_member_value(interp, env, &obj_val, object, member, *line)
        }
        Expr::IndexAccess { object, index, line } => {
            let target = eval_expr(interp, env, object, file, *line)?;
            let idx = eval_expr(interp, env, index, file, *line)?;
            index_read(&target, &idx, *line)
        }
        Expr::Call { callee, args, line } => calls::eval_call(interp, env, callee, args, *line, file),
    }
}

/// Resolves a dotted read (or the receiver of a dotted call after a miss on
/// the built-in method table): private-field check, own-field lookup, then
/// method lookup on instances; key lookup on maps, with the "no such module
/// member" special case when `object` is a bare variable naming a loaded
/// module (an AST-structural check, matching how the reference
/// implementation tells modules and plain mappings apart without tagging
/// values).
fn resolve_member_value(
    interp: &Interpreter,
    env: &Environment,
    obj_val: &Value,
    object: &Expr,
    member: &str,
    line: usize,
) -> Result<Value, RuntimeError> {
    match obj_val {
        Value::Instance(inst) => {
            check_private_access(env, inst, member, line)?;
            if let Some(v) = inst.fields.borrow().get(member) {
                return Ok(v.clone());
            }
            if let Some(m) = inst.class.find_method(member) {
                return Ok(Value::BoundMethod(Rc::new(crate::value::BoundMethod {
                    receiver: inst.clone(),
                    method: m,
                })));
            }
            Err(RuntimeError::new(
                RuntimeErrorKind::UnknownAttribute { name: inst.class.name.clone(), member: member.to_string() },
                line,
            ))
        }
        Value::Map(m) => {
            if let Expr::Var(name) = object {
                if interp.modules.borrow().contains_key(name) {
                    let found = m.borrow().get(&Key::Str(member.into())).cloned();
                    return found.ok_or_else(|| {
                        RuntimeError::new(
                            RuntimeErrorKind::NoSuchModuleMember { module: name.clone(), member: member.to_string() },
                            line,
                        )
                    });
                }
            }
            m.borrow()
                .get(&Key::Str(member.into()))
                .cloned()
                .ok_or_else(|| RuntimeError::new(RuntimeErrorKind::MissingKey { key: member.to_string() }, line))
        }
        other => Err(RuntimeError::new(
            RuntimeErrorKind::UnknownAttribute { name: other.type_name().to_string(), member: member.to_string() },
            line,
        )),
    }
}

/// Enforces the private-name rule (§3/§4.4): a `__`-prefixed field or method
/// is only reachable while the current call's bound receiver
/// (`__current_self__`, compared by identity) is this very instance.
fn check_private_access(env: &Environment, inst: &Rc<Instance>, member: &str, line: usize) -> Result<(), RuntimeError> {
    if !member.starts_with("__") {
        return Ok(());
    }
    let current_self = env.get("__current_self__");
    let ok = matches!(&current_self, Some(Value::Instance(cs)) if Rc::ptr_eq(cs, inst));
    if ok {
        Ok(())
    } else {
        Err(RuntimeError::new(
            RuntimeErrorKind::PrivateAccessViolation { member: member.to_string() },
            line,
        ))
    }
}

fn index_read(target: &Value, idx: &Value, line: usize) -> Result<Value, RuntimeError> {
    match target {
        Value::List(l) => {
            let list = l.borrow();
            let i = as_index(idx, line)?;
            let real = normalize_index(i, list.len(), line)?;
            Ok(list[real].clone())
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let i = as_index(idx, line)?;
            let real = normalize_index(i, chars.len(), line)?;
            Ok(Value::str(chars[real].to_string()))
        }
        Value::Map(m) => {
            let key = Key::from_value(idx)
                .ok_or_else(|| RuntimeError::new(RuntimeErrorKind::UnhashableKey { type_name: idx.type_name().to_string() }, line))?;
            m.borrow()
                .get(&key)
                .cloned()
                .ok_or_else(|| RuntimeError::new(RuntimeErrorKind::MissingKey { key: key.to_string() }, line))
        }
        other => Err(RuntimeError::new(
            RuntimeErrorKind::type_mismatch("index", format!("value of type {} is not indexable", other.type_name())),
            line,
        )),
    }
}

fn index_assign(target: Value, idx: Value, val: Value, line: usize) -> Result<(), RuntimeError> {
    match target {
        Value::List(l) => {
            let i = as_index(&idx, line)?;
            let len = l.borrow().len();
            let real = range_check_index(i, len, line)?;
            l.borrow_mut()[real] = val;
            Ok(())
        }
        Value::Map(m) => {
            let key = Key::from_value(&idx)
                .ok_or_else(|| RuntimeError::new(RuntimeErrorKind::UnhashableKey { type_name: idx.type_name().to_string() }, line))?;
            m.borrow_mut().insert(key, val);
            Ok(())
        }
        other => Err(RuntimeError::new(
            RuntimeErrorKind::type_mismatch("index assignment", format!("value of type {} does not support item assignment", other.type_name())),
            line,
        )),
    }
}

fn as_index(idx: &Value, line: usize) -> Result<i64, RuntimeError> {
    match idx {
        Value::Int(n) => Ok(*n),
        other => Err(RuntimeError::new(
            RuntimeErrorKind::type_mismatch("index", format!("index must be an int, got {}", other.type_name())),
            line,
        )),
    }
}

/// Read indexing (§4.4): negative indices wrap around from the end, the
/// usual scripting-language convention.
fn normalize_index(i: i64, len: usize, line: usize) -> Result<usize, RuntimeError> {
    let real = if i < 0 { i + len as i64 } else { i };
    if real < 0 || real as usize >= len {
        return Err(RuntimeError::new(RuntimeErrorKind::IndexOutOfRange { index: i, length: len }, line));
    }
    Ok(real as usize)
}

/// Write indexing (§4.4): negative indices wrap the same as reads, but the
/// range check is against `-len` directly rather than post-wrap, matching
/// the reference interpreter's `index < -len or index >= len` guard.
fn range_check_index(i: i64, len: usize, line: usize) -> Result<usize, RuntimeError> {
    if i < -(len as i64) || i >= len as i64 {
        return Err(RuntimeError::new(RuntimeErrorKind::IndexOutOfRange { index: i, length: len }, line));
    }
    let real = if i < 0 { i + len as i64 } else { i };
    Ok(real as usize)
}
