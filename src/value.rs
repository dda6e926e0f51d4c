//! The runtime value representation.
//!
//! A [`Value`] is a tagged variant over every kind of data the interpreter
//! can produce or pass around: numbers, strings, booleans, mutable
//! aggregates (list/map, shared by reference via `Rc<RefCell<_>>>`), and the
//! handful of callable shapes (closures, bound methods, classes, native
//! callables) described in §3 of the core's data model.

use crate::class::{Class, Instance};
use crate::native::NativeCallable;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::ast::Stmt;
use crate::env::Bindings;

/// A function closure: name, parameters, body, and a by-value snapshot of
/// the environment at the point of definition (see [`crate::env`]).
///
/// The closure does *not* store itself in its own snapshot — storing a
/// strong `Rc` to itself inside `snapshot` would create a self-cycle that a
/// reference-counted runtime never collects. Instead, recursion is granted
/// at call time: [`crate::interpreter::calls`] re-binds the closure's own
/// name in the freshly built call environment before running the body.
#[derive(Debug)]
pub struct Closure {
    pub name: String,
    pub params: Vec<String>,
    pub body: Rc<Vec<Stmt>>,
    pub snapshot: Bindings,
    pub file: Rc<std::path::PathBuf>,
}

/// A (receiver, closure) pair produced by accessing a method through an
/// instance; calling it prepends the receiver to the argument list.
#[derive(Debug, Clone)]
pub struct BoundMethod {
    pub receiver: Rc<Instance>,
    pub method: Rc<Closure>,
}

/// A mapping key. Restricted to the three hashable primitive kinds the
/// language allows as dictionary keys (§3 invariants).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Str(Rc<str>),
    Int(i64),
    Bool(bool),
}

impl Key {
    /// Converts a runtime value to a map key, or `None` if the value's type
    /// cannot be used as one (only string/int/bool are hashable here).
    pub fn from_value(value: &Value) -> Option<Key> {
        match value {
            Value::Str(s) => Some(Key::Str(s.clone())),
            Value::Int(n) => Some(Key::Int(*n)),
            Value::Bool(b) => Some(Key::Bool(*b)),
            _ => None,
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Key::Str(s) => Value::Str(s),
            Key::Int(n) => Value::Int(n),
            Key::Bool(b) => Value::Bool(b),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Key::Str(_) => "str",
            Key::Int(_) => "int",
            Key::Bool(_) => "bool",
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Str(s) => write!(f, "{s}"),
            Key::Int(n) => write!(f, "{n}"),
            Key::Bool(b) => write!(f, "{b}"),
        }
    }
}

pub type Map = IndexMap<Key, Value>;

#[derive(Clone)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    Bool(bool),
    List(Rc<RefCell<Vec<Value>>>),
    Map(Rc<RefCell<Map>>),
    Class(Rc<Class>),
    Instance(Rc<Instance>),
    Closure(Rc<Closure>),
    BoundMethod(Rc<BoundMethod>),
    Native(NativeCallable),
    /// An opaque handle a native module hands back to the core (e.g. a file
    /// descriptor); the core never looks inside it, only carries it around
    /// and passes it back out to native calls.
    Handle(Rc<dyn std::any::Any>),
}

impl Value {
    pub fn str(s: impl Into<Rc<str>>) -> Value {
        Value::Str(s.into())
    }

    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn map(entries: Map) -> Value {
        Value::Map(Rc::new(RefCell::new(entries)))
    }

    /// `type(v)` tag per §4.4: one of the fixed set, `"unknown"` for
    /// anything the source language has no literal syntax for (classes,
    /// instances, bound methods, native callables, handles).
    pub fn type_tag(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Bool(_) => "bool",
            Value::List(_) => "list",
            Value::Map(_) => "dict",
            Value::Closure(_) | Value::BoundMethod(_) | Value::Native(_) => "function",
            Value::Class(_) | Value::Instance(_) | Value::Handle(_) => "unknown",
        }
    }

    /// A finer-grained name used in error messages (distinguishes classes
    /// from instances from bound methods, where `type_tag` collapses them).
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Class(_) => "class",
            Value::Instance(_) => "instance",
            Value::BoundMethod(_) => "bound method",
            Value::Native(_) => "native function",
            Value::Handle(_) => "handle",
            other => other.type_tag(),
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(l) => !l.borrow().is_empty(),
            Value::Map(m) => !m.borrow().is_empty(),
            _ => true,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "Int({n})"),
            Value::Float(n) => write!(f, "Float({n})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::List(l) => write!(f, "List({:?})", l.borrow()),
            Value::Map(m) => write!(f, "Map({:?})", m.borrow()),
            Value::Class(c) => write!(f, "Class({})", c.name),
            Value::Instance(i) => write!(f, "Instance({})", i.class.name),
            Value::Closure(c) => write!(f, "Closure({})", c.name),
            Value::BoundMethod(b) => write!(f, "BoundMethod({})", b.method.name),
            Value::Native(n) => write!(f, "Native({})", n.name),
            Value::Handle(_) => write!(f, "Handle(..)"),
        }
    }
}

/// Spec-defined value equality (§4.4 step 3): strings by content, lists and
/// mappings structurally, instances by identity, everything else by the
/// obvious by-value comparison. This is *not* the dunder `__eq__` path —
/// that is checked first, in `crate::interpreter::dispatch`, before this is
/// ever reached.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => *a as f64 == *b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let a = a.borrow();
                let b = b.borrow();
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x == y)
            }
            (Value::Map(a), Value::Map(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let a = a.borrow();
                let b = b.borrow();
                a.len() == b.len() && a.iter().all(|(k, v)| b.get(k).is_some_and(|bv| bv == v))
            }
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::BoundMethod(a), Value::BoundMethod(b)) => {
                Rc::ptr_eq(&a.receiver, &b.receiver) && Rc::ptr_eq(&a.method, &b.method)
            }
            (Value::Handle(a), Value::Handle(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}
