//! The runtime environment: a single flat scope of name-to-value bindings.
//!
//! Unlike a parent-chained scope, a closure does not keep a live link to the
//! scope it was defined in. Instead, at the moment a function or method is
//! defined, a by-value copy of the current environment's bindings is taken
//! (the closure's "snapshot", see [`crate::value::Closure`]). Every call then
//! builds a fresh `Environment` seeded from a fresh copy of that snapshot, so
//! concurrent/recursive calls of the same closure never share mutable state
//! through it.

use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub type Bindings = HashMap<String, Value>;

#[derive(Debug, Clone)]
pub struct Environment(Rc<RefCell<Bindings>>);

impl Environment {
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(HashMap::new())))
    }

    /// Builds an environment seeded with the given bindings, e.g. a
    /// closure's captured snapshot copied fresh for one call.
    pub fn from_bindings(bindings: Bindings) -> Self {
        Self(Rc::new(RefCell::new(bindings)))
    }

    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.0.borrow_mut().insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.0.borrow().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.borrow().contains_key(name)
    }

    /// Takes a by-value copy of all current bindings — the snapshot a
    /// closure captures at its point of definition, or the fork a
    /// `try/except` handler runs against.
    pub fn snapshot(&self) -> Bindings {
        self.0.borrow().clone()
    }

    /// Replaces this environment's bindings in place with a forked copy,
    /// used to run a `try/except` handler in an isolated scope: mutations
    /// made while `forked` is live never escape back to `self`'s storage
    /// because `forked` owns an entirely separate `Rc`.
    pub fn fork(&self) -> Environment {
        Environment::from_bindings(self.snapshot())
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
