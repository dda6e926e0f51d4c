//! User-defined classes: descriptors, instances, and single-inheritance
//! method resolution.

use crate::value::Closure;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// A class descriptor: name, optional single base class, and its own
/// methods. `find_method` walks to the base class on a miss, so the
/// descriptor itself never needs to flatten inherited methods in.
#[derive(Debug)]
pub struct Class {
    pub name: String,
    pub base: Option<Rc<Class>>,
    pub methods: HashMap<String, Rc<Closure>>,
}

impl Class {
    pub fn new(name: String, base: Option<Rc<Class>>, methods: HashMap<String, Rc<Closure>>) -> Self {
        Self { name, base, methods }
    }

    /// First hit wins: own methods before the base class's.
    pub fn find_method(&self, name: &str) -> Option<Rc<Closure>> {
        if let Some(m) = self.methods.get(name) {
            return Some(m.clone());
        }
        self.base.as_ref()?.find_method(name)
    }
}

/// A live object: a reference to its class plus a mutable field map.
/// Fields spring into existence on first assignment (`instance.field = v`).
#[derive(Debug)]
pub struct Instance {
    pub class: Rc<Class>,
    pub fields: RefCell<HashMap<String, crate::value::Value>>,
}

impl Instance {
    pub fn new(class: Rc<Class>) -> Self {
        Self {
            class,
            fields: RefCell::new(HashMap::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_closure(name: &str) -> Rc<Closure> {
        Rc::new(Closure {
            name: name.to_string(),
            params: vec![],
            body: Rc::new(vec![]),
            snapshot: HashMap::new(),
            file: Rc::new(std::path::PathBuf::from("<test>")),
        })
    }

    #[test]
    fn find_method_checks_own_methods_first() {
        let mut methods = HashMap::new();
        methods.insert("greet".to_string(), empty_closure("greet"));
        let class = Class::new("C".to_string(), None, methods);
        assert!(class.find_method("greet").is_some());
        assert!(class.find_method("missing").is_none());
    }

    #[test]
    fn find_method_falls_back_to_base_class() {
        let mut base_methods = HashMap::new();
        base_methods.insert("greet".to_string(), empty_closure("greet"));
        let base = Rc::new(Class::new("Base".to_string(), None, base_methods));

        let child = Class::new("Child".to_string(), Some(base), HashMap::new());
        assert!(child.find_method("greet").is_some());
        assert!(child.find_method("nope").is_none());
    }

    #[test]
    fn own_method_shadows_base_method() {
        let mut base_methods = HashMap::new();
        base_methods.insert("greet".to_string(), empty_closure("base_greet"));
        let base = Rc::new(Class::new("Base".to_string(), None, base_methods));

        let mut child_methods = HashMap::new();
        child_methods.insert("greet".to_string(), empty_closure("child_greet"));
        let child = Class::new("Child".to_string(), Some(base), child_methods);

        assert_eq!(child.find_method("greet").unwrap().name, "child_greet");
    }
}
