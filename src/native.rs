//! The native-module extension seam (§6): a host-supplied table mapping
//! module name → symbol name → callable. The core never runs anything that
//! didn't arrive through this table or through source-language functions —
//! it has no other way to call into foreign code.

use crate::error::RuntimeErrorKind;
use crate::value::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

pub type NativeResult = Result<Value, RuntimeErrorKind>;

/// A single host-provided function: takes the evaluated argument vector,
/// returns a value or a runtime-error kind (the call site attaches line
/// information and, on propagation, the call-frame trace).
#[derive(Clone)]
pub struct NativeCallable {
    pub name: Rc<str>,
    pub func: Rc<dyn Fn(&[Value]) -> NativeResult>,
}

impl NativeCallable {
    pub fn new(name: impl Into<Rc<str>>, func: impl Fn(&[Value]) -> NativeResult + 'static) -> Self {
        Self {
            name: name.into(),
            func: Rc::new(func),
        }
    }

    pub fn call(&self, args: &[Value]) -> NativeResult {
        (self.func)(args)
    }
}

impl fmt::Debug for NativeCallable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeCallable({})", self.name)
    }
}

/// A native module is exposed to the language as an ordinary mapping from
/// symbol name to a native-callable value — so `member_access`/`func_call`
/// on a native module go through exactly the same code path as any other
/// `dict`, per §4.5's "module and map share a representation" rule.
pub fn native_module_value(members: Vec<(&str, NativeCallable)>) -> Value {
    let mut map = Map::new();
    for (name, callable) in members {
        map.insert(crate::value::Key::Str(name.into()), Value::Native(callable));
    }
    Value::map(map)
}

/// A pluggable native-extension's entry point (§4.5 step 3): a zero-argument
/// provider the host registers under a module name, invoked only once an
/// `extensions/<name>` marker is actually found on disk while walking up
/// from the importing file. This is the seam's Rust-native stand-in for the
/// reference implementation's `get_module()` hook on a dynamically loaded
/// extension file — the core never opens or links a shared library itself,
/// it only calls back into whatever the host already wired up for that name.
pub type ExtensionProvider = Rc<dyn Fn() -> Value>;

/// The table the host registers before running any source. Keyed by module
/// name; looked up by `import "name"` before the core tries to resolve a
/// `.dark`-equivalent source file on disk.
#[derive(Default)]
pub struct NativeModuleTable {
    modules: HashMap<String, Value>,
    extensions: HashMap<String, ExtensionProvider>,
}

impl NativeModuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, members: Vec<(&str, NativeCallable)>) {
        self.modules.insert(name.into(), native_module_value(members));
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.modules.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    /// Registers a native-extension provider under `name`, reachable only
    /// through the `extensions` directory discovery walk (§4.5 step 3), not
    /// through a plain `import "name"` the way [`Self::register`] entries are.
    pub fn register_extension(&mut self, name: impl Into<String>, provider: impl Fn() -> Value + 'static) {
        self.extensions.insert(name.into(), Rc::new(provider));
    }

    pub fn extension(&self, name: &str) -> Option<&ExtensionProvider> {
        self.extensions.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_module_looks_up_as_a_map_value() {
        let mut table = NativeModuleTable::new();
        table.register(
            "math",
            vec![("double", NativeCallable::new("double", |args| match args {
                [Value::Int(n)] => Ok(Value::Int(n * 2)),
                _ => Err(RuntimeErrorKind::arity_mismatch("math.double", "1", args.len())),
            }))],
        );
        assert!(table.contains("math"));
        let module = table.get("math").unwrap();
        match module {
            Value::Map(m) => assert!(m.borrow().contains_key(&crate::value::Key::Str("double".into()))),
            _ => panic!("expected map"),
        }
    }

    #[test]
    fn unregistered_module_is_absent() {
        let table = NativeModuleTable::new();
        assert!(!table.contains("nope"));
        assert!(table.get("nope").is_none());
    }

    #[test]
    fn extension_provider_is_separate_from_the_plain_module_table() {
        let mut table = NativeModuleTable::new();
        table.register_extension("gfx", || native_module_value(vec![(
            "version",
            NativeCallable::new("version", |_| Ok(Value::Int(1))),
        )]));
        assert!(!table.contains("gfx"));
        let provider = table.extension("gfx").expect("extension registered");
        match provider() {
            Value::Map(m) => assert!(m.borrow().contains_key(&crate::value::Key::Str("version".into()))),
            _ => panic!("expected map"),
        }
    }
}
