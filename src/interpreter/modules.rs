//! Runtime module resolution (§4.5).
//!
//! Lookup order: the module cache (keyed by name, not path); then the
//! host-registered native-module table; then a pluggable native-extension
//! found by walking up from the importing file's directory for an
//! `extensions/<name>` marker; then a `name.willow` file resolved relative
//! to the importing file's directory, with cycle detection via a
//! currently-importing set of absolute paths. A cycle seeds the cache with
//! an empty mapping before the recursive execution starts, so a re-entrant
//! `A.foo` lookup during the cycle resolves to "no such module member"
//! rather than hanging or panicking.

use super::{exec_block, Flow, Interpreter};
use crate::config::MODULE_EXTENSION;
use crate::env::Environment;
use crate::error::{RuntimeError, RuntimeErrorKind};
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::value::{Key, Map, Value};
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub fn ensure_imported(
    interp: &Interpreter,
    name: &str,
    importing_file: &Rc<PathBuf>,
    line: usize,
) -> Result<Value, RuntimeError> {
    if let Some(cached) = interp.modules.borrow().get(name) {
        return Ok(cached.clone());
    }

    if let Some(module_value) = interp.native_modules.get(name) {
        interp.modules.borrow_mut().insert(name.to_string(), module_value.clone());
        return Ok(module_value);
    }

    let dir = importing_file.parent().unwrap_or_else(|| Path::new("."));

    if find_extension_marker(dir, name).is_some() {
        if let Some(provider) = interp.native_modules.extension(name) {
            let module_value = provider();
            interp.modules.borrow_mut().insert(name.to_string(), module_value.clone());
            return Ok(module_value);
        }
    }

    let path = dir.join(format!("{name}.{MODULE_EXTENSION}"));
    if !path.exists() {
        return Err(RuntimeError::new(
            RuntimeErrorKind::ImportFailure {
                module: name.to_string(),
                message: format!("could not find module file '{}'", path.display()),
            },
            line,
        ));
    }
    let abs = path.canonicalize().unwrap_or(path.clone());

    if interp.importing.borrow().contains(&abs) {
        let placeholder = Value::map(Map::new());
        interp.modules.borrow_mut().insert(name.to_string(), placeholder.clone());
        return Ok(placeholder);
    }

    let source = std::fs::read_to_string(&path).map_err(|e| {
        RuntimeError::new(
            RuntimeErrorKind::ImportFailure { module: name.to_string(), message: e.to_string() },
            line,
        )
    })?;

    interp.modules.borrow_mut().insert(name.to_string(), Value::map(Map::new()));
    interp.importing.borrow_mut().insert(abs.clone());

    let tokens = Lexer::new(&source).tokenize();
    let (program, diagnostics) = Parser::new(&tokens, &path).parse();
    if let Some(first) = diagnostics.first() {
        interp.importing.borrow_mut().remove(&abs);
        return Err(RuntimeError::new(
            RuntimeErrorKind::ImportFailure { module: name.to_string(), message: first.message.clone() },
            line,
        ));
    }

    let module_env = Environment::new();
    let module_file = Rc::new(path.clone());
    let result = exec_block(interp, &module_env, &program.statements, &module_file);
    interp.importing.borrow_mut().remove(&abs);

    match result {
        Ok(Flow::Normal) | Ok(Flow::Return(_)) => {
            let mut map = Map::new();
            for (k, v) in module_env.snapshot() {
                map.insert(Key::Str(k.into()), v);
            }
            let value = Value::map(map);
            interp.modules.borrow_mut().insert(name.to_string(), value.clone());
            Ok(value)
        }
        Err(mut e) => {
            e.push_frame((*module_file).clone(), line, format!("module '{name}'"));
            Err(e)
        }
    }
}

/// Walks up from `start` looking for an `extensions/<name>` marker (file or
/// directory, either works — the core only cares whether the host's
/// extension lives at this point in the tree, not what shape it takes on
/// disk). Returns the first directory along the way that has one.
fn find_extension_marker(start: &Path, name: &str) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(d) = dir {
        let marker = d.join("extensions").join(name);
        if marker.exists() {
            return Some(marker);
        }
        dir = d.parent();
    }
    None
}
