//! Library surface for the lexer, parser, static analyzer, and interpreter.

pub mod analyzer;
pub mod ast;
pub mod class;
pub mod config;
pub mod diagnostic;
pub mod env;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod native;
pub mod parser;
pub mod token;
pub mod value;

use diagnostic::Diagnostic;
use error::RuntimeError;
use native::NativeModuleTable;
use std::path::Path;

/// Lexes, parses, and statically analyzes a source file without running it.
/// A non-empty result means the source has diagnostics at one of those three
/// stages; an empty result means it would proceed to execution cleanly.
pub fn check(source: &str, path: impl AsRef<Path>) -> Vec<Diagnostic> {
    let path = path.as_ref();
    let tokens = lexer::Lexer::new(source).tokenize();
    let (program, mut diagnostics) = parser::Parser::new(&tokens, path).parse();
    if diagnostics.is_empty() {
        let native_modules = NativeModuleTable::new();
        diagnostics.extend(analyzer::StaticAnalyzer::new(&native_modules).analyze(&program, path));
    }
    diagnostics
}

/// Runs a source file's program against a host-supplied native-module
/// table. Returns the lex/parse/analyzer diagnostics found before any
/// statement ran, or the runtime error (if any) from execution.
pub fn run_source(
    source: &str,
    path: impl AsRef<Path>,
    native_modules: &NativeModuleTable,
) -> Result<Vec<Diagnostic>, RuntimeError> {
    let path = path.as_ref();
    let tokens = lexer::Lexer::new(source).tokenize();
    let (program, mut diagnostics) = parser::Parser::new(&tokens, path).parse();
    if !diagnostics.is_empty() {
        return Ok(diagnostics);
    }

    diagnostics.extend(analyzer::StaticAnalyzer::new(native_modules).analyze(&program, path));
    if !diagnostics.is_empty() {
        return Ok(diagnostics);
    }

    let interp = interpreter::Interpreter::new(native_modules);
    interp.run(&program, path)?;
    Ok(Vec::new())
}

pub fn run_file(path: impl AsRef<Path>, native_modules: &NativeModuleTable) -> std::io::Result<Result<Vec<Diagnostic>, RuntimeError>> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path)?;
    Ok(run_source(&source, path, native_modules))
}
