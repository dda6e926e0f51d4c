//! Two-pass static analyzer: a lexically-scoped name resolver that also
//! walks imported modules transitively (with cycle protection) and flags
//! arity mismatches, unknown base classes, and missing module members —
//! everything §4.3 asks for, before a single statement ever executes.

use crate::ast::{Expr, FuncDef, Program, Stmt};
use crate::config::MODULE_EXTENSION;
use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::lexer::Lexer;
use crate::native::NativeModuleTable;
use crate::parser::Parser;
use crate::value::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Built-in call table (§4.3): arity `None` means "any number of arguments".
const BUILTIN_FUNCTIONS: &[(&str, Option<usize>)] = &[
    ("print", None),
    ("println", None),
    ("input", Some(0)),
    ("to_int", Some(1)),
    ("to_str", Some(1)),
    ("to_float", Some(1)),
    ("type", Some(1)),
];

#[derive(Debug, Clone)]
enum Binding {
    Variable,
    Parameter,
    Function { params: usize },
    NativeFunction,
    BuiltinFunction { params: Option<usize> },
    Class { methods: HashMap<String, usize>, parent: Option<String> },
    Module { exports: HashMap<String, Binding> },
}

type Scope = HashMap<String, Binding>;

pub struct StaticAnalyzer<'a> {
    errors: Vec<Diagnostic>,
    scopes: Vec<Scope>,
    analyzed_files: HashMap<PathBuf, HashMap<String, Binding>>,
    current_file: PathBuf,
    native_modules: &'a NativeModuleTable,
}

impl<'a> StaticAnalyzer<'a> {
    pub fn new(native_modules: &'a NativeModuleTable) -> Self {
        Self {
            errors: Vec::new(),
            scopes: Vec::new(),
            analyzed_files: HashMap::new(),
            current_file: PathBuf::new(),
            native_modules,
        }
    }

    /// Analyzes the top-level program rooted at `file_path`, returning a
    /// deduplicated, ordered list of semantic (and module-load syntax)
    /// diagnostics.
    pub fn analyze(mut self, program: &Program, file_path: impl AsRef<Path>) -> Vec<Diagnostic> {
        self.current_file = file_path.as_ref().to_path_buf();
        self.enter_scope();
        self.analyze_program(program);
        self.exit_scope();
        self.errors
    }

    fn enter_scope(&mut self) {
        self.scopes.push(Scope::new());
    }

    fn exit_scope(&mut self) {
        self.scopes.pop();
    }

    fn define(&mut self, name: &str, binding: Binding) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), binding);
        }
    }

    fn find(&self, name: &str) -> Option<&Binding> {
        self.scopes.iter().rev().find_map(|s| s.get(name))
    }

    fn add_error(&mut self, message: impl Into<String>, line: usize, kind: DiagnosticKind) {
        let message = message.into();
        let path = self.current_file.clone();
        let already = self
            .errors
            .iter()
            .any(|d| d.message == message && d.line == line && d.path == path);
        if !already {
            self.errors.push(Diagnostic::new(path, line, 1, kind, message));
        }
    }

    fn analyze_program(&mut self, program: &Program) {
        for (name, params) in BUILTIN_FUNCTIONS {
            self.define(name, Binding::BuiltinFunction { params: *params });
        }
        for stmt in &program.statements {
            self.pre_pass(stmt);
        }
        for stmt in &program.statements {
            self.visit_stmt(stmt);
        }
    }

    /// Hoists definitions visible for the rest of the current block (§4.3):
    /// functions/classes record arity, first assignment declares a
    /// variable, and imports trigger (recursive) module analysis.
    fn pre_pass(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::FuncDef(f) => {
                if self.find(&f.name).is_some() {
                    self.add_error(
                        format!("redefinition of existing function or variable '{}'", f.name),
                        f.line,
                        DiagnosticKind::Semantic,
                    );
                }
                self.define(&f.name, Binding::Function { params: f.params.len() });
            }
            Stmt::ClassDef { name, parent, methods, line } => {
                if self.find(name).is_some() {
                    self.add_error(
                        format!("redefinition of existing class or variable '{name}'"),
                        *line,
                        DiagnosticKind::Semantic,
                    );
                }
                let mut method_arities = HashMap::new();
                for m in methods {
                    method_arities.insert(m.name.clone(), m.params.len());
                }
                self.define(
                    name,
                    Binding::Class { methods: method_arities, parent: parent.clone() },
                );
            }
            Stmt::Assign { name, .. } => {
                if self.find(name).is_none() {
                    self.define(name, Binding::Variable);
                }
            }
            Stmt::Import(name, line) => {
                let dir = self
                    .current_file
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_default();
                if let Some(exports) = self.resolve_module(name, &dir, *line) {
                    self.define(name, Binding::Module { exports });
                }
            }
            _ => {}
        }
    }

    fn resolve_module(
        &mut self,
        module_name: &str,
        dir: &Path,
        line: usize,
    ) -> Option<HashMap<String, Binding>> {
        if let Some(Value::Map(m)) = self.native_modules.get(module_name) {
            let exports = m
                .borrow()
                .keys()
                .map(|k| (k.to_string(), Binding::NativeFunction))
                .collect();
            return Some(exports);
        }

        let module_path = dir.join(format!("{module_name}.{MODULE_EXTENSION}"));
        if !module_path.exists() {
            self.add_error(
                format!("could not find module '{module_name}'"),
                line,
                DiagnosticKind::Semantic,
            );
            return None;
        }
        let abs_path = std::fs::canonicalize(&module_path).unwrap_or(module_path.clone());

        if let Some(cached) = self.analyzed_files.get(&abs_path) {
            return Some(cached.clone());
        }
        // Seed the cycle-break entry before recursing: a re-entrant import
        // of this same module sees an empty export set, never a hang.
        self.analyzed_files.insert(abs_path.clone(), HashMap::new());

        let src = match std::fs::read_to_string(&module_path) {
            Ok(s) => s,
            Err(e) => {
                self.add_error(
                    format!("failed to read module '{module_name}': {e}"),
                    line,
                    DiagnosticKind::Semantic,
                );
                return None;
            }
        };
        let tokens = Lexer::new(&src).tokenize();
        let (module_ast, parse_errors) = Parser::new(&tokens, &abs_path).parse();
        if !parse_errors.is_empty() {
            self.errors.extend(parse_errors);
            return Some(HashMap::new());
        }

        let exports = self.analyze_module(&module_ast, &abs_path);
        self.analyzed_files.insert(abs_path, exports.clone());
        Some(exports)
    }

    /// Analyzes a module's AST in a fresh, isolated scope stack and returns
    /// its top-level bindings as the module's export set.
    fn analyze_module(&mut self, module_ast: &Program, module_path: &Path) -> HashMap<String, Binding> {
        let saved_scopes = std::mem::take(&mut self.scopes);
        let saved_file = std::mem::replace(&mut self.current_file, module_path.to_path_buf());

        self.enter_scope();
        self.analyze_program(module_ast);
        let exports = self.scopes.first().cloned().unwrap_or_default();
        self.exit_scope();

        self.scopes = saved_scopes;
        self.current_file = saved_file;
        exports
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Print(args, line) | Stmt::Println(args, line) => {
                for a in args {
                    self.visit_expr(a, *line);
                }
            }
            Stmt::Import(..) => {}
            Stmt::FuncDef(f) => self.visit_func_def(f),
            Stmt::ClassDef { parent, methods, line, .. } => {
                if let Some(pname) = parent {
                    match self.find(pname) {
                        Some(Binding::Class { .. }) => {}
                        _ => self.add_error(
                            format!("base class '{pname}' not found or is not a class"),
                            *line,
                            DiagnosticKind::Semantic,
                        ),
                    }
                }
                for m in methods {
                    self.visit_func_def(m);
                }
            }
            Stmt::Return(expr, line) => {
                if let Some(e) = expr {
                    self.visit_expr(e, *line);
                }
            }
            Stmt::If { clauses, else_body, line } => {
                for (cond, body) in clauses {
                    self.visit_expr(cond, *line);
                    self.enter_scope();
                    for s in body {
                        self.visit_stmt(s);
                    }
                    self.exit_scope();
                }
                if let Some(body) = else_body {
                    self.enter_scope();
                    for s in body {
                        self.visit_stmt(s);
                    }
                    self.exit_scope();
                }
            }
            Stmt::While { cond, body, line } => {
                self.visit_expr(cond, *line);
                self.enter_scope();
                for s in body {
                    self.visit_stmt(s);
                }
                self.exit_scope();
            }
            Stmt::For { var, iter, body, line } => {
                self.visit_expr(iter, *line);
                self.enter_scope();
                self.define(var, Binding::Variable);
                for s in body {
                    self.visit_stmt(s);
                }
                self.exit_scope();
            }
            Stmt::TryExcept { try_body, err_var, except_body, .. } => {
                self.enter_scope();
                for s in try_body {
                    self.visit_stmt(s);
                }
                self.exit_scope();
                self.enter_scope();
                if let Some(v) = err_var {
                    self.define(v, Binding::Variable);
                }
                for s in except_body {
                    self.visit_stmt(s);
                }
                self.exit_scope();
            }
            Stmt::Assign { name, value, line } => {
                self.visit_expr(value, *line);
                self.define(name, Binding::Variable);
            }
            Stmt::IndexAssign { object, index, value, line } => {
                self.visit_expr(object, *line);
                self.visit_expr(index, *line);
                self.visit_expr(value, *line);
            }
            Stmt::MemberAssign { object, value, line, .. } => {
                self.visit_expr(object, *line);
                self.visit_expr(value, *line);
            }
            Stmt::Expr(e, line) => self.visit_expr(e, *line),
        }
    }

    fn visit_func_def(&mut self, f: &FuncDef) {
        self.enter_scope();
        for p in &f.params {
            self.define(p, Binding::Parameter);
        }
        for s in &f.body {
            self.visit_stmt(s);
        }
        self.exit_scope();
    }

    fn visit_expr(&mut self, expr: &Expr, line: usize) {
        match expr {
            Expr::Var(name) => {
                if self.find(name).is_none() {
                    self.add_error(
                        format!("use of undefined name '{name}'"),
                        line,
                        DiagnosticKind::Semantic,
                    );
                }
            }
            Expr::Call { callee, args, line } => {
                self.visit_expr(callee, *line);
                for a in args {
                    self.visit_expr(a, *line);
                }
                self.check_call(callee, args.len(), *line);
            }
            Expr::MemberAccess { object, member, line } => {
                self.visit_expr(object, *line);
                if let Expr::Var(module_name) = object.as_ref() {
                    if let Some(Binding::Module { exports }) = self.find(module_name) {
                        if !exports.contains_key(member) {
                            self.add_error(
                                format!("module '{module_name}' has no member '{member}'"),
                                *line,
                                DiagnosticKind::Semantic,
                            );
                        }
                    }
                }
            }
            Expr::BinOp { left, right, line, .. } | Expr::LogicalOp { left, right, line, .. } => {
                self.visit_expr(left, *line);
                self.visit_expr(right, *line);
            }
            Expr::Unary { expr, line, .. } => self.visit_expr(expr, *line),
            Expr::ToInt(e) | Expr::ToFloat(e) | Expr::ToStr(e) | Expr::TypeOf(e) => {
                self.visit_expr(e, line);
            }
            Expr::List(items) => {
                for item in items {
                    self.visit_expr(item, line);
                }
            }
            Expr::Dict(pairs) => {
                for (k, v) in pairs {
                    self.visit_expr(k, line);
                    self.visit_expr(v, line);
                }
            }
            Expr::IndexAccess { object, index, line } => {
                self.visit_expr(object, *line);
                self.visit_expr(index, *line);
            }
            Expr::Int(_) | Expr::Float(_) | Expr::Str(_) | Expr::Bool(_) | Expr::Input => {}
        }
    }

    fn check_call(&mut self, callee: &Expr, argc: usize, line: usize) {
        match callee {
            Expr::Var(name) => {
                let Some(info) = self.find(name).cloned() else {
                    return;
                };
                match info {
                    Binding::Function { params } => {
                        if params != argc {
                            self.add_error(
                                format!("function '{name}' expects {params} arguments, got {argc}"),
                                line,
                                DiagnosticKind::Semantic,
                            );
                        }
                    }
                    Binding::BuiltinFunction { params: Some(expected) } => {
                        if expected != argc {
                            self.add_error(
                                format!("'{name}' expects {expected} arguments, got {argc}"),
                                line,
                                DiagnosticKind::Semantic,
                            );
                        }
                    }
                    Binding::BuiltinFunction { params: None } => {}
                    Binding::NativeFunction => {}
                    Binding::Class { methods, .. } => {
                        if let Some(ctor_params) = methods.get("__main__") {
                            let expected = ctor_params.saturating_sub(1);
                            if expected != argc {
                                self.add_error(
                                    format!(
                                        "constructor for class '{name}' expects {expected} arguments, got {argc}"
                                    ),
                                    line,
                                    DiagnosticKind::Semantic,
                                );
                            }
                        } else if argc > 0 {
                            self.add_error(
                                format!("class '{name}' has no constructor to accept arguments"),
                                line,
                                DiagnosticKind::Semantic,
                            );
                        }
                    }
                    Binding::Variable | Binding::Parameter | Binding::Module { .. } => {
                        self.add_error(
                            format!("attempt to call non-function and non-class '{name}'"),
                            line,
                            DiagnosticKind::Semantic,
                        );
                    }
                }
            }
            Expr::MemberAccess { object, member, .. } => {
                let Expr::Var(module_name) = object.as_ref() else {
                    return;
                };
                let Some(Binding::Module { exports }) = self.find(module_name) else {
                    return;
                };
                let Some(member_info) = exports.get(member) else {
                    return; // already reported by visit_expr's member-access check
                };
                match member_info {
                    Binding::Function { params } => {
                        if *params != argc {
                            self.add_error(
                                format!(
                                    "function '{module_name}.{member}' expects {params} arguments, got {argc}"
                                ),
                                line,
                                DiagnosticKind::Semantic,
                            );
                        }
                    }
                    Binding::NativeFunction => {}
                    _ => {
                        self.add_error(
                            format!("attempt to call non-function '{module_name}.{member}'"),
                            line,
                            DiagnosticKind::Semantic,
                        );
                    }
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn analyze_src(src: &str) -> Vec<Diagnostic> {
        let tokens = Lexer::new(src).tokenize();
        let (program, parse_errors) = Parser::new(&tokens, "main.willow").parse();
        assert!(parse_errors.is_empty(), "unexpected parse errors: {parse_errors:?}");
        let table = NativeModuleTable::new();
        StaticAnalyzer::new(&table).analyze(&program, "main.willow")
    }

    #[test]
    fn undefined_variable_is_reported() {
        let errs = analyze_src("println(x)");
        assert_eq!(errs.len(), 1);
        assert!(errs[0].message.contains('x'));
    }

    #[test]
    fn defined_before_use_is_fine() {
        let errs = analyze_src("x = 1\nprintln(x)");
        assert!(errs.is_empty());
    }

    #[test]
    fn function_hoisted_so_forward_reference_is_fine() {
        let errs = analyze_src("println(f())\nfunction f() do return 1 end");
        assert!(errs.is_empty());
    }

    #[test]
    fn wrong_arity_call_is_reported() {
        let errs = analyze_src("function f(a) do return a end\nf(1, 2)");
        assert_eq!(errs.len(), 1);
        assert!(errs[0].message.contains("expects 1"));
    }

    #[test]
    fn redefinition_is_reported_but_does_not_abort() {
        let errs = analyze_src("function f() do return 1 end\nfunction f() do return 2 end\nprintln(f())");
        assert_eq!(errs.len(), 1);
        assert!(errs[0].message.contains("redefinition"));
    }

    #[test]
    fn unknown_base_class_is_reported() {
        let errs = analyze_src("class C(Missing) do function __main__(self) do return 0 end end");
        assert_eq!(errs.len(), 1);
        assert!(errs[0].message.contains("Missing"));
    }

    #[test]
    fn constructor_arity_checked() {
        let errs =
            analyze_src("class C do function __main__(self, a) do self.__a = a end end\nC()");
        assert_eq!(errs.len(), 1);
        assert!(errs[0].message.contains("expects 1"));
    }

    #[test]
    fn loop_and_for_variables_are_scoped_but_visible_in_body() {
        let errs = analyze_src("for i in [1, 2, 3] do println(i) end");
        assert!(errs.is_empty());
    }

    #[test]
    fn missing_module_member_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let main_path = dir.path().join("main.willow");
        let mod_path = dir.path().join("helper.willow");
        std::fs::write(&mod_path, "function greet() do return 1 end").unwrap();
        let src = "import \"helper\"\nprintln(helper.missing())";
        std::fs::write(&main_path, src).unwrap();

        let tokens = Lexer::new(src).tokenize();
        let (program, parse_errors) = Parser::new(&tokens, &main_path).parse();
        assert!(parse_errors.is_empty());
        let table = NativeModuleTable::new();
        let errs = StaticAnalyzer::new(&table).analyze(&program, &main_path);
        assert_eq!(errs.len(), 1);
        assert!(errs[0].message.contains("missing"));
    }

    #[test]
    fn import_cycle_terminates_and_both_export() {
        let dir = tempfile::tempdir().unwrap();
        let a_path = dir.path().join("a.willow");
        let b_path = dir.path().join("b.willow");
        std::fs::write(&a_path, "import \"b\"\nfunction fa() do return 1 end").unwrap();
        std::fs::write(&b_path, "import \"a\"\nfunction fb() do return 2 end").unwrap();

        let src = std::fs::read_to_string(&a_path).unwrap();
        let tokens = Lexer::new(&src).tokenize();
        let (program, parse_errors) = Parser::new(&tokens, &a_path).parse();
        assert!(parse_errors.is_empty());
        let table = NativeModuleTable::new();
        let errs = StaticAnalyzer::new(&table).analyze(&program, &a_path);
        assert!(errs.is_empty(), "unexpected diagnostics: {errs:?}");
    }
}
