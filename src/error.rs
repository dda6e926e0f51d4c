//! Runtime error types, with a growable call-frame trace attached as errors
//! propagate out of function and method calls.

use thiserror::Error;

#[allow(dead_code)]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeErrorKind {
    #[error("type mismatch in {op}: {message}")]
    TypeMismatch { op: String, message: String },

    #[error("{name}: expected {expected} argument{}, got {actual}", if expected == "1" { "" } else { "s" })]
    ArityMismatch {
        name: String,
        expected: String,
        actual: usize,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("list index {index} out of range (length {length})")]
    IndexOutOfRange { index: i64, length: usize },

    #[error("key {key} not found in mapping")]
    MissingKey { key: String },

    #[error("'{name}' has no attribute '{member}'")]
    UnknownAttribute { name: String, member: String },

    #[error("value of type {type_name} is not iterable")]
    NonIterable { type_name: String },

    #[error("cannot access private member '{member}' from outside its defining instance")]
    PrivateAccessViolation { member: String },

    #[error("mapping keys must be int, str, or bool, got {type_name}")]
    UnhashableKey { type_name: String },

    #[error("failed to import module '{module}': {message}")]
    ImportFailure { module: String, message: String },

    #[error("module '{module}' has no member '{member}'")]
    NoSuchModuleMember { module: String, member: String },

    #[error("value is not callable")]
    NotCallable,

    #[error("use of undefined name '{0}'")]
    UndefinedName(String),

    #[error("{message}")]
    Other { message: String },
}

impl RuntimeErrorKind {
    pub fn type_mismatch(op: impl Into<String>, message: impl Into<String>) -> Self {
        RuntimeErrorKind::TypeMismatch {
            op: op.into(),
            message: message.into(),
        }
    }

    pub fn arity_mismatch(name: impl Into<String>, expected: impl Into<String>, actual: usize) -> Self {
        RuntimeErrorKind::ArityMismatch {
            name: name.into(),
            expected: expected.into(),
            actual,
        }
    }
}

/// One frame of a call-stack trace, innermost call appended last internally
/// but read innermost-first via [`RuntimeError::trace`].
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub file: std::path::PathBuf,
    pub line: usize,
    pub context: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub line: usize,
    pub column: usize,
    trace: Vec<Frame>,
}

impl RuntimeError {
    pub fn new(kind: RuntimeErrorKind, line: usize) -> Self {
        Self {
            kind,
            line,
            column: 1,
            trace: Vec::new(),
        }
    }

    pub fn with_column(mut self, column: usize) -> Self {
        self.column = column;
        self
    }

    /// Prepends a call frame, innermost call first. Mirrors the reference
    /// implementation's trace-building: every user call wraps the error with
    /// its own call site before re-raising.
    pub fn push_frame(&mut self, file: std::path::PathBuf, line: usize, context: String) {
        self.trace.push(Frame { file, line, context });
    }

    pub fn trace(&self) -> &[Frame] {
        &self.trace
    }

    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (line {})", self.kind, self.line)
    }
}

impl std::error::Error for RuntimeError {}
