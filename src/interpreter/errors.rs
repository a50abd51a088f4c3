use super::value::Value;
use crate::modules::ModuleError;
use crate::parser::ParseError;
use crate::tokenizer::{LexError, Position};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Failures raised by the evaluator and the native built-ins.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("undefined variable '{0}'")]
    UndefinedVariable(String),
    #[error("cannot reassign constant '{0}'")]
    ConstantReassignment(String),
    #[error("type error: {0}")]
    TypeError(String),
    #[error("{0}")]
    ArgumentError(String),
    #[error("index {index} out of range for length {length}")]
    IndexOutOfRange { index: i64, length: usize },
    #[error("division by zero")]
    DivisionByZero,
    #[error("'{0}' is not a function")]
    NotCallable(String),
    #[error("{name} expects {expected} argument(s), got {found}")]
    Arity {
        name: String,
        expected: String,
        found: usize,
    },
    #[error("'{0}' is not a class")]
    NotAClass(String),
    #[error("cannot access property '{property}' of {type_name}")]
    PropertyAccess { property: String, type_name: String },
    #[error("maximum call depth of {0} exceeded")]
    CallDepthExceeded(usize),
    #[error("I/O error: {0}")]
    Io(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("module error: {0}")]
    Module(String),
    #[error("opekha timed out after {0} ms")]
    Timeout(u64),
    #[error("{0}")]
    Custom(String),
}

impl RuntimeError {
    pub fn type_error(message: impl Into<String>) -> Self {
        RuntimeError::TypeError(message.into())
    }

    pub fn argument(message: impl Into<String>) -> Self {
        RuntimeError::ArgumentError(message.into())
    }
}

impl From<std::io::Error> for RuntimeError {
    fn from(value: std::io::Error) -> Self {
        RuntimeError::Io(value.to_string())
    }
}

/// A value travelling up the stack through `felo`, a runtime error or a
/// rejected promise. Runtime errors carry their message as the thrown value.
#[derive(Debug, Clone)]
pub struct Thrown {
    pub value: Value,
    pub error: Option<RuntimeError>,
    pub position: Option<Position>,
    pub file: Option<PathBuf>,
}

impl Thrown {
    pub fn value(value: Value) -> Self {
        Self {
            value,
            error: None,
            position: None,
            file: None,
        }
    }

    pub fn message(&self) -> String {
        match &self.error {
            Some(error) => error.to_string(),
            None => self.value.to_string(),
        }
    }
}

/// Non-local control flow. Everything except `Exit` is caught by some
/// enclosing construct: loops take Break/Continue, calls take Return and
/// `chesta` takes Throw.
#[derive(Debug, Clone)]
pub enum Control {
    Return(Value),
    Break,
    Continue,
    Throw(Box<Thrown>),
    Exit(i32),
}

impl Control {
    pub fn throw(value: Value) -> Self {
        Control::Throw(Box::new(Thrown::value(value)))
    }

    /// Attaches a source location unless a more precise one is already set.
    pub fn located(self, position: Position, file: impl FnOnce() -> Option<PathBuf>) -> Self {
        match self {
            Control::Throw(mut thrown) => {
                if thrown.position.is_none() {
                    thrown.position = Some(position);
                    thrown.file = file();
                }
                Control::Throw(thrown)
            }
            other => other,
        }
    }
}

impl From<RuntimeError> for Control {
    fn from(error: RuntimeError) -> Self {
        Control::Throw(Box::new(Thrown {
            value: Value::String(error.to_string()),
            error: Some(error),
            position: None,
            file: None,
        }))
    }
}

pub type EvalResult<T = Value> = Result<T, Control>;

//=============================================
//            Diagnostics
//=============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Syntax,
    ModuleResolution,
    TypeMismatch,
    InvalidOperation,
    RuntimePanic,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Syntax => "E001",
            ErrorCode::ModuleResolution => "E002",
            ErrorCode::TypeMismatch => "E003",
            ErrorCode::InvalidOperation => "E004",
            ErrorCode::RuntimePanic => "E005",
        }
    }
}

/// A fatal, user-facing failure of a script run.
#[derive(Debug, Clone)]
pub struct ScriptError {
    pub code: ErrorCode,
    pub message: String,
    pub file: Option<PathBuf>,
    pub position: Option<Position>,
}

impl ScriptError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            file: None,
            position: None,
        }
    }

    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        if self.file.is_none() {
            self.file = Some(file.into());
        }
        self
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    /// Converts an uncaught throw that reached the top of a script.
    pub fn from_thrown(thrown: &Thrown) -> Self {
        let (code, message) = match &thrown.error {
            Some(error) => (runtime_error_code(error), error.to_string()),
            None => (
                ErrorCode::RuntimePanic,
                format!("uncaught {}", thrown.value),
            ),
        };
        Self {
            code,
            message,
            file: thrown.file.clone(),
            position: thrown.position,
        }
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error[{}]: ", self.code_str())?;
        match (&self.file, &self.position) {
            (Some(file), Some(pos)) => write!(f, "{}:{}:{}: ", file.display(), pos.line, pos.column)?,
            (Some(file), None) => write!(f, "{}: ", file.display())?,
            (None, Some(pos)) => write!(f, "{}:{}: ", pos.line, pos.column)?,
            (None, None) => {}
        }
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ScriptError {}

impl From<ParseError> for ScriptError {
    fn from(value: ParseError) -> Self {
        let position = value.position();
        let message = match &value {
            ParseError::UnexpectedToken {
                expected, found, ..
            } => format!("expected {}, found {}", expected, found),
            ParseError::UnexpectedEndOfInput { expected, .. } => {
                format!("unexpected end of input, expected {}", expected)
            }
            ParseError::InvalidSyntax { message, .. } => message.clone(),
            ParseError::Lex(err) => lex_message(err),
        };
        Self {
            code: ErrorCode::Syntax,
            message,
            file: None,
            position: Some(position),
        }
    }
}

impl From<LexError> for ScriptError {
    fn from(value: LexError) -> Self {
        ScriptError::from(ParseError::Lex(value))
    }
}

fn lex_message(err: &LexError) -> String {
    match err {
        LexError::UnexpectedCharacter { character, .. } => {
            format!("unexpected character '{}'", character)
        }
        LexError::UnterminatedString { .. } => "unterminated string".into(),
        LexError::UnterminatedTemplate { .. } => "unterminated template string".into(),
        LexError::UnterminatedComment { .. } => "unterminated block comment".into(),
        LexError::MalformedNumber { lexeme, .. } => format!("malformed number '{}'", lexeme),
    }
}

impl From<ModuleError> for ScriptError {
    fn from(value: ModuleError) -> Self {
        ScriptError::new(ErrorCode::ModuleResolution, value.to_string())
    }
}

impl From<RuntimeError> for ScriptError {
    fn from(value: RuntimeError) -> Self {
        ScriptError::new(runtime_error_code(&value), value.to_string())
    }
}

pub fn runtime_error_code(error: &RuntimeError) -> ErrorCode {
    match error {
        RuntimeError::TypeError(_)
        | RuntimeError::ArgumentError(_)
        | RuntimeError::NotCallable(_)
        | RuntimeError::Arity { .. }
        | RuntimeError::NotAClass(_)
        | RuntimeError::PropertyAccess { .. } => ErrorCode::TypeMismatch,
        RuntimeError::UndefinedVariable(_)
        | RuntimeError::ConstantReassignment(_)
        | RuntimeError::IndexOutOfRange { .. }
        | RuntimeError::DivisionByZero => ErrorCode::InvalidOperation,
        RuntimeError::Module(_) => ErrorCode::ModuleResolution,
        RuntimeError::CallDepthExceeded(_)
        | RuntimeError::Io(_)
        | RuntimeError::Network(_)
        | RuntimeError::Timeout(_)
        | RuntimeError::Custom(_) => ErrorCode::RuntimePanic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_errors_become_thrown_strings() {
        match Control::from(RuntimeError::DivisionByZero) {
            Control::Throw(thrown) => {
                assert_eq!(thrown.value.to_string(), "division by zero");
                assert_eq!(thrown.error, Some(RuntimeError::DivisionByZero));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn located_keeps_innermost_position() {
        let inner = Position::new(4, 2, 0);
        let outer = Position::new(9, 1, 0);
        let control = Control::throw(Value::Null)
            .located(inner, || None)
            .located(outer, || None);
        match control {
            Control::Throw(thrown) => assert_eq!(thrown.position, Some(inner)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn script_error_display_includes_location() {
        let mut err = ScriptError::from(RuntimeError::UndefinedVariable("x".into()));
        err.position = Some(Position::new(3, 5, 0));
        let err = err.with_file("main.bang");
        assert_eq!(
            err.to_string(),
            "error[E004]: main.bang:3:5: undefined variable 'x'"
        );
    }
}
