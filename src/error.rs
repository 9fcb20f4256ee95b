use std::fmt::{Display, Formatter};
use thiserror::Error;

/// Static error categories raised while translating an AST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidStatement,
    UndeclaredVariable,
    UndeclaredFunction,
    TooFewArguments,
    TooManyArguments,
    AssignToArgument,
    AssignToConstantTwice,
    DuplicateDeclaration,
    InvalidSlot,
    /// A broken translator invariant, not a problem in the input program.
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidStatement => "InvalidStatement",
            ErrorKind::UndeclaredVariable => "UndeclaredVariable",
            ErrorKind::UndeclaredFunction => "UndeclaredFunction",
            ErrorKind::TooFewArguments => "TooFewArguments",
            ErrorKind::TooManyArguments => "TooManyArguments",
            ErrorKind::AssignToArgument => "AssignToArgument",
            ErrorKind::AssignToConstantTwice => "AssignToConstantTwice",
            ErrorKind::DuplicateDeclaration => "DuplicateDeclaration",
            ErrorKind::InvalidSlot => "InvalidSlot",
            ErrorKind::Internal => "Internal",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A translation failure. Aborts the whole compilation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct CompileError {
    pub kind: ErrorKind,
    pub message: String,
}

impl CompileError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

pub type CompileResult<T> = Result<T, CompileError>;

/// Early-return a [`CompileError`] of the given kind, `bail!`-style.
macro_rules! compile_bail {
    ($kind:ident, $($arg:tt)*) => {
        return Err($crate::error::CompileError::new(
            $crate::error::ErrorKind::$kind,
            format!($($arg)*),
        ))
    };
}

pub(crate) use compile_bail;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_kind_and_message() {
        let err = CompileError::new(
            ErrorKind::UndeclaredFunction,
            "Function 'foo' is not declared.",
        );
        assert_eq!(
            err.to_string(),
            "UndeclaredFunction: Function 'foo' is not declared."
        );
    }

    #[test]
    fn bail_macro_returns_typed_error() {
        fn fails() -> CompileResult<()> {
            compile_bail!(TooFewArguments, "expected {} got {}", 2, 1);
        }
        let err = fails().unwrap_err();
        assert_eq!(err.kind, ErrorKind::TooFewArguments);
        assert_eq!(err.message, "expected 2 got 1");
    }

    #[test]
    fn internal_failures_are_labelled() {
        let err = CompileError::new(ErrorKind::Internal, "Link target 'x' was never emitted.");
        assert!(err.to_string().starts_with("Internal: "));
    }
}
