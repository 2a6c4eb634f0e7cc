use std::fmt;

use emberscript_foundation::errors::Diagnostic;
use thiserror::Error;

/// Compilation failed and an invocation was attempted anyway.
///
/// Only produced by [`Compilation::run`](crate::Compilation::run);
/// [`Compilation::errors`](crate::Compilation::errors) is the non-failing way
/// to get at the same diagnostics. The `Display` form is the concatenation of
/// every surfaced diagnostic, one per line.
#[derive(Debug, Clone)]
pub struct CompilationError {
    pub diagnostics: Vec<Diagnostic>,
}

impl fmt::Display for CompilationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diagnostic) in self.diagnostics.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{diagnostic}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CompilationError {}

/// The invocation request itself was bad: required fields were blank, or the
/// compiled unit has no such class or method.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    #[error("The namespace must not be blank")]
    BlankNamespace,
    #[error("The class must not be blank")]
    BlankClass,
    #[error("The method must not be blank")]
    BlankMethod,
    #[error("Could not find class '{class}' in namespace '{namespace}'")]
    ClassNotFound { namespace: String, class: String },
    /// Also covers a member that exists under the requested name but is not
    /// an invocable method; the two cases collapse on purpose.
    #[error("Could not find method '{method}' in class '{class}' and namespace '{namespace}'")]
    MethodNotFound {
        namespace: String,
        class: String,
        method: String,
    },
}

/// A failure raised from inside the invoked code: argument mismatches that
/// only surface mid-call, arithmetic traps, runaway recursion. These are not
/// part of the engine's designed error taxonomy and pass through unwrapped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvokeError {
    #[error("method expected {expected} argument(s) but was invoked with {got}")]
    ArityMismatch { expected: usize, got: usize },
    #[error("type error: expected `{expected}`, found `{found}`")]
    Mismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("attempt to divide by zero")]
    DivisionByZero,
    #[error("arithmetic overflow")]
    Overflow,
    #[error("call depth limit exceeded")]
    CallDepthExceeded,
    #[error("unresolved native symbol `{0}`")]
    UnresolvedNative(String),
    #[error("malformed image: {0}")]
    Malformed(&'static str),
}

/// Everything [`Compilation::run`](crate::Compilation::run) can fail with.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Compilation(#[from] CompilationError),
    #[error(transparent)]
    Run(#[from] RunError),
    #[error(transparent)]
    Invocation(#[from] InvokeError),
}
