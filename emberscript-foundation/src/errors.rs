mod sink;

use std::fmt;

pub use codespan_reporting::diagnostic::LabelStyle;
pub use codespan_reporting::diagnostic::Severity;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::ColorChoice;
use codespan_reporting::term::termcolor::StandardStream;

pub use sink::*;

use crate::source::SourceFileId;
use crate::source::SourceFileSet;
use crate::source::Span;

/// A label pointing into the source text of a diagnostic's compilation unit.
#[derive(Clone)]
pub struct Label {
    pub style: LabelStyle,
    pub span: Span,
    pub message: String,
}

impl Label {
    pub fn new(style: LabelStyle, span: Span, message: impl Into<String>) -> Self {
        Self {
            style,
            span,
            message: message.into(),
        }
    }

    pub fn primary(span: Span, message: impl Into<String>) -> Self {
        Self::new(LabelStyle::Primary, span, message)
    }

    pub fn secondary(span: Span, message: impl Into<String>) -> Self {
        Self::new(LabelStyle::Secondary, span, message)
    }
}

/// A single compiler-reported issue.
///
/// Diagnostics are data, not control flow; they are collected into sinks and
/// only become an error value when an invocation is attempted against a unit
/// that failed to emit.
#[derive(Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Stable identifier, e.g. `E0101`. Matches across releases so that hosts
    /// can key suppression or telemetry off of it.
    pub code: Option<String>,
    pub message: String,
    pub source_file: SourceFileId,
    /// Set when a warning has been escalated to an error by compiler options.
    pub warning_as_error: bool,
    pub labels: Vec<Label>,
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn new(severity: Severity, source_file: SourceFileId, message: impl Into<String>) -> Self {
        Self {
            severity,
            code: None,
            message: message.into(),
            source_file,
            warning_as_error: false,
            labels: vec![],
            notes: vec![],
        }
    }

    pub fn error(file: SourceFileId, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, file, message)
    }

    pub fn warning(file: SourceFileId, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, file, message)
    }

    pub fn note(file: SourceFileId, message: impl Into<String>) -> Self {
        Self::new(Severity::Note, file, message)
    }

    pub fn bug(file: SourceFileId, message: impl Into<String>) -> Self {
        Self::new(Severity::Bug, file, message)
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_label(mut self, label: Label) -> Self {
        self.labels.push(label);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Escalates a warning to be treated as an error. Other severities are
    /// left untouched.
    pub fn escalated_to_error(mut self) -> Self {
        if self.severity == Severity::Warning {
            self.warning_as_error = true;
        }
        self
    }

    /// Whether this diagnostic blocks emission.
    pub fn is_error(&self) -> bool {
        self.severity >= Severity::Error || self.warning_as_error
    }

    pub fn emit_to_stderr(
        &self,
        files: &SourceFileSet,
    ) -> Result<(), codespan_reporting::files::Error> {
        term::emit(
            &mut StandardStream::stderr(ColorChoice::Auto),
            &term::Config::default(),
            files,
            &self.to_codespan(),
        )
    }

    fn to_codespan(&self) -> codespan_reporting::diagnostic::Diagnostic<SourceFileId> {
        codespan_reporting::diagnostic::Diagnostic {
            severity: if self.warning_as_error {
                Severity::Error
            } else {
                self.severity
            },
            code: self.code.clone(),
            message: self.message.clone(),
            labels: self
                .labels
                .iter()
                .map(|label| codespan_reporting::diagnostic::Label {
                    style: label.style,
                    file_id: self.source_file,
                    range: label.span.to_range(),
                    message: label.message.clone(),
                })
                .collect(),
            notes: self.notes.clone(),
        }
    }
}

impl fmt::Debug for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostic")
            .field("severity", &self.severity)
            .field("code", &self.code)
            .field("message", &self.message)
            .field("warning_as_error", &self.warning_as_error)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            _ if self.warning_as_error => "error",
            Severity::Bug => "bug",
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Note => "note",
            Severity::Help => "help",
        };
        match &self.code {
            Some(code) => write!(f, "{severity}[{code}]: {}", self.message),
            None => write!(f, "{severity}: {}", self.message),
        }
    }
}
