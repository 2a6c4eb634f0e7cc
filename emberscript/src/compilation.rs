use emberscript_analysis::{ir::Image, native::NativeLibrary, Analyzer, Environment};
use emberscript_foundation::{
    errors::Diagnostic,
    source::{SourceFileId, SourceFileSet},
};
use emberscript_syntax::ast;
use tracing::trace;

use crate::{
    error::{CompilationError, EngineError, RunError},
    invoke::LoadedUnit,
    options::RunOptions,
    Value,
};

/// An immutable handle over one compiled (or failed) unit.
///
/// Emission - semantic analysis plus lowering to an in-memory image - is
/// performed freshly on every [`errors`](Self::errors) and [`run`](Self::run)
/// call and never memoized, so repeated calls redo the same work and
/// re-surface the same diagnostics. Since the stored source, syntax tree, and
/// reference set never change, a compilation that emits successfully once
/// does so deterministically forever after.
pub struct Compilation {
    unit_name: String,
    files: SourceFileSet,
    file: SourceFileId,
    unit: ast::File,
    /// Reference, lexer, and parser diagnostics, in production order.
    front_diagnostics: Vec<Diagnostic>,
    libraries: Vec<&'static NativeLibrary>,
    warnings_as_errors: bool,
}

impl Compilation {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        unit_name: String,
        files: SourceFileSet,
        file: SourceFileId,
        unit: ast::File,
        front_diagnostics: Vec<Diagnostic>,
        libraries: Vec<&'static NativeLibrary>,
        warnings_as_errors: bool,
    ) -> Self {
        Self {
            unit_name,
            files,
            file,
            unit,
            front_diagnostics,
            libraries,
            warnings_as_errors,
        }
    }

    /// The unit's anonymous, collision-free name.
    pub fn unit_name(&self) -> &str {
        &self.unit_name
    }

    /// The source file set backing this unit's diagnostics, for rendering
    /// them with [`Diagnostic::emit_to_stderr`].
    pub fn files(&self) -> &SourceFileSet {
        &self.files
    }

    /// Emits the unit: fresh semantic analysis and lowering, every call.
    fn emit(&self) -> Result<Image, Vec<Diagnostic>> {
        let mut env = Environment::new();
        let image =
            Analyzer::new(self.file, &mut env, &self.libraries).analyze(&self.unit_name, &self.unit);

        let mut all = self.front_diagnostics.clone();
        all.extend(env.diagnostics);
        let errors: Vec<Diagnostic> = all
            .into_iter()
            .filter_map(|diagnostic| {
                let diagnostic = if self.warnings_as_errors {
                    diagnostic.escalated_to_error()
                } else {
                    diagnostic
                };
                diagnostic.is_error().then_some(diagnostic)
            })
            .collect();
        if errors.is_empty() {
            Ok(image)
        } else {
            trace!(unit_name = %self.unit_name, count = errors.len(), "emission failed");
            Err(errors)
        }
    }

    /// Returns every diagnostic that blocks emission: errors, plus warnings
    /// escalated by the compiler's warnings-as-errors option, in production
    /// order. An empty result means the unit emits (and runs) cleanly.
    ///
    /// Never fails and has no side effects; calling it twice returns
    /// equivalent results.
    pub fn errors(&self) -> Vec<Diagnostic> {
        match self.emit() {
            Ok(_) => vec![],
            Err(errors) => errors,
        }
    }

    /// Locates and invokes a method inside the compiled unit.
    ///
    /// Validation is strict and short-circuiting, in this order: blank
    /// namespace, blank class, blank method, emission failure, unknown
    /// class, unknown method. After that the target class is instantiated
    /// through its implicit no-argument constructor and the method is
    /// invoked with the options' arguments, in order; void methods produce
    /// [`Value::Void`].
    ///
    /// Each call loads the freshly emitted image into its own executable
    /// context, which is released again when the call returns.
    pub fn run(&self, options: &RunOptions) -> Result<Value, EngineError> {
        let namespace = require_not_blank(options.namespace(), RunError::BlankNamespace)?;
        let class_name = require_not_blank(options.class(), RunError::BlankClass)?;
        let method_name = require_not_blank(options.method(), RunError::BlankMethod)?;

        let image = self
            .emit()
            .map_err(|diagnostics| CompilationError { diagnostics })?;
        let unit = LoadedUnit::load(&image)?;

        let class = unit
            .class(namespace, class_name)
            .ok_or_else(|| RunError::ClassNotFound {
                namespace: namespace.to_owned(),
                class: class_name.to_owned(),
            })?;
        let method = class
            .method_index(method_name)
            .ok_or_else(|| RunError::MethodNotFound {
                namespace: namespace.to_owned(),
                class: class_name.to_owned(),
                method: method_name.to_owned(),
            })?;

        trace!(namespace, class_name, method_name, "invoking method");
        let mut instance = unit.instantiate(class)?;
        let result = unit.invoke(class, &mut instance, method, options.args())?;
        Ok(result)
    }
}

fn require_not_blank(value: Option<&str>, error: RunError) -> Result<&str, RunError> {
    match value {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(error),
    }
}
