use emberscript_analysis::native::{self, NativeLibrary};
use emberscript_foundation::{
    errors::Diagnostic,
    source::{SourceFile, SourceFileSet},
};
use emberscript_lexer::Lexer;
use emberscript_syntax::Parser;
use tracing::debug;
use uuid::Uuid;

use crate::Compilation;

/// The ordered list of library locations a compilation links against.
///
/// Blank locations are tolerated and dropped on insertion; the set is never
/// required to be non-empty. A non-blank location that matches no known
/// library produces a warning at compile time rather than an error.
#[derive(Debug, Clone)]
pub struct ReferenceSet {
    locations: Vec<String>,
}

impl ReferenceSet {
    /// A set with nothing in it. Scripts compiled against this can not call
    /// any native methods.
    pub fn empty() -> Self {
        Self { locations: vec![] }
    }

    /// The host's own base runtime library plus console/IO support.
    pub fn host_defaults() -> Self {
        Self::empty()
            .with_reference(native::LANG.location)
            .with_reference(native::CONSOLE.location)
    }

    pub fn with_reference(mut self, location: impl AsRef<str>) -> Self {
        let location = location.as_ref();
        if !location.is_empty() {
            self.locations.push(location.to_owned());
        }
        self
    }

    pub fn locations(&self) -> &[String] {
        &self.locations
    }
}

impl Default for ReferenceSet {
    fn default() -> Self {
        Self::host_defaults()
    }
}

/// Compiles Ember source text into [`Compilation`]s.
///
/// References are injected at construction and fixed for the compiler's
/// lifetime; there is no ambient discovery of libraries. The compiler itself
/// is stateless across `compile` calls and safe to share between threads.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    references: ReferenceSet,
    warnings_as_errors: bool,
}

impl Compiler {
    pub fn new(references: ReferenceSet) -> Self {
        Self {
            references,
            warnings_as_errors: false,
        }
    }

    /// Escalates every warning produced by compilations of this compiler to
    /// an error.
    pub fn with_warnings_as_errors(mut self, enabled: bool) -> Self {
        self.warnings_as_errors = enabled;
        self
    }

    /// Compiles source text, including the empty string, which denotes "no
    /// additional code" and compiles cleanly.
    ///
    /// This never fails; compile-time problems are reported through
    /// [`Compilation::errors`] and at invocation time, not here. Each call
    /// produces a freshly named unit so that units never collide with each
    /// other.
    pub fn compile(&self, source: &str) -> Compilation {
        let unit_name = format!("script-{}", Uuid::new_v4());
        debug!(%unit_name, source_len = source.len(), "compiling unit");

        let mut files = SourceFileSet::new();
        let file = files.add(SourceFile::new(unit_name.clone(), source.to_owned()));

        let mut diagnostics: Vec<Diagnostic> = vec![];
        let mut libraries: Vec<&'static NativeLibrary> = vec![];
        for location in self.references.locations() {
            match native::find(location) {
                Some(library) => libraries.push(library),
                None => diagnostics.push(
                    Diagnostic::warning(
                        file,
                        format!("the reference `{location}` does not match any known library"),
                    )
                    .with_code("W0002"),
                ),
            }
        }

        let tokens = Lexer::new(file, source, &mut diagnostics).lex();
        let unit = Parser::new(file, source, &tokens, &mut diagnostics).parse_file();

        Compilation::new(
            unit_name,
            files,
            file,
            unit,
            diagnostics,
            libraries,
            self.warnings_as_errors,
        )
    }
}
