//! Semantic analysis and emission for Ember compilation units.

pub mod ir;
pub mod native;
pub mod type_system;

mod class;
mod diagnostics;
mod environment;
mod function;

pub use environment::*;

use emberscript_foundation::source::{SourceFileId, Span};
use emberscript_syntax::ast;
use indexmap::IndexSet;
use tracing::trace;

use crate::{
    ir::{Image, NativeRef},
    native::{NativeClass, NativeLibrary},
};

pub(crate) struct Import {
    pub name: String,
    pub span: Span,
    pub kind: ImportKind,
    pub used: bool,
}

pub(crate) enum ImportKind {
    /// A namespace declared by the unit itself.
    Script,
    /// A namespace provided by the reference libraries; carries every class
    /// the references contribute to it.
    Native(Vec<(&'static NativeLibrary, &'static NativeClass)>),
}

/// Semantic analysis and lowering of one parsed compilation unit.
///
/// An analyzer is good for exactly one `analyze` call; diagnostics land in
/// the environment it was created over.
pub struct Analyzer<'a> {
    pub(crate) file: SourceFileId,
    pub(crate) env: &'a mut Environment,
    pub(crate) references: &'a [&'static NativeLibrary],

    pub(crate) imports: Vec<Import>,
    pub(crate) native_symbols: IndexSet<String>,
}

impl<'a> Analyzer<'a> {
    pub fn new(
        file: SourceFileId,
        env: &'a mut Environment,
        references: &'a [&'static NativeLibrary],
    ) -> Self {
        Self {
            file,
            env,
            references,
            imports: vec![],
            native_symbols: IndexSet::new(),
        }
    }

    /// Analyzes the unit and lowers it to an image.
    ///
    /// This always produces an image; whether the image is fit to run is
    /// decided by whether any error diagnostics were emitted along the way.
    pub fn analyze(mut self, unit_name: &str, unit: &ast::File) -> Image {
        self.resolve_usings(unit);
        let class_ids = self.register_classes(unit);
        self.register_members(unit, &class_ids);
        self.check_orphans(unit);
        let classes = self.lower_classes(unit, &class_ids);
        self.warn_unused_usings();

        trace!(
            unit_name,
            classes = classes.len(),
            natives = self.native_symbols.len(),
            "lowered unit"
        );
        Image {
            unit_name: unit_name.to_owned(),
            classes,
            natives: self
                .native_symbols
                .into_iter()
                .map(|symbol| NativeRef { symbol })
                .collect(),
        }
    }

    pub(crate) fn intern_native(&mut self, symbol: String) -> u16 {
        let (index, _) = self.native_symbols.insert_full(symbol);
        index
            .try_into()
            .expect("too many native references in one unit")
    }
}

#[cfg(test)]
mod tests {
    use emberscript_foundation::{
        errors::{Diagnostic, Severity},
        source::{SourceFile, SourceFileSet},
    };
    use emberscript_lexer::Lexer;
    use emberscript_syntax::Parser;
    use indoc::indoc;

    use crate::{native, Analyzer, Environment};

    fn analyze(input: &str) -> Vec<Diagnostic> {
        let mut files = SourceFileSet::new();
        let file = files.add(SourceFile::new("test".into(), input.into()));
        let mut diagnostics = vec![];
        let tokens = Lexer::new(file, input, &mut diagnostics).lex();
        let unit = Parser::new(file, input, &tokens, &mut diagnostics).parse_file();
        assert!(
            diagnostics.is_empty(),
            "analysis tests expect parseable input: {diagnostics:?}"
        );
        let mut env = Environment::new();
        let references = [&native::LANG, &native::CONSOLE];
        Analyzer::new(file, &mut env, &references).analyze("test", &unit);
        env.diagnostics
    }

    fn codes(diagnostics: &[Diagnostic]) -> Vec<&str> {
        diagnostics
            .iter()
            .map(|diagnostic| diagnostic.code.as_deref().unwrap_or(""))
            .collect()
    }

    #[test]
    fn clean_class_produces_no_diagnostics() {
        let diagnostics = analyze(indoc! {r#"
            namespace TestNamespace {
                class TestClass {
                    int counter = 3;

                    string label() {
                        return "ok";
                    }

                    int bump(int by) {
                        counter = counter + by;
                        return counter;
                    }
                }
            }
        "#});
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
    }

    #[test]
    fn unknown_field_type_is_unresolved() {
        let diagnostics = analyze(indoc! {"
            namespace A {
                class B {
                    Widget w;
                }
            }
        "});
        assert_eq!(codes(&diagnostics), vec!["E0301"]);
    }

    #[test]
    fn operator_type_mismatch_is_reported_once() {
        let diagnostics = analyze(indoc! {r#"
            namespace A {
                class B {
                    int bad() {
                        return 1 + "x";
                    }
                }
            }
        "#});
        assert_eq!(codes(&diagnostics), vec!["E0311"]);
    }

    #[test]
    fn value_methods_must_return_on_every_path() {
        let diagnostics = analyze(indoc! {"
            namespace A {
                class B {
                    int f(bool c) {
                        if (c) {
                            return 1;
                        }
                    }
                }
            }
        "});
        assert_eq!(codes(&diagnostics), vec!["E0312"]);
    }

    #[test]
    fn call_arity_is_checked_for_script_methods() {
        let diagnostics = analyze(indoc! {"
            namespace A {
                class B {
                    int id(int x) {
                        return x;
                    }

                    int f() {
                        return id(1, 2);
                    }
                }
            }
        "});
        assert_eq!(codes(&diagnostics), vec!["E0309"]);
    }

    #[test]
    fn duplicate_members_are_rejected() {
        let diagnostics = analyze(indoc! {"
            namespace A {
                class B {
                    int x;
                    int x;
                }
            }
        "});
        assert_eq!(codes(&diagnostics), vec!["E0304"]);
    }

    #[test]
    fn native_calls_resolve_through_usings() {
        let diagnostics = analyze(indoc! {r#"
            using System;

            namespace A {
                class B {
                    void log() {
                        Console.writeLine(Convert.toString(Math.abs(-3)));
                    }
                }
            }
        "#});
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
    }

    #[test]
    fn calling_natives_without_using_reports_the_class() {
        let diagnostics = analyze(indoc! {r#"
            namespace A {
                class B {
                    void log() {
                        Console.writeLine("hi");
                    }
                }
            }
        "#});
        assert_eq!(codes(&diagnostics), vec!["E0308"]);
    }

    #[test]
    fn unused_using_is_a_plain_warning() {
        let diagnostics = analyze(indoc! {"
            using System;

            namespace A {
                class B {
                }
            }
        "});
        assert_eq!(codes(&diagnostics), vec!["W0001"]);
        assert_eq!(diagnostics[0].severity, Severity::Warning);
    }

    #[test]
    fn unresolved_using_namespace_is_an_error() {
        let diagnostics = analyze(indoc! {"
            using Systemm;

            namespace A {
                class B {
                }
            }
        "});
        assert_eq!(codes(&diagnostics), vec!["E0302"]);
    }
}
