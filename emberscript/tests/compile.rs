use emberscript::{Compiler, EngineError, ReferenceSet, RunOptions, Severity};
use indoc::indoc;

fn compiler() -> Compiler {
    Compiler::new(ReferenceSet::host_defaults())
}

const VALID_SOURCE: &str = indoc! {r#"
    namespace TestNamespace {
        class TestClass {
            int testField;

            void voidMethod() {
            }

            string stringMethod() {
                return "hello from ember";
            }

            string concat(string a, string b) {
                return a + b;
            }
        }
    }
"#};

#[test]
fn empty_source_compiles_with_zero_diagnostics() {
    let compilation = compiler().compile("");
    assert!(compilation.errors().is_empty());
}

#[test]
fn valid_source_compiles_with_zero_diagnostics() {
    let compilation = compiler().compile(VALID_SOURCE);
    let errors = compilation.errors();
    assert!(errors.is_empty(), "{errors:?}");
}

#[test]
fn errors_is_idempotent() {
    let compilation = compiler().compile("usi ng System;");
    let first: Vec<String> = compilation
        .errors()
        .iter()
        .map(ToString::to_string)
        .collect();
    let second: Vec<String> = compilation
        .errors()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(first, second);
    assert!(!first.is_empty());
}

#[test]
fn mangled_using_yields_exactly_four_diagnostics() {
    let compilation = compiler().compile("usi ng System;");
    let errors = compilation.errors();
    let codes: Vec<&str> = errors
        .iter()
        .map(|diagnostic| diagnostic.code.as_deref().unwrap_or(""))
        .collect();
    // A missing statement terminator, a member where none is allowed, an
    // unexpected token where an item or end of file should be, and an
    // unresolved type.
    assert_eq!(codes, vec!["E0102", "E0101", "E0103", "E0301"]);
    assert!(errors
        .iter()
        .all(|diagnostic| diagnostic.severity == Severity::Error));
}

#[test]
fn running_a_failed_compilation_reports_concatenated_diagnostics() {
    let compilation = compiler().compile("usi ng System;");
    let expected = compilation
        .errors()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n");

    let options = RunOptions::new()
        .with_namespace("TestNamespace")
        .with_class("TestClass")
        .with_method("voidMethod");
    match compilation.run(&options) {
        Err(EngineError::Compilation(error)) => {
            assert_eq!(error.to_string(), expected);
            assert_eq!(error.diagnostics.len(), 4);
        }
        other => panic!("expected a compilation error, got {other:?}"),
    }
}

#[test]
fn diagnostics_render_with_severity_and_code() {
    let compilation = compiler().compile("usi ng System;");
    let errors = compilation.errors();
    assert!(errors[0].to_string().starts_with("error[E0102]: "));
}

#[test]
fn unit_names_never_collide() {
    let compiler = compiler();
    let first = compiler.compile("");
    let second = compiler.compile("");
    assert_ne!(first.unit_name(), second.unit_name());
}

#[test]
fn blank_references_are_dropped_from_the_set() {
    let references = ReferenceSet::host_defaults().with_reference("");
    assert_eq!(references.locations().len(), 2);
}

#[test]
fn unknown_reference_locations_warn_only_under_escalation() {
    let references = ReferenceSet::host_defaults().with_reference("ember:no-such-library");

    let relaxed = Compiler::new(references.clone()).compile(VALID_SOURCE);
    assert!(relaxed.errors().is_empty());

    let strict = Compiler::new(references)
        .with_warnings_as_errors(true)
        .compile(VALID_SOURCE);
    let errors = strict.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code.as_deref(), Some("W0002"));
    assert!(errors[0].warning_as_error);
    assert_eq!(errors[0].severity, Severity::Warning);
}

#[test]
fn unused_usings_surface_under_warnings_as_errors() {
    let source = indoc! {"
        using System;

        namespace A {
            class B {
            }
        }
    "};
    let relaxed = compiler().compile(source);
    assert!(relaxed.errors().is_empty());

    let strict = Compiler::new(ReferenceSet::host_defaults())
        .with_warnings_as_errors(true)
        .compile(source);
    let errors = strict.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code.as_deref(), Some("W0001"));
}

#[test]
fn an_empty_reference_set_cannot_resolve_using_directives() {
    let source = indoc! {"
        using System;

        namespace A {
            class B {
            }
        }
    "};
    let compilation = Compiler::new(ReferenceSet::empty()).compile(source);
    let errors = compilation.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code.as_deref(), Some("E0302"));
}

#[test]
fn semantic_errors_block_emission() {
    let source = indoc! {"
        namespace A {
            class B {
                Widget w;
            }
        }
    "};
    let compilation = compiler().compile(source);
    let errors = compilation.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code.as_deref(), Some("E0301"));
}
