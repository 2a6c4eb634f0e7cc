use emberscript::{
    Compilation, Compiler, EngineError, InvokeError, ReferenceSet, RunError, RunOptions, Value,
};
use indoc::indoc;

const TEST_SOURCE: &str = indoc! {r#"
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

fn compile(source: &str) -> Compilation {
    let compilation = Compiler::new(ReferenceSet::host_defaults()).compile(source);
    let errors = compilation.errors();
    assert!(errors.is_empty(), "test source should compile: {errors:?}");
    compilation
}

fn test_options() -> RunOptions {
    RunOptions::new()
        .with_namespace("TestNamespace")
        .with_class("TestClass")
}

fn expect_run_error(result: Result<Value, EngineError>) -> RunError {
    match result {
        Err(EngineError::Run(error)) => error,
        other => panic!("expected a run error, got {other:?}"),
    }
}

fn expect_invoke_error(result: Result<Value, EngineError>) -> InvokeError {
    match result {
        Err(EngineError::Invocation(error)) => error,
        other => panic!("expected an invocation error, got {other:?}"),
    }
}

#[test]
fn validation_checks_namespace_then_class_then_method() {
    let compilation = compile(TEST_SOURCE);

    let error = expect_run_error(compilation.run(&RunOptions::new()));
    assert_eq!(error.to_string(), "The namespace must not be blank");

    let error = expect_run_error(
        compilation.run(&RunOptions::new().with_namespace("TestNamespace")),
    );
    assert_eq!(error.to_string(), "The class must not be blank");

    let error = expect_run_error(
        compilation.run(
            &RunOptions::new()
                .with_namespace("TestNamespace")
                .with_class("TestClass"),
        ),
    );
    assert_eq!(error.to_string(), "The method must not be blank");
}

#[test]
fn blank_and_unset_fields_fail_identically() {
    let compilation = compile(TEST_SOURCE);
    let error = expect_run_error(compilation.run(
        &RunOptions::new()
            .with_namespace("")
            .with_class("TestClass")
            .with_method("voidMethod"),
    ));
    assert_eq!(error, RunError::BlankNamespace);
}

#[test]
fn unknown_namespace_names_the_missing_identifier() {
    let compilation = compile(TEST_SOURCE);
    let error = expect_run_error(compilation.run(
        &test_options()
            .with_namespace("WrongNamespace")
            .with_method("voidMethod"),
    ));
    assert_eq!(
        error.to_string(),
        "Could not find class 'TestClass' in namespace 'WrongNamespace'"
    );
}

#[test]
fn unknown_class_names_the_missing_identifier() {
    let compilation = compile(TEST_SOURCE);
    let error = expect_run_error(compilation.run(
        &test_options()
            .with_class("WrongClass")
            .with_method("voidMethod"),
    ));
    assert_eq!(
        error.to_string(),
        "Could not find class 'WrongClass' in namespace 'TestNamespace'"
    );
}

#[test]
fn unknown_method_names_all_three_identifiers() {
    let compilation = compile(TEST_SOURCE);
    let error = expect_run_error(compilation.run(&test_options().with_method("wrongMethod")));
    assert_eq!(
        error.to_string(),
        "Could not find method 'wrongMethod' in class 'TestClass' and namespace 'TestNamespace'"
    );
}

#[test]
fn a_field_is_not_an_invocable_method() {
    let compilation = compile(TEST_SOURCE);
    let error = expect_run_error(compilation.run(&test_options().with_method("testField")));
    // Deliberately the same shape as a truly absent method.
    assert_eq!(
        error,
        RunError::MethodNotFound {
            namespace: "TestNamespace".into(),
            class: "TestClass".into(),
            method: "testField".into(),
        }
    );
}

#[test]
fn void_methods_return_the_absence_of_a_value() {
    let compilation = compile(TEST_SOURCE);
    let result = compilation
        .run(&test_options().with_method("voidMethod"))
        .unwrap();
    assert_eq!(result, Value::Void);
}

#[test]
fn value_returning_methods_return_their_value() {
    let compilation = compile(TEST_SOURCE);
    let result = compilation
        .run(&test_options().with_method("stringMethod"))
        .unwrap();
    assert_eq!(result, Value::String("hello from ember".into()));
}

#[test]
fn arguments_are_passed_in_order() {
    let compilation = compile(TEST_SOURCE);
    let result = compilation
        .run(&test_options().with_method("concat").with_args(vec![
            Value::String("abcd".into()),
            Value::String("-1234".into()),
        ]))
        .unwrap();
    assert_eq!(result, Value::String("abcd-1234".into()));
}

#[test]
fn repeated_runs_load_independently_and_agree() {
    let compilation = compile(TEST_SOURCE);
    let options = test_options().with_method("stringMethod");
    let first = compilation.run(&options).unwrap();
    let second = compilation.run(&options).unwrap();
    assert_eq!(first, second);
}

#[test]
fn lookup_is_case_insensitive() {
    let compilation = compile(TEST_SOURCE);
    let result = compilation
        .run(
            &RunOptions::new()
                .with_namespace("testnamespace")
                .with_class("testclass")
                .with_method("STRINGMETHOD"),
        )
        .unwrap();
    assert_eq!(result, Value::String("hello from ember".into()));
}

#[test]
fn running_the_empty_unit_finds_no_classes() {
    let compilation = compile("");
    let error = expect_run_error(compilation.run(&test_options().with_method("voidMethod")));
    assert_eq!(
        error,
        RunError::ClassNotFound {
            namespace: "TestNamespace".into(),
            class: "TestClass".into(),
        }
    );
}

#[test]
fn argument_count_mismatches_are_invocation_failures_not_run_errors() {
    let compilation = compile(TEST_SOURCE);
    let error = expect_invoke_error(
        compilation.run(
            &test_options()
                .with_method("concat")
                .with_args(vec![Value::String("abcd".into())]),
        ),
    );
    assert_eq!(error, InvokeError::ArityMismatch { expected: 2, got: 1 });
}

#[test]
fn argument_type_mismatches_trap_inside_the_call() {
    let compilation = compile(TEST_SOURCE);
    let error = expect_invoke_error(compilation.run(
        &test_options()
            .with_method("concat")
            .with_args(vec![Value::Int(1), Value::Int(2)]),
    ));
    assert!(matches!(error, InvokeError::Mismatch { .. }));
}

#[test]
fn failures_inside_user_code_pass_through_unwrapped() {
    let compilation = compile(indoc! {"
        namespace TestNamespace {
            class TestClass {
                int divide(int a, int b) {
                    return a / b;
                }
            }
        }
    "});
    let error = expect_invoke_error(compilation.run(
        &test_options()
            .with_method("divide")
            .with_args(vec![Value::Int(10), Value::Int(0)]),
    ));
    assert_eq!(error, InvokeError::DivisionByZero);
}

#[test]
fn field_initializers_run_before_the_method() {
    let compilation = compile(indoc! {"
        namespace TestNamespace {
            class Counter {
                int count = 41;

                int next() {
                    return count + 1;
                }
            }
        }
    "});
    let result = compilation
        .run(
            &RunOptions::new()
                .with_namespace("TestNamespace")
                .with_class("Counter")
                .with_method("next"),
        )
        .unwrap();
    assert_eq!(result, Value::Int(42));
}

#[test]
fn control_flow_and_locals_evaluate() {
    let compilation = compile(indoc! {"
        namespace TestNamespace {
            class TestClass {
                int sumTo(int n) {
                    int total = 0;
                    int i = 1;
                    while (i <= n) {
                        total = total + i;
                        i = i + 1;
                    }
                    return total;
                }

                string pick(bool flag) {
                    if (flag) {
                        return \"yes\";
                    } else {
                        return \"no\";
                    }
                }
            }
        }
    "});
    let sum = compilation
        .run(
            &test_options()
                .with_method("sumTo")
                .with_args(vec![Value::Int(10)]),
        )
        .unwrap();
    assert_eq!(sum, Value::Int(55));

    let picked = compilation
        .run(
            &test_options()
                .with_method("pick")
                .with_args(vec![Value::Bool(false)]),
        )
        .unwrap();
    assert_eq!(picked, Value::String("no".into()));
}

#[test]
fn methods_call_their_siblings() {
    let compilation = compile(indoc! {r#"
        namespace TestNamespace {
            class TestClass {
                string decorate(string inner) {
                    return "<" + inner + ">";
                }

                string greet() {
                    return decorate("hi");
                }
            }
        }
    "#});
    let result = compilation
        .run(&test_options().with_method("greet"))
        .unwrap();
    assert_eq!(result, Value::String("<hi>".into()));
}

#[test]
fn native_methods_link_by_symbol_at_load_time() {
    let compilation = compile(indoc! {"
        using System;

        namespace TestNamespace {
            class TestClass {
                string describe(int x) {
                    return Convert.toString(Math.max(Math.abs(x), 10));
                }
            }
        }
    "});
    let result = compilation
        .run(
            &test_options()
                .with_method("describe")
                .with_args(vec![Value::Int(-42)]),
        )
        .unwrap();
    assert_eq!(result, Value::String("42".into()));
}

#[test]
fn runaway_recursion_traps_instead_of_overflowing() {
    let compilation = compile(indoc! {"
        namespace TestNamespace {
            class TestClass {
                int forever(int x) {
                    return forever(x + 1);
                }
            }
        }
    "});
    let error = expect_invoke_error(compilation.run(
        &test_options()
            .with_method("forever")
            .with_args(vec![Value::Int(0)]),
    ));
    assert_eq!(error, InvokeError::CallDepthExceeded);
}
