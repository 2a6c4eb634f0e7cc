//! EmberScript - a dynamic source-compilation and invocation engine.
//!
//! Source text goes in through [`Compiler::compile`]; what comes back is a
//! [`Compilation`] that can be probed for diagnostics with
//! [`Compilation::errors`] or asked to locate and invoke a method with
//! [`Compilation::run`].
//!
//! ```
//! use emberscript::{Compiler, ReferenceSet, RunOptions, Value};
//!
//! let compiler = Compiler::new(ReferenceSet::host_defaults());
//! let compilation = compiler.compile(
//!     r#"
//!     namespace Demo {
//!         class Greeter {
//!             string greet(string name) {
//!                 return "hello " + name;
//!             }
//!         }
//!     }
//!     "#,
//! );
//! assert!(compilation.errors().is_empty());
//!
//! let options = RunOptions::new()
//!     .with_namespace("Demo")
//!     .with_class("Greeter")
//!     .with_method("greet")
//!     .with_args(vec![Value::String("ember".into())]);
//! let result = compilation.run(&options).unwrap();
//! assert_eq!(result, Value::String("hello ember".into()));
//! ```

mod compilation;
mod compiler;
mod error;
mod invoke;
mod natives;
mod options;

pub use compilation::Compilation;
pub use compiler::{Compiler, ReferenceSet};
pub use error::{CompilationError, EngineError, InvokeError, RunError};
pub use options::RunOptions;

pub use emberscript_analysis::ir::Value;
pub use emberscript_foundation::errors::{Diagnostic, Severity};
