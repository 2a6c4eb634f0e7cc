use emberscript_analysis::ir::Value;

/// Which callable to run, with which arguments.
///
/// Built by accumulation; every field may stay unset until
/// [`Compilation::run`](crate::Compilation::run) validates the whole thing.
/// There are no defaults for the namespace, class, or method.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    namespace: Option<String>,
    class: Option<String>,
    method: Option<String>,
    args: Vec<Value>,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Sets the argument list. Passing `None` normalizes to no arguments.
    pub fn with_args(mut self, args: impl Into<Option<Vec<Value>>>) -> Self {
        self.args = args.into().unwrap_or_default();
        self
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn class(&self) -> Option<&str> {
        self.class.as_deref()
    }

    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_accumulate_across_with_calls() {
        let options = RunOptions::new()
            .with_namespace("A")
            .with_class("B")
            .with_method("c");
        assert_eq!(options.namespace(), Some("A"));
        assert_eq!(options.class(), Some("B"));
        assert_eq!(options.method(), Some("c"));
        assert!(options.args().is_empty());
    }

    #[test]
    fn absent_args_normalize_to_empty() {
        let options = RunOptions::new().with_args(None);
        assert!(options.args().is_empty());

        let options = RunOptions::new()
            .with_args(vec![Value::Int(1)])
            .with_args(None);
        assert!(options.args().is_empty());
    }
}
