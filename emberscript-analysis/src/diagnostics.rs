//! Shared wording for analysis diagnostics.

pub mod notes {
    pub const MISSING_REFERENCE: &str =
        "note: namespaces come from reference libraries; check the compiler's reference set";
    pub const MISSING_USING: &str =
        "note: classes only become visible after their namespace is imported with `using`";
}
