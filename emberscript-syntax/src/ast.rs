mod expr;
mod item;
mod stmt;

use std::fmt;

use emberscript_foundation::source::{Span, Spanned};

pub use expr::*;
pub use item::*;
pub use stmt::*;

/// An identifier as written in source. The original spelling is preserved for
/// display; equality-sensitive consumers wrap the name in `CaseInsensitive`.
#[derive(Debug, Clone)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl Spanned for Ident {
    fn span(&self) -> Span {
        self.span
    }
}

/// Dotted name, such as a namespace path `A.B.C`.
#[derive(Debug, Clone)]
pub struct Path {
    pub segments: Vec<Ident>,
}

impl Path {
    pub fn dotted(&self) -> String {
        let mut out = String::new();
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            out.push_str(&segment.name);
        }
        out
    }
}

impl Spanned for Path {
    fn span(&self) -> Span {
        match (self.segments.first(), self.segments.last()) {
            (Some(first), Some(last)) => first.span.join(&last.span),
            _ => Span::new(0, 0),
        }
    }
}

/// A type as written in source. Ember types are always simple names; whether
/// the name resolves to a primitive or a class is decided during analysis.
#[derive(Debug, Clone)]
pub struct TypeExpr {
    pub name: Ident,
}

impl Spanned for TypeExpr {
    fn span(&self) -> Span {
        self.name.span
    }
}
