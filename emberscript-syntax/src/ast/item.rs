use emberscript_foundation::source::{Span, Spanned};

use crate::ast::{Block, Expr, Ident, Path, TypeExpr};

/// A whole compilation unit.
#[derive(Debug, Clone, Default)]
pub struct File {
    pub usings: Vec<UsingDirective>,
    pub namespaces: Vec<NamespaceDecl>,
    /// Members that appeared directly at the top level. That is always an
    /// error, but the declarations are kept so analysis can still resolve
    /// the names they mention.
    pub orphans: Vec<MemberDecl>,
}

#[derive(Debug, Clone)]
pub struct UsingDirective {
    pub path: Path,
    pub span: Span,
}

impl Spanned for UsingDirective {
    fn span(&self) -> Span {
        self.span
    }
}

#[derive(Debug, Clone)]
pub struct NamespaceDecl {
    pub path: Path,
    pub classes: Vec<ClassDecl>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub name: Ident,
    pub members: Vec<MemberDecl>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum MemberDecl {
    Field(FieldDecl),
    Method(MethodDecl),
}

impl MemberDecl {
    pub fn name(&self) -> &Ident {
        match self {
            MemberDecl::Field(field) => &field.name,
            MemberDecl::Method(method) => &method.name,
        }
    }

    pub fn declared_type(&self) -> &TypeExpr {
        match self {
            MemberDecl::Field(field) => &field.ty,
            MemberDecl::Method(method) => &method.return_ty,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub ty: TypeExpr,
    pub name: Ident,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub return_ty: TypeExpr,
    pub name: Ident,
    pub params: Vec<Param>,
    pub body: Block,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub ty: TypeExpr,
    pub name: Ident,
}
