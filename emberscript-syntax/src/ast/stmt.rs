use emberscript_foundation::source::{Span, Spanned};

use crate::ast::{Expr, Ident, TypeExpr};

#[derive(Debug, Clone)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

impl Spanned for Block {
    fn span(&self) -> Span {
        self.span
    }
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Local(LocalDecl),
    Assign(AssignStmt),
    Expr(ExprStmt),
    If(IfStmt),
    While(WhileStmt),
    Return(ReturnStmt),
}

/// `type name = init;` - the initializer is mandatory in Ember.
#[derive(Debug, Clone)]
pub struct LocalDecl {
    pub ty: TypeExpr,
    pub name: Ident,
    pub init: Expr,
}

#[derive(Debug, Clone)]
pub struct AssignStmt {
    pub target: Ident,
    pub value: Expr,
}

#[derive(Debug, Clone)]
pub struct ExprStmt {
    pub expr: Expr,
}

#[derive(Debug, Clone)]
pub struct IfStmt {
    pub condition: Expr,
    pub then_block: Block,
    pub else_arm: Option<ElseArm>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ElseArm {
    Block(Block),
    If(Box<IfStmt>),
}

#[derive(Debug, Clone)]
pub struct WhileStmt {
    pub condition: Expr,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ReturnStmt {
    pub value: Option<Expr>,
    pub span: Span,
}
