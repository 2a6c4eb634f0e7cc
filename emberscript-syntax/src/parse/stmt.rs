use emberscript_lexer::token::TokenKind;

use crate::{
    ast::{
        AssignStmt, Block, ElseArm, ExprStmt, IfStmt, LocalDecl, ReturnStmt, Stmt, WhileStmt,
    },
    ParseError, Parser,
};

/// # Statements
impl<'a> Parser<'a> {
    pub(crate) fn parse_block(&mut self) -> Result<Block, ParseError> {
        let open = self.expect_token(TokenKind::LeftBrace)?;
        let mut stmts = vec![];
        let end = loop {
            let token = self.peek();
            match token.kind {
                TokenKind::RightBrace => {
                    self.advance();
                    break token.span;
                }
                TokenKind::EndOfFile => {
                    self.error_at(token, "E0104", "`}` expected");
                    break token.span;
                }
                _ => match self.parse_stmt() {
                    Ok(stmt) => stmts.push(stmt),
                    Err(_) => {
                        self.skip_until(|_, token| {
                            matches!(token.kind, TokenKind::Semi | TokenKind::RightBrace)
                        });
                        if self.peek().kind == TokenKind::Semi {
                            self.advance();
                        }
                    }
                },
            }
        };
        Ok(Block {
            stmts,
            span: open.span.join(&end),
        })
    }

    fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        let token = self.peek();
        if self.is_keyword(token, "if") {
            return Ok(Stmt::If(self.parse_if()?));
        }
        if self.is_keyword(token, "while") {
            return self.parse_while();
        }
        if self.is_keyword(token, "return") {
            return self.parse_return();
        }
        if token.kind == TokenKind::Ident {
            match self.peek2().kind {
                // `type name = ...;`
                TokenKind::Ident => return self.parse_local(),
                // `name = ...;`
                TokenKind::Assign => {
                    let target = self.expect_ident()?;
                    self.advance();
                    let value = self.parse_expr()?;
                    self.expect_semi()?;
                    return Ok(Stmt::Assign(AssignStmt { target, value }));
                }
                _ => (),
            }
        }
        let expr = self.parse_expr()?;
        self.expect_semi()?;
        Ok(Stmt::Expr(ExprStmt { expr }))
    }

    fn parse_local(&mut self) -> Result<Stmt, ParseError> {
        let ty = self.parse_type()?;
        let name = self.expect_ident()?;
        if self.peek().kind != TokenKind::Assign {
            let token = self.peek();
            self.error_at(
                token,
                "E0107",
                format!("local variable `{name}` must have an initializer"),
            );
            return Err(ParseError::new(token.span));
        }
        self.advance();
        let init = self.parse_expr()?;
        self.expect_semi()?;
        Ok(Stmt::Local(LocalDecl { ty, name, init }))
    }

    fn parse_if(&mut self) -> Result<IfStmt, ParseError> {
        let keyword = self.advance();
        self.expect_token(TokenKind::LeftParen)?;
        let condition = self.parse_expr()?;
        self.expect_token(TokenKind::RightParen)?;
        let then_block = self.parse_block()?;

        let mut span = keyword.span.join(&then_block.span);
        let else_arm = if self.is_keyword(self.peek(), "else") {
            self.advance();
            if self.is_keyword(self.peek(), "if") {
                let nested = self.parse_if()?;
                span = span.join(&nested.span);
                Some(ElseArm::If(Box::new(nested)))
            } else {
                let block = self.parse_block()?;
                span = span.join(&block.span);
                Some(ElseArm::Block(block))
            }
        } else {
            None
        };
        Ok(IfStmt {
            condition,
            then_block,
            else_arm,
            span,
        })
    }

    fn parse_while(&mut self) -> Result<Stmt, ParseError> {
        let keyword = self.advance();
        self.expect_token(TokenKind::LeftParen)?;
        let condition = self.parse_expr()?;
        self.expect_token(TokenKind::RightParen)?;
        let body = self.parse_block()?;
        let span = keyword.span.join(&body.span);
        Ok(Stmt::While(WhileStmt {
            condition,
            body,
            span,
        }))
    }

    fn parse_return(&mut self) -> Result<Stmt, ParseError> {
        let keyword = self.advance();
        if self.peek().kind == TokenKind::Semi {
            let semi = self.advance();
            return Ok(Stmt::Return(ReturnStmt {
                value: None,
                span: keyword.span.join(&semi.span),
            }));
        }
        let value = self.parse_expr()?;
        let semi = self.expect_semi()?;
        Ok(Stmt::Return(ReturnStmt {
            value: Some(value),
            span: keyword.span.join(&semi.span),
        }))
    }
}
