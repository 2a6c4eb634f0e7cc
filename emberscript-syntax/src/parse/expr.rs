use emberscript_lexer::token::{Token, TokenKind};

use crate::{
    ast::{BinaryExpr, BinaryOp, Callee, CallExpr, Expr, Lit, LitKind, UnaryExpr, UnaryOp},
    ParseError, Parser,
};

/// # Expressions
///
/// Plain precedence climbing; each level is its own function, lowest
/// precedence outermost.
impl<'a> Parser<'a> {
    pub(crate) fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_or()
    }

    fn parse_binary(
        &mut self,
        next: fn(&mut Self) -> Result<Expr, ParseError>,
        op_of: fn(TokenKind) -> Option<BinaryOp>,
    ) -> Result<Expr, ParseError> {
        let mut lhs = next(self)?;
        while let Some(op) = op_of(self.peek().kind) {
            let op_token = self.advance();
            let rhs = next(self)?;
            lhs = Expr::Binary(BinaryExpr {
                op,
                op_span: op_token.span,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            });
        }
        Ok(lhs)
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary(Self::parse_and, |kind| {
            (kind == TokenKind::Or).then_some(BinaryOp::Or)
        })
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary(Self::parse_equality, |kind| {
            (kind == TokenKind::And).then_some(BinaryOp::And)
        })
    }

    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary(Self::parse_comparison, |kind| match kind {
            TokenKind::Equal => Some(BinaryOp::Eq),
            TokenKind::NotEqual => Some(BinaryOp::Ne),
            _ => None,
        })
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary(Self::parse_additive, |kind| match kind {
            TokenKind::Less => Some(BinaryOp::Lt),
            TokenKind::LessEqual => Some(BinaryOp::Le),
            TokenKind::Greater => Some(BinaryOp::Gt),
            TokenKind::GreaterEqual => Some(BinaryOp::Ge),
            _ => None,
        })
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary(Self::parse_multiplicative, |kind| match kind {
            TokenKind::Add => Some(BinaryOp::Add),
            TokenKind::Sub => Some(BinaryOp::Sub),
            _ => None,
        })
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary(Self::parse_unary, |kind| match kind {
            TokenKind::Mul => Some(BinaryOp::Mul),
            TokenKind::Div => Some(BinaryOp::Div),
            TokenKind::Rem => Some(BinaryOp::Rem),
            _ => None,
        })
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let token = self.peek();
        let op = match token.kind {
            TokenKind::Sub => Some(UnaryOp::Neg),
            TokenKind::Not => Some(UnaryOp::Not),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.parse_unary()?;
            Ok(Expr::Unary(UnaryExpr {
                op,
                op_span: token.span,
                operand: Box::new(operand),
            }))
        } else {
            self.parse_primary()
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let token = self.peek();
        match token.kind {
            TokenKind::IntLit => {
                self.advance();
                let value = self.text(token).parse().unwrap_or_else(|_| {
                    self.error_at(token, "E0005", "int literal out of range");
                    0
                });
                Ok(Expr::Lit(Lit {
                    kind: LitKind::Int(value),
                    span: token.span,
                }))
            }
            TokenKind::FloatLit => {
                self.advance();
                let value = self.text(token).parse().unwrap_or_else(|_| {
                    self.error_at(token, "E0005", "float literal out of range");
                    0.0
                });
                Ok(Expr::Lit(Lit {
                    kind: LitKind::Float(value),
                    span: token.span,
                }))
            }
            TokenKind::StringLit => {
                self.advance();
                Ok(Expr::Lit(Lit {
                    kind: LitKind::String(self.unescape_string(token)),
                    span: token.span,
                }))
            }
            TokenKind::Ident if self.is_keyword(token, "true") => {
                self.advance();
                Ok(Expr::Lit(Lit {
                    kind: LitKind::Bool(true),
                    span: token.span,
                }))
            }
            TokenKind::Ident if self.is_keyword(token, "false") => {
                self.advance();
                Ok(Expr::Lit(Lit {
                    kind: LitKind::Bool(false),
                    span: token.span,
                }))
            }
            TokenKind::Ident => {
                let ident = self.expect_ident()?;
                match self.peek().kind {
                    TokenKind::LeftParen => self.parse_call(Callee::Method(ident), token),
                    TokenKind::Dot => {
                        self.advance();
                        let method = self.expect_ident()?;
                        if self.peek().kind != TokenKind::LeftParen {
                            let unexpected = self.peek();
                            self.error_at(
                                unexpected,
                                "E0108",
                                format!("`(` expected in call to `{ident}.{method}`"),
                            );
                            return Err(ParseError::new(unexpected.span));
                        }
                        self.parse_call(
                            Callee::Static {
                                class: ident,
                                method,
                            },
                            token,
                        )
                    }
                    _ => Ok(Expr::Ident(ident)),
                }
            }
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect_token(TokenKind::RightParen)?;
                Ok(inner)
            }
            _ => {
                self.error_at(token, "E0109", "expected expression");
                Err(ParseError::new(token.span))
            }
        }
    }

    fn parse_call(&mut self, callee: Callee, start: Token) -> Result<Expr, ParseError> {
        self.advance();
        let mut args = vec![];
        let end = if self.peek().kind == TokenKind::RightParen {
            self.advance()
        } else {
            loop {
                args.push(self.parse_expr()?);
                match self.peek().kind {
                    TokenKind::Comma => {
                        self.advance();
                    }
                    _ => break self.expect_token(TokenKind::RightParen)?,
                }
            }
        };
        Ok(Expr::Call(CallExpr {
            callee,
            args,
            span: start.span.join(&end.span),
        }))
    }

    fn unescape_string(&mut self, token: Token) -> String {
        // The lexer only produces string literal tokens with both quotes in
        // place; unterminated literals become error tokens instead.
        let text = self.text(token);
        let inner = &text[1..text.len() - 1];
        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(char) = chars.next() {
            if char == '\\' {
                match chars.next() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some(other) => out.push(other),
                    None => (),
                }
            } else {
                out.push(char);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use emberscript_foundation::{
        errors::Diagnostic,
        source::{SourceFile, SourceFileSet},
    };
    use emberscript_lexer::Lexer;

    use crate::{
        ast::{BinaryOp, Callee, Expr, LitKind},
        Parser,
    };

    fn parse_expr(input: &str) -> (Expr, Vec<Diagnostic>) {
        let mut files = SourceFileSet::new();
        let file = files.add(SourceFile::new("test".into(), input.into()));
        let mut diagnostics = vec![];
        let tokens = Lexer::new(file, input, &mut diagnostics).lex();
        let expr = {
            let mut parser = Parser::new(file, input, &tokens, &mut diagnostics);
            parser.parse_expr().expect("expression should parse")
        };
        (expr, diagnostics)
    }

    #[test]
    fn precedence_puts_multiplication_under_addition() {
        let (expr, diagnostics) = parse_expr("1 + 2 * 3");
        assert!(diagnostics.is_empty());
        let Expr::Binary(add) = expr else {
            panic!("expected binary expression");
        };
        assert_eq!(add.op, BinaryOp::Add);
        let Expr::Binary(mul) = *add.rhs else {
            panic!("expected rhs to be the multiplication");
        };
        assert_eq!(mul.op, BinaryOp::Mul);
    }

    #[test]
    fn parses_qualified_static_calls() {
        let (expr, diagnostics) = parse_expr(r#"Console.writeLine("hi")"#);
        assert!(diagnostics.is_empty());
        let Expr::Call(call) = expr else {
            panic!("expected call");
        };
        let Callee::Static { class, method } = call.callee else {
            panic!("expected static callee");
        };
        assert_eq!(class.name, "Console");
        assert_eq!(method.name, "writeLine");
        assert_eq!(call.args.len(), 1);
    }

    #[test]
    fn string_escapes_are_decoded() {
        let (expr, _) = parse_expr(r#""a\n\"b""#);
        let Expr::Lit(lit) = expr else {
            panic!("expected literal");
        };
        assert_eq!(lit.kind, LitKind::String("a\n\"b".into()));
    }
}
