mod expr;
mod stmt;

use emberscript_foundation::{
    errors::{Diagnostic, DiagnosticSink, Label},
    source::{SourceFileId, Span},
};
use emberscript_lexer::token::{Channel, Token, TokenKind};
use tracing::trace;

use crate::ast::{self, FieldDecl, File, Ident, MemberDecl, MethodDecl, Param, TypeExpr};

/// The AST node could not be parsed. The diagnostic describing why has
/// already been emitted by the time this is returned.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub span: Span,
}

impl ParseError {
    pub fn new(span: Span) -> Self {
        Self { span }
    }
}

/// Where a member declaration appeared; drives error recovery, which must
/// not eat tokens the enclosing context wants to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MemberContext {
    TopLevel,
    Class,
}

pub struct Parser<'a> {
    pub file: SourceFileId,
    pub input: &'a str,
    tokens: Vec<Token>,
    position: usize,
    diagnostics: &'a mut dyn DiagnosticSink,
}

impl<'a> Parser<'a> {
    pub fn new(
        file: SourceFileId,
        input: &'a str,
        tokens: &[Token],
        diagnostics: &'a mut dyn DiagnosticSink,
    ) -> Self {
        // Comment and error tokens are filtered out up front; errors have
        // already produced their diagnostics during lexis.
        let tokens: Vec<Token> = tokens
            .iter()
            .filter(|token| token.kind.channel().contains(Channel::CODE))
            .copied()
            .collect();
        Self {
            file,
            input,
            tokens,
            position: 0,
            diagnostics,
        }
    }

    fn peek(&self) -> Token {
        self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    fn peek2(&self) -> Token {
        self.tokens[(self.position + 1).min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek();
        if token.kind != TokenKind::EndOfFile {
            self.position += 1;
        }
        token
    }

    fn text(&self, token: Token) -> &'a str {
        token.text(self.input)
    }

    fn is_keyword(&self, token: Token, keyword: &str) -> bool {
        token.kind == TokenKind::Ident && self.text(token).eq_ignore_ascii_case(keyword)
    }

    fn emit(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.emit(diagnostic);
    }

    fn error_at(&mut self, token: Token, code: &str, message: impl Into<String>) {
        let diagnostic = Diagnostic::error(self.file, message)
            .with_code(code)
            .with_label(Label::primary(token.span, ""));
        self.emit(diagnostic);
    }

    fn expect_token(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        let token = self.peek();
        if token.kind == kind {
            Ok(self.advance())
        } else {
            self.error_at(token, "E0104", format!("{} expected", kind.pretty_name()));
            Err(ParseError::new(token.span))
        }
    }

    fn expect_semi(&mut self) -> Result<Token, ParseError> {
        let token = self.peek();
        if token.kind == TokenKind::Semi {
            Ok(self.advance())
        } else {
            self.error_at(token, "E0101", "`;` expected");
            Err(ParseError::new(token.span))
        }
    }

    fn expect_ident(&mut self) -> Result<Ident, ParseError> {
        let token = self.peek();
        if token.kind == TokenKind::Ident {
            self.advance();
            Ok(Ident {
                name: self.text(token).to_owned(),
                span: token.span,
            })
        } else {
            self.error_at(token, "E0104", "identifier expected");
            Err(ParseError::new(token.span))
        }
    }

    /// Skips forward until `stop` matches or the input ends. The matching
    /// token is left in the stream.
    fn skip_until(&mut self, stop: impl Fn(&Self, Token) -> bool) {
        loop {
            let token = self.peek();
            if token.kind == TokenKind::EndOfFile || stop(self, token) {
                break;
            }
            self.advance();
        }
    }

    fn at_top_level_sync(&self, token: Token) -> bool {
        matches!(token.kind, TokenKind::Semi | TokenKind::LeftBrace)
            || self.is_keyword(token, "using")
            || self.is_keyword(token, "namespace")
    }
}

/// # Items
impl<'a> Parser<'a> {
    /// Parses a whole compilation unit. Parsing never fails as a whole;
    /// whatever could not be understood is reported and skipped.
    pub fn parse_file(mut self) -> File {
        let mut file = File::default();
        loop {
            let token = self.peek();
            match token.kind {
                TokenKind::EndOfFile => break,
                TokenKind::Ident if self.is_keyword(token, "using") => {
                    if let Ok(using) = self.parse_using() {
                        file.usings.push(using);
                    }
                }
                TokenKind::Ident if self.is_keyword(token, "namespace") => {
                    if let Ok(namespace) = self.parse_namespace() {
                        file.namespaces.push(namespace);
                    }
                }
                TokenKind::Ident => {
                    // Looks like a member declaration. Those only belong
                    // inside classes, but we parse it anyway so analysis can
                    // see the names it mentions.
                    self.error_at(
                        token,
                        "E0102",
                        "a compilation unit cannot directly contain members such as fields or methods",
                    );
                    if let Some(member) = self.parse_orphan_member() {
                        file.orphans.push(member);
                    }
                }
                _ => {
                    self.error_at(
                        token,
                        "E0103",
                        "expected `using` directive, `namespace` declaration, or end of file",
                    );
                    self.advance();
                }
            }
        }
        trace!(
            usings = file.usings.len(),
            namespaces = file.namespaces.len(),
            orphans = file.orphans.len(),
            "parsed compilation unit"
        );
        file
    }

    fn parse_path(&mut self) -> Result<ast::Path, ParseError> {
        let mut segments = vec![self.expect_ident()?];
        while self.peek().kind == TokenKind::Dot {
            self.advance();
            segments.push(self.expect_ident()?);
        }
        Ok(ast::Path { segments })
    }

    fn parse_using(&mut self) -> Result<ast::UsingDirective, ParseError> {
        let keyword = self.advance();
        let result = (|| {
            let path = self.parse_path()?;
            let semi = self.expect_semi()?;
            Ok(ast::UsingDirective {
                span: keyword.span.join(&semi.span),
                path,
            })
        })();
        if result.is_err() {
            self.skip_until(|parser, token| parser.at_top_level_sync(token));
            if self.peek().kind == TokenKind::Semi {
                self.advance();
            }
        }
        result
    }

    fn parse_namespace(&mut self) -> Result<ast::NamespaceDecl, ParseError> {
        let keyword = self.advance();
        let path = self.parse_path().map_err(|error| {
            self.skip_until(|parser, token| parser.at_top_level_sync(token));
            error
        })?;
        self.expect_token(TokenKind::LeftBrace).map_err(|error| {
            self.skip_until(|parser, token| parser.at_top_level_sync(token));
            error
        })?;

        let mut classes = vec![];
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
                TokenKind::Ident if self.is_keyword(token, "class") => {
                    if let Ok(class) = self.parse_class() {
                        classes.push(class);
                    } else {
                        self.skip_until(|parser, token| {
                            token.kind == TokenKind::RightBrace
                                || parser.is_keyword(token, "class")
                        });
                    }
                }
                _ => {
                    self.error_at(token, "E0105", "expected a class declaration");
                    self.skip_until(|parser, token| {
                        token.kind == TokenKind::RightBrace || parser.is_keyword(token, "class")
                    });
                }
            }
        };
        Ok(ast::NamespaceDecl {
            span: keyword.span.join(&end),
            path,
            classes,
        })
    }

    fn parse_class(&mut self) -> Result<ast::ClassDecl, ParseError> {
        let keyword = self.advance();
        let name = self.expect_ident()?;
        self.expect_token(TokenKind::LeftBrace)?;

        let mut members = vec![];
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
                TokenKind::Ident => {
                    if let Some(member) = self.parse_class_member() {
                        members.push(member);
                    }
                }
                _ => {
                    self.error_at(token, "E0106", "expected a member declaration");
                    self.advance();
                }
            }
        };
        Ok(ast::ClassDecl {
            span: keyword.span.join(&end),
            name,
            members,
        })
    }
}

/// # Members
impl<'a> Parser<'a> {
    fn parse_type(&mut self) -> Result<TypeExpr, ParseError> {
        Ok(TypeExpr {
            name: self.expect_ident()?,
        })
    }

    fn parse_class_member(&mut self) -> Option<MemberDecl> {
        let checkpoint = (self.parse_type(), self.expect_ident());
        let (Ok(ty), Ok(name)) = checkpoint else {
            self.recover_member(MemberContext::Class);
            return None;
        };
        match self.parse_member_rest(ty.clone(), name.clone(), MemberContext::Class) {
            Ok(member) => Some(member),
            Err(_) => {
                self.recover_member(MemberContext::Class);
                Some(MemberDecl::Field(FieldDecl {
                    ty,
                    name,
                    init: None,
                }))
            }
        }
    }

    fn parse_orphan_member(&mut self) -> Option<MemberDecl> {
        let Ok(ty) = self.parse_type() else {
            self.recover_member(MemberContext::TopLevel);
            return None;
        };
        let Ok(name) = self.expect_ident() else {
            self.recover_member(MemberContext::TopLevel);
            return None;
        };
        match self.parse_member_rest(ty.clone(), name.clone(), MemberContext::TopLevel) {
            Ok(member) => Some(member),
            Err(_) => Some(MemberDecl::Field(FieldDecl {
                ty,
                name,
                init: None,
            })),
        }
    }

    /// Parses the remainder of a member declaration after its type and name.
    fn parse_member_rest(
        &mut self,
        ty: TypeExpr,
        name: Ident,
        context: MemberContext,
    ) -> Result<MemberDecl, ParseError> {
        let token = self.peek();
        match token.kind {
            TokenKind::Semi => {
                self.advance();
                Ok(MemberDecl::Field(FieldDecl {
                    ty,
                    name,
                    init: None,
                }))
            }
            TokenKind::Assign => {
                self.advance();
                let init = self.parse_expr()?;
                self.expect_semi()?;
                Ok(MemberDecl::Field(FieldDecl {
                    ty,
                    name,
                    init: Some(init),
                }))
            }
            TokenKind::LeftParen => {
                self.advance();
                let params = self.parse_params()?;
                let body = self.parse_block()?;
                Ok(MemberDecl::Method(MethodDecl {
                    return_ty: ty,
                    name,
                    params,
                    body,
                }))
            }
            _ => {
                self.error_at(token, "E0101", "`;` expected");
                // Inside a class an identifier here most likely starts the
                // next member, so leave it alone. Anywhere else, bail to the
                // closest item boundary.
                if !(context == MemberContext::Class && token.kind == TokenKind::Ident) {
                    self.recover_member(context);
                }
                Ok(MemberDecl::Field(FieldDecl {
                    ty,
                    name,
                    init: None,
                }))
            }
        }
    }

    fn parse_params(&mut self) -> Result<Vec<Param>, ParseError> {
        let mut params = vec![];
        if self.peek().kind == TokenKind::RightParen {
            self.advance();
            return Ok(params);
        }
        loop {
            let ty = self.parse_type()?;
            let name = self.expect_ident()?;
            params.push(Param { ty, name });
            match self.peek().kind {
                TokenKind::Comma => {
                    self.advance();
                }
                _ => {
                    self.expect_token(TokenKind::RightParen)?;
                    return Ok(params);
                }
            }
        }
    }

    /// Skips past the remains of an unparsable member declaration.
    ///
    /// At the top level the `;` is deliberately left in the stream; the item
    /// loop reports it as not being a valid start of an item, which mirrors
    /// what the member was told about itself.
    fn recover_member(&mut self, context: MemberContext) {
        match context {
            MemberContext::TopLevel => {
                self.skip_until(|parser, token| parser.at_top_level_sync(token));
            }
            MemberContext::Class => {
                self.skip_until(|_, token| {
                    matches!(token.kind, TokenKind::Semi | TokenKind::RightBrace)
                });
                if self.peek().kind == TokenKind::Semi {
                    self.advance();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use emberscript_foundation::{
        errors::Diagnostic,
        source::{SourceFile, SourceFileSet},
    };
    use emberscript_lexer::Lexer;
    use indoc::indoc;

    use super::*;

    fn parse(input: &str) -> (File, Vec<Diagnostic>) {
        let mut files = SourceFileSet::new();
        let file = files.add(SourceFile::new("test".into(), input.into()));
        let mut diagnostics = vec![];
        let tokens = Lexer::new(file, input, &mut diagnostics).lex();
        let parsed = Parser::new(file, input, &tokens, &mut diagnostics).parse_file();
        (parsed, diagnostics)
    }

    fn codes(diagnostics: &[Diagnostic]) -> Vec<&str> {
        diagnostics
            .iter()
            .map(|diagnostic| diagnostic.code.as_deref().unwrap_or(""))
            .collect()
    }

    #[test]
    fn empty_input_parses_to_an_empty_file() {
        let (file, diagnostics) = parse("");
        assert!(file.usings.is_empty());
        assert!(file.namespaces.is_empty());
        assert!(file.orphans.is_empty());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn parses_a_class_with_fields_and_methods() {
        let (file, diagnostics) = parse(indoc! {r#"
            using System;

            namespace TestNamespace {
                class TestClass {
                    int testField;
                    string greeting = "hello";

                    void voidMethod() {
                    }

                    string concat(string a, string b) {
                        return a + b;
                    }
                }
            }
        "#});
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        assert_eq!(file.usings.len(), 1);
        assert_eq!(file.usings[0].path.dotted(), "System");
        assert_eq!(file.namespaces.len(), 1);
        let namespace = &file.namespaces[0];
        assert_eq!(namespace.path.dotted(), "TestNamespace");
        assert_eq!(namespace.classes.len(), 1);
        let class = &namespace.classes[0];
        assert_eq!(class.name.name, "TestClass");
        assert_eq!(class.members.len(), 4);
    }

    #[test]
    fn mangled_using_produces_the_canonical_recovery_sequence() {
        let (file, diagnostics) = parse("usi ng System;");
        assert_eq!(codes(&diagnostics), vec!["E0102", "E0101", "E0103"]);
        assert_eq!(file.orphans.len(), 1);
        let orphan = &file.orphans[0];
        assert_eq!(orphan.declared_type().name.name, "usi");
        assert_eq!(orphan.name().name, "ng");
    }

    #[test]
    fn keywords_are_case_insensitive() {
        let (file, diagnostics) = parse("NAMESPACE A { Class B { } }");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        assert_eq!(file.namespaces.len(), 1);
        assert_eq!(file.namespaces[0].classes.len(), 1);
    }

    #[test]
    fn missing_member_semicolon_recovers_within_the_class() {
        let (file, diagnostics) = parse(indoc! {"
            namespace A {
                class B {
                    int x
                    int y;
                }
            }
        "});
        assert_eq!(codes(&diagnostics), vec!["E0101"]);
        let class = &file.namespaces[0].classes[0];
        assert_eq!(class.members.len(), 2);
    }
}
