use emberscript_foundation::{
    errors::{Diagnostic, DiagnosticSink, Label},
    source::{SourceFileId, Span},
};

use crate::token::{Token, TokenKind};

pub struct Lexer<'a> {
    pub file: SourceFileId,
    pub input: &'a str,
    pub position: usize,

    diagnostics: &'a mut dyn DiagnosticSink,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(file: SourceFileId, input: &'a str, diagnostics: &'a mut dyn DiagnosticSink) -> Self {
        Self {
            file,
            input,
            position: 0,
            diagnostics,
            tokens: vec![],
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn advance_char(&mut self) {
        if let Some(char) = self.current_char() {
            self.position += char.len_utf8();
        }
    }

    fn span(&self, start: usize) -> Span {
        Span::new(start, self.position)
    }

    fn push_token(&mut self, kind: TokenKind, start: usize) {
        self.tokens.push(Token {
            kind,
            span: self.span(start),
        });
    }

    fn skip_whitespace(&mut self) {
        while let Some(' ' | '\t' | '\r' | '\n') = self.current_char() {
            self.advance_char();
        }
    }

    fn comment_or_division(&mut self, start: usize) {
        self.advance_char();
        match self.current_char() {
            Some('/') => {
                while !matches!(self.current_char(), None | Some('\n')) {
                    self.advance_char();
                }
                self.push_token(TokenKind::Comment, start);
            }
            Some('*') => {
                self.advance_char();
                loop {
                    match self.current_char() {
                        Some('*') => {
                            self.advance_char();
                            if self.current_char() == Some('/') {
                                self.advance_char();
                                self.push_token(TokenKind::Comment, start);
                                break;
                            }
                        }
                        None => {
                            self.push_token(TokenKind::Error, start);
                            self.diagnostics.emit(
                                Diagnostic::error(
                                    self.file,
                                    "block comment does not have a matching `*/` terminator",
                                )
                                .with_code("E0003")
                                .with_label(Label::primary(
                                    Span::new(start, start + 2),
                                    "the comment starts here",
                                )),
                            );
                            break;
                        }
                        _ => self.advance_char(),
                    }
                }
            }
            _ => self.push_token(TokenKind::Div, start),
        }
    }

    fn identifier(&mut self, start: usize) {
        while let Some('a'..='z' | 'A'..='Z' | '0'..='9' | '_') = self.current_char() {
            self.advance_char();
        }
        self.push_token(TokenKind::Ident, start);
    }

    fn number(&mut self, start: usize) {
        while let Some('0'..='9') = self.current_char() {
            self.advance_char();
        }
        if self.current_char() == Some('.')
            && matches!(
                self.input[self.position + 1..].chars().next(),
                Some('0'..='9')
            )
        {
            self.advance_char();
            while let Some('0'..='9') = self.current_char() {
                self.advance_char();
            }
            self.push_token(TokenKind::FloatLit, start);
        } else {
            self.push_token(TokenKind::IntLit, start);
        }
    }

    fn string(&mut self, start: usize) {
        self.advance_char();
        loop {
            match self.current_char() {
                Some('"') => {
                    self.advance_char();
                    self.push_token(TokenKind::StringLit, start);
                    break;
                }
                Some('\\') => {
                    self.advance_char();
                    let escape_start = self.position;
                    match self.current_char() {
                        Some('\\' | '"' | 'n' | 't' | 'r') => self.advance_char(),
                        Some(_) => {
                            self.advance_char();
                            let diagnostic =
                                Diagnostic::error(self.file, "unrecognized escape sequence")
                                    .with_code("E0004")
                                    .with_label(Label::primary(self.span(escape_start - 1), ""));
                            self.diagnostics.emit(diagnostic);
                        }
                        None => (),
                    }
                }
                Some('\n') | None => {
                    self.push_token(TokenKind::Error, start);
                    self.diagnostics.emit(
                        Diagnostic::error(
                            self.file,
                            "string literal does not have a closing `\"`",
                        )
                        .with_code("E0001")
                        .with_label(Label::primary(
                            Span::new(start, start + 1),
                            "the string starts here",
                        )),
                    );
                    break;
                }
                Some(_) => self.advance_char(),
            }
        }
    }

    fn single_or_double(
        &mut self,
        start: usize,
        single: TokenKind,
        next: char,
        double: TokenKind,
    ) {
        self.advance_char();
        if self.current_char() == Some(next) {
            self.advance_char();
            self.push_token(double, start);
        } else {
            self.push_token(single, start);
        }
    }

    /// Lexes the entire input, producing a token list that always ends with
    /// an [`TokenKind::EndOfFile`] token.
    pub fn lex(mut self) -> Vec<Token> {
        loop {
            self.skip_whitespace();
            let start = self.position;
            let Some(char) = self.current_char() else {
                self.push_token(TokenKind::EndOfFile, start);
                break;
            };
            match char {
                'a'..='z' | 'A'..='Z' | '_' => self.identifier(start),
                '0'..='9' => self.number(start),
                '"' => self.string(start),
                '/' => self.comment_or_division(start),
                '+' => {
                    self.advance_char();
                    self.push_token(TokenKind::Add, start);
                }
                '-' => {
                    self.advance_char();
                    self.push_token(TokenKind::Sub, start);
                }
                '*' => {
                    self.advance_char();
                    self.push_token(TokenKind::Mul, start);
                }
                '%' => {
                    self.advance_char();
                    self.push_token(TokenKind::Rem, start);
                }
                '!' => self.single_or_double(start, TokenKind::Not, '=', TokenKind::NotEqual),
                '=' => self.single_or_double(start, TokenKind::Assign, '=', TokenKind::Equal),
                '<' => self.single_or_double(start, TokenKind::Less, '=', TokenKind::LessEqual),
                '>' => {
                    self.single_or_double(start, TokenKind::Greater, '=', TokenKind::GreaterEqual)
                }
                '&' => {
                    self.advance_char();
                    if self.current_char() == Some('&') {
                        self.advance_char();
                        self.push_token(TokenKind::And, start);
                    } else {
                        self.unexpected_character(start, '&');
                    }
                }
                '|' => {
                    self.advance_char();
                    if self.current_char() == Some('|') {
                        self.advance_char();
                        self.push_token(TokenKind::Or, start);
                    } else {
                        self.unexpected_character(start, '|');
                    }
                }
                '.' => {
                    self.advance_char();
                    self.push_token(TokenKind::Dot, start);
                }
                '(' => {
                    self.advance_char();
                    self.push_token(TokenKind::LeftParen, start);
                }
                ')' => {
                    self.advance_char();
                    self.push_token(TokenKind::RightParen, start);
                }
                '{' => {
                    self.advance_char();
                    self.push_token(TokenKind::LeftBrace, start);
                }
                '}' => {
                    self.advance_char();
                    self.push_token(TokenKind::RightBrace, start);
                }
                ',' => {
                    self.advance_char();
                    self.push_token(TokenKind::Comma, start);
                }
                ';' => {
                    self.advance_char();
                    self.push_token(TokenKind::Semi, start);
                }
                other => {
                    self.advance_char();
                    self.unexpected_character(start, other);
                }
            }
        }
        self.tokens
    }

    fn unexpected_character(&mut self, start: usize, char: char) {
        self.push_token(TokenKind::Error, start);
        let diagnostic = Diagnostic::error(self.file, format!("unexpected character {char:?}"))
            .with_code("E0002")
            .with_label(Label::primary(self.span(start), ""));
        self.diagnostics.emit(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use emberscript_foundation::{
        errors::Diagnostic,
        source::{SourceFile, SourceFileSet},
    };

    use super::*;

    fn lex(input: &str) -> (Vec<Token>, Vec<Diagnostic>) {
        let mut files = SourceFileSet::new();
        let file = files.add(SourceFile::new("test".into(), input.into()));
        let mut diagnostics = vec![];
        let tokens = Lexer::new(file, input, &mut diagnostics).lex();
        (tokens, diagnostics)
    }

    fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
        tokens.iter().map(|token| token.kind).collect()
    }

    #[test]
    fn empty_input_is_just_end_of_file() {
        let (tokens, diagnostics) = lex("");
        assert_eq!(kinds(&tokens), vec![TokenKind::EndOfFile]);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn lexes_member_declaration_shape() {
        let (tokens, diagnostics) = lex("string concat(string a) { return a + a; }");
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::Ident,
                TokenKind::Ident,
                TokenKind::LeftParen,
                TokenKind::Ident,
                TokenKind::Ident,
                TokenKind::RightParen,
                TokenKind::LeftBrace,
                TokenKind::Ident,
                TokenKind::Ident,
                TokenKind::Add,
                TokenKind::Ident,
                TokenKind::Semi,
                TokenKind::RightBrace,
                TokenKind::EndOfFile,
            ]
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn string_escapes_and_floats() {
        let (tokens, diagnostics) = lex(r#""a\"b" 12 3.5"#);
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::StringLit,
                TokenKind::IntLit,
                TokenKind::FloatLit,
                TokenKind::EndOfFile,
            ]
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn unterminated_string_is_an_error_token() {
        let (tokens, diagnostics) = lex("\"oops");
        assert_eq!(kinds(&tokens), vec![TokenKind::Error, TokenKind::EndOfFile]);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code.as_deref(), Some("E0001"));
    }

    #[test]
    fn comments_ride_the_comment_channel() {
        let (tokens, _) = lex("// line\n/* block */ x");
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::Comment,
                TokenKind::Comment,
                TokenKind::Ident,
                TokenKind::EndOfFile,
            ]
        );
    }
}
