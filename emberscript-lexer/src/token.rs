use std::fmt;

use bitflags::bitflags;
use emberscript_foundation::source::{Span, Spanned};

/// Passes all the token kinds as a sequence of `Kind = "name",` pairs into
/// the provided macro.
#[macro_export]
macro_rules! expand_tokens {
    ($x:path) => {
        $x! {
            Comment = "comment",

            Ident = "identifier",

            IntLit    = "int literal",
            FloatLit  = "float literal",
            StringLit = "string literal",

            Add          = "`+`",
            Sub          = "`-`",
            Mul          = "`*`",
            Div          = "`/`",
            Rem          = "`%`",
            Not          = "`!`",
            Equal        = "`==`",
            NotEqual     = "`!=`",
            Less         = "`<`",
            Greater      = "`>`",
            LessEqual    = "`<=`",
            GreaterEqual = "`>=`",
            And          = "`&&`",
            Or           = "`||`",

            Assign = "`=`",
            Dot    = "`.`",

            LeftParen  = "`(`",
            RightParen = "`)`",
            LeftBrace  = "`{`",
            RightBrace = "`}`",
            Comma      = "`,`",
            Semi       = "`;`",

            // Produced for characters the lexer cannot make sense of; carries
            // a diagnostic alongside.
            Error = "error",
            EndOfFile = "end of file",
        }
    };
}

macro_rules! token_kind_enum {
    ($($name:tt = $pretty_name:tt),* $(,)?) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
        pub enum TokenKind {
            $($name),*
        }

        impl TokenKind {
            /// Human-readable name used in "x expected" diagnostics.
            pub fn pretty_name(&self) -> &'static str {
                match self {
                    $(TokenKind::$name => $pretty_name),*
                }
            }
        }
    }
}

expand_tokens!(token_kind_enum);

bitflags! {
    /// Token channels. The parser only listens to [`Channel::CODE`];
    /// comments and error tokens ride on side channels.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Channel: u8 {
        const CODE    = 0x1;
        const COMMENT = 0x2;
        const ERROR   = 0x4;
    }
}

impl TokenKind {
    pub const fn channel(&self) -> Channel {
        match self {
            TokenKind::Comment => Channel::COMMENT,
            TokenKind::Error => Channel::ERROR,
            _ => Channel::CODE,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    /// The token's text within the unit it was lexed from.
    pub fn text<'a>(&self, input: &'a str) -> &'a str {
        self.span.get_input(input)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({:?})", self.kind, self.span)
    }
}

impl Spanned for Token {
    fn span(&self) -> Span {
        self.span
    }
}
