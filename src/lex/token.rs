use crate::lex::Span;
use crate::symbol::Symbol;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub symbol: Symbol,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, symbol: Symbol, span: Span) -> Self {
        Self { kind, symbol, span }
    }

    pub fn dummy() -> Self {
        Self {
            kind: TokenKind::Eof,
            symbol: Symbol::intern(""),
            span: Span::DUMMY,
        }
    }

    /// Whether this is an operator token with exactly the text `op`.
    pub fn is_op(&self, op: &str) -> bool {
        self.kind.is_op() && self.symbol.is(op)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Single-character tokens.
    OpenBrace,
    CloseBrace,
    OpenParen,
    CloseParen,
    Comma,
    Dot,
    Equals,
    SemiColon,
    Quote,

    // Operator families. The concrete operator is the token text.
    Arithmetic,
    Logical,
    Comparer,

    // Identifiers and digit runs.
    Ident,
    Type,

    // Keywords
    Class,
    If,
    Else,
    While,
    Return,

    Eof,
    Error,
}

impl TokenKind {
    pub fn is_op(&self) -> bool {
        use TokenKind::*;
        matches!(self, Arithmetic | Logical | Comparer)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use TokenKind::*;
        let s = match self {
            OpenBrace => "'{'",
            CloseBrace => "'}'",
            OpenParen => "'('",
            CloseParen => "')'",
            Comma => "','",
            Dot => "'.'",
            Equals => "'='",
            SemiColon => "';'",
            Quote => "'\"'",
            Arithmetic => "arithmetic operator",
            Logical => "logical operator",
            Comparer => "comparison operator",
            Ident => "identifier",
            Type => "type name",
            Class => "'class'",
            If => "'if'",
            Else => "'else'",
            While => "'while'",
            Return => "'return'",
            Eof => "end of file",
            Error => "invalid character",
        };
        f.write_str(s)
    }
}
