use crate::{
    lex::{Span, Token, TokenKind, TokenKind::*},
    symbol::Symbol,
};
use std::{collections::HashMap, rc::Rc};

/// Saved lexer position, see [`Lexer::snapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pos: usize,
}

pub struct Lexer {
    src: Rc<str>,
    start_pos: usize,
    pos: usize,
    keywords: HashMap<Symbol, TokenKind>,
}

impl Lexer {
    pub fn new(src: Rc<str>) -> Self {
        Self {
            src,
            start_pos: 0,
            pos: 0,
            keywords: keywords(),
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos.min(self.src.len());
        self.start_pos = self.pos;
    }

    pub fn snapshot(&self) -> Cursor {
        Cursor { pos: self.pos }
    }

    pub fn restore(&mut self, cursor: Cursor) {
        self.set_position(cursor.pos);
    }

    /// Produces the next token. Never fails: unknown characters become
    /// `Error` tokens and the end of input yields `Eof` forever.
    pub fn advance(&mut self) -> Token {
        while !self.eof() {
            self.start_pos = self.pos;
            if let Some(t) = self.scan_token() {
                return t;
            }
        }

        Token {
            kind: Eof,
            span: Span::new(self.src.len(), self.src.len()),
            symbol: Symbol::intern(""),
        }
    }

    /// Reads raw text up to, but not including, the next `"`.
    pub fn string_content(&mut self) -> (Symbol, Span) {
        self.start_pos = self.pos;
        while self.peek() != b'"' && !self.eof() {
            self.bump();
        }
        (self.mk_symbol(), self.mk_span())
    }

    fn scan_token(&mut self) -> Option<Token> {
        let c = self.peek();
        self.bump();
        let t = match c {
            b'{' => self.add_token(OpenBrace),
            b'}' => self.add_token(CloseBrace),
            b'(' => self.add_token(OpenParen),
            b')' => self.add_token(CloseParen),
            b',' => self.add_token(Comma),
            b'.' => self.add_token(Dot),
            b'=' => self.add_token(Equals),
            b';' => self.add_token(SemiColon),
            b'"' => self.add_token(Quote),
            b'/' if self.peek() == b'/' => {
                self.comment();
                return None;
            }
            b'+' | b'-' | b'*' | b'/' | b'%' => self.add_token(Arithmetic),
            b'&' | b'|' | b'^' => self.add_token(Logical),
            b'<' | b'>' | b'!' => self.add_token(Comparer),
            b' ' | b'\r' | b'\t' | b'\n' => {
                return None;
            }
            c if c.is_ascii_digit() => self.number(),
            c if is_ident_start(c) => self.ident(),
            _ => {
                // Skip the rest of a multi-byte character.
                while !self.src.is_char_boundary(self.pos) {
                    self.pos += 1;
                }
                log::trace!("invalid character at {}", self.start_pos);
                self.add_token(Error)
            }
        };
        Some(t)
    }

    fn add_token(&mut self, kind: TokenKind) -> Token {
        Token::new(kind, self.mk_symbol(), self.mk_span())
    }

    fn mk_span(&self) -> Span {
        Span::new(self.start_pos, self.pos)
    }

    fn mk_symbol(&self) -> Symbol {
        Symbol::intern(&self.src[self.start_pos..self.pos])
    }

    fn number(&mut self) -> Token {
        while self.peek().is_ascii_digit() {
            self.bump();
        }
        self.add_token(Ident)
    }

    fn ident(&mut self) -> Token {
        while is_ident_continue(self.peek()) {
            self.bump();
        }

        let symbol = self.mk_symbol();
        let kind = self.keywords.get(&symbol).copied().unwrap_or(Ident);
        self.add_token(kind)
    }

    fn comment(&mut self) {
        while self.peek() != b'\n' && !self.eof() {
            self.bump();
        }
    }

    fn eof(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> u8 {
        self.src.as_bytes().get(self.pos).copied().unwrap_or_default()
    }

    fn bump(&mut self) {
        self.pos += 1;
    }
}

fn is_ident_start(c: u8) -> bool {
    matches!(c, b'a'..=b'z' | b'A'..=b'Z' | b'_')
}

fn is_ident_continue(c: u8) -> bool {
    matches!(c, b'a'..=b'z' | b'A'..=b'Z' | b'_' | b'0'..=b'9')
}

pub const TYPE_KEYWORDS: &[&str] = &[
    "int", "long", "short", "byte", "char", "float", "double", "bool", "string", "object", "void",
];

fn keywords() -> HashMap<Symbol, TokenKind> {
    let mut m = HashMap::new();
    m.insert(Symbol::intern("class"), Class);
    m.insert(Symbol::intern("if"), If);
    m.insert(Symbol::intern("else"), Else);
    m.insert(Symbol::intern("while"), While);
    m.insert(Symbol::intern("return"), Return);
    for ty in TYPE_KEYWORDS {
        m.insert(Symbol::intern(ty), Type);
    }
    m
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(src.into());
        let mut out = vec![];
        loop {
            let t = lexer.advance();
            out.push(t.kind);
            if t.kind == Eof {
                return out;
            }
        }
    }

    #[test]
    fn classify() {
        assert_eq!(
            kinds("class Foo { int x = 12; }"),
            vec![Class, Ident, OpenBrace, Type, Ident, Equals, Ident, SemiColon, CloseBrace, Eof]
        );
        assert_eq!(
            kinds("a >= b & c % 2"),
            vec![Ident, Comparer, Equals, Ident, Logical, Ident, Arithmetic, Ident, Eof]
        );
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(kinds("x // trailing { }\ny / z"), vec![Ident, Ident, Arithmetic, Ident, Eof]);
    }

    #[test]
    fn eof_is_idempotent() {
        let mut lexer = Lexer::new("x".into());
        assert_eq!(lexer.advance().kind, Ident);
        let pos = lexer.position();
        for _ in 0..3 {
            let t = lexer.advance();
            assert_eq!(t.kind, Eof);
            assert_eq!(lexer.position(), pos);
        }
    }

    #[test]
    fn unknown_char_is_error_token() {
        let mut lexer = Lexer::new("#x é".into());
        let t = lexer.advance();
        assert_eq!(t.kind, Error);
        assert_eq!(t.symbol.to_string(), "#");
        assert_eq!(lexer.position(), 1);
        assert_eq!(lexer.advance().kind, Ident);
        let t = lexer.advance();
        assert_eq!(t.kind, Error);
        assert_eq!(t.symbol.to_string(), "é");
        assert_eq!(lexer.advance().kind, Eof);
    }

    #[test]
    fn snapshot_restore() {
        let mut lexer = Lexer::new("a b c".into());
        lexer.advance();
        let cursor = lexer.snapshot();
        assert!(lexer.advance().symbol.is("b"));
        assert!(lexer.advance().symbol.is("c"));
        lexer.restore(cursor);
        assert!(lexer.advance().symbol.is("b"));
    }

    #[test]
    fn raw_string_content() {
        let mut lexer = Lexer::new("\"hello, world!\";".into());
        assert_eq!(lexer.advance().kind, Quote);
        let (text, span) = lexer.string_content();
        assert_eq!(text.to_string(), "hello, world!");
        assert_eq!(span, Span::new(1, 14));
        assert_eq!(lexer.advance().kind, Quote);
        assert_eq!(lexer.advance().kind, SemiColon);
    }
}
