mod scan;
mod span;
mod token;

pub use scan::{Cursor, Lexer};
pub use span::Span;
pub use token::{Token, TokenKind};
