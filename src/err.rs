use crate::{
    lex::{Span, TokenKind},
    parse::ast::Ty,
    symbol::Symbol,
};
use std::rc::Rc;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CompileError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Syntax,
    Binding,
    Type,
    Generation,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    // Syntax
    #[error("expected {expected}, found `{found}`")]
    UnexpectedToken {
        expected: TokenKind,
        found: Symbol,
        span: Span,
    },
    #[error("expected {expected}, found `{found}`")]
    Expected {
        expected: &'static str,
        found: Symbol,
        span: Span,
    },

    // Binding
    #[error("unknown identifier `{name}`")]
    UnknownIdentifier { name: Symbol, span: Option<Span> },
    #[error("{what} `{name}` is already defined")]
    Duplicate {
        what: &'static str,
        name: Symbol,
        span: Span,
    },
    #[error("`{name}` is a built-in method and cannot be redefined")]
    Reserved { name: Symbol, span: Span },
    #[error("no method named `{name}`")]
    UnresolvedMethod { name: Symbol, span: Span },
    #[error("`{name}` takes {expected} argument(s) but {found} were supplied")]
    ArityMismatch {
        name: Symbol,
        expected: String,
        found: usize,
        span: Span,
    },

    // Type
    #[error("`{text}` is not a valid {ty} literal")]
    InvalidLiteral { text: Symbol, ty: Ty, span: Span },
    #[error("mismatched types in {context}: expected {expected}, found {found}")]
    TypeMismatch {
        expected: Ty,
        found: Ty,
        context: String,
    },
    #[error("operator `{op}` is not supported for {ty}")]
    UnsupportedOperator { op: &'static str, ty: Ty },
    #[error("cannot increment `{name}` of type {ty}")]
    NonNumericIncrement { name: Symbol, ty: Ty, span: Span },
    #[error("{what} cannot be void")]
    VoidNotAllowed { what: String, span: Option<Span> },
    #[error("method `{method}` must return a value of type {ty} on every path")]
    MissingReturn { method: Symbol, ty: Ty },
    #[error("void method `{method}` cannot return a value")]
    UnexpectedReturnValue { method: Symbol },

    // Generation
    #[error("no emit target for {node}")]
    NoEmitTarget { node: &'static str },
    #[error("call to `{name}` was never resolved")]
    UnpatchedCall { name: Symbol },
    #[error("label {0} was never marked")]
    UnmarkedLabel(u32),
}

impl CompileError {
    pub fn kind(&self) -> ErrorKind {
        use CompileError::*;
        match self {
            UnexpectedToken { .. } | Expected { .. } => ErrorKind::Syntax,
            UnknownIdentifier { .. }
            | Duplicate { .. }
            | Reserved { .. }
            | UnresolvedMethod { .. }
            | ArityMismatch { .. } => ErrorKind::Binding,
            InvalidLiteral { .. }
            | TypeMismatch { .. }
            | UnsupportedOperator { .. }
            | NonNumericIncrement { .. }
            | VoidNotAllowed { .. }
            | MissingReturn { .. }
            | UnexpectedReturnValue { .. } => ErrorKind::Type,
            NoEmitTarget { .. } | UnpatchedCall { .. } | UnmarkedLabel(_) => ErrorKind::Generation,
        }
    }

    pub fn span(&self) -> Option<Span> {
        use CompileError::*;
        match *self {
            UnexpectedToken { span, .. }
            | Expected { span, .. }
            | Duplicate { span, .. }
            | Reserved { span, .. }
            | UnresolvedMethod { span, .. }
            | ArityMismatch { span, .. }
            | InvalidLiteral { span, .. }
            | NonNumericIncrement { span, .. } => Some(span),
            UnknownIdentifier { span, .. } | VoidNotAllowed { span, .. } => span,
            _ => None,
        }
    }
}

/// Renders diagnostics against the source they were raised for.
pub struct Handler {
    src: Rc<str>,
}

impl Handler {
    pub fn new(src: &Rc<str>) -> Self {
        Self { src: src.clone() }
    }

    pub fn report(&self, err: &CompileError) {
        println!("{}", self.render(err));
    }

    /// The offending line with a caret underline, or just the message when
    /// the error has no location.
    pub fn render(&self, err: &CompileError) -> String {
        let span = match err.span() {
            Some(span) if !self.src.is_empty() => span.clamp_to(&self.src),
            _ => return format!("error: {}", err),
        };

        let line = span.line_in(&self.src);
        let width = span.hi().min(line.end).saturating_sub(span.lo()).max(1);
        format!(
            "{}\n{}{} {}",
            &self.src[line.clone()],
            " ".repeat(span.lo() - line.start),
            "^".repeat(width),
            err
        )
    }
}
