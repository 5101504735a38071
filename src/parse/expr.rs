use super::{Parser, Placeholder};
use crate::{
    err::{CompileError, Result},
    lex::{Span, TokenKind::*},
    parse::ast::{ArithOp, Builtin, CallTarget, CmpOp, Expr, Lit, LogicOp, MethodCall, Ty},
    symbol::Symbol,
};

/// A binary operator family that can be climbed by [`prioritize`].
trait Operator: Copy {
    fn priority(self) -> u8;
    fn combine(self, left: Expr, right: Expr) -> Expr;
}

impl Operator for ArithOp {
    fn priority(self) -> u8 {
        ArithOp::priority(self)
    }

    fn combine(self, left: Expr, right: Expr) -> Expr {
        Expr::Calculation {
            op: self,
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}

impl Operator for LogicOp {
    fn priority(self) -> u8 {
        LogicOp::priority(self)
    }

    fn combine(self, left: Expr, right: Expr) -> Expr {
        Expr::Logical {
            op: self,
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}

/// Builds a tree from `first op1 e1 op2 e2 ...` by splitting at the
/// lowest-priority operator, taking the rightmost one among ties.
fn prioritize<O: Operator>(first: Expr, mut rest: Vec<(O, Expr)>) -> Expr {
    let split = rest
        .iter()
        .enumerate()
        .rev()
        .min_by_key(|(_, (op, _))| op.priority())
        .map(|(i, _)| i);
    let i = match split {
        Some(i) => i,
        None => return first,
    };

    let tail = rest.split_off(i + 1);
    match rest.pop() {
        Some((op, pivot)) => {
            let left = prioritize(first, rest);
            let right = prioritize(pivot, tail);
            op.combine(left, right)
        }
        None => first,
    }
}

impl Parser {
    /// Parses a value expression. `expected` is the type of whatever receives
    /// the value and drives literal conversion.
    pub(super) fn parse_expression(&mut self, expected: Option<Ty>) -> Result<Expr> {
        if self.logical_follows() {
            self.logical_chain()
        } else {
            self.arithmetic_chain(expected)
        }
    }

    /// Scans the tokens of the expression starting at the current token and
    /// reports whether a logical or comparison operator joins it outside any
    /// parentheses. Only the lexer moves, and it is put back afterwards.
    pub(super) fn logical_follows(&mut self) -> bool {
        let cursor = self.lexer.snapshot();
        let mut token = self.curr.clone();
        let mut depth = 0usize;

        let logical = loop {
            match token.kind {
                Quote => {
                    self.lexer.set_position(token.span.hi());
                    self.lexer.string_content();
                    self.lexer.advance();
                }
                OpenParen => depth += 1,
                CloseParen if depth == 0 => break false,
                CloseParen => depth -= 1,
                Logical | Comparer if depth == 0 => break true,
                Equals if depth == 0 => break self.lexer.advance().kind == Equals,
                SemiColon | Comma if depth == 0 => break false,
                OpenBrace | CloseBrace | Eof => break false,
                _ => {}
            }
            token = self.lexer.advance();
        };

        self.lexer.restore(cursor);
        logical
    }

    fn logical_chain(&mut self) -> Result<Expr> {
        let first = self.logical_operand(None)?;
        let ctx = Some(self.expr_ty(&first));

        let mut rest = vec![];
        while self.check(Logical) {
            let op = self.bump_op(LogicOp::from_text, "logical operator")?;
            rest.push((op, self.logical_operand(ctx)?));
        }
        Ok(prioritize(first, rest))
    }

    /// An arithmetic chain, optionally compared against a second one.
    fn logical_operand(&mut self, ctx: Option<Ty>) -> Result<Expr> {
        let left = self.arithmetic_chain(ctx)?;
        let op = match self.comparison_operator()? {
            Some(op) => op,
            None => return Ok(left),
        };

        let ty = self.expr_ty(&left);
        let right = self.arithmetic_chain(Some(ty))?;
        Ok(Expr::Predicate {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn comparison_operator(&mut self) -> Result<Option<CmpOp>> {
        if self.next_kinds_are(&[Equals, Equals]) {
            self.bump();
            self.bump();
            return Ok(Some(CmpOp::Eq));
        }
        if !self.check(Comparer) {
            return Ok(None);
        }

        let token = self.curr.clone();
        self.bump();
        let or_equal = self.eat(Equals);
        let op = match (token.symbol.to_string().as_str(), or_equal) {
            (">", false) => CmpOp::Gt,
            (">", true) => CmpOp::Ge,
            ("<", false) => CmpOp::Lt,
            ("<", true) => CmpOp::Le,
            ("!", true) => CmpOp::Ne,
            _ => {
                return Err(CompileError::Expected {
                    expected: "comparison operator",
                    found: token.symbol,
                    span: token.span,
                })
            }
        };
        Ok(Some(op))
    }

    /// Values joined by `+ - * / %`. Without an outer context the type of
    /// the first operand types the literals that follow it.
    fn arithmetic_chain(&mut self, expected: Option<Ty>) -> Result<Expr> {
        let first = self.parse_value(expected)?;
        let ctx = expected.or_else(|| Some(self.expr_ty(&first)));

        let mut rest = vec![];
        while self.check(Arithmetic) {
            let op = self.bump_op(ArithOp::from_text, "arithmetic operator")?;
            rest.push((op, self.parse_value(ctx)?));
        }
        Ok(prioritize(first, rest))
    }

    fn bump_op<O>(&mut self, f: fn(&str) -> Option<O>, what: &'static str) -> Result<O> {
        match self.curr.symbol.as_str_with(f) {
            Some(op) => {
                self.bump();
                Ok(op)
            }
            None => Err(self.expected(what)),
        }
    }

    fn parse_value(&mut self, ctx: Option<Ty>) -> Result<Expr> {
        let kind = self.curr.kind;
        match kind {
            OpenParen => {
                self.bump();
                let inner = self.parse_expression(ctx)?;
                self.consume(CloseParen)?;
                Ok(inner)
            }
            Quote => {
                let (text, _) = self.string_literal()?;
                Ok(Expr::Literal(Lit::Str(text.to_string().into())))
            }
            Arithmetic if self.curr.is_op("-") && self.digits_follow() => {
                let minus = self.curr.span;
                self.bump();
                let (text, span) = self.number_text()?;
                self.literal(&format!("-{}", text), ctx, minus.to(span))
            }
            Ident if self.curr.symbol.as_str_with(starts_with_digit) => {
                let (text, span) = self.number_text()?;
                self.literal(&text, ctx, span)
            }
            Ident => {
                let token = self.curr.clone();
                if let Some(expr) = self.reference(token.symbol) {
                    self.bump();
                    return Ok(expr);
                }
                if self.next_kinds_are(&[Ident, OpenParen]) || self.next_kinds_are(&[Ident, Dot]) {
                    return Ok(Expr::Call(self.method_call()?));
                }
                self.bump();
                self.literal(&token.symbol.to_string(), ctx, token.span)
            }
            _ => Err(self.expected("value")),
        }
    }

    /// Whether the token after the current one is a digit run.
    fn digits_follow(&mut self) -> bool {
        self.look_ahead(1)
            .first()
            .map_or(false, |t| t.kind == Ident && t.symbol.as_str_with(starts_with_digit))
    }

    /// A digit run, joined with `. digits` when a fraction follows.
    fn number_text(&mut self) -> Result<(String, Span)> {
        let int = self.consume(Ident)?;
        let mut text = int.symbol.to_string();
        let mut span = int.span;

        if self.check(Dot) {
            let next = self.look_ahead(1);
            let fraction = next
                .first()
                .filter(|t| t.kind == Ident && t.symbol.as_str_with(starts_with_digit));
            if let Some(fraction) = fraction {
                text.push('.');
                text.push_str(&fraction.symbol.to_string());
                span = span.to(fraction.span);
                self.bump();
                self.bump();
            }
        }
        Ok((text, span))
    }

    /// Converts literal text using the context type.
    fn literal(&self, text: &str, ctx: Option<Ty>, span: Span) -> Result<Expr> {
        let numeric = text.starts_with(|c: char| c.is_ascii_digit() || c == '-');
        let ty = ctx.filter(|ty| !matches!(ty, Ty::Object | Ty::Void));

        let lit = match ty {
            Some(ty) if !(numeric && matches!(ty, Ty::Str | Ty::Bool)) => Lit::parse(text, ty),
            _ => Lit::infer(text),
        };

        match lit {
            Some(lit) => Ok(Expr::Literal(lit)),
            None if !numeric => Err(CompileError::UnknownIdentifier {
                name: Symbol::intern(text),
                span: Some(span),
            }),
            None => Err(CompileError::InvalidLiteral {
                text: Symbol::intern(text),
                ty: ty.unwrap_or(Ty::Object),
                span,
            }),
        }
    }

    /// `Name(args)` or `Owner.Name(args)`, where the owner is the class
    /// itself or `this`.
    pub(super) fn method_call(&mut self) -> Result<MethodCall> {
        let first = self.consume(Ident)?;
        let name = if self.eat(Dot) {
            if first.symbol != self.name && !first.symbol.is("this") {
                return Err(CompileError::UnknownIdentifier {
                    name: first.symbol,
                    span: Some(first.span),
                });
            }
            self.consume(Ident)?
        } else {
            first
        };

        self.consume(OpenParen)?;
        let builtin = name.symbol.as_str_with(Builtin::from_name);
        let mut args = vec![];
        if !self.check(CloseParen) {
            loop {
                let ctx = self.argument_ty(name.symbol, builtin, args.len());
                args.push(self.parse_expression(ctx)?);
                if !self.eat(Comma) {
                    break;
                }
            }
        }
        self.consume(CloseParen)?;

        let span = name.span;
        let target = match builtin {
            Some(b) => {
                let arity = b.arity();
                if !arity.contains(&args.len()) {
                    let expected = if arity.start() == arity.end() {
                        arity.start().to_string()
                    } else {
                        format!("{} to {}", arity.start(), arity.end())
                    };
                    return Err(CompileError::ArityMismatch {
                        name: name.symbol,
                        expected,
                        found: args.len(),
                        span,
                    });
                }
                CallTarget::Builtin(b)
            }
            None => {
                self.placeholders.push(Placeholder {
                    name: name.symbol,
                    span,
                    argc: args.len(),
                });
                CallTarget::Pending(self.placeholders.len() - 1)
            }
        };

        Ok(MethodCall {
            name: name.symbol,
            span,
            target,
            args,
        })
    }

    fn argument_ty(&self, method: Symbol, builtin: Option<Builtin>, index: usize) -> Option<Ty> {
        match builtin {
            Some(Builtin::RandomInt) => Some(Ty::Int),
            Some(_) => None,
            None => self
                .signatures
                .get(&method)
                .and_then(|s| s.params.get(index).copied()),
        }
    }
}

fn starts_with_digit(s: &str) -> bool {
    s.starts_with(|c: char| c.is_ascii_digit())
}
