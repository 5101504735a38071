pub mod ast;
mod expr;
mod stmt;

use crate::{
    err::{CompileError, Result},
    lex::{Lexer, Span, Token, TokenKind, TokenKind::*},
    symbol::{Scope, Symbol, SymbolTable},
};
use ast::{Builtin, CallTarget, Expr, Field, Method, MethodCall, MethodId, Object, Param, Ty};
use std::{collections::HashMap, rc::Rc};

/// Parses a single class declaration.
pub fn parse(src: &str) -> Result<Object> {
    Parser::new(src.into()).parse()
}

/// A call seen before its target was known.
#[derive(Debug)]
struct Placeholder {
    name: Symbol,
    span: Span,
    argc: usize,
}

/// Return and parameter types of a method, collected while skipping its body.
#[derive(Debug)]
struct Signature {
    ret: Ty,
    params: Vec<Ty>,
}

struct MethodScope {
    ret: Ty,
    params: Vec<Param>,
    locals: SymbolTable<Ty>,
    /// Start of the innermost block.
    block: Scope,
}

impl MethodScope {
    fn new(ret: Ty, params: Vec<Param>) -> Self {
        let locals = SymbolTable::new();
        let block = locals.enter();
        Self {
            ret,
            params,
            locals,
            block,
        }
    }
}

pub struct Parser {
    lexer: Lexer,
    curr: Token,
    prev: Token,
    name: Symbol,
    fields: Vec<Field>,
    methods: Vec<Method>,
    signatures: HashMap<Symbol, Signature>,
    placeholders: Vec<Placeholder>,
    scope: Option<MethodScope>,
}

impl Parser {
    pub fn new(src: Rc<str>) -> Self {
        let mut lexer = Lexer::new(src);
        let curr = lexer.advance();
        Self {
            lexer,
            curr,
            prev: Token::dummy(),
            name: Symbol::intern(""),
            fields: vec![],
            methods: vec![],
            signatures: HashMap::new(),
            placeholders: vec![],
            scope: None,
        }
    }

    pub fn parse(&mut self) -> Result<Object> {
        self.name = self.header()?;
        self.parse_fields()?;
        log::debug!("pass 1: {} field(s) in `{}`", self.fields.len(), self.name);

        self.rewind();
        self.header()?;
        self.parse_methods()?;
        log::debug!("pass 2: {} method(s) in `{}`", self.methods.len(), self.name);

        self.consume(CloseBrace)?;
        self.consume(Eof)?;
        self.fix_method_calls()?;

        Ok(Object {
            name: self.name,
            fields: std::mem::take(&mut self.fields),
            methods: std::mem::take(&mut self.methods),
        })
    }

    fn header(&mut self) -> Result<Symbol> {
        self.consume(Class)?;
        let name = self.consume(Ident)?;
        self.consume(OpenBrace)?;
        Ok(name.symbol)
    }

    /// Pass 1: field declarations. Method bodies are skipped, but their
    /// signatures are kept so calls can be typed before the method is parsed.
    fn parse_fields(&mut self) -> Result<()> {
        while !self.check(CloseBrace) && !self.check(Eof) {
            let ty = self.ty()?;
            let name = self.consume(Ident)?;

            if self.check(OpenParen) {
                let params = self.params()?;
                self.skip_braced()?;
                self.signatures.insert(
                    name.symbol,
                    Signature {
                        ret: ty,
                        params: params.iter().map(|p| p.ty).collect(),
                    },
                );
                continue;
            }

            self.consume(Equals)?;
            if ty == Ty::Void {
                return Err(CompileError::VoidNotAllowed {
                    what: format!("field `{}`", name.symbol),
                    span: Some(name.span),
                });
            }
            if self.fields.iter().any(|f| f.name == name.symbol) {
                return Err(CompileError::Duplicate {
                    what: "field",
                    name: name.symbol,
                    span: name.span,
                });
            }

            let init = self.parse_expression(Some(ty))?;
            self.consume(SemiColon)?;
            log::trace!("field `{}: {}`", name.symbol, ty);
            self.fields.push(Field {
                name: name.symbol,
                ty,
                init,
            });
        }
        Ok(())
    }

    /// Pass 2: method declarations. Field declarations are skipped.
    fn parse_methods(&mut self) -> Result<()> {
        while !self.check(CloseBrace) && !self.check(Eof) {
            let ret = self.ty()?;
            let name = self.consume(Ident)?;

            if self.eat(Equals) {
                self.skip_until(SemiColon)?;
                self.consume(SemiColon)?;
                continue;
            }

            let method = self.method(ret, name)?;
            self.methods.push(method);
        }
        Ok(())
    }

    fn method(&mut self, ret: Ty, name: Token) -> Result<Method> {
        let Token { symbol, span, .. } = name;
        if Builtin::from_name(&symbol.to_string()).is_some() {
            return Err(CompileError::Reserved { name: symbol, span });
        }
        if self.methods.iter().any(|m| m.name == symbol) {
            return Err(CompileError::Duplicate {
                what: "method",
                name: symbol,
                span,
            });
        }

        let params = self.params()?;
        self.scope = Some(MethodScope::new(ret, params.clone()));
        let body = self.block();
        self.scope = None;
        let body = body?;

        log::debug!("method `{}` with {} statement(s)", symbol, body.len());
        Ok(Method {
            name: symbol,
            ret,
            params,
            body,
        })
    }

    fn params(&mut self) -> Result<Vec<Param>> {
        self.consume(OpenParen)?;
        let mut params: Vec<Param> = vec![];
        if !self.check(CloseParen) {
            loop {
                let ty = self.ty()?;
                let name = self.consume(Ident)?;
                if ty == Ty::Void {
                    return Err(CompileError::VoidNotAllowed {
                        what: format!("parameter `{}`", name.symbol),
                        span: Some(name.span),
                    });
                }
                if params.iter().any(|p| p.name == name.symbol) {
                    return Err(CompileError::Duplicate {
                        what: "parameter",
                        name: name.symbol,
                        span: name.span,
                    });
                }
                params.push(Param {
                    name: name.symbol,
                    ty,
                });

                if !self.eat(Comma) {
                    break;
                }
            }
        }
        self.consume(CloseParen)?;
        Ok(params)
    }

    fn ty(&mut self) -> Result<Ty> {
        let token = self.consume(Type)?;
        token
            .symbol
            .as_str_with(Ty::from_keyword)
            .ok_or(CompileError::UnexpectedToken {
                expected: Type,
                found: token.symbol,
                span: token.span,
            })
    }

    /// Resolves every placeholder by name and patches the pending targets.
    fn fix_method_calls(&mut self) -> Result<()> {
        let mut resolved = Vec::with_capacity(self.placeholders.len());
        for p in &self.placeholders {
            let id = self
                .methods
                .iter()
                .position(|m| m.name == p.name)
                .ok_or(CompileError::UnresolvedMethod {
                    name: p.name,
                    span: p.span,
                })?;

            let expected = self.methods[id].params.len();
            if expected != p.argc {
                return Err(CompileError::ArityMismatch {
                    name: p.name,
                    expected: expected.to_string(),
                    found: p.argc,
                    span: p.span,
                });
            }
            resolved.push(MethodId(id));
        }

        let mut patch = |call: &mut MethodCall| -> Result<()> {
            if let CallTarget::Pending(idx) = call.target {
                let id = resolved
                    .get(idx)
                    .copied()
                    .ok_or(CompileError::UnpatchedCall { name: call.name })?;
                call.target = CallTarget::Method(id);
            }
            Ok(())
        };

        for field in &mut self.fields {
            field.init.visit_calls_mut(&mut patch)?;
        }
        for method in &mut self.methods {
            for stmt in &mut method.body {
                stmt.visit_calls_mut(&mut patch)?;
            }
        }

        log::debug!("resolved {} call(s)", self.placeholders.len());
        Ok(())
    }

    /// Parameter, then local, then field.
    fn reference(&self, name: Symbol) -> Option<Expr> {
        if let Some(scope) = &self.scope {
            if let Some(index) = scope.params.iter().position(|p| p.name == name) {
                return Some(Expr::Param {
                    index,
                    name,
                    ty: scope.params[index].ty,
                });
            }
            if let Some(&ty) = scope.locals.get(name) {
                return Some(Expr::Local { name, ty });
            }
        }

        let index = self.fields.iter().position(|f| f.name == name)?;
        Some(Expr::Field {
            index,
            name,
            ty: self.fields[index].ty,
        })
    }

    fn expr_ty(&self, expr: &Expr) -> Ty {
        match expr {
            Expr::Call(MethodCall {
                name,
                target: CallTarget::Pending(_),
                ..
            }) => self
                .signatures
                .get(name)
                .map(|s| s.ret)
                .unwrap_or(Ty::Object),
            Expr::Calculation { left, .. } | Expr::Logical { left, .. } => self.expr_ty(left),
            _ => expr.ty(&self.methods),
        }
    }

    /// Consumes `"text"` and returns the raw text between the quotes.
    fn string_literal(&mut self) -> Result<(Symbol, Span)> {
        let open = self.consume(Quote)?;
        self.lexer.set_position(open.span.hi());
        let content = self.lexer.string_content();
        self.curr = self.lexer.advance();
        self.consume(Quote)?;
        Ok(content)
    }

    fn skip_braced(&mut self) -> Result<()> {
        self.consume(OpenBrace)?;
        let mut depth = 1;
        while depth > 0 {
            match self.curr.kind {
                OpenBrace => depth += 1,
                CloseBrace => depth -= 1,
                Quote => {
                    self.string_literal()?;
                    continue;
                }
                Eof => return Err(self.unexpected(CloseBrace)),
                _ => {}
            }
            self.bump();
        }
        Ok(())
    }

    fn skip_until(&mut self, kind: TokenKind) -> Result<()> {
        while !self.check(kind) {
            match self.curr.kind {
                Quote => {
                    self.string_literal()?;
                }
                Eof => return Err(self.unexpected(kind)),
                _ => self.bump(),
            }
        }
        Ok(())
    }

    fn rewind(&mut self) {
        self.lexer.set_position(0);
        self.curr = self.lexer.advance();
        self.prev = Token::dummy();
    }

    /// The `n` tokens following the current one.
    fn look_ahead(&mut self, n: usize) -> Vec<Token> {
        let cursor = self.lexer.snapshot();
        let tokens = (0..n).map(|_| self.lexer.advance()).collect();
        self.lexer.restore(cursor);
        tokens
    }

    /// Whether the current token and the ones after it have these kinds.
    fn next_kinds_are(&mut self, kinds: &[TokenKind]) -> bool {
        match kinds.split_first() {
            Some((first, rest)) if self.check(*first) => self
                .look_ahead(rest.len())
                .iter()
                .zip(rest)
                .all(|(t, k)| t.kind == *k),
            Some(_) => false,
            None => true,
        }
    }

    fn unexpected(&self, expected: TokenKind) -> CompileError {
        CompileError::UnexpectedToken {
            expected,
            found: self.found(),
            span: self.curr.span,
        }
    }

    fn expected(&self, expected: &'static str) -> CompileError {
        CompileError::Expected {
            expected,
            found: self.found(),
            span: self.curr.span,
        }
    }

    fn found(&self) -> Symbol {
        if self.check(Eof) {
            Symbol::intern("end of file")
        } else {
            self.curr.symbol
        }
    }

    fn consume(&mut self, kind: TokenKind) -> Result<Token> {
        if self.check(kind) {
            self.bump();
            return Ok(self.prev.clone());
        }
        Err(self.unexpected(kind))
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.curr.kind == kind
    }

    fn bump(&mut self) {
        self.prev = std::mem::replace(&mut self.curr, self.lexer.advance())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ast::{CmpOp, Lit, Stmt};
    use crate::err::ErrorKind;

    #[test]
    fn operator_scan_leaves_no_placeholders() {
        let mut parser = Parser::new(
            r#"
            class A {
                int F() { return G(1) + 2; }
                int G(int x) { return x; }
            }
            "#
            .into(),
        );
        let object = parser.parse().unwrap();
        assert_eq!(parser.placeholders.len(), 1);
        assert_eq!(object.methods.len(), 2);
    }

    #[test]
    fn operator_scan_skips_strings_and_arguments() {
        let scan = |src: &str| {
            let mut parser = Parser::new(src.into());
            let before = (parser.curr.clone(), parser.lexer.position());
            let found = parser.logical_follows();
            assert_eq!((parser.curr.clone(), parser.lexer.position()), before);
            found
        };
        assert!(!scan(r#"Id(a > b) + "x & (y" ;"#));
        assert!(!scan(r#""a // b" + c)"#));
        assert!(scan("(a + 1) == 2;"));
        assert!(scan("Id(1, 2) >= 3)"));
        assert!(!scan("a + 1 = 2;"));
    }

    #[test]
    fn fields_declared_after_methods_are_visible() {
        let object = parse(
            r#"
            class A {
                int Get() { return late; }
                int late = 4;
            }
            "#,
        )
        .unwrap();
        match &object.methods[0].body[0] {
            Stmt::Return(Some(Expr::Field { index: 0, ty: Ty::Int, .. })) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn pending_call_typed_from_signature() {
        let object = parse(
            r#"
            class A {
                bool Check() { return Big() > 1; }
                long Big() { return 5; }
            }
            "#,
        )
        .unwrap();
        match &object.methods[0].body[0] {
            Stmt::Return(Some(Expr::Predicate { op, right, .. })) => {
                assert_eq!(*op, CmpOp::Gt);
                assert_eq!(**right, Expr::Literal(Lit::Long(1)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn block_scopes_are_restored() {
        let err = parse(
            r#"
            class A {
                void M() {
                    if (true) { int t = 1; }
                    t = 2;
                }
            }
            "#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Binding);
    }

    #[test]
    fn unterminated_class() {
        let err = parse("class A { int x = 1;").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax);
    }
}
