use super::Parser;
use crate::{
    err::{CompileError, Result},
    lex::{Token, TokenKind::*},
    parse::ast::{
        ArithOp, Assignment, Expr, IfStatement, Lit, LocalVariable, LogicOp, Stmt, Ty, WhileLoop,
    },
};

impl Parser {
    pub(super) fn block(&mut self) -> Result<Vec<Stmt>> {
        self.consume(OpenBrace)?;
        let stmts = self.scoped(|p| {
            let mut stmts = vec![];
            while !p.check(CloseBrace) && !p.check(Eof) {
                stmts.push(p.statement()?);
            }
            Ok(stmts)
        })?;
        self.consume(CloseBrace)?;
        Ok(stmts)
    }

    /// Runs `f` inside a fresh block scope.
    fn scoped<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let outer = self.scope.as_mut().map(|scope| {
            let outer = scope.block;
            scope.block = scope.locals.enter();
            outer
        });

        let result = f(self);

        if let (Some(outer), Some(scope)) = (outer, self.scope.as_mut()) {
            scope.locals.leave(scope.block);
            scope.block = outer;
        }
        result
    }

    fn statement(&mut self) -> Result<Stmt> {
        match self.curr.kind {
            If => self.if_statement(),
            While => self.while_loop(),
            Return => self.return_statement(),
            Type => self.local_variable(),
            Ident => self.ident_statement(),
            _ => Err(self.expected("statement")),
        }
    }

    /// Statements that start with a name, told apart by the next two tokens.
    fn ident_statement(&mut self) -> Result<Stmt> {
        let next = self.look_ahead(2);
        let (first, second) = match next.as_slice() {
            [first, second] => (first, second),
            _ => return Err(self.expected("statement")),
        };

        let stmt = match (first.kind, second.kind) {
            (Equals, kind) if kind != Equals => self.assignment()?,
            (OpenParen, _) | (Dot, _) => Stmt::Call(self.method_call()?),
            (Arithmetic, Arithmetic)
                if first.symbol == second.symbol && (first.is_op("+") || first.is_op("-")) =>
            {
                self.increment()?
            }
            (Arithmetic, Equals) | (Logical, Equals) => self.compound_assignment()?,
            _ => {
                self.bump();
                return Err(self.expected("'=', '(' or an operator"));
            }
        };

        self.consume(SemiColon)?;
        Ok(stmt)
    }

    fn assignment(&mut self) -> Result<Stmt> {
        let target = self.consume(Ident)?;
        let ty = self.target_ty(&target)?;
        self.consume(Equals)?;
        let value = self.parse_expression(Some(ty))?;
        Ok(Stmt::Assign(Assignment {
            target: target.symbol,
            span: target.span,
            value,
        }))
    }

    /// `x++` and `x--`, lowered to `x = x + 1` and `x = x - 1`.
    fn increment(&mut self) -> Result<Stmt> {
        let target = self.consume(Ident)?;
        let ty = self.target_ty(&target)?;
        let op = self.consume(Arithmetic)?;
        self.consume(Arithmetic)?;

        let one = match Lit::one(ty) {
            Some(one) => one,
            None => {
                return Err(CompileError::NonNumericIncrement {
                    name: target.symbol,
                    ty,
                    span: target.span,
                })
            }
        };
        let op = op
            .symbol
            .as_str_with(ArithOp::from_text)
            .ok_or_else(|| self.expected("'++' or '--'"))?;

        Ok(Stmt::Assign(Assignment {
            target: target.symbol,
            span: target.span,
            value: Expr::Calculation {
                op,
                left: Box::new(self.target_expr(&target)?),
                right: Box::new(Expr::Literal(one)),
            },
        }))
    }

    /// `x op= value`, lowered to `x = x op value`.
    fn compound_assignment(&mut self) -> Result<Stmt> {
        let target = self.consume(Ident)?;
        let ty = self.target_ty(&target)?;
        let op = self.curr.clone();
        self.bump();
        self.consume(Equals)?;

        let left = Box::new(self.target_expr(&target)?);
        let right = Box::new(self.parse_expression(Some(ty))?);
        let value = if op.kind == Arithmetic {
            let op = op
                .symbol
                .as_str_with(ArithOp::from_text)
                .ok_or_else(|| self.expected("arithmetic operator"))?;
            Expr::Calculation { op, left, right }
        } else {
            let op = op
                .symbol
                .as_str_with(LogicOp::from_text)
                .ok_or_else(|| self.expected("logical operator"))?;
            Expr::Logical { op, left, right }
        };

        Ok(Stmt::Assign(Assignment {
            target: target.symbol,
            span: target.span,
            value,
        }))
    }

    fn local_variable(&mut self) -> Result<Stmt> {
        let position = self.curr.span.lo();
        let ty = self.ty()?;
        let name = self.consume(Ident)?;

        if ty == Ty::Void {
            return Err(CompileError::VoidNotAllowed {
                what: format!("local `{}`", name.symbol),
                span: Some(name.span),
            });
        }
        if let Some(scope) = &self.scope {
            let redeclared = scope.locals.declared_in(name.symbol, scope.block)
                || scope.params.iter().any(|p| p.name == name.symbol);
            if redeclared {
                return Err(CompileError::Duplicate {
                    what: "local",
                    name: name.symbol,
                    span: name.span,
                });
            }
        }

        self.consume(Equals)?;
        let init = self.parse_expression(Some(ty))?;
        self.consume(SemiColon)?;

        if let Some(scope) = &mut self.scope {
            scope.locals.insert(name.symbol, ty);
        }
        Ok(Stmt::Local(LocalVariable {
            name: name.symbol,
            ty,
            init,
            position,
        }))
    }

    fn if_statement(&mut self) -> Result<Stmt> {
        self.consume(If)?;
        let cond = self.condition()?;
        let then_body = self.block()?;

        let else_body = if self.eat(Else) {
            if self.check(If) {
                vec![self.if_statement()?]
            } else {
                self.block()?
            }
        } else {
            vec![]
        };

        Ok(Stmt::If(IfStatement {
            cond,
            then_body,
            else_body,
        }))
    }

    fn while_loop(&mut self) -> Result<Stmt> {
        self.consume(While)?;
        let cond = self.condition()?;
        let body = self.block()?;
        Ok(Stmt::While(WhileLoop { cond, body }))
    }

    fn condition(&mut self) -> Result<Expr> {
        self.consume(OpenParen)?;
        let cond = self.parse_expression(None)?;
        self.consume(CloseParen)?;
        Ok(cond)
    }

    fn return_statement(&mut self) -> Result<Stmt> {
        self.consume(Return)?;
        if self.eat(SemiColon) {
            return Ok(Stmt::Return(None));
        }

        let ret = self
            .scope
            .as_ref()
            .map(|scope| scope.ret)
            .filter(|ty| *ty != Ty::Void);
        let value = self.parse_expression(ret)?;
        self.consume(SemiColon)?;
        Ok(Stmt::Return(Some(value)))
    }

    fn target_expr(&self, target: &Token) -> Result<Expr> {
        self.reference(target.symbol)
            .ok_or(CompileError::UnknownIdentifier {
                name: target.symbol,
                span: Some(target.span),
            })
    }

    fn target_ty(&self, target: &Token) -> Result<Ty> {
        let expr = self.target_expr(target)?;
        Ok(self.expr_ty(&expr))
    }
}
