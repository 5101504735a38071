mod builtin;
mod emit;
pub mod instr;

pub use emit::Emitter;
pub use instr::{ClassType, FieldDef, Instr, Label, MethodBody, MethodDef, Runtime};

use crate::{
    err::{CompileError, Result},
    parse::ast::{
        ArithOp, Assignment, CallTarget, CmpOp, Expr, IfStatement, Lit, LogicOp, Method,
        MethodCall, Object, Stmt, Ty, WhileLoop,
    },
    symbol::{Symbol, SymbolTable},
};
use bitflags::bitflags;

bitflags! {
    /// How a predicate is lowered.
    pub struct VisitOptions: u8 {
        /// Emit a conditional branch instead of a value.
        const CONDITION = 0b01;
        /// Branch when the predicate holds rather than when it fails.
        const BRANCH_ON_TRUE = 0b10;
    }
}

/// Lowers a parsed class to bytecode.
pub fn generate(object: &Object) -> Result<ClassType> {
    Generator::new(object).generate()
}

pub struct Generator<'a> {
    object: &'a Object,
    il: Option<Emitter>,
    locals: SymbolTable<(u16, Ty)>,
    method: Option<&'a Method>,
}

impl<'a> Generator<'a> {
    pub fn new(object: &'a Object) -> Self {
        Self {
            object,
            il: None,
            locals: SymbolTable::new(),
            method: None,
        }
    }

    pub fn generate(mut self) -> Result<ClassType> {
        let ctor = self.constructor()?;
        let object = self.object;
        let mut methods = Vec::with_capacity(object.methods.len());
        for method in &object.methods {
            methods.push(self.method(method)?);
        }

        log::debug!(
            "generated `{}`: {} field(s), {} method(s)",
            self.object.name,
            self.object.fields.len(),
            methods.len()
        );
        Ok(ClassType {
            name: self.object.name,
            fields: self
                .object
                .fields
                .iter()
                .map(|f| FieldDef {
                    name: f.name,
                    ty: f.ty,
                })
                .collect(),
            ctor,
            methods,
        })
    }

    /// Base constructor first, then field initializers in declaration order.
    fn constructor(&mut self) -> Result<MethodBody> {
        self.il = Some(Emitter::new());
        self.locals = SymbolTable::new();
        self.emit(Instr::LdArg(0))?;
        self.emit(Instr::CallBase)?;

        let object = self.object;
        for (index, field) in object.fields.iter().enumerate() {
            self.emit(Instr::LdArg(0))?;
            let ty = self.expr(&field.init)?;
            check(field.ty, ty, || format!("initializer of field `{}`", field.name))?;
            self.emit(Instr::StFld(index))?;
        }
        self.emit(Instr::Ret)?;
        self.finish()
    }

    fn method(&mut self, method: &'a Method) -> Result<MethodDef> {
        log::debug!("generating `{} {}`", method.ret, method.name);
        self.il = Some(Emitter::new());
        self.locals = SymbolTable::new();
        self.method = Some(method);

        for stmt in &method.body {
            self.stmt(stmt)?;
        }

        if method.ret == Ty::Void {
            if !matches!(method.body.last(), Some(Stmt::Return(_))) {
                self.emit(Instr::Ret)?;
            }
        } else if !always_returns(&method.body) {
            return Err(CompileError::MissingReturn {
                method: method.name,
                ty: method.ret,
            });
        }

        self.method = None;
        Ok(MethodDef {
            name: method.name,
            ret: method.ret,
            params: method.params.iter().map(|p| p.ty).collect(),
            body: self.finish()?,
        })
    }

    fn finish(&mut self) -> Result<MethodBody> {
        self.il
            .take()
            .ok_or(CompileError::NoEmitTarget { node: "method" })?
            .finish()
    }

    fn il(&mut self, node: &'static str) -> Result<&mut Emitter> {
        self.il.as_mut().ok_or(CompileError::NoEmitTarget { node })
    }

    fn emit(&mut self, instr: Instr) -> Result<()> {
        self.il("instruction")?.emit(instr);
        Ok(())
    }

    pub fn stmt(&mut self, stmt: &Stmt) -> Result<()> {
        self.il(stmt_name(stmt))?;
        match stmt {
            Stmt::Local(local) => {
                let ty = self.expr(&local.init)?;
                check(local.ty, ty, || format!("declaration of `{}`", local.name))?;
                let slot = self.il("local")?.declare_local(local.ty);
                self.emit(Instr::StLoc(slot))?;
                self.locals.insert(local.name, (slot, local.ty));
                Ok(())
            }
            Stmt::Assign(assign) => self.assignment(assign),
            Stmt::Call(call) => {
                if self.call(call)? != Ty::Void {
                    self.emit(Instr::Pop)?;
                }
                Ok(())
            }
            Stmt::Return(value) => self.ret(value.as_ref()),
            Stmt::If(stmt) => self.if_statement(stmt),
            Stmt::While(stmt) => self.while_loop(stmt),
        }
    }

    fn block(&mut self, stmts: &[Stmt]) -> Result<()> {
        let scope = self.locals.enter();
        for stmt in stmts {
            self.stmt(stmt)?;
        }
        self.locals.leave(scope);
        Ok(())
    }

    /// Parameter, then local, then field.
    fn assignment(&mut self, assign: &Assignment) -> Result<()> {
        let name = assign.target;
        let context = || format!("assignment to `{}`", name);

        let param = self
            .method
            .and_then(|m| m.params.iter().position(|p| p.name == name).map(|i| (i, m.params[i].ty)));
        if let Some((index, ty)) = param {
            let found = self.expr(&assign.value)?;
            check(ty, found, context)?;
            return self.emit(Instr::StArg(index as u16 + 1));
        }

        if let Some(&(slot, ty)) = self.locals.get(name) {
            let found = self.expr(&assign.value)?;
            check(ty, found, context)?;
            return self.emit(Instr::StLoc(slot));
        }

        if let Some(index) = self.object.field_index(name) {
            let ty = self.object.fields[index].ty;
            self.emit(Instr::LdArg(0))?;
            let found = self.expr(&assign.value)?;
            check(ty, found, context)?;
            return self.emit(Instr::StFld(index));
        }

        Err(CompileError::UnknownIdentifier {
            name,
            span: Some(assign.span),
        })
    }

    fn ret(&mut self, value: Option<&Expr>) -> Result<()> {
        let method = self
            .method
            .ok_or(CompileError::NoEmitTarget { node: "return" })?;

        match (value, method.ret) {
            (None, Ty::Void) => {}
            (None, expected) => {
                return Err(CompileError::TypeMismatch {
                    expected,
                    found: Ty::Void,
                    context: format!("return from `{}`", method.name),
                })
            }
            (Some(_), Ty::Void) => {
                return Err(CompileError::UnexpectedReturnValue {
                    method: method.name,
                })
            }
            (Some(value), expected) => {
                let found = self.expr(value)?;
                check(expected, found, || format!("return from `{}`", method.name))?;
            }
        }
        self.emit(Instr::Ret)
    }

    fn if_statement(&mut self, stmt: &IfStatement) -> Result<()> {
        let il = self.il("if statement")?;
        let else_label = il.define_label();
        let end = il.define_label();

        self.condition(&stmt.cond, else_label, VisitOptions::CONDITION)?;
        self.block(&stmt.then_body)?;
        self.emit(Instr::Br(end))?;
        self.il("if statement")?.mark_label(else_label);
        self.block(&stmt.else_body)?;
        self.il("if statement")?.mark_label(end);
        Ok(())
    }

    fn while_loop(&mut self, stmt: &WhileLoop) -> Result<()> {
        let il = self.il("while loop")?;
        let start = il.define_label();
        let cond = il.define_label();

        self.emit(Instr::Br(cond))?;
        self.il("while loop")?.mark_label(start);
        self.block(&stmt.body)?;
        self.il("while loop")?.mark_label(cond);
        self.condition(
            &stmt.cond,
            start,
            VisitOptions::CONDITION | VisitOptions::BRANCH_ON_TRUE,
        )
    }

    /// Emits a branch to `target` taken when `cond` fails, or when it holds
    /// with `BRANCH_ON_TRUE`.
    fn condition(&mut self, cond: &Expr, target: Label, options: VisitOptions) -> Result<()> {
        if let Expr::Predicate { op, left, right } = cond {
            self.predicate(*op, left, right, options, Some(target))?;
            return Ok(());
        }

        let ty = self.expr(cond)?;
        if ty != Ty::Bool && !ty.is_integral() {
            return Err(CompileError::TypeMismatch {
                expected: Ty::Bool,
                found: ty,
                context: "condition".into(),
            });
        }
        if options.contains(VisitOptions::BRANCH_ON_TRUE) {
            self.emit(Instr::BrTrue(target))
        } else {
            self.emit(Instr::BrFalse(target))
        }
    }

    /// Pushes the value of `expr` and returns its type.
    pub fn expr(&mut self, expr: &Expr) -> Result<Ty> {
        self.il(expr_name(expr))?;
        match expr {
            Expr::Literal(lit) => {
                let instr = match lit {
                    Lit::Int(v) => Instr::LdcI4(*v),
                    Lit::Str(s) => Instr::LdStr(s.clone()),
                    lit => Instr::LdConst(lit.clone()),
                };
                self.emit(instr)?;
                Ok(lit.ty())
            }
            Expr::Field { index, ty, .. } => {
                self.emit(Instr::LdArg(0))?;
                self.emit(Instr::LdFld(*index))?;
                Ok(*ty)
            }
            Expr::Param { index, ty, .. } => {
                self.emit(Instr::LdArg(*index as u16 + 1))?;
                Ok(*ty)
            }
            Expr::Local { name, .. } => {
                let (slot, ty) = self.local(*name)?;
                self.emit(Instr::LdLoc(slot))?;
                Ok(ty)
            }
            Expr::Calculation { op, left, right } => self.calculation(*op, left, right),
            Expr::Logical { op, left, right } => self.logical(*op, left, right),
            Expr::Predicate { op, left, right } => {
                self.predicate(*op, left, right, VisitOptions::empty(), None)
            }
            Expr::Call(call) => self.call(call),
        }
    }

    fn local(&self, name: Symbol) -> Result<(u16, Ty)> {
        self.locals
            .get(name)
            .copied()
            .ok_or(CompileError::UnknownIdentifier { name, span: None })
    }

    fn operands(&mut self, op: &'static str, left: &Expr, right: &Expr) -> Result<Ty> {
        let left = self.expr(left)?;
        let right = self.expr(right)?;
        if left != right {
            return Err(CompileError::TypeMismatch {
                expected: left,
                found: right,
                context: format!("operator `{}`", op),
            });
        }
        Ok(left)
    }

    fn calculation(&mut self, op: ArithOp, left: &Expr, right: &Expr) -> Result<Ty> {
        let ty = self.operands(op.as_str(), left, right)?;
        let instr = match (op, ty) {
            (ArithOp::Add, Ty::Str) => Instr::CallRuntime(Runtime::Concat),
            (_, ty) if !ty.is_numeric() => {
                return Err(CompileError::UnsupportedOperator {
                    op: op.as_str(),
                    ty,
                })
            }
            (ArithOp::Add, _) => Instr::Add,
            (ArithOp::Sub, _) => Instr::Sub,
            (ArithOp::Mul, _) => Instr::Mul,
            (ArithOp::Div, _) => Instr::Div,
            (ArithOp::Rem, _) => Instr::Rem,
        };
        self.emit(instr)?;
        Ok(ty)
    }

    fn logical(&mut self, op: LogicOp, left: &Expr, right: &Expr) -> Result<Ty> {
        let ty = self.operands(op.as_str(), left, right)?;
        if ty != Ty::Bool && !ty.is_integral() {
            return Err(CompileError::UnsupportedOperator {
                op: op.as_str(),
                ty,
            });
        }
        self.emit(match op {
            LogicOp::And => Instr::And,
            LogicOp::Or => Instr::Or,
            LogicOp::Xor => Instr::Xor,
        })?;
        Ok(ty)
    }

    /// As a condition, a single branch to `target`; otherwise a `bool` value.
    fn predicate(
        &mut self,
        op: CmpOp,
        left: &Expr,
        right: &Expr,
        options: VisitOptions,
        target: Option<Label>,
    ) -> Result<Ty> {
        let ty = self.operands(op.as_str(), left, right)?;
        let ordered = ty.is_numeric() || ty == Ty::Char;
        if !ordered && !matches!(op, CmpOp::Eq | CmpOp::Ne) {
            return Err(CompileError::UnsupportedOperator {
                op: op.as_str(),
                ty,
            });
        }

        if let (true, Some(target)) = (options.contains(VisitOptions::CONDITION), target) {
            let op = if options.contains(VisitOptions::BRANCH_ON_TRUE) {
                op
            } else {
                negate(op)
            };
            self.emit(match op {
                CmpOp::Gt => Instr::Bgt(target),
                CmpOp::Ge => Instr::Bge(target),
                CmpOp::Lt => Instr::Blt(target),
                CmpOp::Le => Instr::Ble(target),
                CmpOp::Eq => Instr::Beq(target),
                CmpOp::Ne => Instr::BneUn(target),
            })?;
            return Ok(Ty::Bool);
        }

        let (instr, invert) = match op {
            CmpOp::Gt => (Instr::Cgt, false),
            CmpOp::Ge => (Instr::Clt, true),
            CmpOp::Lt => (Instr::Clt, false),
            CmpOp::Le => (Instr::Cgt, true),
            CmpOp::Eq => (Instr::Ceq, false),
            CmpOp::Ne => (Instr::Ceq, true),
        };
        self.emit(instr)?;
        if invert {
            self.emit(Instr::Not)?;
        }
        Ok(Ty::Bool)
    }

    fn call(&mut self, call: &MethodCall) -> Result<Ty> {
        match call.target {
            CallTarget::Builtin(builtin) => self.builtin(builtin, call),
            CallTarget::Pending(_) => Err(CompileError::UnpatchedCall { name: call.name }),
            CallTarget::Method(id) => {
                let object = self.object;
                let method = object
                    .method(id)
                    .ok_or(CompileError::UnpatchedCall { name: call.name })?;

                self.emit(Instr::LdArg(0))?;
                for (i, (arg, param)) in call.args.iter().zip(&method.params).enumerate() {
                    let found = self.expr(arg)?;
                    check(param.ty, found, || {
                        format!("argument {} of `{}`", i + 1, method.name)
                    })?;
                }
                self.emit(Instr::Call(id.0))?;
                Ok(method.ret)
            }
        }
    }
}

fn check(expected: Ty, found: Ty, context: impl FnOnce() -> String) -> Result<()> {
    if expected.accepts(found) {
        Ok(())
    } else {
        Err(CompileError::TypeMismatch {
            expected,
            found,
            context: context(),
        })
    }
}

fn negate(op: CmpOp) -> CmpOp {
    match op {
        CmpOp::Gt => CmpOp::Le,
        CmpOp::Ge => CmpOp::Lt,
        CmpOp::Lt => CmpOp::Ge,
        CmpOp::Le => CmpOp::Gt,
        CmpOp::Eq => CmpOp::Ne,
        CmpOp::Ne => CmpOp::Eq,
    }
}

/// Whether every path through `stmts` ends in a `return`.
fn always_returns(stmts: &[Stmt]) -> bool {
    stmts.iter().any(|stmt| match stmt {
        Stmt::Return(_) => true,
        Stmt::If(stmt) => always_returns(&stmt.then_body) && always_returns(&stmt.else_body),
        _ => false,
    })
}

fn stmt_name(stmt: &Stmt) -> &'static str {
    match stmt {
        Stmt::Local(_) => "local declaration",
        Stmt::Assign(_) => "assignment",
        Stmt::Call(_) => "method call",
        Stmt::Return(_) => "return",
        Stmt::If(_) => "if statement",
        Stmt::While(_) => "while loop",
    }
}

fn expr_name(expr: &Expr) -> &'static str {
    match expr {
        Expr::Literal(_) => "literal",
        Expr::Field { .. } => "field",
        Expr::Param { .. } => "parameter",
        Expr::Local { .. } => "local",
        Expr::Calculation { .. } => "calculation",
        Expr::Logical { .. } => "logical expression",
        Expr::Predicate { .. } => "predicate",
        Expr::Call(_) => "method call",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;

    fn method_code(src: &str, name: &str) -> Vec<Instr> {
        let class = generate(&parse(src).unwrap()).unwrap();
        match class.method(name) {
            Some((_, m)) => m.body.code.clone(),
            None => panic!("no method {}", name),
        }
    }

    #[test]
    fn visiting_without_emitter_fails() {
        let object = parse("class A { }").unwrap();
        let mut gen = Generator::new(&object);
        assert_eq!(
            gen.expr(&Expr::Literal(Lit::Int(1))),
            Err(CompileError::NoEmitTarget { node: "literal" })
        );
    }

    #[test]
    fn constructor_calls_base_first() {
        let class = generate(&parse("class A { int x = 5; string s = hi; }").unwrap()).unwrap();
        assert_eq!(
            class.ctor.code,
            vec![
                Instr::LdArg(0),
                Instr::CallBase,
                Instr::LdArg(0),
                Instr::LdcI4(5),
                Instr::StFld(0),
                Instr::LdArg(0),
                Instr::LdStr("hi".into()),
                Instr::StFld(1),
                Instr::Ret,
            ]
        );
    }

    #[test]
    fn if_branches_on_reversed_predicate() {
        let code = method_code(
            "class A { int Max(int a, int b) { if (a > b) { return a; } return b; } }",
            "Max",
        );
        assert_eq!(code[0], Instr::LdArg(1));
        assert_eq!(code[1], Instr::LdArg(2));
        assert_eq!(code[2], Instr::Ble(Label(0)));
    }

    #[test]
    fn while_tests_at_the_bottom() {
        let code = method_code(
            "class A { void M() { int i = 0; while (i < 3) { i++; } } }",
            "M",
        );
        assert_eq!(code[2], Instr::Br(Label(1)));
        assert_eq!(code[code.len() - 2], Instr::Blt(Label(0)));
        assert_eq!(code[code.len() - 1], Instr::Ret);
    }

    #[test]
    fn predicate_as_value() {
        let code = method_code("class A { bool Ge(int a, int b) { return a >= b; } }", "Ge");
        assert_eq!(
            code,
            vec![
                Instr::LdArg(1),
                Instr::LdArg(2),
                Instr::Clt,
                Instr::Not,
                Instr::Ret
            ]
        );
    }

    #[test]
    fn call_result_is_popped() {
        let code = method_code(
            "class A { int One() { return 1; } void M() { One(); } }",
            "M",
        );
        assert_eq!(
            code,
            vec![Instr::LdArg(0), Instr::Call(0), Instr::Pop, Instr::Ret]
        );
    }
}
