use crate::parse::ast::{Expr, MethodCall, Object, Stmt};

/// Renders a parsed class back to source, four spaces per level.
pub fn to_source(object: &Object) -> String {
    let mut p = Printer::default();
    p.line(0, &format!("class {} {{", object.name));
    for field in &object.fields {
        p.line(
            1,
            &format!("{} {} = {};", field.ty, field.name, expr(&field.init)),
        );
    }
    for method in &object.methods {
        let params: Vec<_> = method
            .params
            .iter()
            .map(|p| format!("{} {}", p.ty, p.name))
            .collect();
        p.line(
            1,
            &format!("{} {}({}) {{", method.ret, method.name, params.join(", ")),
        );
        p.block(2, &method.body);
        p.line(1, "}");
    }
    p.line(0, "}");
    p.out
}

#[derive(Default)]
struct Printer {
    out: String,
}

impl Printer {
    fn line(&mut self, depth: usize, text: &str) {
        self.out.push_str(&"    ".repeat(depth));
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn block(&mut self, depth: usize, stmts: &[Stmt]) {
        for stmt in stmts {
            self.stmt(depth, stmt);
        }
    }

    fn stmt(&mut self, depth: usize, stmt: &Stmt) {
        match stmt {
            Stmt::Local(local) => self.line(
                depth,
                &format!("{} {} = {};", local.ty, local.name, expr(&local.init)),
            ),
            Stmt::Assign(assign) => {
                self.line(depth, &format!("{} = {};", assign.target, expr(&assign.value)))
            }
            Stmt::Call(c) => self.line(depth, &format!("{};", call(c))),
            Stmt::Return(None) => self.line(depth, "return;"),
            Stmt::Return(Some(value)) => self.line(depth, &format!("return {};", expr(value))),
            Stmt::If(_) => {
                self.if_chain(depth, stmt, "");
                self.line(depth, "}");
            }
            Stmt::While(w) => {
                self.line(depth, &format!("while ({}) {{", expr(&w.cond)));
                self.block(depth + 1, &w.body);
                self.line(depth, "}");
            }
        }
    }

    /// Prints `if` and its `else if` continuations, leaving the final `}` to
    /// the caller.
    fn if_chain(&mut self, depth: usize, stmt: &Stmt, prefix: &str) {
        let s = match stmt {
            Stmt::If(s) => s,
            _ => return,
        };

        self.line(depth, &format!("{}if ({}) {{", prefix, expr(&s.cond)));
        self.block(depth + 1, &s.then_body);
        match s.else_body.as_slice() {
            [] => {}
            [nested @ Stmt::If(_)] => self.if_chain(depth, nested, "} else "),
            body => {
                self.line(depth, "} else {");
                self.block(depth + 1, body);
            }
        }
    }
}

fn expr(e: &Expr) -> String {
    match e {
        Expr::Literal(lit) => lit.to_string(),
        Expr::Field { name, .. } | Expr::Param { name, .. } | Expr::Local { name, .. } => {
            name.to_string()
        }
        Expr::Calculation { op, left, right } => binary(e, left, op.as_str(), right),
        Expr::Logical { op, left, right } => binary(e, left, op.as_str(), right),
        Expr::Predicate { op, left, right } => binary(e, left, op.as_str(), right),
        Expr::Call(c) => call(c),
    }
}

/// Operators group to the left, so a right operand of equal binding needs
/// parentheses. Comparisons do not chain at all.
fn binary(parent: &Expr, left: &Expr, op: &str, right: &Expr) -> String {
    let level = binding(parent);
    let left_level = binding(left);
    let left_grouped = left_level < level || (left_level == level && level == COMPARISON);
    format!(
        "{} {} {}",
        grouped(left, left_grouped),
        op,
        grouped(right, binding(right) <= level)
    )
}

const COMPARISON: u8 = 1;

/// How tightly an expression binds: logical chains loosest, then
/// comparisons, then the arithmetic priorities, then single values.
fn binding(e: &Expr) -> u8 {
    match e {
        Expr::Logical { .. } => 0,
        Expr::Predicate { .. } => COMPARISON,
        Expr::Calculation { op, .. } => 1 + op.priority(),
        _ => u8::MAX,
    }
}

fn grouped(e: &Expr, parens: bool) -> String {
    if parens {
        format!("({})", expr(e))
    } else {
        expr(e)
    }
}

fn call(c: &MethodCall) -> String {
    let args: Vec<_> = c.args.iter().map(expr).collect();
    format!("{}({})", c.name, args.join(", "))
}
