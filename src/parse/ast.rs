use crate::{err::Result, lex::Span, symbol::Symbol};
use std::{fmt, ops::RangeInclusive, rc::Rc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ty {
    Int,
    Long,
    Short,
    Byte,
    Char,
    Float,
    Double,
    Bool,
    Str,
    Object,
    Void,
}

impl Ty {
    pub fn from_keyword(s: &str) -> Option<Ty> {
        let ty = match s {
            "int" => Ty::Int,
            "long" => Ty::Long,
            "short" => Ty::Short,
            "byte" => Ty::Byte,
            "char" => Ty::Char,
            "float" => Ty::Float,
            "double" => Ty::Double,
            "bool" => Ty::Bool,
            "string" => Ty::Str,
            "object" => Ty::Object,
            "void" => Ty::Void,
            _ => return None,
        };
        Some(ty)
    }

    pub fn is_numeric(self) -> bool {
        self.is_integral() || matches!(self, Ty::Float | Ty::Double)
    }

    pub fn is_integral(self) -> bool {
        matches!(self, Ty::Int | Ty::Long | Ty::Short | Ty::Byte)
    }

    /// Whether a value of type `other` can be stored where `self` is expected.
    pub fn accepts(self, other: Ty) -> bool {
        other != Ty::Void && (self == other || self == Ty::Object)
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Ty::Int => "int",
            Ty::Long => "long",
            Ty::Short => "short",
            Ty::Byte => "byte",
            Ty::Char => "char",
            Ty::Float => "float",
            Ty::Double => "double",
            Ty::Bool => "bool",
            Ty::Str => "string",
            Ty::Object => "object",
            Ty::Void => "void",
        };
        f.write_str(s)
    }
}

/// A constant with its runtime type resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum Lit {
    Int(i32),
    Long(i64),
    Short(i16),
    Byte(u8),
    Char(char),
    Float(f32),
    Double(f64),
    Bool(bool),
    Str(Rc<str>),
}

impl Lit {
    /// Converts source text to a constant of type `ty`.
    pub fn parse(text: &str, ty: Ty) -> Option<Lit> {
        let lit = match ty {
            Ty::Int => Lit::Int(parse_number(text)?),
            Ty::Long => Lit::Long(parse_number(text)?),
            Ty::Short => Lit::Short(parse_number(text)?),
            Ty::Byte => Lit::Byte(parse_number(text)?),
            Ty::Float => Lit::Float(parse_number(text)?),
            Ty::Double => Lit::Double(parse_number(text)?),
            Ty::Bool => Lit::Bool(parse_bool(text)?),
            Ty::Char => {
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Lit::Char(c),
                    _ => return None,
                }
            }
            Ty::Str => Lit::Str(text.into()),
            Ty::Object | Ty::Void => return None,
        };
        Some(lit)
    }

    /// Picks a type for text that appears without a usable context.
    pub fn infer(text: &str) -> Option<Lit> {
        if let Some(b) = parse_bool(text) {
            return Some(Lit::Bool(b));
        }
        if !looks_numeric(text) {
            return None;
        }
        if text.contains('.') {
            return text.parse().ok().map(Lit::Double);
        }
        text.parse()
            .map(Lit::Int)
            .or_else(|_| text.parse().map(Lit::Long))
            .ok()
    }

    /// The constant `1` of a numeric type.
    pub fn one(ty: Ty) -> Option<Lit> {
        let lit = match ty {
            Ty::Int => Lit::Int(1),
            Ty::Long => Lit::Long(1),
            Ty::Short => Lit::Short(1),
            Ty::Byte => Lit::Byte(1),
            Ty::Float => Lit::Float(1.0),
            Ty::Double => Lit::Double(1.0),
            _ => return None,
        };
        Some(lit)
    }

    pub fn ty(&self) -> Ty {
        match self {
            Lit::Int(_) => Ty::Int,
            Lit::Long(_) => Ty::Long,
            Lit::Short(_) => Ty::Short,
            Lit::Byte(_) => Ty::Byte,
            Lit::Char(_) => Ty::Char,
            Lit::Float(_) => Ty::Float,
            Lit::Double(_) => Ty::Double,
            Lit::Bool(_) => Ty::Bool,
            Lit::Str(_) => Ty::Str,
        }
    }
}

/// Source form of the constant.
impl fmt::Display for Lit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lit::Int(v) => write!(f, "{}", v),
            Lit::Long(v) => write!(f, "{}", v),
            Lit::Short(v) => write!(f, "{}", v),
            Lit::Byte(v) => write!(f, "{}", v),
            Lit::Char(c) => write!(f, "{}", c),
            Lit::Float(v) => write_fraction(f, v.to_string()),
            Lit::Double(v) => write_fraction(f, v.to_string()),
            Lit::Bool(b) => write!(f, "{}", b),
            Lit::Str(s) => write!(f, "\"{}\"", s),
        }
    }
}

fn write_fraction(f: &mut fmt::Formatter<'_>, s: String) -> fmt::Result {
    if s.contains('.') {
        f.write_str(&s)
    } else {
        write!(f, "{}.0", s)
    }
}

fn looks_numeric(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    digits.starts_with(|c: char| c.is_ascii_digit())
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
}

fn parse_number<T: std::str::FromStr>(text: &str) -> Option<T> {
    if looks_numeric(text) {
        text.parse().ok()
    } else {
        None
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    if text.eq_ignore_ascii_case("true") {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl ArithOp {
    pub fn from_text(s: &str) -> Option<Self> {
        let op = match s {
            "+" => ArithOp::Add,
            "-" => ArithOp::Sub,
            "*" => ArithOp::Mul,
            "/" => ArithOp::Div,
            "%" => ArithOp::Rem,
            _ => return None,
        };
        Some(op)
    }

    pub fn priority(self) -> u8 {
        match self {
            ArithOp::Add | ArithOp::Sub => 1,
            ArithOp::Mul | ArithOp::Div | ArithOp::Rem => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
            ArithOp::Rem => "%",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
    Xor,
}

impl LogicOp {
    pub fn from_text(s: &str) -> Option<Self> {
        let op = match s {
            "&" => LogicOp::And,
            "|" => LogicOp::Or,
            "^" => LogicOp::Xor,
            _ => return None,
        };
        Some(op)
    }

    pub fn priority(self) -> u8 {
        1
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LogicOp::And => "&",
            LogicOp::Or => "|",
            LogicOp::Xor => "^",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
    Ne,
}

impl CmpOp {
    pub fn as_str(self) -> &'static str {
        match self {
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
        }
    }
}

/// Methods every class can call without declaring them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Print,
    PrintLine,
    ReadLine,
    ReadInt,
    RandomInt,
}

impl Builtin {
    pub fn from_name(s: &str) -> Option<Self> {
        let b = match s {
            "Print" => Builtin::Print,
            "PrintLine" => Builtin::PrintLine,
            "ReadLine" => Builtin::ReadLine,
            "ReadInt" => Builtin::ReadInt,
            "RandomInt" => Builtin::RandomInt,
            _ => return None,
        };
        Some(b)
    }

    pub fn arity(self) -> RangeInclusive<usize> {
        match self {
            Builtin::Print => 1..=1,
            Builtin::PrintLine => 0..=1,
            Builtin::ReadLine | Builtin::ReadInt => 0..=0,
            Builtin::RandomInt => 0..=2,
        }
    }

    pub fn ret(self) -> Ty {
        match self {
            Builtin::Print | Builtin::PrintLine => Ty::Void,
            Builtin::ReadLine => Ty::Str,
            Builtin::ReadInt | Builtin::RandomInt => Ty::Int,
        }
    }
}

/// Index into [`Object::methods`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub enum CallTarget {
    /// Index into the parser's placeholder table, replaced during fix-up.
    Pending(usize),
    Method(MethodId),
    Builtin(Builtin),
}

#[derive(Debug, Clone)]
pub struct MethodCall {
    pub name: Symbol,
    pub span: Span,
    pub target: CallTarget,
    pub args: Vec<Expr>,
}

/// Equal calls may sit at different places in the source.
impl PartialEq for MethodCall {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.target == other.target && self.args == other.args
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Lit),
    Field {
        index: usize,
        name: Symbol,
        ty: Ty,
    },
    Param {
        index: usize,
        name: Symbol,
        ty: Ty,
    },
    Local {
        name: Symbol,
        ty: Ty,
    },
    Calculation {
        op: ArithOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        op: LogicOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Predicate {
        op: CmpOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call(MethodCall),
}

impl Expr {
    /// Static type of the expression. Unresolved calls are typed `object`.
    pub fn ty(&self, methods: &[Method]) -> Ty {
        match self {
            Expr::Literal(lit) => lit.ty(),
            Expr::Field { ty, .. } | Expr::Param { ty, .. } | Expr::Local { ty, .. } => *ty,
            Expr::Calculation { left, .. } | Expr::Logical { left, .. } => left.ty(methods),
            Expr::Predicate { .. } => Ty::Bool,
            Expr::Call(call) => match call.target {
                CallTarget::Builtin(b) => b.ret(),
                CallTarget::Method(MethodId(id)) => {
                    methods.get(id).map(|m| m.ret).unwrap_or(Ty::Object)
                }
                CallTarget::Pending(_) => Ty::Object,
            },
        }
    }

    pub fn visit_calls_mut(
        &mut self,
        f: &mut dyn FnMut(&mut MethodCall) -> Result<()>,
    ) -> Result<()> {
        match self {
            Expr::Literal(_) | Expr::Field { .. } | Expr::Param { .. } | Expr::Local { .. } => {
                Ok(())
            }
            Expr::Calculation { left, right, .. }
            | Expr::Logical { left, right, .. }
            | Expr::Predicate { left, right, .. } => {
                left.visit_calls_mut(f)?;
                right.visit_calls_mut(f)
            }
            Expr::Call(call) => {
                for arg in &mut call.args {
                    arg.visit_calls_mut(f)?;
                }
                f(call)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct LocalVariable {
    pub name: Symbol,
    pub ty: Ty,
    pub init: Expr,
    /// Source offset of the declaration. Not part of equality.
    pub position: usize,
}

impl PartialEq for LocalVariable {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.ty == other.ty && self.init == other.init
    }
}

#[derive(Debug, Clone)]
pub struct Assignment {
    pub target: Symbol,
    pub span: Span,
    pub value: Expr,
}

impl PartialEq for Assignment {
    fn eq(&self, other: &Self) -> bool {
        self.target == other.target && self.value == other.value
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStatement {
    pub cond: Expr,
    pub then_body: Vec<Stmt>,
    pub else_body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileLoop {
    pub cond: Expr,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Local(LocalVariable),
    Assign(Assignment),
    Call(MethodCall),
    Return(Option<Expr>),
    If(IfStatement),
    While(WhileLoop),
}

impl Stmt {
    pub fn visit_calls_mut(
        &mut self,
        f: &mut dyn FnMut(&mut MethodCall) -> Result<()>,
    ) -> Result<()> {
        match self {
            Stmt::Local(local) => local.init.visit_calls_mut(f),
            Stmt::Assign(assign) => assign.value.visit_calls_mut(f),
            Stmt::Call(call) => {
                for arg in &mut call.args {
                    arg.visit_calls_mut(f)?;
                }
                f(call)
            }
            Stmt::Return(value) => match value {
                Some(value) => value.visit_calls_mut(f),
                None => Ok(()),
            },
            Stmt::If(stmt) => {
                stmt.cond.visit_calls_mut(f)?;
                for s in stmt.then_body.iter_mut().chain(&mut stmt.else_body) {
                    s.visit_calls_mut(f)?;
                }
                Ok(())
            }
            Stmt::While(stmt) => {
                stmt.cond.visit_calls_mut(f)?;
                for s in &mut stmt.body {
                    s.visit_calls_mut(f)?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: Symbol,
    pub ty: Ty,
    pub init: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Param {
    pub name: Symbol,
    pub ty: Ty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    pub name: Symbol,
    pub ret: Ty,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
}

/// Root of a compilation unit: one class.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    pub name: Symbol,
    pub fields: Vec<Field>,
    pub methods: Vec<Method>,
}

impl Object {
    pub fn method(&self, id: MethodId) -> Option<&Method> {
        self.methods.get(id.0)
    }

    pub fn field_index(&self, name: Symbol) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_conversion() {
        assert_eq!(Lit::parse("300", Ty::Byte), None);
        assert_eq!(Lit::parse("200", Ty::Byte), Some(Lit::Byte(200)));
        assert_eq!(Lit::parse("-7", Ty::Short), Some(Lit::Short(-7)));
        assert_eq!(Lit::parse("inf", Ty::Float), None);
        assert_eq!(Lit::parse("True", Ty::Bool), Some(Lit::Bool(true)));
        assert_eq!(Lit::parse("ab", Ty::Char), None);
        assert_eq!(Lit::infer("1"), Some(Lit::Int(1)));
        assert_eq!(Lit::infer("5000000000"), Some(Lit::Long(5_000_000_000)));
        assert_eq!(Lit::infer("2.5"), Some(Lit::Double(2.5)));
        assert_eq!(Lit::infer("abc"), None);
    }

    #[test]
    fn literal_display() {
        assert_eq!(Lit::Double(3.0).to_string(), "3.0");
        assert_eq!(Lit::Float(0.25).to_string(), "0.25");
        assert_eq!(Lit::Str("hi there".into()).to_string(), "\"hi there\"");
    }

    #[test]
    fn equality_ignores_source_positions() {
        let local = |position| LocalVariable {
            name: Symbol::intern("n"),
            ty: Ty::Int,
            init: Expr::Literal(Lit::Int(3)),
            position,
        };
        assert_eq!(local(4), local(40));

        let assign = |lo| Assignment {
            target: Symbol::intern("n"),
            span: Span::new(lo, lo + 1),
            value: Expr::Literal(Lit::Int(1)),
        };
        assert_eq!(assign(0), assign(12));
        assert_ne!(local(4), LocalVariable { ty: Ty::Long, ..local(4) });
    }

    #[test]
    fn object_accepts_anything_but_void() {
        assert!(Ty::Object.accepts(Ty::Int));
        assert!(!Ty::Object.accepts(Ty::Void));
        assert!(!Ty::Int.accepts(Ty::Long));
    }
}
