use super::VmError;
use crate::parse::ast::{ArithOp, Lit, LogicOp, Ty};
use std::{cmp::Ordering, fmt, rc::Rc};

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Void,
    Null,
    /// The receiver of the running method.
    This,
    /// A random number generator instance.
    Random,
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

impl From<Lit> for Value {
    fn from(lit: Lit) -> Self {
        match lit {
            Lit::Int(v) => Value::Int(v),
            Lit::Long(v) => Value::Long(v),
            Lit::Short(v) => Value::Short(v),
            Lit::Byte(v) => Value::Byte(v),
            Lit::Char(v) => Value::Char(v),
            Lit::Float(v) => Value::Float(v),
            Lit::Double(v) => Value::Double(v),
            Lit::Bool(v) => Value::Bool(v),
            Lit::Str(v) => Value::Str(v),
        }
    }
}

macro_rules! int_arith {
    ($op:expr, $a:expr, $b:expr) => {
        match $op {
            ArithOp::Add => $a.wrapping_add($b),
            ArithOp::Sub => $a.wrapping_sub($b),
            ArithOp::Mul => $a.wrapping_mul($b),
            ArithOp::Div | ArithOp::Rem if $b == 0 => return Err(VmError::DivideByZero),
            ArithOp::Div => $a.wrapping_div($b),
            ArithOp::Rem => $a.wrapping_rem($b),
        }
    };
}

macro_rules! float_arith {
    ($op:expr, $a:expr, $b:expr) => {
        match $op {
            ArithOp::Add => $a + $b,
            ArithOp::Sub => $a - $b,
            ArithOp::Mul => $a * $b,
            ArithOp::Div => $a / $b,
            ArithOp::Rem => $a % $b,
        }
    };
}

macro_rules! bit_op {
    ($op:expr, $a:expr, $b:expr) => {
        match $op {
            LogicOp::And => $a & $b,
            LogicOp::Or => $a | $b,
            LogicOp::Xor => $a ^ $b,
        }
    };
}

impl Value {
    /// What a field of type `ty` holds before its initializer runs.
    pub fn zero(ty: Ty) -> Value {
        match ty {
            Ty::Int => Value::Int(0),
            Ty::Long => Value::Long(0),
            Ty::Short => Value::Short(0),
            Ty::Byte => Value::Byte(0),
            Ty::Char => Value::Char('\0'),
            Ty::Float => Value::Float(0.0),
            Ty::Double => Value::Double(0.0),
            Ty::Bool => Value::Bool(false),
            Ty::Str | Ty::Object | Ty::Void => Value::Null,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Void => "void",
            Value::Null => "null",
            Value::This => "this",
            Value::Random => "Random",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Short(_) => "short",
            Value::Byte(_) => "byte",
            Value::Char(_) => "char",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Bool(_) => "bool",
            Value::Str(_) => "string",
        }
    }

    /// Integer arithmetic wraps; integer division by zero is an error.
    pub fn arith(self, op: ArithOp, rhs: Value) -> Result<Value, VmError> {
        let v = match (self, rhs) {
            (Value::Int(a), Value::Int(b)) => Value::Int(int_arith!(op, a, b)),
            (Value::Long(a), Value::Long(b)) => Value::Long(int_arith!(op, a, b)),
            (Value::Short(a), Value::Short(b)) => Value::Short(int_arith!(op, a, b)),
            (Value::Byte(a), Value::Byte(b)) => Value::Byte(int_arith!(op, a, b)),
            (Value::Float(a), Value::Float(b)) => Value::Float(float_arith!(op, a, b)),
            (Value::Double(a), Value::Double(b)) => Value::Double(float_arith!(op, a, b)),
            (a, b) => return Err(invalid(op.as_str(), &a, &b)),
        };
        Ok(v)
    }

    pub fn logic(self, op: LogicOp, rhs: Value) -> Result<Value, VmError> {
        let v = match (self, rhs) {
            (Value::Bool(a), Value::Bool(b)) => Value::Bool(bit_op!(op, a, b)),
            (Value::Int(a), Value::Int(b)) => Value::Int(bit_op!(op, a, b)),
            (Value::Long(a), Value::Long(b)) => Value::Long(bit_op!(op, a, b)),
            (Value::Short(a), Value::Short(b)) => Value::Short(bit_op!(op, a, b)),
            (Value::Byte(a), Value::Byte(b)) => Value::Byte(bit_op!(op, a, b)),
            (a, b) => return Err(invalid(op.as_str(), &a, &b)),
        };
        Ok(v)
    }

    pub fn concat(self, rhs: Value) -> Value {
        Value::Str(format!("{}{}", self, rhs).into())
    }

    /// `None` when the values are unordered, as with NaN.
    pub fn compare(&self, rhs: &Value) -> Result<Option<Ordering>, VmError> {
        let ord = match (self, rhs) {
            (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
            (Value::Long(a), Value::Long(b)) => a.partial_cmp(b),
            (Value::Short(a), Value::Short(b)) => a.partial_cmp(b),
            (Value::Byte(a), Value::Byte(b)) => a.partial_cmp(b),
            (Value::Char(a), Value::Char(b)) => a.partial_cmp(b),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Double(a), Value::Double(b)) => a.partial_cmp(b),
            (Value::Bool(a), Value::Bool(b)) => a.partial_cmp(b),
            (Value::Str(a), Value::Str(b)) => a.partial_cmp(b),
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (a, b) => return Err(invalid("compare", a, b)),
        };
        Ok(ord)
    }

    pub fn is_true(&self) -> Result<bool, VmError> {
        match *self {
            Value::Bool(b) => Ok(b),
            Value::Int(v) => Ok(v != 0),
            Value::Long(v) => Ok(v != 0),
            Value::Short(v) => Ok(v != 0),
            Value::Byte(v) => Ok(v != 0),
            Value::Null => Ok(false),
            ref v => Err(VmError::NotACondition(v.type_name())),
        }
    }
}

fn invalid(op: &'static str, left: &Value, right: &Value) -> VmError {
    VmError::InvalidOperands {
        op,
        left: left.type_name(),
        right: right.type_name(),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Void | Value::Null => Ok(()),
            Value::This => f.write_str("this"),
            Value::Random => f.write_str("System.Random"),
            Value::Int(v) => write!(f, "{}", v),
            Value::Long(v) => write!(f, "{}", v),
            Value::Short(v) => write!(f, "{}", v),
            Value::Byte(v) => write!(f, "{}", v),
            Value::Char(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Str(s) => f.write_str(s),
        }
    }
}
